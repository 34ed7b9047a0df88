#![forbid(unsafe_code)]

//! Errors raised while resolving a context at connect time.

use std::fmt;

/// A context could not be resolved when a consumer connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// No host in the ancestor chain provides the context.
    NoProvider { context: &'static str },
    /// A provider exists but holds no value yet.
    Empty { context: &'static str },
    /// The host was dropped before the consumer connected.
    Detached { context: &'static str },
}

impl ContextError {
    /// Name of the context that failed to resolve.
    #[must_use]
    pub fn context(&self) -> &'static str {
        match self {
            Self::NoProvider { context } | Self::Empty { context } | Self::Detached { context } => {
                *context
            }
        }
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProvider { context } => write!(f, "no provider found for context `{context}`"),
            Self::Empty { context } => write!(f, "context `{context}` has no value"),
            Self::Detached { context } => {
                write!(f, "host was dropped before context `{context}` was resolved")
            }
        }
    }
}

impl std::error::Error for ContextError {}
