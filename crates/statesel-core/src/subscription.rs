#![forbid(unsafe_code)]

//! Cancellation handle returned by [`Actor::subscribe`](crate::Actor::subscribe).
//!
//! # Invariants
//!
//! 1. The teardown closure runs at most once, no matter how many times
//!    [`Subscription::unsubscribe`] is called.
//! 2. Dropping a live subscription unsubscribes it.
//! 3. An [`empty`](Subscription::empty) subscription is already closed.

use std::fmt;

/// Idempotent handle for a registered listener.
///
/// Holding the handle keeps the listener registered; calling
/// [`unsubscribe`](Self::unsubscribe) or dropping it removes the listener.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Wrap a teardown closure. It runs on the first `unsubscribe()` or on drop.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    /// Release the listener. Subsequent calls are no-ops.
    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// Whether the listener has been released.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.teardown.is_none()
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
