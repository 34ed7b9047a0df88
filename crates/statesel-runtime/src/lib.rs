#![forbid(unsafe_code)]

//! Selector-based subscriptions from UI hosts to external actors.
//!
//! - [`SelectorController`]: binds a host to an actor it is handed directly.
//!   Each emission is projected through a selector; the host is asked to
//!   re-render only when the comparator reports the projection changed.
//! - [`SelectState`]: resolves the actor from an ancestor-provided context
//!   on every connection and rebinds a fresh [`SelectorController`] each time.
//! - [`compare`]: the equality rules used to gate updates.
//!
//! # Invariants
//!
//! 1. At most one live actor subscription per controller instance.
//! 2. `request_update` fires iff the comparator reports the new projection
//!    as unequal to the stored one, and never from a constructor.
//! 3. Teardown is idempotent.
//!
//! Everything is single-threaded. Selector and comparator panics propagate
//! to whoever triggered them (construction, connection, or an emission).

pub mod compare;
pub mod context;
pub mod error;
pub mod select_state;
pub mod selector;

#[cfg(test)]
mod test_support;

pub use compare::{
    Compare, ObjectLike, compare_arrays, compare_objects, deep_compare, default_compare,
    identity_compare,
};
pub use context::{ContextConsumer, ContextHost, ContextId, ContextKey, ContextProvider};
pub use error::ContextError;
pub use select_state::{
    SelectState, SelectStateConfig, SelectStatePhase, ServiceContext, connect_state,
};
pub use selector::{SelectorController, connect_selector, connect_selector_with};

pub use statesel_core::{Actor, ReactiveController, ReactiveControllerHost, Subscription};
