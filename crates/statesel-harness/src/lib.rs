#![forbid(unsafe_code)]

//! Reference host and fixtures for statesel integration tests.
//!
//! [`HostElement`] stands in for a UI component: it owns registered
//! controllers, forwards connect/disconnect to them, counts update requests,
//! and resolves context providers through its ancestor chain. The
//! [`fixtures`] module carries small machines and snapshots shared by the
//! integration tests.

pub mod fixtures;
pub mod host;

pub use fixtures::{TOGGLE, ToggleEvent, ToggleMachine, ToggleState};
pub use host::HostElement;
