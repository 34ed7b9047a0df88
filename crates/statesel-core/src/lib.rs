#![forbid(unsafe_code)]

//! Collaborator protocols for statesel.
//!
//! This crate defines the boundaries the selector runtime is written against:
//!
//! - [`Actor`]: an externally-owned state holder with a synchronous
//!   [`snapshot`](Actor::snapshot) and push-based [`subscribe`](Actor::subscribe).
//! - [`Subscription`]: an idempotent cancellation handle, released on drop.
//! - [`ReactiveController`] / [`ReactiveControllerHost`]: the lifecycle
//!   protocol between a UI component and its auxiliary controllers.
//!
//! Two reference actors are provided: [`Observable`], a plain snapshot cell,
//! and [`Interpreter`], a status-tracked [`Machine`] service.
//!
//! # Threading
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Listeners run to
//! completion inside the transition that triggered them.

pub mod actor;
pub mod controller;
pub mod machine;
pub mod observable;
pub mod subscription;

pub use actor::{Actor, Listener};
pub use controller::{ReactiveController, ReactiveControllerHost};
pub use machine::{Interpreter, InterpreterStatus, Machine};
pub use observable::Observable;
pub use subscription::Subscription;
