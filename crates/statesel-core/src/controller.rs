#![forbid(unsafe_code)]

//! Host lifecycle protocol.
//!
//! A [`ReactiveControllerHost`] is a UI component. It owns a list of
//! [`ReactiveController`]s and forwards its own lifecycle to them: entering
//! the live tree calls [`host_connected`](ReactiveController::host_connected),
//! leaving it calls [`host_disconnected`](ReactiveController::host_disconnected).
//!
//! Hosts may connect and disconnect many times over their lifetime, and a
//! well-behaved controller tolerates `host_connected` arriving again without
//! an intervening `host_disconnected`.
//!
//! Controllers take `&self`; state that changes across the lifecycle lives
//! behind interior mutability so a host can hold them as
//! `Rc<dyn ReactiveController>`.

use std::rc::Rc;

/// Lifecycle-aware auxiliary object attached to a host.
///
/// Every hook defaults to a no-op.
pub trait ReactiveController {
    /// The host entered the live tree.
    fn host_connected(&self) {}

    /// The host left the live tree.
    fn host_disconnected(&self) {}

    /// The host is about to render.
    fn host_update(&self) {}

    /// The host finished rendering.
    fn host_updated(&self) {}
}

/// A component that drives controllers and renders on request.
pub trait ReactiveControllerHost {
    /// Attach `controller`. A host that is already connected calls
    /// `host_connected` on it right away.
    fn add_controller(&self, controller: Rc<dyn ReactiveController>);

    /// Detach `controller`, compared by pointer identity.
    fn remove_controller(&self, controller: &Rc<dyn ReactiveController>);

    /// Schedule a re-render. Hosts are free to coalesce requests.
    fn request_update(&self);
}
