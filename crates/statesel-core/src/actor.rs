#![forbid(unsafe_code)]

//! The actor protocol.
//!
//! An [`Actor`] is an externally-owned state holder. The selector runtime
//! only ever observes it: it reads the current snapshot once and then
//! listens for further snapshots. It never sends events or mutates state.
//!
//! # Contract
//!
//! 1. [`snapshot`](Actor::snapshot) has no side effects.
//! 2. Each listener is invoked once per state transition, synchronously, in
//!    the order transitions were produced. Invocations for one actor are
//!    never concurrent.
//! 3. No transition can slip between a `snapshot()` call and a following
//!    `subscribe()` call on the same thread.
//! 4. After [`Subscription::unsubscribe`] the listener is never invoked again.

use std::rc::Rc;

use crate::subscription::Subscription;

/// Listener registered with [`Actor::subscribe`].
pub type Listener<S> = Box<dyn Fn(&S)>;

/// An observable state holder.
pub trait Actor {
    /// The value handed to observers on every transition.
    type Snapshot: 'static;

    /// The current snapshot.
    fn snapshot(&self) -> Self::Snapshot;

    /// Register `listener` for every subsequent transition.
    fn subscribe(&self, listener: Listener<Self::Snapshot>) -> Subscription;
}

impl<A: Actor + ?Sized> Actor for Rc<A> {
    type Snapshot = A::Snapshot;

    fn snapshot(&self) -> Self::Snapshot {
        (**self).snapshot()
    }

    fn subscribe(&self, listener: Listener<Self::Snapshot>) -> Subscription {
        (**self).subscribe(listener)
    }
}

impl<A: Actor + ?Sized> Actor for &A {
    type Snapshot = A::Snapshot;

    fn snapshot(&self) -> Self::Snapshot {
        (**self).snapshot()
    }

    fn subscribe(&self, listener: Listener<Self::Snapshot>) -> Subscription {
        (**self).subscribe(listener)
    }
}
