#![forbid(unsafe_code)]

//! A shared snapshot cell that implements [`Actor`].
//!
//! # Design
//!
//! [`Observable<S>`] stores the latest snapshot behind `Rc` so every clone is
//! a handle to the same state. Each [`emit`](Observable::emit) is one
//! transition: the snapshot is replaced, the version bumped, and every live
//! listener notified, even when the new snapshot equals the old one. Change
//! gating is the subscriber's job, not the actor's.
//!
//! # Invariants
//!
//! 1. Listeners are notified in registration order.
//! 2. Emissions made from inside a listener are queued and delivered after
//!    the current round, so every listener sees snapshots in production order.
//! 3. A listener unsubscribed during a round is not invoked for the rest of
//!    that round.
//! 4. A listener subscribed during a round first hears the next emission.
//! 5. Version increments by exactly 1 per delivered emission.
//!
//! # Failure Modes
//!
//! - **Listener panics**: the round is abandoned and queued emissions are
//!   discarded. The snapshot keeps the value that was being delivered.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::actor::{Actor, Listener};
use crate::subscription::Subscription;

struct ListenerSlot<S> {
    id: u64,
    active: Cell<bool>,
    callback: Listener<S>,
}

struct ObservableInner<S> {
    snapshot: RefCell<S>,
    version: Cell<u64>,
    listeners: RefCell<Vec<Rc<ListenerSlot<S>>>>,
    next_id: Cell<u64>,
    pending: RefCell<VecDeque<S>>,
    delivering: Cell<bool>,
}

/// Resets the delivery flag even if a listener unwinds.
struct DeliveryGuard<'a, S> {
    inner: &'a ObservableInner<S>,
}

impl<S> Drop for DeliveryGuard<'_, S> {
    fn drop(&mut self) {
        self.inner.delivering.set(false);
        self.inner.pending.borrow_mut().clear();
    }
}

/// Shared, push-based snapshot holder.
///
/// Cloning an `Observable` creates a new handle to the **same** state.
pub struct Observable<S> {
    inner: Rc<ObservableInner<S>>,
}

impl<S> Clone for Observable<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Observable<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("snapshot", &*self.inner.snapshot.borrow())
            .field("version", &self.inner.version.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<S: Default> Default for Observable<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S> Observable<S> {
    /// Create an observable holding `initial` at version 0.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                snapshot: RefCell::new(initial),
                version: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                pending: RefCell::new(VecDeque::new()),
                delivering: Cell::new(false),
            }),
        }
    }

    /// Borrow the current snapshot.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.snapshot.borrow())
    }

    /// Record a transition to `next` and notify every listener.
    pub fn emit(&self, next: S) {
        let inner = &*self.inner;
        inner.pending.borrow_mut().push_back(next);
        if inner.delivering.get() {
            tracing::trace!(
                queued = inner.pending.borrow().len(),
                "observable emission queued behind active round"
            );
            return;
        }

        inner.delivering.set(true);
        let _guard = DeliveryGuard { inner };
        loop {
            let Some(next) = inner.pending.borrow_mut().pop_front() else {
                break;
            };
            *inner.snapshot.borrow_mut() = next;
            inner.version.set(inner.version.get() + 1);

            let round: Vec<Rc<ListenerSlot<S>>> = inner.listeners.borrow().clone();
            tracing::trace!(
                version = inner.version.get(),
                listeners = round.len(),
                "observable delivering snapshot"
            );
            let snapshot = inner.snapshot.borrow();
            for slot in &round {
                if slot.active.get() {
                    (slot.callback)(&snapshot);
                }
            }
        }
    }

    /// Compute the next snapshot from the latest one and emit it.
    ///
    /// Inside a delivery round the latest snapshot is the last emission
    /// still queued, so chained updates from listeners never start from a
    /// stale value. `f` must not emit on this observable.
    pub fn update(&self, f: impl FnOnce(&S) -> S) {
        let next = {
            let pending = self.inner.pending.borrow();
            match pending.back() {
                Some(latest) => f(latest),
                None => self.with(f),
            }
        };
        self.emit(next);
    }

    /// Number of emissions delivered so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Number of live listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn register(&self, callback: Listener<S>) -> Subscription
    where
        S: 'static,
    {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let slot = Rc::new(ListenerSlot {
            id,
            active: Cell::new(true),
            callback,
        });
        self.inner.listeners.borrow_mut().push(Rc::clone(&slot));
        tracing::trace!(id, "observable listener registered");

        let weak: Weak<ObservableInner<S>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            slot.active.set(false);
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|s| s.id != slot.id);
            }
            tracing::trace!(id = slot.id, "observable listener released");
        })
    }
}

impl<S: Clone + 'static> Actor for Observable<S> {
    type Snapshot = S;

    fn snapshot(&self) -> S {
        self.inner.snapshot.borrow().clone()
    }

    fn subscribe(&self, listener: Listener<S>) -> Subscription {
        self.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<S: Clone + 'static>(obs: &Observable<S>) -> (Subscription, Rc<RefCell<Vec<S>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let sub = obs.subscribe(Box::new(move |v: &S| l.borrow_mut().push(v.clone())));
        (sub, log)
    }

    #[test]
    fn snapshot_reads_initial_value() {
        let obs = Observable::new(3);
        assert_eq!(obs.snapshot(), 3);
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn every_emit_notifies_even_when_equal() {
        let obs = Observable::new(1);
        let (_sub, log) = recorder(&obs);
        obs.emit(1);
        obs.emit(1);
        obs.emit(2);
        assert_eq!(*log.borrow(), vec![1, 1, 2]);
        assert_eq!(obs.version(), 3);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let obs = Observable::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<_> = (0..3)
            .map(|i| {
                let o = Rc::clone(&order);
                obs.subscribe(Box::new(move |_: &i32| o.borrow_mut().push(i)))
            })
            .collect();
        obs.emit(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let obs = Observable::new(0);
        let (mut sub, log) = recorder(&obs);
        obs.emit(1);
        sub.unsubscribe();
        obs.emit(2);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn drop_subscription_stops_delivery() {
        let obs = Observable::new(0);
        let (sub, log) = recorder(&obs);
        drop(sub);
        obs.emit(5);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn nested_emit_is_delivered_in_order() {
        let obs = Observable::new(0);
        let trigger = obs.clone();
        let _bump = obs.subscribe(Box::new(move |v: &i32| {
            if *v == 1 {
                trigger.emit(2);
            }
        }));
        let (_sub, log) = recorder(&obs);
        obs.emit(1);
        // The second listener sees 1 before 2 even though 2 was emitted
        // from inside the first listener's callback.
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(obs.snapshot(), 2);
    }

    #[test]
    fn unsubscribe_mid_round_skips_listener() {
        let obs = Observable::new(0);
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let v = Rc::clone(&victim);
        let _killer = obs.subscribe(Box::new(move |_: &i32| {
            if let Some(mut sub) = v.borrow_mut().take() {
                sub.unsubscribe();
            }
        }));
        let (sub, log) = recorder(&obs);
        *victim.borrow_mut() = Some(sub);
        obs.emit(1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subscribe_mid_round_waits_for_next_emit() {
        let obs = Observable::new(0);
        let late_log = Rc::new(RefCell::new(Vec::new()));
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
        let source = obs.clone();
        let h = Rc::clone(&held);
        let ll = Rc::clone(&late_log);
        let _adder = obs.subscribe(Box::new(move |_: &i32| {
            if h.borrow().is_empty() {
                let ll = Rc::clone(&ll);
                let sub = source.subscribe(Box::new(move |v: &i32| ll.borrow_mut().push(*v)));
                h.borrow_mut().push(sub);
            }
        }));
        obs.emit(1);
        assert!(late_log.borrow().is_empty());
        obs.emit(2);
        assert_eq!(*late_log.borrow(), vec![2]);
    }

    #[test]
    fn update_derives_from_current() {
        let obs = Observable::new(10);
        obs.update(|v| v + 5);
        assert_eq!(obs.snapshot(), 15);
    }

    #[test]
    fn nested_updates_chain_from_queued_value() {
        let obs = Observable::new(0);
        let source = obs.clone();
        let _chain = obs.subscribe(Box::new(move |v: &i32| {
            if *v == 1 {
                source.update(|v| v + 1);
                source.update(|v| v + 1);
            }
        }));
        let (_sub, log) = recorder(&obs);
        obs.update(|v| v + 1);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(obs.snapshot(), 3);
    }

    #[test]
    fn subscription_outlives_observable() {
        let obs = Observable::new(0);
        let (mut sub, _) = recorder(&obs);
        drop(obs);
        sub.unsubscribe();
        assert!(sub.is_closed());
    }

    #[test]
    fn debug_format() {
        let obs = Observable::new(42);
        let dbg = format!("{obs:?}");
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
    }
}
