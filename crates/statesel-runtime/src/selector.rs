#![forbid(unsafe_code)]

//! Selector subscription from one host to one actor.
//!
//! # Design
//!
//! A [`SelectorController<T>`] owns exactly one actor subscription. At
//! construction it reads the actor's current snapshot, projects it through
//! the selector and stores the result; it then subscribes, and on every
//! emission projects again and consults the comparator:
//!
//! ```text
//! emitted ──selector──▶ next ──compare(stored, next)──▶ equal? ── yes ─▶ (nothing)
//!                                                       │
//!                                                       └─ no ──▶ stored = next;
//!                                                                 host.request_update()
//! ```
//!
//! The snapshot read and the subscription happen back to back on one thread,
//! so no transition can be skipped between them.
//!
//! # Invariants
//!
//! 1. `value()` reflects the constructor-time snapshot until the first
//!    emission the comparator reports as a change.
//! 2. `request_update` is called at most once per emission, never from the
//!    constructor.
//! 3. `host_disconnected` releases the subscription; repeating it is a no-op.
//! 4. The controller holds its host weakly. A dropped host silently stops
//!    receiving update requests.
//!
//! # Failure Modes
//!
//! - **Selector or comparator panics**: the panic propagates to the caller of
//!   the constructor, or to whoever triggered the emission. The stored value
//!   is left untouched.
//!
//! A controller subscribes once. After `host_disconnected` it stays inert
//! even if the host reconnects; use [`SelectState`](crate::SelectState) when
//! the binding must survive reconnection.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use statesel_core::{Actor, Listener, ReactiveController, ReactiveControllerHost, Subscription};

use crate::compare::{Compare, default_compare};

struct SelectorState<T> {
    host: Weak<dyn ReactiveControllerHost>,
    selected: RefCell<T>,
    subscription: RefCell<Subscription>,
}

impl<T> SelectorState<T> {
    fn observe(&self, next: T, compare: &dyn Fn(&T, &T) -> bool) {
        let unchanged = compare(&self.selected.borrow(), &next);
        if unchanged {
            tracing::trace!("selected value unchanged; update suppressed");
            return;
        }
        *self.selected.borrow_mut() = next;
        match self.host.upgrade() {
            Some(host) => host.request_update(),
            None => tracing::trace!("selected value changed but host is gone"),
        }
    }

    fn release(&self) {
        let mut subscription = self.subscription.borrow_mut();
        if !subscription.is_closed() {
            tracing::debug!("selector controller unsubscribing");
        }
        subscription.unsubscribe();
    }
}

impl<T> ReactiveController for SelectorState<T> {
    fn host_disconnected(&self) {
        self.release();
    }
}

/// Projects an actor's snapshots for a host and gates its re-renders.
///
/// Cloning a `SelectorController` creates a new handle to the **same**
/// subscription and selected value.
pub struct SelectorController<T> {
    state: Rc<SelectorState<T>>,
}

impl<T> Clone for SelectorController<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for SelectorController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorController")
            .field("value", &*self.state.selected.borrow())
            .field("subscribed", &self.is_subscribed())
            .finish()
    }
}

impl<T: 'static> SelectorController<T> {
    /// Bind `host` to `actor` with value equality as the comparator.
    pub fn new<H, A, F>(host: &Rc<H>, actor: &A, selector: F) -> Self
    where
        H: ReactiveControllerHost + 'static,
        A: Actor,
        F: Fn(&A::Snapshot) -> T + 'static,
        T: PartialEq,
    {
        Self::with_compare(host, actor, selector, default_compare::<T>)
    }

    /// Bind `host` to `actor`, gating updates with `compare`.
    ///
    /// Registers the controller with `host`, reads the initial projection,
    /// then subscribes.
    pub fn with_compare<H, A, F, C>(host: &Rc<H>, actor: &A, selector: F, compare: C) -> Self
    where
        H: ReactiveControllerHost + 'static,
        A: Actor,
        F: Fn(&A::Snapshot) -> T + 'static,
        C: Fn(&T, &T) -> bool + 'static,
    {
        let host: Rc<dyn ReactiveControllerHost> =
            Rc::clone(host) as Rc<dyn ReactiveControllerHost>;
        let controller =
            Self::bind(Rc::downgrade(&host), actor, Rc::new(selector), Rc::new(compare));
        host.add_controller(controller.as_controller());
        controller
    }

    /// Subscribe without registering with the host.
    ///
    /// Used by owners that forward the host lifecycle themselves.
    pub(crate) fn bind<A: Actor>(
        host: Weak<dyn ReactiveControllerHost>,
        actor: &A,
        selector: Rc<dyn Fn(&A::Snapshot) -> T>,
        compare: Compare<T>,
    ) -> Self {
        let initial = selector(&actor.snapshot());
        let state = Rc::new(SelectorState {
            host,
            selected: RefCell::new(initial),
            subscription: RefCell::new(Subscription::empty()),
        });

        let subscription = actor.subscribe(gate(Rc::downgrade(&state), selector, compare));
        *state.subscription.borrow_mut() = subscription;
        tracing::debug!("selector controller subscribed");

        Self { state }
    }

    /// The current selected value.
    #[must_use]
    pub fn value(&self) -> T
    where
        T: Clone,
    {
        self.state.selected.borrow().clone()
    }

    /// Borrow the current selected value.
    ///
    /// # Panics
    ///
    /// Panics if `f` causes an emission that changes the selected value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.selected.borrow())
    }

    /// Release the actor subscription. Safe to call repeatedly.
    pub fn host_disconnected(&self) {
        self.state.release();
    }

    /// Whether the actor subscription is still live.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        !self.state.subscription.borrow().is_closed()
    }

    /// This controller as the host sees it.
    #[must_use]
    pub fn as_controller(&self) -> Rc<dyn ReactiveController> {
        Rc::clone(&self.state) as Rc<dyn ReactiveController>
    }
}

fn gate<S: 'static, T: 'static>(
    state: Weak<SelectorState<T>>,
    selector: Rc<dyn Fn(&S) -> T>,
    compare: Compare<T>,
) -> Listener<S> {
    Box::new(move |emitted: &S| {
        if let Some(state) = state.upgrade() {
            state.observe(selector(emitted), &*compare);
        }
    })
}

/// Construct a [`SelectorController`] with value equality.
pub fn connect_selector<T, H, A, F>(host: &Rc<H>, actor: &A, selector: F) -> SelectorController<T>
where
    T: PartialEq + 'static,
    H: ReactiveControllerHost + 'static,
    A: Actor,
    F: Fn(&A::Snapshot) -> T + 'static,
{
    SelectorController::new(host, actor, selector)
}

/// Construct a [`SelectorController`] with a custom comparator.
pub fn connect_selector_with<T, H, A, F, C>(
    host: &Rc<H>,
    actor: &A,
    selector: F,
    compare: C,
) -> SelectorController<T>
where
    T: 'static,
    H: ReactiveControllerHost + 'static,
    A: Actor,
    F: Fn(&A::Snapshot) -> T + 'static,
    C: Fn(&T, &T) -> bool + 'static,
{
    SelectorController::with_compare(host, actor, selector, compare)
}
