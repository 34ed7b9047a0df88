#![forbid(unsafe_code)]

//! Context-resolved state selection.
//!
//! A [`SelectState`] is a [`SelectorController`] whose actor is not known
//! when the component is written. The actor is the `service` of a
//! [`ServiceContext`] provided by some ancestor, and it is looked up again
//! every time the host connects, since a remounted host may resolve a
//! different service.
//!
//! # State Machine
//!
//! ```text
//!            host_connected (context resolved)
//!   Idle ─────────────────────────────────────────▶ Bound
//!    ▲  │                                            │ ▲
//!    │  │ host_connected (provider empty)            │ │ host_connected:
//!    │  ▼                                            │ │ tear down, re-resolve,
//!    │ Pending ── provider gets a value ─────────────┘ │ bind fresh controller
//!    │                                                 │
//!    └─────────────── host_disconnected ◀──────────────┘
//! ```
//!
//! # Invariants
//!
//! 1. At most one inner controller is subscribed at any time. A second
//!    `host_connected` without a `host_disconnected` tears the stale one
//!    down before binding.
//! 2. The comparator in effect is the one set at the time of binding;
//!    [`set_compare`](SelectState::set_compare) never touches a live
//!    subscription.
//! 3. `value()` is `None` until the first successful binding. After a
//!    disconnect it keeps returning the last selected value.
//!
//! # Failure Modes
//!
//! - **No provider at connect**: logged at `warn`, the selector stays Idle.
//! - **Provider without value**: logged at `warn`; with `subscribe` enabled
//!   the selector waits in Pending and binds when a value arrives.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use statesel_core::{Actor, ReactiveController, ReactiveControllerHost};

use crate::compare::{Compare, default_compare};
use crate::context::{ContextConsumer, ContextHost, ContextKey};
use crate::error::ContextError;
use crate::selector::SelectorController;

/// Context value carrying the actor a [`SelectState`] binds to.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceContext<A> {
    pub service: A,
}

impl<A> ServiceContext<A> {
    #[must_use]
    pub fn new(service: A) -> Self {
        Self { service }
    }
}

/// Configuration for [`SelectState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectStateConfig {
    /// Keep listening to the provider while connected.
    /// Default: true
    pub subscribe: bool,

    /// Rebind to a newly provided service while Bound. When false, a
    /// provider change only requests a host update.
    /// Default: true
    pub rebind_on_change: bool,
}

impl Default for SelectStateConfig {
    fn default() -> Self {
        Self {
            subscribe: true,
            rebind_on_change: true,
        }
    }
}

impl SelectStateConfig {
    #[must_use]
    pub fn with_subscribe(mut self, subscribe: bool) -> Self {
        self.subscribe = subscribe;
        self
    }

    #[must_use]
    pub fn with_rebind_on_change(mut self, rebind: bool) -> Self {
        self.rebind_on_change = rebind;
        self
    }
}

/// Lifecycle phase of a [`SelectState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectStatePhase {
    /// Not connected, or connected without a provider.
    Idle,
    /// Connected to a provider that has no value yet.
    Pending,
    /// Subscribed to the provided service.
    Bound,
}

struct SelectStateInner<A: Actor, T> {
    host: Weak<dyn ReactiveControllerHost>,
    consumer: ContextConsumer<ServiceContext<A>>,
    selector: Rc<dyn Fn(&A::Snapshot) -> T>,
    compare: RefCell<Compare<T>>,
    controller: RefCell<Option<SelectorController<T>>>,
    phase: Cell<SelectStatePhase>,
    config: SelectStateConfig,
}

impl<A, T> SelectStateInner<A, T>
where
    A: Actor + Clone + 'static,
    T: 'static,
{
    fn connect(&self) -> Result<(), ContextError> {
        if self.phase.get() == SelectStatePhase::Bound {
            tracing::debug!(
                context = self.consumer.key().name(),
                "state selector reconnecting; tearing down stale binding"
            );
            self.teardown();
        }
        self.phase.set(SelectStatePhase::Idle);

        if let Err(err) = self.consumer.connect() {
            if matches!(err, ContextError::Empty { .. }) && self.consumer.is_listening() {
                self.phase.set(SelectStatePhase::Pending);
            }
            return Err(err);
        }
        let Some(context) = self.consumer.value() else {
            return Err(ContextError::Empty {
                context: self.consumer.key().name(),
            });
        };
        self.bind(&context.service);
        Ok(())
    }

    fn bind(&self, service: &A) {
        let compare = Rc::clone(&self.compare.borrow());
        let controller = SelectorController::bind(
            self.host.clone(),
            service,
            Rc::clone(&self.selector),
            compare,
        );
        *self.controller.borrow_mut() = Some(controller);
        self.phase.set(SelectStatePhase::Bound);
        tracing::debug!(context = self.consumer.key().name(), "state selector bound");
    }

    fn teardown(&self) {
        self.consumer.disconnect();
        if let Some(controller) = self.controller.borrow().as_ref() {
            controller.host_disconnected();
        }
        self.phase.set(SelectStatePhase::Idle);
    }

    fn context_changed(&self, context: &ServiceContext<A>) {
        match self.phase.get() {
            SelectStatePhase::Idle => {}
            SelectStatePhase::Pending => {
                self.bind(&context.service);
                self.request_update();
            }
            SelectStatePhase::Bound if !self.config.rebind_on_change => self.request_update(),
            SelectStatePhase::Bound => {
                let previous = self.controller.borrow_mut().take();
                if let Some(previous) = &previous {
                    previous.host_disconnected();
                }
                self.bind(&context.service);
                tracing::debug!(
                    context = self.consumer.key().name(),
                    "state selector rebound to new service"
                );

                let changed = match (&previous, self.controller.borrow().as_ref()) {
                    (Some(old), Some(new)) => {
                        let compare = Rc::clone(&self.compare.borrow());
                        old.with(|old| new.with(|new| !compare(old, new)))
                    }
                    _ => true,
                };
                if changed {
                    self.request_update();
                }
            }
        }
    }

    fn request_update(&self) {
        if let Some(host) = self.host.upgrade() {
            host.request_update();
        }
    }
}

impl<A, T> ReactiveController for SelectStateInner<A, T>
where
    A: Actor + Clone + 'static,
    T: 'static,
{
    fn host_connected(&self) {
        if let Err(err) = self.connect() {
            tracing::warn!(
                context = err.context(),
                %err,
                "state selector could not resolve its service"
            );
        }
    }

    fn host_disconnected(&self) {
        self.teardown();
    }
}

/// Selects from an actor resolved through an ancestor context.
///
/// Cloning a `SelectState` creates a new handle to the same binding.
pub struct SelectState<A: Actor, T> {
    inner: Rc<SelectStateInner<A, T>>,
}

impl<A: Actor, T> Clone for SelectState<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, T> fmt::Debug for SelectState<A, T>
where
    A: Actor + Clone + 'static,
    T: fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let controller = self.inner.controller.borrow();
        let mut dbg = f.debug_struct("SelectState");
        dbg.field("context", &self.inner.consumer.key().name())
            .field("phase", &self.inner.phase.get());
        match controller.as_ref() {
            Some(controller) => controller.with(|value| dbg.field("value", value).finish()),
            None => dbg.field("value", &None::<()>).finish(),
        }
    }
}

impl<A, T> SelectState<A, T>
where
    A: Actor + Clone + 'static,
    T: 'static,
{
    /// Select from the service provided under `key`, using value equality.
    pub fn new<H, F>(key: ContextKey<ServiceContext<A>>, host: &Rc<H>, selector: F) -> Self
    where
        H: ContextHost + 'static,
        F: Fn(&A::Snapshot) -> T + 'static,
        T: PartialEq,
    {
        Self::with_compare(key, host, selector, default_compare::<T>)
    }

    /// Select from the service provided under `key`, gating with `compare`.
    pub fn with_compare<H, F, C>(
        key: ContextKey<ServiceContext<A>>,
        host: &Rc<H>,
        selector: F,
        compare: C,
    ) -> Self
    where
        H: ContextHost + 'static,
        F: Fn(&A::Snapshot) -> T + 'static,
        C: Fn(&T, &T) -> bool + 'static,
    {
        Self::with_config(key, host, selector, compare, SelectStateConfig::default())
    }

    /// Fully configured constructor.
    ///
    /// Registers with `host`; if the host is already connected it binds
    /// right away.
    pub fn with_config<H, F, C>(
        key: ContextKey<ServiceContext<A>>,
        host: &Rc<H>,
        selector: F,
        compare: C,
        config: SelectStateConfig,
    ) -> Self
    where
        H: ContextHost + 'static,
        F: Fn(&A::Snapshot) -> T + 'static,
        C: Fn(&T, &T) -> bool + 'static,
    {
        let lookup_host: Rc<dyn ContextHost> = Rc::clone(host) as Rc<dyn ContextHost>;
        let update_host: Rc<dyn ReactiveControllerHost> =
            Rc::clone(host) as Rc<dyn ReactiveControllerHost>;
        let selector: Rc<dyn Fn(&A::Snapshot) -> T> = Rc::new(selector);
        let compare: Compare<T> = Rc::new(compare);

        let inner = Rc::new_cyclic(|weak: &Weak<SelectStateInner<A, T>>| {
            let weak = weak.clone();
            let consumer = ContextConsumer::detached(
                Rc::downgrade(&lookup_host),
                key,
                config.subscribe,
                Some(Box::new(move |context: &ServiceContext<A>| {
                    if let Some(inner) = weak.upgrade() {
                        inner.context_changed(context);
                    }
                })),
            );
            SelectStateInner {
                host: Rc::downgrade(&update_host),
                consumer,
                selector,
                compare: RefCell::new(compare),
                controller: RefCell::new(None),
                phase: Cell::new(SelectStatePhase::Idle),
                config,
            }
        });

        update_host.add_controller(Rc::clone(&inner) as Rc<dyn ReactiveController>);
        Self { inner }
    }

    /// The selected value, or `None` before the first successful binding.
    #[must_use]
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.inner.controller.borrow().as_ref().map(SelectorController::value)
    }

    /// Borrow the selected value, if any.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        match self.inner.controller.borrow().as_ref() {
            Some(controller) => controller.with(|value| f(Some(value))),
            None => f(None),
        }
    }

    /// Replace the comparator used from the next binding on.
    pub fn set_compare(&self, compare: impl Fn(&T, &T) -> bool + 'static) {
        *self.inner.compare.borrow_mut() = Rc::new(compare);
    }

    /// Resolve the service and bind, reporting why resolution failed.
    ///
    /// # Errors
    ///
    /// See [`ContextConsumer::connect`].
    pub fn try_connect(&self) -> Result<(), ContextError> {
        self.inner.connect()
    }

    /// Resolve the service and bind; failures are logged.
    pub fn host_connected(&self) {
        ReactiveController::host_connected(&*self.inner);
    }

    /// Release the context and the actor subscription. Safe to repeat.
    pub fn host_disconnected(&self) {
        ReactiveController::host_disconnected(&*self.inner);
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SelectStatePhase {
        self.inner.phase.get()
    }

    /// Whether an actor subscription is live.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.phase() == SelectStatePhase::Bound
    }

    /// Configuration this selector was built with.
    #[must_use]
    pub fn config(&self) -> SelectStateConfig {
        self.inner.config
    }
}

/// Construct a [`SelectState`] with value equality.
pub fn connect_state<A, T, H, F>(
    key: ContextKey<ServiceContext<A>>,
    host: &Rc<H>,
    selector: F,
) -> SelectState<A, T>
where
    A: Actor + Clone + 'static,
    T: PartialEq + 'static,
    H: ContextHost + 'static,
    F: Fn(&A::Snapshot) -> T + 'static,
{
    SelectState::new(key, host, selector)
}
