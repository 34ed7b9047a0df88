#![forbid(unsafe_code)]

//! Ancestor-scoped dependency lookup.
//!
//! A [`ContextProvider<V>`] is attached to some host; descendants find it by
//! [`ContextKey<V>`] through [`ContextHost::find_provider`], which walks from
//! the asking host up through its ancestors. How providers get attached to
//! hosts is up to the host implementation.
//!
//! A [`ContextConsumer<V>`] engages on `host_connected`: it resolves the
//! nearest provider, reads its value and, when subscribing, keeps listening
//! for later values until `host_disconnected`. It resolves afresh on every
//! connection, since a remounted host may sit under a different ancestor.
//!
//! # Invariants
//!
//! 1. A consumer holds at most one provider subscription.
//! 2. A consumer's value is the provider value read at the last connection,
//!    or the last value pushed since.
//! 3. Disconnecting keeps the last value readable.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use statesel_core::{Actor, Observable, ReactiveController, ReactiveControllerHost, Subscription};

use crate::error::ContextError;

/// Identity of a context slot: its value type plus its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId {
    type_id: TypeId,
    name: &'static str,
}

impl ContextId {
    /// The slot's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Typed descriptor of a context slot holding a `V`.
pub struct ContextKey<V> {
    name: &'static str,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for ContextKey<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for ContextKey<V> {}

impl<V> fmt::Debug for ContextKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextKey").field(&self.name).finish()
    }
}

impl<V: 'static> ContextKey<V> {
    /// Declare a context slot named `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The slot's name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Lookup identity used by [`ContextHost::find_provider`].
    #[must_use]
    pub fn id(&self) -> ContextId {
        ContextId {
            type_id: TypeId::of::<V>(),
            name: self.name,
        }
    }
}

/// A host that can locate context providers among itself and its ancestors.
pub trait ContextHost: ReactiveControllerHost {
    /// The nearest provider registered for `id`.
    ///
    /// The returned value is a type-erased [`ContextProvider`] as produced
    /// by [`ContextProvider::erase`].
    fn find_provider(&self, id: ContextId) -> Option<Rc<dyn Any>>;
}

/// A shared, subscribable context slot.
///
/// Cloning a `ContextProvider` creates a new handle to the same slot.
/// Every [`set`](Self::set) notifies subscribers, whether or not the value
/// changed.
pub struct ContextProvider<V> {
    key: ContextKey<V>,
    slot: Observable<Option<V>>,
}

impl<V> Clone for ContextProvider<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            slot: self.slot.clone(),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for ContextProvider<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextProvider")
            .field("key", &self.key)
            .field("slot", &self.slot)
            .finish()
    }
}

impl<V: Clone + 'static> ContextProvider<V> {
    /// A provider for `key` holding `value`.
    #[must_use]
    pub fn new(key: ContextKey<V>, value: V) -> Self {
        Self {
            key,
            slot: Observable::new(Some(value)),
        }
    }

    /// A provider for `key` with no value yet.
    #[must_use]
    pub fn empty(key: ContextKey<V>) -> Self {
        Self {
            key,
            slot: Observable::new(None),
        }
    }

    /// The slot this provider serves.
    #[must_use]
    pub fn key(&self) -> ContextKey<V> {
        self.key
    }

    /// The provided value.
    #[must_use]
    pub fn get(&self) -> Option<V> {
        self.slot.snapshot()
    }

    /// Replace the provided value and notify subscribers.
    pub fn set(&self, value: V) {
        tracing::debug!(context = self.key.name(), "context value replaced");
        self.slot.emit(Some(value));
    }

    /// Listen for subsequent values.
    pub fn subscribe(&self, listener: impl Fn(&V) + 'static) -> Subscription {
        self.slot.subscribe(Box::new(move |value: &Option<V>| {
            if let Some(value) = value {
                listener(value);
            }
        }))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.slot.subscriber_count()
    }

    /// Type-erased handle for storage in a host's provider table.
    #[must_use]
    pub fn erase(&self) -> Rc<dyn Any> {
        Rc::new(self.clone())
    }
}

struct ConsumerInner<V> {
    key: ContextKey<V>,
    host: Weak<dyn ContextHost>,
    subscribe: bool,
    value: RefCell<Option<V>>,
    subscription: RefCell<Subscription>,
    on_change: Option<Box<dyn Fn(&V)>>,
}

impl<V: Clone + 'static> ConsumerInner<V> {
    fn connect(self: &Rc<Self>) -> Result<(), ContextError> {
        self.release();
        let context = self.key.name();
        let host = self
            .host
            .upgrade()
            .ok_or(ContextError::Detached { context })?;
        let provider = host
            .find_provider(self.key.id())
            .and_then(|erased| erased.downcast_ref::<ContextProvider<V>>().cloned())
            .ok_or(ContextError::NoProvider { context })?;

        let current = provider.get();
        let found = current.is_some();
        *self.value.borrow_mut() = current;

        if self.subscribe {
            let weak = Rc::downgrade(self);
            *self.subscription.borrow_mut() = provider.subscribe(move |value: &V| {
                if let Some(inner) = weak.upgrade() {
                    inner.receive(value);
                }
            });
        }

        tracing::debug!(context, found, subscribed = self.subscribe, "context consumer connected");
        if found {
            Ok(())
        } else {
            Err(ContextError::Empty { context })
        }
    }

    fn receive(&self, value: &V) {
        *self.value.borrow_mut() = Some(value.clone());
        match &self.on_change {
            Some(callback) => callback(value),
            None => {
                if let Some(host) = self.host.upgrade() {
                    host.request_update();
                }
            }
        }
    }

    fn release(&self) {
        self.subscription.borrow_mut().unsubscribe();
    }
}

/// Adapter registered with the host; keeps the consumer state alive.
struct ConsumerController<V>(Rc<ConsumerInner<V>>);

impl<V: Clone + 'static> ReactiveController for ConsumerController<V> {
    fn host_connected(&self) {
        if let Err(err) = self.0.connect() {
            tracing::warn!(context = err.context(), %err, "context consumer could not resolve");
        }
    }

    fn host_disconnected(&self) {
        self.0.release();
    }
}

/// Reads a context value on behalf of a host.
///
/// Cloning a `ContextConsumer` creates a new handle to the same consumer.
pub struct ContextConsumer<V> {
    inner: Rc<ConsumerInner<V>>,
}

impl<V> Clone for ContextConsumer<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for ContextConsumer<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConsumer")
            .field("key", &self.inner.key)
            .field("value", &*self.inner.value.borrow())
            .field("subscribe", &self.inner.subscribe)
            .finish()
    }
}

impl<V: Clone + 'static> ContextConsumer<V> {
    /// A consumer registered with `host`. Later values request a host update.
    pub fn new<H: ContextHost + 'static>(
        host: &Rc<H>,
        key: ContextKey<V>,
        subscribe: bool,
    ) -> Self {
        Self::register(host, key, subscribe, None)
    }

    /// A consumer registered with `host` that hands later values to `on_change`.
    pub fn with_callback<H: ContextHost + 'static>(
        host: &Rc<H>,
        key: ContextKey<V>,
        subscribe: bool,
        on_change: impl Fn(&V) + 'static,
    ) -> Self {
        Self::register(host, key, subscribe, Some(Box::new(on_change)))
    }

    fn register<H: ContextHost + 'static>(
        host: &Rc<H>,
        key: ContextKey<V>,
        subscribe: bool,
        on_change: Option<Box<dyn Fn(&V)>>,
    ) -> Self {
        let erased: Rc<dyn ContextHost> = Rc::clone(host) as Rc<dyn ContextHost>;
        let consumer = Self::detached(Rc::downgrade(&erased), key, subscribe, on_change);
        host.add_controller(Rc::new(ConsumerController(Rc::clone(&consumer.inner))));
        consumer
    }

    /// A consumer whose lifecycle is driven by its owner, not the host.
    pub(crate) fn detached(
        host: Weak<dyn ContextHost>,
        key: ContextKey<V>,
        subscribe: bool,
        on_change: Option<Box<dyn Fn(&V)>>,
    ) -> Self {
        Self {
            inner: Rc::new(ConsumerInner {
                key,
                host,
                subscribe,
                value: RefCell::new(None),
                subscription: RefCell::new(Subscription::empty()),
                on_change,
            }),
        }
    }

    /// Resolve the nearest provider and read its value.
    ///
    /// Any previous provider subscription is released first. When the
    /// provider exists but is empty, the consumer still subscribes (if
    /// configured to) and reports [`ContextError::Empty`].
    ///
    /// # Errors
    ///
    /// - [`ContextError::NoProvider`] if no ancestor provides the key.
    /// - [`ContextError::Empty`] if the provider holds no value.
    /// - [`ContextError::Detached`] if the host has been dropped.
    pub fn connect(&self) -> Result<(), ContextError> {
        self.inner.connect()
    }

    /// Stop listening to the provider. The last value stays readable.
    pub fn disconnect(&self) {
        self.inner.release();
    }

    /// The last resolved value.
    #[must_use]
    pub fn value(&self) -> Option<V> {
        self.inner.value.borrow().clone()
    }

    /// The slot this consumer reads.
    #[must_use]
    pub fn key(&self) -> ContextKey<V> {
        self.inner.key
    }

    /// Whether a provider subscription is live.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        !self.inner.subscription.borrow().is_closed()
    }
}
