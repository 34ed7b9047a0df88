#![forbid(unsafe_code)]

//! A reference [`ReactiveControllerHost`] with an ancestor chain.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use statesel_core::{ReactiveController, ReactiveControllerHost};
use statesel_runtime::{ContextHost, ContextId, ContextProvider};

/// A component-like host.
///
/// Hosts are created detached and disconnected. [`mount_under`] places a host
/// below a parent (replacing any previous parent), and [`connect`] /
/// [`disconnect`] drive the lifecycle of every registered controller.
///
/// `request_update` only counts and runs the optional update hook; there is
/// no render scheduling.
///
/// [`mount_under`]: HostElement::mount_under
/// [`connect`]: HostElement::connect
/// [`disconnect`]: HostElement::disconnect
pub struct HostElement {
    name: &'static str,
    parent: RefCell<Weak<HostElement>>,
    controllers: RefCell<Vec<Rc<dyn ReactiveController>>>,
    providers: RefCell<HashMap<ContextId, Rc<dyn Any>>>,
    connected: Cell<bool>,
    updates: Cell<usize>,
    update_hook: RefCell<Option<Rc<dyn Fn()>>>,
}

impl fmt::Debug for HostElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostElement")
            .field("name", &self.name)
            .field("connected", &self.connected.get())
            .field("controllers", &self.controllers.borrow().len())
            .field("updates", &self.updates.get())
            .finish()
    }
}

impl HostElement {
    /// A detached, disconnected host.
    #[must_use]
    pub fn new(name: &'static str) -> Rc<Self> {
        Rc::new(Self {
            name,
            parent: RefCell::new(Weak::new()),
            controllers: RefCell::new(Vec::new()),
            providers: RefCell::new(HashMap::new()),
            connected: Cell::new(false),
            updates: Cell::new(0),
            update_hook: RefCell::new(None),
        })
    }

    /// A host already mounted under `parent`.
    #[must_use]
    pub fn child(name: &'static str, parent: &Rc<Self>) -> Rc<Self> {
        let host = Self::new(name);
        host.mount_under(parent);
        host
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Re-parent this host. Controllers see the change on their next connect.
    pub fn mount_under(&self, parent: &Rc<Self>) {
        tracing::trace!(host = self.name, parent = parent.name, "host mounted");
        *self.parent.borrow_mut() = Rc::downgrade(parent);
    }

    /// Detach from the current parent.
    pub fn unmount(&self) {
        *self.parent.borrow_mut() = Weak::new();
    }

    /// Attach `provider` to this host, replacing any provider for the same key.
    pub fn provide<V: Clone + 'static>(&self, provider: &ContextProvider<V>) {
        self.providers
            .borrow_mut()
            .insert(provider.key().id(), provider.erase());
    }

    /// Connect the host and every registered controller.
    pub fn connect(&self) {
        self.connected.set(true);
        tracing::trace!(host = self.name, "host connected");
        for controller in self.registered() {
            controller.host_connected();
        }
    }

    /// Disconnect the host and every registered controller.
    pub fn disconnect(&self) {
        self.connected.set(false);
        tracing::trace!(host = self.name, "host disconnected");
        for controller in self.registered() {
            controller.host_disconnected();
        }
    }

    /// Run one update cycle: `host_update` on every controller, then
    /// `host_updated`.
    pub fn perform_update(&self) {
        let controllers = self.registered();
        for controller in &controllers {
            controller.host_update();
        }
        for controller in &controllers {
            controller.host_updated();
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Number of `request_update` calls received so far.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.get()
    }

    #[must_use]
    pub fn controller_count(&self) -> usize {
        self.controllers.borrow().len()
    }

    /// Run `hook` on every update request, after the count is bumped.
    pub fn on_update(&self, hook: impl Fn() + 'static) {
        *self.update_hook.borrow_mut() = Some(Rc::new(hook));
    }

    fn registered(&self) -> Vec<Rc<dyn ReactiveController>> {
        self.controllers.borrow().clone()
    }
}

impl ReactiveControllerHost for HostElement {
    fn add_controller(&self, controller: Rc<dyn ReactiveController>) {
        self.controllers.borrow_mut().push(Rc::clone(&controller));
        if self.connected.get() {
            controller.host_connected();
        }
    }

    fn remove_controller(&self, controller: &Rc<dyn ReactiveController>) {
        self.controllers
            .borrow_mut()
            .retain(|registered| !Rc::ptr_eq(registered, controller));
    }

    fn request_update(&self) {
        self.updates.set(self.updates.get() + 1);
        tracing::trace!(host = self.name, updates = self.updates.get(), "update requested");
        let hook = self.update_hook.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl ContextHost for HostElement {
    fn find_provider(&self, id: ContextId) -> Option<Rc<dyn Any>> {
        if let Some(provider) = self.providers.borrow().get(&id) {
            return Some(Rc::clone(provider));
        }
        let parent = self.parent.borrow().upgrade()?;
        parent.find_provider(id)
    }
}
