//! Minimal host for unit tests.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use statesel_core::{ReactiveController, ReactiveControllerHost};

use crate::context::{ContextHost, ContextId, ContextProvider};

#[derive(Default)]
pub(crate) struct TestHost {
    controllers: RefCell<Vec<Rc<dyn ReactiveController>>>,
    connected: Cell<bool>,
    updates: Cell<usize>,
    on_update: RefCell<Option<Box<dyn Fn()>>>,
    parent: RefCell<Option<Weak<TestHost>>>,
    providers: RefCell<HashMap<ContextId, Rc<dyn Any>>>,
}

impl TestHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn child_of(parent: &Rc<Self>) -> Rc<Self> {
        let child = Self::new();
        *child.parent.borrow_mut() = Some(Rc::downgrade(parent));
        child
    }

    pub(crate) fn provide<V: Clone + 'static>(&self, provider: &ContextProvider<V>) {
        self.providers
            .borrow_mut()
            .insert(provider.key().id(), provider.erase());
    }

    pub(crate) fn connect(&self) {
        self.connected.set(true);
        for controller in self.snapshot() {
            controller.host_connected();
        }
    }

    pub(crate) fn disconnect(&self) {
        self.connected.set(false);
        for controller in self.snapshot() {
            controller.host_disconnected();
        }
    }

    pub(crate) fn update_count(&self) -> usize {
        self.updates.get()
    }

    pub(crate) fn controller_count(&self) -> usize {
        self.controllers.borrow().len()
    }

    pub(crate) fn on_update(&self, hook: impl Fn() + 'static) {
        *self.on_update.borrow_mut() = Some(Box::new(hook));
    }

    fn snapshot(&self) -> Vec<Rc<dyn ReactiveController>> {
        self.controllers.borrow().clone()
    }
}

impl ReactiveControllerHost for TestHost {
    fn add_controller(&self, controller: Rc<dyn ReactiveController>) {
        self.controllers.borrow_mut().push(Rc::clone(&controller));
        if self.connected.get() {
            controller.host_connected();
        }
    }

    fn remove_controller(&self, controller: &Rc<dyn ReactiveController>) {
        self.controllers
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, controller));
    }

    fn request_update(&self) {
        self.updates.set(self.updates.get() + 1);
        if let Some(hook) = self.on_update.borrow().as_ref() {
            hook();
        }
    }
}

impl ContextHost for TestHost {
    fn find_provider(&self, id: ContextId) -> Option<Rc<dyn Any>> {
        if let Some(found) = self.providers.borrow().get(&id) {
            return Some(Rc::clone(found));
        }
        let parent = self.parent.borrow().as_ref().and_then(Weak::upgrade)?;
        parent.find_provider(id)
    }
}
