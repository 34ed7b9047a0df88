#![forbid(unsafe_code)]

//! Status-tracked machine service.
//!
//! An [`Interpreter`] runs a user-supplied [`Machine`] and exposes it as an
//! [`Actor`]. How transitions are computed is entirely the machine's
//! business; the interpreter only tracks lifecycle status and fans snapshots
//! out through an [`Observable`].
//!
//! Before [`start`](Interpreter::start) the snapshot is the machine's initial
//! state, so a selector bound to a not-yet-started service still reads a
//! meaningful value.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::actor::{Actor, Listener};
use crate::observable::Observable;
use crate::subscription::Subscription;

/// Transition function over states and events.
pub trait Machine {
    /// Machine state; cloned out to observers.
    type State: Clone + 'static;
    /// Events accepted by [`transition`](Machine::transition).
    type Event;

    /// State the machine starts in.
    fn initial_state(&self) -> Self::State;

    /// Next state after `event` is received in `state`.
    fn transition(&self, state: &Self::State, event: &Self::Event) -> Self::State;
}

/// Lifecycle status of an [`Interpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterStatus {
    NotStarted,
    Running,
    Stopped,
}

struct InterpreterInner<M: Machine> {
    machine: M,
    status: Cell<InterpreterStatus>,
    state: Observable<M::State>,
}

/// A running (or not yet running) [`Machine`].
///
/// Cloning an `Interpreter` creates a new handle to the same service.
pub struct Interpreter<M: Machine> {
    inner: Rc<InterpreterInner<M>>,
}

impl<M: Machine> Clone for Interpreter<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: Machine> fmt::Debug for Interpreter<M>
where
    M::State: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("status", &self.status())
            .field("state", &self.inner.state)
            .finish()
    }
}

impl<M: Machine> Interpreter<M> {
    /// Wrap `machine` without starting it.
    #[must_use]
    pub fn new(machine: M) -> Self {
        let initial = machine.initial_state();
        Self {
            inner: Rc::new(InterpreterInner {
                machine,
                status: Cell::new(InterpreterStatus::NotStarted),
                state: Observable::new(initial),
            }),
        }
    }

    /// Start processing events. Idempotent while running.
    ///
    /// Starting emits the initial state once so listeners registered before
    /// the start observe the service going live.
    pub fn start(&self) -> &Self {
        match self.status() {
            InterpreterStatus::Running => {}
            InterpreterStatus::NotStarted => {
                self.inner.status.set(InterpreterStatus::Running);
                tracing::debug!("interpreter started");
                self.inner.state.emit(self.inner.machine.initial_state());
            }
            InterpreterStatus::Stopped => {
                tracing::warn!("interpreter cannot be restarted after stop");
            }
        }
        self
    }

    /// Stop processing events. Later `send` calls are ignored.
    pub fn stop(&self) {
        if self.status() != InterpreterStatus::Stopped {
            self.inner.status.set(InterpreterStatus::Stopped);
            tracing::debug!("interpreter stopped");
        }
    }

    /// Deliver `event` to the machine and emit the resulting state.
    pub fn send(&self, event: M::Event) {
        if self.status() != InterpreterStatus::Running {
            tracing::warn!(
                status = ?self.status(),
                "event sent to interpreter that is not running; ignored"
            );
            return;
        }
        let inner = &*self.inner;
        inner
            .state
            .update(|state| inner.machine.transition(state, &event));
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> InterpreterStatus {
        self.inner.status.get()
    }

    /// The wrapped machine.
    #[must_use]
    pub fn machine(&self) -> &M {
        &self.inner.machine
    }
}

impl<M: Machine> Actor for Interpreter<M> {
    type Snapshot = M::State;

    fn snapshot(&self) -> M::State {
        match self.status() {
            InterpreterStatus::NotStarted => self.inner.machine.initial_state(),
            InterpreterStatus::Running | InterpreterStatus::Stopped => self.inner.state.snapshot(),
        }
    }

    fn subscribe(&self, listener: Listener<M::State>) -> Subscription {
        self.inner.state.subscribe(listener)
    }
}
