#![forbid(unsafe_code)]

//! Shared fixtures: a two-state toggle machine and its context key.

use statesel_core::{Interpreter, Machine};
use statesel_runtime::{ContextKey, ServiceContext};

/// Toggle machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleState {
    pub active: bool,
    /// Number of times the toggle became active.
    pub activations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleEvent {
    Toggle,
    /// Leaves the state unchanged; still produces a transition.
    Noop,
}

/// Flips between inactive and active.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleMachine;

impl Machine for ToggleMachine {
    type State = ToggleState;
    type Event = ToggleEvent;

    fn initial_state(&self) -> ToggleState {
        ToggleState {
            active: false,
            activations: 0,
        }
    }

    fn transition(&self, state: &ToggleState, event: &ToggleEvent) -> ToggleState {
        match event {
            ToggleEvent::Toggle if state.active => ToggleState {
                active: false,
                ..state.clone()
            },
            ToggleEvent::Toggle => ToggleState {
                active: true,
                activations: state.activations + 1,
            },
            ToggleEvent::Noop => state.clone(),
        }
    }
}

/// Context slot under which a toggle service is provided.
pub const TOGGLE: ContextKey<ServiceContext<Interpreter<ToggleMachine>>> =
    ContextKey::new("toggle");
