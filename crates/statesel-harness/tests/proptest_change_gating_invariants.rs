//! Property-based invariant tests for change-gated host updates.
//!
//! 1. A direct selector requests exactly one update per emission whose
//!    projection differs from the stored one, and its value tracks the last
//!    such projection.
//! 2. Under arbitrary connect/disconnect/emit interleavings a `SelectState`
//!    matches a model: one live subscription while connected, none
//!    otherwise, a fresh baseline on every connect, and updates only for
//!    changed projections while connected.

use std::rc::Rc;

use proptest::prelude::*;
use statesel_core::Observable;
use statesel_harness::HostElement;
use statesel_runtime::{
    ContextKey, ContextProvider, SelectState, SelectorController, ServiceContext,
};

const LEVEL: ContextKey<ServiceContext<Observable<i32>>> = ContextKey::new("level");

fn project(v: &i32) -> i32 {
    v / 3
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Direct selector
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn updates_equal_changed_projections(
        initial in -20i32..20,
        emissions in proptest::collection::vec(-20i32..20, 0..50),
    ) {
        let host = HostElement::new("view");
        let actor = Observable::new(initial);
        let ctl = SelectorController::new(&host, &actor, project);

        let mut stored = project(&initial);
        let mut expected_updates = 0;
        for v in emissions {
            actor.emit(v);
            if project(&v) != stored {
                stored = project(&v);
                expected_updates += 1;
            }
            prop_assert_eq!(ctl.value(), stored);
        }
        prop_assert_eq!(host.update_count(), expected_updates);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Context-resolved selector across lifecycles
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Step {
    Connect,
    Disconnect,
    Emit(i32),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        1 => Just(Step::Connect),
        1 => Just(Step::Disconnect),
        4 => (-20i32..20).prop_map(Step::Emit),
    ]
}

proptest! {
    #[test]
    fn select_state_matches_model(steps in proptest::collection::vec(step_strategy(), 0..60)) {
        let app = HostElement::new("app");
        let actor = Observable::new(0);
        app.provide(&ContextProvider::new(LEVEL, ServiceContext::new(actor.clone())));
        let view: Rc<HostElement> = HostElement::child("view", &app);
        let state = SelectState::new(LEVEL, &view, project);

        let mut current = 0;
        let mut connected = false;
        let mut stored: Option<i32> = None;
        let mut expected_updates = 0;

        for step in steps {
            match step {
                Step::Connect => {
                    view.connect();
                    connected = true;
                    stored = Some(project(&current));
                }
                Step::Disconnect => {
                    view.disconnect();
                    connected = false;
                }
                Step::Emit(v) => {
                    actor.emit(v);
                    current = v;
                    if connected && stored != Some(project(&v)) {
                        stored = Some(project(&v));
                        expected_updates += 1;
                    }
                }
            }
            prop_assert_eq!(actor.subscriber_count(), usize::from(connected));
            prop_assert_eq!(state.value(), stored);
        }
        prop_assert_eq!(view.update_count(), expected_updates);
    }
}
