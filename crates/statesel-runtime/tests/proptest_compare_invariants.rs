//! Property-based invariant tests for the equality comparators.
//!
//! 1. Every comparator is reflexive on values without NaN.
//! 2. Every comparator is symmetric.
//! 3. `compare_arrays` agrees with slice equality.
//! 4. `compare_objects` agrees with map equality.
//! 5. `deep_compare` treats integers and their float forms as equal.
//! 6. `deep_compare` ignores object key order.
//! 7. `deep_compare` stays exact for integers a float cannot represent.

use std::collections::{BTreeMap, HashMap};

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use statesel_runtime::{compare_arrays, compare_objects, deep_compare, default_compare};

// ── Helpers ─────────────────────────────────────────────────────────────

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-z]{0,6}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn small_map() -> impl Strategy<Value = HashMap<u8, u8>> {
    proptest::collection::hash_map(0u8..8, 0u8..4, 0..6)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Reflexivity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn deep_compare_reflexive(v in json_strategy()) {
        prop_assert!(deep_compare(&v, &v), "not reflexive: {}", v);
    }

    #[test]
    fn structural_comparators_reflexive(
        xs in proptest::collection::vec(any::<i32>(), 0..8),
        m in small_map(),
    ) {
        prop_assert!(compare_arrays(&xs, &xs));
        prop_assert!(compare_objects(&m, &m));
        prop_assert!(default_compare(&xs, &xs));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Symmetry
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn deep_compare_symmetric(a in json_strategy(), b in json_strategy()) {
        prop_assert_eq!(deep_compare(&a, &b), deep_compare(&b, &a));
    }

    #[test]
    fn compare_objects_symmetric(a in small_map(), b in small_map()) {
        prop_assert_eq!(compare_objects(&a, &b), compare_objects(&b, &a));
    }

    #[test]
    fn compare_arrays_symmetric(
        a in proptest::collection::vec(0u8..3, 0..4),
        b in proptest::collection::vec(0u8..3, 0..4),
    ) {
        prop_assert_eq!(compare_arrays(&a, &b), compare_arrays(&b, &a));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-4. Agreement with std equality
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn compare_arrays_matches_slice_eq(
        a in proptest::collection::vec(0u8..3, 0..4),
        b in proptest::collection::vec(0u8..3, 0..4),
    ) {
        prop_assert_eq!(compare_arrays(&a, &b), a == b);
    }

    #[test]
    fn compare_objects_matches_map_eq(a in small_map(), b in small_map()) {
        prop_assert_eq!(compare_objects(&a, &b), a == b);
        let (sa, sb): (BTreeMap<_, _>, BTreeMap<_, _>) =
            (a.clone().into_iter().collect(), b.clone().into_iter().collect());
        prop_assert_eq!(compare_objects(&sa, &sb), a == b);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. deep_compare specifics
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn integer_equals_its_float(n in -1_000_000i64..1_000_000) {
        #[allow(clippy::cast_precision_loss)]
        let f = n as f64;
        prop_assert!(deep_compare(&json!(n), &json!(f)));
        prop_assert!(deep_compare(&json!([n]), &json!([f])));
    }

    #[test]
    fn key_order_is_irrelevant(
        entries in proptest::collection::vec(("[a-f]", any::<i32>()), 0..6),
    ) {
        let forward: Map<String, Value> =
            entries.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let backward: Map<String, Value> =
            entries.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();
        // Later duplicates win on insert, so only compare when keys are unique.
        prop_assume!(forward.len() == entries.len());
        prop_assert!(deep_compare(&Value::Object(forward), &Value::Object(backward)));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Integer/float equality is exact past 2^53
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn large_integer_equals_float_only_when_exact(n in (1u64 << 53)..(1u64 << 60)) {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let (f, back) = (n as f64, (n as f64) as u64);
        prop_assert_eq!(deep_compare(&json!(n), &json!(f)), back == n);
        // Transitivity through the rounded float.
        if deep_compare(&json!(back), &json!(f)) && deep_compare(&json!(n), &json!(f)) {
            prop_assert!(deep_compare(&json!(n), &json!(back)));
        }
    }
}
