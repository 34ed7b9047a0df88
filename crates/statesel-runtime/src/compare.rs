#![forbid(unsafe_code)]

//! Equality rules for gating host updates.
//!
//! Every comparator here is pure, symmetric, total over its input type and
//! never mutates its inputs. A comparator answers "should these two
//! projections be treated as the same?"; `true` suppresses the update.
//!
//! | Comparator | Equal when |
//! |------------|------------|
//! | [`default_compare`] | `a == b` (`NaN` is never equal to itself) |
//! | [`identity_compare`] | both `Rc`s point at the same allocation |
//! | [`compare_arrays`] | same length, pairwise `==` in order |
//! | [`compare_objects`] | same key count, every key of `a` in `b` with `==` value |
//! | [`deep_compare`] | structurally equal JSON, numbers by magnitude |

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use serde_json::{Map, Number, Value};

/// Shared comparator, reused across rebindings.
pub type Compare<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Value equality.
#[must_use]
pub fn default_compare<T: PartialEq + ?Sized>(a: &T, b: &T) -> bool {
    a == b
}

/// Reference identity of shared values.
///
/// Two separately allocated but structurally equal values are different.
/// Use this when snapshots share unchanged subtrees by `Rc` and a fresh
/// allocation signals a change.
#[must_use]
pub fn identity_compare<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Same length and pairwise equal elements, in order.
#[must_use]
pub fn compare_arrays<T: PartialEq>(a: &[T], b: &[T]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Keyed collections that [`compare_objects`] can inspect.
pub trait ObjectLike {
    type Key: ?Sized;
    type Value: PartialEq;

    /// Number of entries.
    fn entry_count(&self) -> usize;

    /// Value stored under `key`.
    fn lookup(&self, key: &Self::Key) -> Option<&Self::Value>;

    /// All entries, in any order.
    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;
}

impl<K: Eq + Hash, V: PartialEq, S: BuildHasher> ObjectLike for HashMap<K, V, S> {
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

impl<K: Ord, V: PartialEq> ObjectLike for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }
}

impl ObjectLike for Map<String, Value> {
    type Key = str;
    type Value = Value;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        self.get(key)
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Same key count, and every key of `a` maps to an equal value in `b`.
///
/// Values are compared one level deep with `==`.
#[must_use]
pub fn compare_objects<O: ObjectLike + ?Sized>(a: &O, b: &O) -> bool {
    a.entry_count() == b.entry_count()
        && a
            .entries()
            .all(|(key, value)| b.lookup(key).is_some_and(|other| value == other))
}

/// Structural equality over nested JSON values.
///
/// Unlike `Value`'s own `PartialEq`, numbers compare by magnitude, so `1`
/// and `1.0` are equal. An integer equals a float only when the float is
/// integral and converts to exactly that integer, so equality stays
/// transitive beyond 2^53. Object key order never matters.
#[must_use]
pub fn deep_compare(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| deep_compare(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| deep_compare(l, r)))
        }
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (integer_value(x), integer_value(y)) {
        (Some(l), Some(r)) => l == r,
        (Some(int), None) => y.as_f64().is_some_and(|f| float_is_integer(f, int)),
        (None, Some(int)) => x.as_f64().is_some_and(|f| float_is_integer(f, int)),
        (None, None) => x.as_f64() == y.as_f64(),
    }
}

fn integer_value(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Exact: `f` must be integral and within the `i64`/`u64` range.
#[allow(clippy::cast_possible_truncation)]
fn float_is_integer(f: f64, int: i128) -> bool {
    // -2^63 and 2^64, both exactly representable.
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 18_446_744_073_709_551_616.0;
    f.fract() == 0.0 && (LOWER..UPPER).contains(&f) && f as i128 == int
}
