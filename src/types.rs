//! Core types shared across the runtime.
//!
//! Props and data are plain JSON values: equality on [`Value`] is strict
//! (`0` and `"0"` differ) and cloning is deep, which is exactly what dirty
//! checking needs.

use std::cell::Cell;
use std::fmt;

pub use serde_json::{Map, Value};

// =============================================================================
// Identifiers
// =============================================================================

thread_local! {
    static COMPONENT_COUNTER: Cell<u64> = const { Cell::new(0) };
    static LISTENER_COUNTER: Cell<u64> = const { Cell::new(0) };
}

/// Stable identifier of a component instance, unique per thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    pub(crate) fn next() -> Self {
        COMPONENT_COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            Self(id)
        })
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Handle identifying a registered listener, used for removal.
///
/// Lifecycle and delegated listeners draw from the same id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn next() -> Self {
        LISTENER_COUNTER.with(|counter| {
            let id = counter.get();
            counter.set(id + 1);
            Self(id)
        })
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// An empty JSON object, the default for props and data.
pub fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Normalize an optional props value: absent or `null` becomes `{}`.
pub fn normalize_props(props: Option<Value>) -> Value {
    match props {
        None | Some(Value::Null) => empty_object(),
        Some(value) => value,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_ids_are_unique() {
        let a = ComponentId::next();
        let b = ComponentId::next();
        assert_ne!(a, b);
        assert_eq!(format!("{}", a), format!("c{}", a.get()));
    }

    #[test]
    fn test_normalize_props() {
        assert_eq!(normalize_props(None), json!({}));
        assert_eq!(normalize_props(Some(Value::Null)), json!({}));
        assert_eq!(normalize_props(Some(json!({"a": 1}))), json!({"a": 1}));
    }

    #[test]
    fn test_strict_equality_distinguishes_representation() {
        assert_ne!(json!({"n": 0}), json!({"n": "0"}));
        assert_ne!(json!(false), json!(0));
        assert_eq!(json!({"a": [1, 2]}), json!({"a": [1, 2]}));
    }
}
