//! The immutable state record and the shallow-copy helpers used by reducers.
//!
//! A [`State`] maps property names to shared JSON values. Every transition
//! builds a new record: untouched properties keep pointing at the same
//! allocation as the previous snapshot, only the touched property gets a
//! fresh value.
//!
//! # Example
//!
//! ```
//! use statekit_core::state::State;
//! use serde_json::json;
//!
//! let before = State::from_json(json!({"a": [1, 2], "b": true})).unwrap();
//! let after = before.with("b", json!(false));
//!
//! assert_eq!(before.get("b"), Some(&json!(true)));
//! assert_eq!(after.get("b"), Some(&json!(false)));
//! assert!(std::sync::Arc::ptr_eq(
//!     before.get_shared("a").unwrap(),
//!     after.get_shared("a").unwrap(),
//! ));
//! ```

use crate::error::{json_type_name, Error, Result};
use crate::undo::History;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Field name under which undo histories are serialized.
///
/// `$` is never accepted in a property key, so this cannot collide with a
/// property.
pub const HISTORY_FIELD: &str = "$history";

/// Immutable state record: property name to value.
///
/// Undo histories (see [`crate::undo`]) travel inside the record so that a
/// snapshot is self-contained and serializable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(
        rename = "$history",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    histories: BTreeMap<String, History>,

    #[serde(flatten)]
    properties: BTreeMap<String, Arc<Value>>,
}

impl State {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object.
    ///
    /// A `"$history"` field, if present, is read back as undo histories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAnObject`] if `value` is not a JSON object, or
    /// [`Error::Json`] if an embedded history is malformed.
    pub fn from_json(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::NotAnObject {
                found: json_type_name(&value),
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Render the properties as a JSON object (histories excluded).
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.properties
                .iter()
                .map(|(key, value)| (key.clone(), Value::clone(value)))
                .collect(),
        )
    }

    /// Value of a property, `None` when the key is absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).map(AsRef::as_ref)
    }

    /// Shared handle to a property value.
    #[must_use]
    pub fn get_shared(&self, key: &str) -> Option<&Arc<Value>> {
        self.properties.get(key)
    }

    /// Whether the property key is present (possibly with a null value).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Property keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the record has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// New record with one property replaced.
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: Value) -> Self {
        self.with_shared(key, Arc::new(value))
    }

    /// New record with one property replaced by an already shared value.
    #[must_use]
    pub fn with_shared(&self, key: impl Into<String>, value: Arc<Value>) -> Self {
        let mut next = self.clone();
        next.properties.insert(key.into(), value);
        next
    }

    /// New record without the given property.
    ///
    /// The key is removed entirely; this is distinct from holding `null`.
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.properties.remove(key);
        next
    }

    /// Undo history stored under `history_key`, if any.
    #[must_use]
    pub fn history(&self, history_key: &str) -> Option<&History> {
        self.histories.get(history_key)
    }

    pub(crate) fn set_history(&mut self, history_key: &str, history: History) {
        self.histories.insert(history_key.to_string(), history);
    }

    pub(crate) fn set_shared(&mut self, key: &str, value: Arc<Value>) {
        self.properties.insert(key.to_string(), value);
    }

    pub(crate) fn remove(&mut self, key: &str) {
        self.properties.remove(key);
    }
}

impl FromIterator<(String, Value)> for State {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            histories: BTreeMap::new(),
            properties: iter
                .into_iter()
                .map(|(key, value)| (key, Arc::new(value)))
                .collect(),
        }
    }
}

/// Copy a sequence into a new, independent container.
///
/// Absent and null values yield an empty sequence. Any other non-array value
/// carries no elements and is treated the same way.
#[must_use]
pub fn shallow_clone_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::debug!(
                found = json_type_name(other),
                "Treating non-array value as an empty sequence"
            );
            Vec::new()
        }
    }
}

/// Copy a flat object into a new, independent map.
///
/// Absent, null and non-object values yield an empty map.
#[must_use]
pub fn shallow_clone_object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(entries)) => entries.clone(),
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            tracing::debug!(
                found = json_type_name(other),
                "Treating non-object value as an empty object"
            );
            Map::new()
        }
    }
}

/// Truthiness used by the boolean toggle.
///
/// Absent, `null`, `false`, `0` and `""` are falsy; everything else is truthy.
#[must_use]
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_rejects_non_objects() {
        let err = State::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::NotAnObject { found: "array" }));
    }

    #[test]
    fn with_shares_untouched_properties() {
        let state = State::from_json(json!({"a": [1], "b": {"x": 1}})).unwrap();
        let next = state.with("a", json!([1, 2]));

        assert_eq!(state.get("a"), Some(&json!([1])));
        assert_eq!(next.get("a"), Some(&json!([1, 2])));
        assert!(Arc::ptr_eq(
            state.get_shared("b").unwrap(),
            next.get_shared("b").unwrap()
        ));
    }

    #[test]
    fn without_removes_the_key() {
        let state = State::from_json(json!({"a": 1, "b": null})).unwrap();
        let next = state.without("a");

        assert!(!next.contains_key("a"));
        assert!(next.contains_key("b"));
        assert_eq!(next.get("b"), Some(&Value::Null));
        assert_eq!(next.to_json(), json!({"b": null}));
    }

    #[test]
    fn from_iter_builds_record() {
        let state: State = vec![("a".to_string(), json!(1))].into_iter().collect();
        assert_eq!(state.len(), 1);
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn shallow_clone_array_handles_absent_values() {
        assert!(shallow_clone_array(None).is_empty());
        assert!(shallow_clone_array(Some(&Value::Null)).is_empty());
        assert!(shallow_clone_array(Some(&json!("text"))).is_empty());
        assert_eq!(shallow_clone_array(Some(&json!([1]))), vec![json!(1)]);
    }

    #[test]
    fn shallow_clone_array_is_independent() {
        let original = json!([1, 2]);
        let mut copy = shallow_clone_array(Some(&original));
        copy.push(json!(3));
        assert_eq!(original, json!([1, 2]));
    }

    #[test]
    fn shallow_clone_object_handles_absent_values() {
        assert!(shallow_clone_object(None).is_empty());
        assert!(shallow_clone_object(Some(&json!(3))).is_empty());
        assert_eq!(
            Value::Object(shallow_clone_object(Some(&json!({"a": 1})))),
            json!({"a": 1})
        );
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(is_truthy(Some(&json!(1))));
        assert!(is_truthy(Some(&json!("x"))));
        assert!(is_truthy(Some(&json!([]))));
    }
}
