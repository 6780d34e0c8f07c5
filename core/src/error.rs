//! Error types for component construction and the JSON action boundary.
//!
//! Reducers never return errors. Every abnormal dispatch (unknown action
//! type, unresolved array selector, undo with no history) is a silent no-op.
//! Errors only surface while building components or while converting actions
//! and state records to and from JSON.

use thiserror::Error;

/// Result type alias for statekit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building components or crossing the JSON boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The action prefix was empty.
    #[error("Action prefix cannot be empty")]
    EmptyPrefix,

    /// A property key cannot be used in generated action names.
    #[error("Invalid property key: {0:?} (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidPropertyKey(String),

    /// No action creators exist for the requested property.
    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    /// A state record must be a JSON object.
    #[error("State must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was found instead
        found: &'static str,
    },

    /// An action must be a JSON object.
    #[error("Action must be a JSON object, found {found}")]
    InvalidAction {
        /// JSON type that was found instead
        found: &'static str,
    },

    /// The action has no string `type` field.
    #[error("Action is missing a string `type` field")]
    MissingActionType,

    /// A payload field required by the action verb is absent.
    #[error("Action {action_type} is missing payload field `{field}`")]
    MissingPayload {
        /// Full action type string
        action_type: String,
        /// Name of the missing field
        field: &'static str,
    },

    /// A payload field has the wrong JSON shape.
    #[error("Action {action_type} has an invalid `{field}` field: {reason}")]
    InvalidPayload {
        /// Full action type string
        action_type: String,
        /// Name of the offending field
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// The action carries a closure and has no JSON form.
    #[error("Action {0} carries a function payload and cannot be serialized")]
    NotSerializable(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Name of a JSON value's type, for error messages.
pub(crate) const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn display_messages() {
        assert_eq!(Error::EmptyPrefix.to_string(), "Action prefix cannot be empty");
        assert_eq!(
            Error::UnknownProperty("a".to_string()).to_string(),
            "Unknown property: a"
        );
        let err = Error::MissingPayload {
            action_type: "PREFIX_set_a".to_string(),
            field: "value",
        };
        assert_eq!(
            err.to_string(),
            "Action PREFIX_set_a is missing payload field `value`"
        );
    }

    #[test]
    fn json_type_names() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
        assert_eq!(json_type_name(&json!("s")), "string");
    }
}
