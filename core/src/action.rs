//! Actions: the tagged requests interpreted by property reducers.
//!
//! An action's wire identity is its `type` string, built from an action
//! prefix, a verb and (for property actions) a property name:
//!
//! ```text
//! <prefix>_<verb>_<property>     e.g. PREFIX_array_push_todos
//! <prefix>_undo
//! ```
//!
//! Inside the crate the string is never re-derived per branch. The verb and
//! the property are held as data ([`PropertyAction`]) and reducers match on
//! them directly. [`Action::from_json`] parses a `type` string once, at the
//! boundary.

use crate::error::{json_type_name, Error, Result};
use crate::property::PropertyKind;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Element predicate used by array remove/replace: `(element, index) -> bool`.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Value, usize) -> bool + Send + Sync>);

impl Predicate {
    /// Wrap a closure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Value, usize) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Evaluate the predicate.
    #[must_use]
    pub fn test(&self, element: &Value, index: usize) -> bool {
        (self.0)(element, index)
    }

    /// Index of the first element matching the predicate.
    #[must_use]
    pub fn find_index(&self, elements: &[Value]) -> Option<usize> {
        elements
            .iter()
            .enumerate()
            .position(|(index, element)| self.test(element, index))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate(<fn>)")
    }
}

/// Value transform used by `map` and by mapping replacements.
#[derive(Clone)]
pub struct Mapper(Arc<dyn Fn(&Value) -> Value + Send + Sync>);

impl Mapper {
    /// Wrap a closure.
    pub fn new<F>(mapper: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(mapper))
    }

    /// Apply the transform.
    #[must_use]
    pub fn apply(&self, current: &Value) -> Value {
        (self.0)(current)
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapper(<fn>)")
    }
}

/// The fixed vocabulary of property verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Verb {
    /// Replace the whole value
    Set,
    /// Remove the property from the record
    Delete,
    /// Replace the value with `mapper(current)`
    Map,
    /// Append to an array
    ArrayPush,
    /// Prepend to an array
    ArrayUnshift,
    /// Remove one array element
    ArrayRemove,
    /// Overwrite one array element
    ArrayReplace,
    /// Set a flag to `true`
    BooleanSetTrue,
    /// Set a flag to `false`
    BooleanSetFalse,
    /// Negate a flag
    BooleanToggle,
    /// Set one key of an object
    ObjectSetProperty,
    /// Remove one key of an object
    ObjectDeleteProperty,
    /// Shallow-merge keys into an object
    ObjectMerge,
}

impl Verb {
    /// Every verb, universal ones first.
    pub const ALL: [Self; 13] = [
        Self::Set,
        Self::Delete,
        Self::Map,
        Self::ArrayPush,
        Self::ArrayUnshift,
        Self::ArrayRemove,
        Self::ArrayReplace,
        Self::BooleanSetTrue,
        Self::BooleanSetFalse,
        Self::BooleanToggle,
        Self::ObjectSetProperty,
        Self::ObjectDeleteProperty,
        Self::ObjectMerge,
    ];

    /// Fragment used inside the action `type` string.
    #[must_use]
    pub const fn type_fragment(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Delete => "delete",
            Self::Map => "map",
            Self::ArrayPush => "array_push",
            Self::ArrayUnshift => "array_unshift",
            Self::ArrayRemove => "array_remove",
            Self::ArrayReplace => "array_replace",
            Self::BooleanSetTrue => "boolean_set_true",
            Self::BooleanSetFalse => "boolean_set_false",
            Self::BooleanToggle => "boolean_toggle",
            Self::ObjectSetProperty => "object_set_property",
            Self::ObjectDeleteProperty => "object_delete_property",
            Self::ObjectMerge => "object_merge",
        }
    }

    /// Conventional action-creator name, without the property suffix.
    #[must_use]
    pub const fn creator_name(self) -> &'static str {
        match self {
            Self::Set => "Set",
            Self::Delete => "Delete",
            Self::Map => "Map",
            Self::ArrayPush => "Array_push",
            Self::ArrayUnshift => "Array_unshift",
            Self::ArrayRemove => "Array_remove",
            Self::ArrayReplace => "Array_replace",
            Self::BooleanSetTrue => "Boolean_set_true",
            Self::BooleanSetFalse => "Boolean_set_false",
            Self::BooleanToggle => "Boolean_toggle",
            Self::ObjectSetProperty => "Object_set_property",
            Self::ObjectDeleteProperty => "Object_delete_property",
            Self::ObjectMerge => "Object_merge",
        }
    }

    /// Classification that enables this verb; `None` for universal verbs.
    #[must_use]
    pub const fn required_kind(self) -> Option<PropertyKind> {
        match self {
            Self::Set | Self::Delete | Self::Map => None,
            Self::ArrayPush | Self::ArrayUnshift | Self::ArrayRemove | Self::ArrayReplace => {
                Some(PropertyKind::Array)
            },
            Self::BooleanSetTrue | Self::BooleanSetFalse | Self::BooleanToggle => {
                Some(PropertyKind::Boolean)
            },
            Self::ObjectSetProperty | Self::ObjectDeleteProperty | Self::ObjectMerge => {
                Some(PropertyKind::Object)
            },
        }
    }

    /// Whether a property of the given kind recognizes this verb.
    #[must_use]
    pub fn is_enabled_for(self, kind: PropertyKind) -> bool {
        self.required_kind().is_none_or(|required| required == kind)
    }

    /// Render the full `type` string for a property action.
    #[must_use]
    pub fn action_type(self, prefix: &str, property: &str) -> String {
        format!("{prefix}_{}_{property}", self.type_fragment())
    }

    /// Split a `type` string into verb and property for a known prefix.
    ///
    /// Returns `None` when the string does not follow the property grammar
    /// for `prefix`.
    ///
    /// ```
    /// use statekit_core::action::Verb;
    ///
    /// assert_eq!(
    ///     Verb::parse_type("PREFIX", "PREFIX_boolean_toggle_dark_mode"),
    ///     Some((Verb::BooleanToggle, "dark_mode"))
    /// );
    /// assert_eq!(Verb::parse_type("PREFIX", "OTHER_set_a"), None);
    /// ```
    #[must_use]
    pub fn parse_type<'a>(prefix: &str, action_type: &'a str) -> Option<(Self, &'a str)> {
        let rest = action_type.strip_prefix(prefix)?.strip_prefix('_')?;
        Self::ALL.into_iter().find_map(|verb| {
            let property = rest
                .strip_prefix(verb.type_fragment())?
                .strip_prefix('_')?;
            (!property.is_empty()).then_some((verb, property))
        })
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_fragment())
    }
}

/// How an array remove locates its element.
#[derive(Clone, Debug)]
pub enum RemoveArgs {
    /// Explicit position
    Index(usize),
    /// First element matching the predicate
    Predicate(Predicate),
}

impl RemoveArgs {
    /// Remove at a position.
    #[must_use]
    pub const fn index(index: usize) -> Self {
        Self::Index(index)
    }

    /// Remove the first element matching `predicate`.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Value, usize) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Predicate::new(predicate))
    }
}

/// How an array replace locates its element.
#[derive(Clone, Debug)]
pub enum ReplaceSelector {
    /// Explicit position
    Index(usize),
    /// First element matching the predicate
    Predicate(Predicate),
    /// First element whose field equals the replacement value's field
    PropertyToCheckEquality(String),
}

/// What an array replace writes.
#[derive(Clone, Debug)]
pub enum Replacement {
    /// Write this value verbatim
    Value(Value),
    /// Write `mapper(current_element)`
    Mapper(Mapper),
}

impl Replacement {
    /// Value to store in place of `current`.
    #[must_use]
    pub fn resolve(&self, current: &Value) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Mapper(mapper) => mapper.apply(current),
        }
    }
}

/// Arguments of an array replace.
///
/// A missing selector is accepted and leaves the array untouched.
#[derive(Clone, Debug)]
pub struct ReplaceArgs {
    /// Element locator
    pub selector: Option<ReplaceSelector>,
    /// Value (or mapping) written at the located index
    pub replacement: Replacement,
}

impl ReplaceArgs {
    /// Replace the element at `index`.
    pub fn index(index: usize, value: impl Into<Value>) -> Self {
        Self {
            selector: Some(ReplaceSelector::Index(index)),
            replacement: Replacement::Value(value.into()),
        }
    }

    /// Replace the first element matching `predicate`.
    pub fn predicate<F>(predicate: F, value: impl Into<Value>) -> Self
    where
        F: Fn(&Value, usize) -> bool + Send + Sync + 'static,
    {
        Self {
            selector: Some(ReplaceSelector::Predicate(Predicate::new(predicate))),
            replacement: Replacement::Value(value.into()),
        }
    }

    /// Replace the first element whose `key` field equals `value[key]`.
    pub fn property_to_check_equality(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            selector: Some(ReplaceSelector::PropertyToCheckEquality(key.into())),
            replacement: Replacement::Value(value.into()),
        }
    }

    /// Replace with no selector; dispatching it changes nothing.
    pub fn unselected(value: impl Into<Value>) -> Self {
        Self {
            selector: None,
            replacement: Replacement::Value(value.into()),
        }
    }

    /// Map the element at `index` through `mapper`.
    pub fn map_index<F>(index: usize, mapper: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            selector: Some(ReplaceSelector::Index(index)),
            replacement: Replacement::Mapper(Mapper::new(mapper)),
        }
    }

    /// Map the first element matching `predicate` through `mapper`.
    pub fn map_predicate<P, F>(predicate: P, mapper: F) -> Self
    where
        P: Fn(&Value, usize) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            selector: Some(ReplaceSelector::Predicate(Predicate::new(predicate))),
            replacement: Replacement::Mapper(Mapper::new(mapper)),
        }
    }
}

/// Verb payloads.
#[derive(Clone, Debug)]
pub enum PropertyOp {
    /// Replace the whole value
    Set(Value),
    /// Remove the property
    Delete,
    /// Replace the value with `mapper(current)`
    Map(Mapper),
    /// Append an element
    ArrayPush(Value),
    /// Prepend an element
    ArrayUnshift(Value),
    /// Remove one element
    ArrayRemove(RemoveArgs),
    /// Overwrite one element
    ArrayReplace(ReplaceArgs),
    /// Set to `true`
    BooleanSetTrue,
    /// Set to `false`
    BooleanSetFalse,
    /// Negate
    BooleanToggle,
    /// Set one key
    ObjectSetProperty {
        /// Object key
        key: String,
        /// New value
        value: Value,
    },
    /// Remove one key
    ObjectDeleteProperty {
        /// Object key
        key: String,
    },
    /// Overlay keys (payload keys win)
    ObjectMerge(Map<String, Value>),
}

impl PropertyOp {
    /// Verb of this payload.
    #[must_use]
    pub const fn verb(&self) -> Verb {
        match self {
            Self::Set(_) => Verb::Set,
            Self::Delete => Verb::Delete,
            Self::Map(_) => Verb::Map,
            Self::ArrayPush(_) => Verb::ArrayPush,
            Self::ArrayUnshift(_) => Verb::ArrayUnshift,
            Self::ArrayRemove(_) => Verb::ArrayRemove,
            Self::ArrayReplace(_) => Verb::ArrayReplace,
            Self::BooleanSetTrue => Verb::BooleanSetTrue,
            Self::BooleanSetFalse => Verb::BooleanSetFalse,
            Self::BooleanToggle => Verb::BooleanToggle,
            Self::ObjectSetProperty { .. } => Verb::ObjectSetProperty,
            Self::ObjectDeleteProperty { .. } => Verb::ObjectDeleteProperty,
            Self::ObjectMerge(_) => Verb::ObjectMerge,
        }
    }
}

/// An action aimed at one property of the record.
#[derive(Clone, Debug)]
pub struct PropertyAction {
    /// Action namespace
    pub prefix: String,
    /// Target property
    pub property: String,
    /// Verb and payload
    pub op: PropertyOp,
}

impl PropertyAction {
    /// Whether this action is addressed to `property` under `prefix`.
    #[must_use]
    pub fn targets(&self, prefix: &str, property: &str) -> bool {
        self.prefix == prefix && self.property == property
    }
}

/// Every action that can travel through a generated reducer.
#[derive(Clone, Debug)]
pub enum Action {
    /// Verb applied to one property
    Property(PropertyAction),
    /// Undo the last tracked transition
    Undo {
        /// Action namespace
        prefix: String,
    },
    /// Any other action sharing the dispatch stream
    Other {
        /// Opaque `type` string
        action_type: String,
    },
}

impl Action {
    /// Build a property action.
    pub fn property(
        prefix: impl Into<String>,
        property: impl Into<String>,
        op: PropertyOp,
    ) -> Self {
        Self::Property(PropertyAction {
            prefix: prefix.into(),
            property: property.into(),
            op,
        })
    }

    /// Build an undo action.
    pub fn undo(prefix: impl Into<String>) -> Self {
        Self::Undo {
            prefix: prefix.into(),
        }
    }

    /// Build a foreign action identified only by its `type`.
    pub fn other(action_type: impl Into<String>) -> Self {
        Self::Other {
            action_type: action_type.into(),
        }
    }

    /// The wire `type` string.
    #[must_use]
    pub fn action_type(&self) -> String {
        match self {
            Self::Property(action) => {
                action.op.verb().action_type(&action.prefix, &action.property)
            },
            Self::Undo { prefix } => undo_action_type(prefix),
            Self::Other { action_type } => action_type.clone(),
        }
    }

    /// The property action, if this is one.
    #[must_use]
    pub const fn as_property(&self) -> Option<&PropertyAction> {
        match self {
            Self::Property(action) => Some(action),
            _ => None,
        }
    }

    /// Whether this is the undo action of `prefix`.
    #[must_use]
    pub fn is_undo_for(&self, prefix: &str) -> bool {
        matches!(self, Self::Undo { prefix: own } if own == prefix)
    }

    /// Parse a JSON action (`{"type": .., ..payload}`) for a known prefix.
    ///
    /// `type` strings that do not follow the grammar for `prefix` become
    /// [`Action::Other`]; they are valid actions that no generated reducer
    /// recognizes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAction`] if `value` is not an object
    /// - [`Error::MissingActionType`] if there is no string `type`
    /// - [`Error::MissingPayload`] / [`Error::InvalidPayload`] if the verb's
    ///   payload is absent or malformed
    pub fn from_json(prefix: &str, value: &Value) -> Result<Self> {
        let Some(fields) = value.as_object() else {
            return Err(Error::InvalidAction {
                found: json_type_name(value),
            });
        };
        let action_type = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or(Error::MissingActionType)?;

        if action_type == undo_action_type(prefix) {
            return Ok(Self::undo(prefix));
        }
        let Some((verb, property)) = Verb::parse_type(prefix, action_type) else {
            return Ok(Self::other(action_type));
        };

        let payload = Payload {
            action_type,
            fields,
        };
        let op = match verb {
            Verb::Set => PropertyOp::Set(payload.required("value")?.clone()),
            Verb::Delete => PropertyOp::Delete,
            Verb::Map => {
                return Err(payload.invalid("mapper", "function payloads cannot be read from JSON"));
            },
            Verb::ArrayPush => PropertyOp::ArrayPush(payload.required("value")?.clone()),
            Verb::ArrayUnshift => PropertyOp::ArrayUnshift(payload.required("value")?.clone()),
            Verb::ArrayRemove => PropertyOp::ArrayRemove(RemoveArgs::Index(
                payload.index()?.ok_or_else(|| payload.missing("index"))?,
            )),
            Verb::ArrayReplace => {
                let value = payload.required("value")?.clone();
                let selector = if let Some(index) = payload.index()? {
                    Some(ReplaceSelector::Index(index))
                } else {
                    payload
                        .optional_str("propertyToCheckEquality")?
                        .map(|key| ReplaceSelector::PropertyToCheckEquality(key.to_string()))
                };
                PropertyOp::ArrayReplace(ReplaceArgs {
                    selector,
                    replacement: Replacement::Value(value),
                })
            },
            Verb::BooleanSetTrue => PropertyOp::BooleanSetTrue,
            Verb::BooleanSetFalse => PropertyOp::BooleanSetFalse,
            Verb::BooleanToggle => PropertyOp::BooleanToggle,
            Verb::ObjectSetProperty => PropertyOp::ObjectSetProperty {
                key: payload.required_str("key")?.to_string(),
                value: payload.required("value")?.clone(),
            },
            Verb::ObjectDeleteProperty => PropertyOp::ObjectDeleteProperty {
                key: payload.required_str("key")?.to_string(),
            },
            Verb::ObjectMerge => PropertyOp::ObjectMerge(
                fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != "type")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
        };

        Ok(Self::property(prefix, property, op))
    }

    /// Render the action as JSON (`{"type": .., ..payload}`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSerializable`] if the payload holds a predicate
    /// or mapper.
    pub fn to_json(&self) -> Result<Value> {
        let action_type = self.action_type();
        let mut fields = Map::new();

        if let Self::Property(action) = self {
            match &action.op {
                PropertyOp::Set(value)
                | PropertyOp::ArrayPush(value)
                | PropertyOp::ArrayUnshift(value) => {
                    fields.insert("value".to_string(), value.clone());
                },
                PropertyOp::Delete
                | PropertyOp::BooleanSetTrue
                | PropertyOp::BooleanSetFalse
                | PropertyOp::BooleanToggle => {},
                PropertyOp::Map(_)
                | PropertyOp::ArrayRemove(RemoveArgs::Predicate(_))
                | PropertyOp::ArrayReplace(ReplaceArgs {
                    selector: Some(ReplaceSelector::Predicate(_)),
                    ..
                })
                | PropertyOp::ArrayReplace(ReplaceArgs {
                    replacement: Replacement::Mapper(_),
                    ..
                }) => return Err(Error::NotSerializable(action_type)),
                PropertyOp::ArrayRemove(RemoveArgs::Index(index)) => {
                    fields.insert("index".to_string(), Value::from(*index));
                },
                PropertyOp::ArrayReplace(args) => {
                    if let Replacement::Value(value) = &args.replacement {
                        fields.insert("value".to_string(), value.clone());
                    }
                    match &args.selector {
                        Some(ReplaceSelector::Index(index)) => {
                            fields.insert("index".to_string(), Value::from(*index));
                        },
                        Some(ReplaceSelector::PropertyToCheckEquality(key)) => {
                            fields.insert(
                                "propertyToCheckEquality".to_string(),
                                Value::from(key.as_str()),
                            );
                        },
                        Some(ReplaceSelector::Predicate(_)) | None => {},
                    }
                },
                PropertyOp::ObjectSetProperty { key, value } => {
                    fields.insert("key".to_string(), Value::from(key.as_str()));
                    fields.insert("value".to_string(), value.clone());
                },
                PropertyOp::ObjectDeleteProperty { key } => {
                    fields.insert("key".to_string(), Value::from(key.as_str()));
                },
                PropertyOp::ObjectMerge(entries) => {
                    fields.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
                },
            }
        }

        fields.insert("type".to_string(), Value::String(action_type));
        Ok(Value::Object(fields))
    }
}

/// `type` string of the undo action for `prefix`.
#[must_use]
pub fn undo_action_type(prefix: &str) -> String {
    format!("{prefix}_undo")
}

/// Field access over a JSON action with verb-aware errors.
struct Payload<'a> {
    action_type: &'a str,
    fields: &'a Map<String, Value>,
}

impl<'a> Payload<'a> {
    fn missing(&self, field: &'static str) -> Error {
        Error::MissingPayload {
            action_type: self.action_type.to_string(),
            field,
        }
    }

    fn invalid(&self, field: &'static str, reason: &str) -> Error {
        Error::InvalidPayload {
            action_type: self.action_type.to_string(),
            field,
            reason: reason.to_string(),
        }
    }

    fn required(&self, field: &'static str) -> Result<&'a Value> {
        self.fields.get(field).ok_or_else(|| self.missing(field))
    }

    fn required_str(&self, field: &'static str) -> Result<&'a str> {
        self.optional_str(field)?.ok_or_else(|| self.missing(field))
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<&'a str>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(_) => Err(self.invalid(field, "expected a string")),
        }
    }

    fn index(&self) -> Result<Option<usize>> {
        match self.fields.get("index") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|index| usize::try_from(index).ok())
                .map(Some)
                .ok_or_else(|| self.invalid("index", "expected a non-negative integer")),
        }
    }
}
