//! Property reducers: action creators plus a reducer for one named property.
//!
//! [`create_property_components`] takes an action prefix, a property key and
//! a [`PropertyKind`], and returns:
//!
//! - [`PropertyActionCreators`]: builds the actions valid for that kind
//! - [`PropertyReducer`]: interprets exactly those actions against the
//!   property and declines everything else
//!
//! | Kind | Verbs (beyond `Set`, `Delete`, `Map`) |
//! |---|---|
//! | `ARRAY` | `Array_push`, `Array_unshift`, `Array_remove`, `Array_replace` |
//! | `BOOLEAN` | `Boolean_set_true`, `Boolean_set_false`, `Boolean_toggle` |
//! | `OBJECT` | `Object_set_property`, `Object_delete_property`, `Object_merge` |
//! | `GENERIC` | none |
//!
//! # Example
//!
//! ```
//! use statekit_core::property::{create_property_components, PropertyKind};
//! use statekit_core::reducer::Reducer;
//! use statekit_core::state::State;
//! use serde_json::json;
//!
//! let todos = create_property_components("PREFIX", "todos", PropertyKind::Array).unwrap();
//! let push = todos.action_creators.array().unwrap().push(json!("write docs"));
//! assert_eq!(push.action_type(), "PREFIX_array_push_todos");
//!
//! let state = todos.reducer.reduce(&State::new(), &push).into_option().unwrap();
//! assert_eq!(state.get("todos"), Some(&json!(["write docs"])));
//! ```

use crate::action::{
    Action, Mapper, PropertyOp, RemoveArgs, ReplaceArgs, ReplaceSelector, Replacement, Verb,
};
use crate::composition::{combine_optional_reducers, OptionalReducers};
use crate::error::{Error, Result};
use crate::reducer::{BoxedReducer, Reducer, Reduction};
use crate::state::{is_truthy, shallow_clone_array, shallow_clone_object, State};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fmt;
use std::str::FromStr;

/// Classification of a property, deciding which verbs it supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyKind {
    /// Ordered sequence
    #[serde(alias = "array")]
    Array,
    /// Two-state flag
    #[serde(alias = "boolean")]
    Boolean,
    /// Flat string-keyed mapping
    #[serde(alias = "object")]
    Object,
    /// Anything else; only the universal verbs
    #[default]
    #[serde(alias = "generic", alias = "ANY", alias = "any")]
    Generic,
}

impl PropertyKind {
    /// Classify a sample value by its shape.
    ///
    /// Returns `None` for values that reveal no collection or flag shape
    /// (null, numbers, strings); callers treat those as [`Self::Generic`]
    /// unless told otherwise.
    #[must_use]
    pub const fn infer(value: &Value) -> Option<Self> {
        match value {
            Value::Array(_) => Some(Self::Array),
            Value::Bool(_) => Some(Self::Boolean),
            Value::Object(_) => Some(Self::Object),
            Value::Null | Value::Number(_) | Value::String(_) => None,
        }
    }

    /// Canonical upper-case name (`"ARRAY"`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Array => "ARRAY",
            Self::Boolean => "BOOLEAN",
            Self::Object => "OBJECT",
            Self::Generic => "GENERIC",
        }
    }

    /// Verbs recognized for a property of this kind, universal ones first.
    #[must_use]
    pub fn verbs(self) -> SmallVec<[Verb; 8]> {
        Verb::ALL
            .into_iter()
            .filter(|verb| verb.is_enabled_for(self))
            .collect()
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ARRAY" => Ok(Self::Array),
            "BOOLEAN" => Ok(Self::Boolean),
            "OBJECT" => Ok(Self::Object),
            "GENERIC" | "ANY" => Ok(Self::Generic),
            _ => Err(format!("Unknown property kind: {s}")),
        }
    }
}

/// Reject empty action prefixes.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Err(Error::EmptyPrefix);
    }
    Ok(())
}

/// Check that `key` can be used in generated action names.
///
/// # Errors
///
/// Returns [`Error::InvalidPropertyKey`] unless `key` matches
/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_property_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPropertyKey(key.to_string()))
    }
}

/// Action creators for one property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyActionCreators {
    prefix: String,
    property: String,
    kind: PropertyKind,
}

impl PropertyActionCreators {
    /// Target property.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    /// Action prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Classification the creators were generated for.
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// `Set`: replace the whole value.
    pub fn set(&self, value: impl Into<Value>) -> Action {
        self.action(PropertyOp::Set(value.into()))
    }

    /// `Delete`: remove the property from the record.
    #[must_use]
    pub fn delete(&self) -> Action {
        self.action(PropertyOp::Delete)
    }

    /// `Map`: replace the value with `mapper(current)`.
    ///
    /// An absent property is passed to the mapper as `null`.
    pub fn map<F>(&self, mapper: F) -> Action
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.action(PropertyOp::Map(Mapper::new(mapper)))
    }

    /// Array verbs, available for `ARRAY` properties.
    #[must_use]
    pub fn array(&self) -> Option<ArrayActionCreators<'_>> {
        (self.kind == PropertyKind::Array).then_some(ArrayActionCreators { creators: self })
    }

    /// Boolean verbs, available for `BOOLEAN` properties.
    #[must_use]
    pub fn boolean(&self) -> Option<BooleanActionCreators<'_>> {
        (self.kind == PropertyKind::Boolean).then_some(BooleanActionCreators { creators: self })
    }

    /// Object verbs, available for `OBJECT` properties.
    #[must_use]
    pub fn object(&self) -> Option<ObjectActionCreators<'_>> {
        (self.kind == PropertyKind::Object).then_some(ObjectActionCreators { creators: self })
    }

    /// Verbs these creators can build.
    #[must_use]
    pub fn verbs(&self) -> SmallVec<[Verb; 8]> {
        self.kind.verbs()
    }

    /// Conventional creator names carrying the property suffix
    /// (`Set_todos`, `Array_push_todos`, ...).
    #[must_use]
    pub fn creator_names(&self) -> Vec<String> {
        self.verbs()
            .into_iter()
            .map(|verb| format!("{}_{}", verb.creator_name(), self.property))
            .collect()
    }

    /// Every action `type` string these creators can produce.
    #[must_use]
    pub fn action_types(&self) -> Vec<String> {
        self.verbs()
            .into_iter()
            .map(|verb| verb.action_type(&self.prefix, &self.property))
            .collect()
    }

    fn action(&self, op: PropertyOp) -> Action {
        Action::property(self.prefix.clone(), self.property.clone(), op)
    }
}

/// `ARRAY` action creators. Obtained from [`PropertyActionCreators::array`].
#[derive(Clone, Copy, Debug)]
pub struct ArrayActionCreators<'a> {
    creators: &'a PropertyActionCreators,
}

impl ArrayActionCreators<'_> {
    /// `Array_push`: append an element.
    pub fn push(&self, value: impl Into<Value>) -> Action {
        self.creators.action(PropertyOp::ArrayPush(value.into()))
    }

    /// `Array_unshift`: prepend an element.
    pub fn unshift(&self, value: impl Into<Value>) -> Action {
        self.creators.action(PropertyOp::ArrayUnshift(value.into()))
    }

    /// `Array_remove`: remove one element by index or predicate.
    #[must_use]
    pub fn remove(&self, args: RemoveArgs) -> Action {
        self.creators.action(PropertyOp::ArrayRemove(args))
    }

    /// `Array_replace`: overwrite one element by index, predicate or field equality.
    #[must_use]
    pub fn replace(&self, args: ReplaceArgs) -> Action {
        self.creators.action(PropertyOp::ArrayReplace(args))
    }
}

/// `BOOLEAN` action creators. Obtained from [`PropertyActionCreators::boolean`].
#[derive(Clone, Copy, Debug)]
pub struct BooleanActionCreators<'a> {
    creators: &'a PropertyActionCreators,
}

impl BooleanActionCreators<'_> {
    /// `Boolean_set_true`.
    #[must_use]
    pub fn set_true(&self) -> Action {
        self.creators.action(PropertyOp::BooleanSetTrue)
    }

    /// `Boolean_set_false`.
    #[must_use]
    pub fn set_false(&self) -> Action {
        self.creators.action(PropertyOp::BooleanSetFalse)
    }

    /// `Boolean_toggle`.
    #[must_use]
    pub fn toggle(&self) -> Action {
        self.creators.action(PropertyOp::BooleanToggle)
    }
}

/// `OBJECT` action creators. Obtained from [`PropertyActionCreators::object`].
#[derive(Clone, Copy, Debug)]
pub struct ObjectActionCreators<'a> {
    creators: &'a PropertyActionCreators,
}

impl ObjectActionCreators<'_> {
    /// `Object_set_property`: set one key.
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<Value>) -> Action {
        self.creators.action(PropertyOp::ObjectSetProperty {
            key: key.into(),
            value: value.into(),
        })
    }

    /// `Object_delete_property`: remove one key.
    pub fn delete_property(&self, key: impl Into<String>) -> Action {
        self.creators
            .action(PropertyOp::ObjectDeleteProperty { key: key.into() })
    }

    /// `Object_merge`: overlay every entry of `partial` (its keys win).
    #[must_use]
    pub fn merge(&self, partial: Map<String, Value>) -> Action {
        self.creators.action(PropertyOp::ObjectMerge(partial))
    }
}

/// Action creators and reducer for one property.
pub struct PropertyComponents {
    /// Builds the actions valid for the property's kind
    pub action_creators: PropertyActionCreators,
    /// Interprets those actions
    pub reducer: PropertyReducer,
}

/// Generate action creators and a reducer for one property.
///
/// # Errors
///
/// - [`Error::EmptyPrefix`] if `prefix` is empty
/// - [`Error::InvalidPropertyKey`] if `key` is not an identifier
pub fn create_property_components(
    prefix: &str,
    key: &str,
    kind: PropertyKind,
) -> Result<PropertyComponents> {
    validate_prefix(prefix)?;
    validate_property_key(key)?;

    tracing::debug!(prefix, property = key, %kind, "Creating property components");

    Ok(PropertyComponents {
        action_creators: PropertyActionCreators {
            prefix: prefix.to_string(),
            property: key.to_string(),
            kind,
        },
        reducer: PropertyReducer::new(prefix, key, kind),
    })
}

/// Address of the property a branch works on.
#[derive(Clone, Debug)]
struct Target {
    prefix: String,
    property: String,
}

impl Target {
    /// Payload of `action` if it is addressed to this property.
    fn op<'a>(&self, action: &'a Action) -> Option<&'a PropertyOp> {
        action
            .as_property()
            .filter(|action| action.targets(&self.prefix, &self.property))
            .map(|action| &action.op)
    }

    fn current<'s>(&self, state: &'s State) -> Option<&'s Value> {
        state.get(&self.property)
    }

    fn write(&self, state: &State, value: Value) -> Reduction<State> {
        Reduction::Handled(state.with(self.property.clone(), value))
    }
}

/// Reducer for one property.
///
/// Built from branch reducers chained with the optional-reducer combinator;
/// only the branches enabled by the property's kind are present, so verbs of
/// another kind decline.
pub struct PropertyReducer {
    target: Target,
    kind: PropertyKind,
    branches: OptionalReducers<State, Action>,
}

impl PropertyReducer {
    fn new(prefix: &str, key: &str, kind: PropertyKind) -> Self {
        let target = Target {
            prefix: prefix.to_string(),
            property: key.to_string(),
        };

        let mut branches: Vec<BoxedReducer<State, Action>> = Vec::new();
        match kind {
            PropertyKind::Array => {
                branches.push(Box::new(ArrayInsertBranch(target.clone())));
                branches.push(Box::new(ArraySelectBranch(target.clone())));
            },
            PropertyKind::Boolean => branches.push(Box::new(BooleanBranch(target.clone()))),
            PropertyKind::Object => branches.push(Box::new(ObjectBranch(target.clone()))),
            PropertyKind::Generic => {},
        }
        branches.push(Box::new(UniversalBranch(target.clone())));

        Self {
            target,
            kind,
            branches: combine_optional_reducers(branches),
        }
    }

    /// Target property.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.target.property
    }

    /// Classification the reducer was generated for.
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }
}

impl fmt::Debug for PropertyReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyReducer")
            .field("prefix", &self.target.prefix)
            .field("property", &self.target.property)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Reducer for PropertyReducer {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        let Some(op) = self.target.op(action) else {
            return Reduction::Declined;
        };

        let reduction = self.branches.reduce(state, action);
        tracing::trace!(
            property = %self.target.property,
            verb = %op.verb(),
            handled = reduction.is_handled(),
            "Property action reduced"
        );
        reduction
    }
}

/// `Set`, `Delete` and `Map`, present for every kind.
struct UniversalBranch(Target);

impl Reducer for UniversalBranch {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        match self.0.op(action) {
            Some(PropertyOp::Set(value)) => self.0.write(state, value.clone()),
            Some(PropertyOp::Delete) => Reduction::Handled(state.without(&self.0.property)),
            Some(PropertyOp::Map(mapper)) => {
                let current = self.0.current(state).unwrap_or(&Value::Null);
                self.0.write(state, mapper.apply(current))
            },
            _ => Reduction::Declined,
        }
    }
}

/// `Array_push` and `Array_unshift`.
struct ArrayInsertBranch(Target);

impl Reducer for ArrayInsertBranch {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        match self.0.op(action) {
            Some(PropertyOp::ArrayPush(value)) => {
                let mut items = shallow_clone_array(self.0.current(state));
                items.push(value.clone());
                self.0.write(state, Value::Array(items))
            },
            Some(PropertyOp::ArrayUnshift(value)) => {
                let mut items = shallow_clone_array(self.0.current(state));
                items.insert(0, value.clone());
                self.0.write(state, Value::Array(items))
            },
            _ => Reduction::Declined,
        }
    }
}

/// `Array_remove` and `Array_replace`: both locate one element first.
///
/// An unresolved locator still counts as handled and leaves the record
/// unchanged.
struct ArraySelectBranch(Target);

impl Reducer for ArraySelectBranch {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        match self.0.op(action) {
            Some(PropertyOp::ArrayRemove(args)) => {
                let mut items = shallow_clone_array(self.0.current(state));
                let index = match args {
                    RemoveArgs::Index(index) => (*index < items.len()).then_some(*index),
                    RemoveArgs::Predicate(predicate) => predicate.find_index(&items),
                };
                let Some(index) = index else {
                    return Reduction::Handled(state.clone());
                };
                items.remove(index);
                self.0.write(state, Value::Array(items))
            },
            Some(PropertyOp::ArrayReplace(args)) => {
                let mut items = shallow_clone_array(self.0.current(state));
                let Some(index) = replace_index(&items, args) else {
                    return Reduction::Handled(state.clone());
                };
                if index == items.len() {
                    let next = args.replacement.resolve(&Value::Null);
                    items.push(next);
                } else {
                    items[index] = args.replacement.resolve(&items[index]);
                }
                self.0.write(state, Value::Array(items))
            },
            _ => Reduction::Declined,
        }
    }
}

/// Resolve the element an array replace targets.
///
/// An explicit index may equal the length (writing one past the end extends
/// the sequence); anything beyond is unresolved. Field equality needs a
/// literal replacement value to compare against.
fn replace_index(items: &[Value], args: &ReplaceArgs) -> Option<usize> {
    match args.selector.as_ref()? {
        ReplaceSelector::Index(index) => (*index <= items.len()).then_some(*index),
        ReplaceSelector::Predicate(predicate) => predicate.find_index(items),
        ReplaceSelector::PropertyToCheckEquality(key) => {
            let Replacement::Value(replacement) = &args.replacement else {
                return None;
            };
            let expected = replacement.get(key.as_str());
            items
                .iter()
                .position(|item| item.get(key.as_str()) == expected)
        },
    }
}

/// `Boolean_set_true`, `Boolean_set_false` and `Boolean_toggle`.
struct BooleanBranch(Target);

impl Reducer for BooleanBranch {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        match self.0.op(action) {
            Some(PropertyOp::BooleanSetTrue) => self.0.write(state, Value::Bool(true)),
            Some(PropertyOp::BooleanSetFalse) => self.0.write(state, Value::Bool(false)),
            Some(PropertyOp::BooleanToggle) => {
                let current = is_truthy(self.0.current(state));
                self.0.write(state, Value::Bool(!current))
            },
            _ => Reduction::Declined,
        }
    }
}

/// `Object_set_property`, `Object_delete_property` and `Object_merge`.
struct ObjectBranch(Target);

impl Reducer for ObjectBranch {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        let op = self.0.op(action);
        if !matches!(
            op,
            Some(
                PropertyOp::ObjectSetProperty { .. }
                    | PropertyOp::ObjectDeleteProperty { .. }
                    | PropertyOp::ObjectMerge(_)
            )
        ) {
            return Reduction::Declined;
        }

        let mut entries = shallow_clone_object(self.0.current(state));
        match op {
            Some(PropertyOp::ObjectSetProperty { key, value }) => {
                entries.insert(key.clone(), value.clone());
            },
            Some(PropertyOp::ObjectDeleteProperty { key }) => {
                entries.remove(key);
            },
            Some(PropertyOp::ObjectMerge(partial)) => {
                entries.extend(partial.iter().map(|(key, value)| (key.clone(), value.clone())));
            },
            _ => {},
        }
        self.0.write(state, Value::Object(entries))
    }
}
