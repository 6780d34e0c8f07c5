//! Whole-state composer: one property reducer per property of a default record.
//!
//! [`create_bulk_components`] classifies every property of a representative
//! default state, generates [`PropertyComponents`](crate::property::PropertyComponents)
//! for each, and composes the per-property reducers into a single
//! [`BulkReducer`] for the whole record.
//!
//! Classification order for each property:
//!
//! 1. an explicit entry in [`BulkConfig::type_suggestions`]
//! 2. the shape of the default value ([`PropertyKind::infer`])
//! 3. `GENERIC`
//!
//! Properties named only in the suggestions still get a reducer even though
//! the default record has no value for them.

use crate::action::Action;
use crate::composition::{combine_optional_reducers, CombinedReducer, OptionalReducers};
use crate::error::{Error, Result};
use crate::property::{
    create_property_components, validate_prefix, PropertyActionCreators, PropertyKind,
};
use crate::reducer::{BoxedReducer, Reducer, Reduction};
use crate::schema::PropertySchema;
use crate::state::State;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Configuration for [`create_bulk_components`].
///
/// Deserializable from the host's JSON configuration:
///
/// ```
/// use statekit_core::bulk::BulkConfig;
/// use statekit_core::PropertyKind;
/// use serde_json::json;
///
/// let config: BulkConfig = serde_json::from_value(json!({
///     "actionPrefix": "PREFIX",
///     "typeSuggestions": {"h": "ARRAY", "g": "BOOLEAN"}
/// }))
/// .unwrap();
///
/// assert_eq!(config.type_suggestions.get("h"), Some(&PropertyKind::Array));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkConfig {
    /// Namespace of every generated action type
    pub action_prefix: String,
    /// Explicit classifications; win over shape inference
    #[serde(default)]
    pub type_suggestions: BTreeMap<String, PropertyKind>,
}

impl BulkConfig {
    /// Config with no type suggestions.
    pub fn new(action_prefix: impl Into<String>) -> Self {
        Self {
            action_prefix: action_prefix.into(),
            type_suggestions: BTreeMap::new(),
        }
    }

    /// Classify `property` explicitly.
    #[must_use]
    pub fn with_type_suggestion(mut self, property: impl Into<String>, kind: PropertyKind) -> Self {
        self.type_suggestions.insert(property.into(), kind);
        self
    }

    /// Take every classification from a schema type.
    ///
    /// Entries already present are overwritten by the schema.
    #[must_use]
    pub fn with_schema<T: PropertySchema>(mut self) -> Self {
        self.type_suggestions.extend(
            T::property_kinds()
                .into_iter()
                .map(|(property, kind)| (property.to_string(), kind)),
        );
        self
    }
}

/// Action creators and reducer for a whole record.
pub struct BulkComponents {
    /// Per-property action creators, addressed by property name
    pub action_creators: ActionCreators,
    /// Whole-record reducer
    pub reducer: BulkReducer,
}

/// Generate components for every property of `defaults` plus every
/// suggested property.
///
/// # Errors
///
/// - [`Error::EmptyPrefix`] if the config's prefix is empty
/// - [`Error::InvalidPropertyKey`] if a property name is not an identifier
pub fn create_bulk_components(config: &BulkConfig, defaults: &State) -> Result<BulkComponents> {
    validate_prefix(&config.action_prefix)?;

    let keys: BTreeSet<&str> = defaults
        .keys()
        .chain(config.type_suggestions.keys().map(String::as_str))
        .collect();

    let mut creators = BTreeMap::new();
    let mut kinds = BTreeMap::new();
    let mut reducers: Vec<BoxedReducer<State, Action>> = Vec::with_capacity(keys.len());

    for key in keys {
        let kind = classify(config, defaults, key);
        let components = create_property_components(&config.action_prefix, key, kind)?;

        creators.insert(key.to_string(), components.action_creators);
        kinds.insert(key.to_string(), kind);
        reducers.push(Box::new(components.reducer));
    }

    tracing::debug!(
        prefix = %config.action_prefix,
        properties = kinds.len(),
        "Created bulk components"
    );

    Ok(BulkComponents {
        action_creators: ActionCreators {
            prefix: config.action_prefix.clone(),
            properties: creators,
        },
        reducer: BulkReducer {
            prefix: config.action_prefix.clone(),
            kinds,
            reducers: combine_optional_reducers(reducers),
        },
    })
}

fn classify(config: &BulkConfig, defaults: &State, key: &str) -> PropertyKind {
    if let Some(kind) = config.type_suggestions.get(key) {
        return *kind;
    }

    match defaults.get(key) {
        Some(value) => PropertyKind::infer(value).unwrap_or_else(|| {
            if value.is_null() {
                tracing::debug!(property = key, "Null default without a suggestion, using GENERIC");
            }
            PropertyKind::Generic
        }),
        None => {
            tracing::debug!(property = key, "No default value or suggestion, using GENERIC");
            PropertyKind::Generic
        },
    }
}

/// Remove the `_<property>` suffix a per-property creator name carries.
///
/// Names without that suffix are returned unchanged.
///
/// ```
/// use statekit_core::bulk::strip_property_suffix;
///
/// assert_eq!(strip_property_suffix("Array_push_todos", "todos"), "Array_push");
/// assert_eq!(strip_property_suffix("Set", "todos"), "Set");
/// ```
#[must_use]
pub fn strip_property_suffix<'a>(name: &'a str, property: &str) -> &'a str {
    name.strip_suffix(property)
        .and_then(|rest| rest.strip_suffix('_'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(name)
}

/// Per-property action creators of a whole record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionCreators {
    prefix: String,
    properties: BTreeMap<String, PropertyActionCreators>,
}

impl ActionCreators {
    /// Action prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creators for one property.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&PropertyActionCreators> {
        self.properties.get(property)
    }

    /// Creators for one property.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownProperty`] if the record has no such property.
    pub fn property(&self, property: &str) -> Result<&PropertyActionCreators> {
        self.get(property)
            .ok_or_else(|| Error::UnknownProperty(property.to_string()))
    }

    /// Property names in sorted order.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether there are no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Creator names per property, with the property suffix stripped.
    #[must_use]
    pub fn catalog(&self) -> BTreeMap<String, Vec<String>> {
        self.properties
            .iter()
            .map(|(property, creators)| {
                let names = creators
                    .creator_names()
                    .iter()
                    .map(|name| strip_property_suffix(name, property).to_string())
                    .collect();
                (property.clone(), names)
            })
            .collect()
    }

    /// Every action `type` string the bundle can emit.
    #[must_use]
    pub fn action_types(&self) -> BTreeSet<String> {
        self.properties
            .values()
            .flat_map(PropertyActionCreators::action_types)
            .collect()
    }
}

/// Whole-record reducer: first property reducer that handles the action wins.
///
/// Declines actions no property recognizes; wrap it with
/// [`BulkReducer::into_combined`] to get a total reducer.
pub struct BulkReducer {
    prefix: String,
    kinds: BTreeMap<String, PropertyKind>,
    reducers: OptionalReducers<State, Action>,
}

impl BulkReducer {
    /// Action prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Classification chosen for each property.
    #[must_use]
    pub const fn kinds(&self) -> &BTreeMap<String, PropertyKind> {
        &self.kinds
    }

    /// Total reducer that substitutes `initial` for an uninitialized host
    /// state and returns the input state for unrecognized actions.
    #[must_use]
    pub fn into_combined(self, initial: State) -> CombinedReducer<Self> {
        CombinedReducer::new(initial, self)
    }
}

impl fmt::Debug for BulkReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkReducer")
            .field("prefix", &self.prefix)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

impl Reducer for BulkReducer {
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        let reduction = self.reducers.reduce(state, action);
        if reduction.is_declined() {
            tracing::trace!(
                prefix = %self.prefix,
                action_type = %action.action_type(),
                "No property handled action"
            );
        }
        reduction
    }
}
