//! Undo decorator: records tracked properties before each transition.
//!
//! [`UndoReducer`] wraps a whole-record reducer. Every transition the wrapped
//! reducer handles pushes a [`Snapshot`] of the tracked properties, taken from
//! the state being moved away from. The undo action pops the most recent
//! snapshot and overlays it onto the current state.
//!
//! The [`History`] lives inside the [`State`] under a history key, so every
//! state lineage carries its own history and a serialized state can be
//! undone after it is read back.
//!
//! # Example
//!
//! ```
//! use statekit_core::bulk::{create_bulk_components, BulkConfig};
//! use statekit_core::undo::{create_undo_components, UndoConfig};
//! use statekit_core::state::State;
//! use serde_json::json;
//!
//! let defaults = State::from_json(json!({"a": 0, "b": 0})).unwrap();
//! let bulk = create_bulk_components(&BulkConfig::new("PREFIX"), &defaults).unwrap();
//! let undo = create_undo_components(&UndoConfig::new("PREFIX", ["a"]), bulk.reducer).unwrap();
//! let reducer = undo.reducer.into_combined(defaults);
//!
//! let state = reducer.apply(None, &bulk.action_creators.property("a").unwrap().set(json!(5)));
//! assert_eq!(state.get("a"), Some(&json!(5)));
//!
//! let state = reducer.apply(Some(&state), &undo.action_creators.undo());
//! assert_eq!(state.get("a"), Some(&json!(0)));
//! ```

use crate::action::{undo_action_type, Action};
use crate::composition::CombinedReducer;
use crate::error::Result;
use crate::property::{validate_prefix, validate_property_key};
use crate::reducer::{Reducer, Reduction};
use crate::state::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Values of the tracked properties at one point in time.
///
/// Tracked properties that were absent are not stored; restoring the
/// snapshot removes them again.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, Arc<Value>>,
}

impl Snapshot {
    fn capture(state: &State, keys: &[String]) -> Self {
        Self {
            values: keys
                .iter()
                .filter_map(|key| {
                    state
                        .get_shared(key)
                        .map(|value| (key.clone(), Arc::clone(value)))
                })
                .collect(),
        }
    }

    fn restore(&self, state: &State, keys: &[String]) -> State {
        let mut next = state.clone();
        for key in keys {
            match self.values.get(key) {
                Some(value) => next.set_shared(key, Arc::clone(value)),
                None => next.remove(key),
            }
        }
        next
    }

    /// Recorded value of a tracked property.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).map(AsRef::as_ref)
    }

    /// Tracked properties that were present.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of recorded properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no tracked property was present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Recorded properties as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(key, value)| (key.clone(), Value::clone(value)))
                .collect(),
        )
    }
}

/// Snapshots in recording order, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    past: VecDeque<Snapshot>,
}

impl History {
    /// Number of snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.past.len()
    }

    /// Whether there is nothing to undo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.past.is_empty()
    }

    /// Most recent snapshot, the one the next undo restores.
    #[must_use]
    pub fn last(&self) -> Option<&Snapshot> {
        self.past.back()
    }

    /// Snapshots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.past.iter()
    }

    fn push(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
    }

    fn pop(&mut self) -> Option<Snapshot> {
        self.past.pop_back()
    }

    /// Drop the oldest snapshots until at most `limit` remain.
    fn truncate_front(&mut self, limit: usize) -> usize {
        let excess = self.past.len().saturating_sub(limit);
        self.past.drain(..excess);
        excess
    }
}

/// Configuration for [`create_undo_components`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoConfig {
    /// Namespace of the undo action type
    pub action_prefix: String,
    /// Properties captured in each snapshot
    pub keys_to_track: Vec<String>,
    /// Maximum history length; `None` keeps every snapshot
    #[serde(default)]
    pub limit: Option<usize>,
    /// Where the history is stored in the state; defaults to the action
    /// prefix followed by the tracked keys
    #[serde(default)]
    pub history_key: Option<String>,
}

impl UndoConfig {
    /// Unbounded history of `keys_to_track`.
    pub fn new<I, K>(action_prefix: impl Into<String>, keys_to_track: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            action_prefix: action_prefix.into(),
            keys_to_track: keys_to_track.into_iter().map(Into::into).collect(),
            limit: None,
            history_key: None,
        }
    }

    /// Keep at most `limit` snapshots.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Store the history under `history_key` instead of the derived key.
    #[must_use]
    pub fn with_history_key(mut self, history_key: impl Into<String>) -> Self {
        self.history_key = Some(history_key.into());
        self
    }

    /// Effective history key.
    ///
    /// Without an explicit key this is `<prefix>[<tracked keys>]` with the
    /// keys sorted and deduplicated, so decorators sharing a prefix but
    /// tracking different properties never read each other's snapshots.
    #[must_use]
    pub fn history_key(&self) -> String {
        self.history_key.clone().unwrap_or_else(|| {
            let tracked: BTreeSet<&str> = self.keys_to_track.iter().map(String::as_str).collect();
            let tracked: Vec<&str> = tracked.into_iter().collect();
            format!("{}[{}]", self.action_prefix, tracked.join(","))
        })
    }
}

/// Undo action creator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoActionCreators {
    prefix: String,
}

impl UndoActionCreators {
    /// The undo action.
    #[must_use]
    pub fn undo(&self) -> Action {
        Action::undo(self.prefix.clone())
    }

    /// `type` string of the undo action (`<prefix>_undo`).
    #[must_use]
    pub fn action_type(&self) -> String {
        undo_action_type(&self.prefix)
    }
}

/// Undo action creator and decorated reducer.
pub struct UndoComponents<R> {
    /// Builds the undo action
    pub action_creators: UndoActionCreators,
    /// The wrapped reducer with history recording
    pub reducer: UndoReducer<R>,
}

/// Wrap `reducer` with history recording and an undo action.
///
/// # Errors
///
/// - [`Error::EmptyPrefix`](crate::Error::EmptyPrefix) if the prefix is empty
/// - [`Error::InvalidPropertyKey`](crate::Error::InvalidPropertyKey) if a
///   tracked key is not an identifier
pub fn create_undo_components<R>(config: &UndoConfig, reducer: R) -> Result<UndoComponents<R>>
where
    R: Reducer<State = State, Action = Action>,
{
    validate_prefix(&config.action_prefix)?;
    for key in &config.keys_to_track {
        validate_property_key(key)?;
    }

    let history_key = config.history_key();
    tracing::debug!(
        prefix = %config.action_prefix,
        history_key = %history_key,
        tracked = ?config.keys_to_track,
        limit = ?config.limit,
        "Creating undo components"
    );

    Ok(UndoComponents {
        action_creators: UndoActionCreators {
            prefix: config.action_prefix.clone(),
        },
        reducer: UndoReducer {
            prefix: config.action_prefix.clone(),
            history_key,
            keys: config.keys_to_track.clone(),
            limit: config.limit,
            inner: reducer,
        },
    })
}

/// Reducer decorated with undo history.
pub struct UndoReducer<R> {
    prefix: String,
    history_key: String,
    keys: Vec<String>,
    limit: Option<usize>,
    inner: R,
}

impl<R> UndoReducer<R>
where
    R: Reducer<State = State, Action = Action>,
{
    /// Recorded snapshots for `state`, oldest first.
    #[must_use]
    pub fn past(&self, state: &State) -> Vec<Snapshot> {
        state
            .history(&self.history_key)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total reducer that substitutes `initial` for an uninitialized host
    /// state and returns the input state for unrecognized actions.
    #[must_use]
    pub fn into_combined(self, initial: State) -> CombinedReducer<Self> {
        CombinedReducer::new(initial, self)
    }

    fn undo(&self, state: &State) -> Reduction<State> {
        let mut history = state.history(&self.history_key).cloned().unwrap_or_default();
        let Some(snapshot) = history.pop() else {
            tracing::trace!(history_key = %self.history_key, "Nothing to undo");
            return Reduction::Declined;
        };

        let mut next = snapshot.restore(state, &self.keys);
        tracing::debug!(
            history_key = %self.history_key,
            remaining = history.len(),
            "Undid last transition"
        );
        next.set_history(&self.history_key, history);
        Reduction::Handled(next)
    }

    fn record(&self, previous: &State, mut next: State) -> State {
        let mut history = previous
            .history(&self.history_key)
            .cloned()
            .unwrap_or_default();

        let snapshot = Snapshot::capture(previous, &self.keys);
        if history.last() != Some(&snapshot) {
            history.push(snapshot);
            tracing::debug!(
                history_key = %self.history_key,
                len = history.len(),
                "Recorded snapshot"
            );
        }

        if let Some(limit) = self.limit {
            let evicted = history.truncate_front(limit);
            if evicted > 0 {
                tracing::debug!(
                    history_key = %self.history_key,
                    evicted,
                    "Evicted oldest snapshots"
                );
            }
        }

        next.set_history(&self.history_key, history);
        next
    }
}

impl<R> fmt::Debug for UndoReducer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoReducer")
            .field("prefix", &self.prefix)
            .field("history_key", &self.history_key)
            .field("keys", &self.keys)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl<R> Reducer for UndoReducer<R>
where
    R: Reducer<State = State, Action = Action>,
{
    type State = State;
    type Action = Action;

    fn reduce(&self, state: &State, action: &Action) -> Reduction<State> {
        if action.is_undo_for(&self.prefix) {
            return self.undo(state);
        }

        match self.inner.reduce(state, action) {
            Reduction::Handled(next) => Reduction::Handled(self.record(state, next)),
            Reduction::Declined => Reduction::Declined,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bulk::{create_bulk_components, ActionCreators, BulkConfig, BulkReducer};
    use crate::composition::combine_optional_reducers;
    use crate::reducer::{from_fn, BoxedReducer};
    use serde_json::json;

    fn bulk() -> (ActionCreators, BulkReducer) {
        let defaults = State::from_json(json!({"a": 0, "b": 0, "c": 0})).unwrap();
        let components = create_bulk_components(&BulkConfig::new("PREFIX"), &defaults).unwrap();
        (components.action_creators, components.reducer)
    }

    fn run(
        reducer: &impl Reducer<State = State, Action = Action>,
        state: State,
        action: &Action,
    ) -> State {
        reducer.reduce(&state, action).into_option().expect("handled")
    }

    #[test]
    fn undo_restores_tracked_properties() {
        let (creators, reducer) = bulk();
        let config = UndoConfig::new("PREFIX", ["a", "b"]).with_limit(10);
        let undo = create_undo_components(&config, reducer).unwrap();
        let reducer = &undo.reducer;

        let mut state = State::new();
        for action in [
            creators.property("c").unwrap().set(0),
            creators.property("c").unwrap().set(1),
            creators.property("a").unwrap().set(1),
            creators.property("b").unwrap().set(2),
            creators.property("c").unwrap().set(3),
            creators.property("c").unwrap().set(4),
        ] {
            state = run(reducer, state, &action);
        }

        assert_eq!(state.to_json(), json!({"a": 1, "b": 2, "c": 4}));
        let past: Vec<Value> = reducer.past(&state).iter().map(Snapshot::to_json).collect();
        assert_eq!(past, vec![json!({}), json!({"a": 1}), json!({"a": 1, "b": 2})]);

        state = run(reducer, state, &undo.action_creators.undo());
        state = run(reducer, state, &undo.action_creators.undo());

        assert_eq!(state.to_json(), json!({"a": 1, "c": 4}));
        assert_eq!(reducer.past(&state), vec![Snapshot::default()]);
    }

    #[test]
    fn history_respects_limit() {
        let (creators, reducer) = bulk();
        let config = UndoConfig::new("PREFIX", ["a", "b"]).with_limit(1);
        let undo = create_undo_components(&config, reducer).unwrap();

        let mut state = State::new();
        for action in [
            creators.property("a").unwrap().set(1),
            creators.property("b").unwrap().set(2),
            creators.property("c").unwrap().set(3),
        ] {
            state = run(&undo.reducer, state, &action);
        }

        assert_eq!(state.to_json(), json!({"a": 1, "b": 2, "c": 3}));
        let past = undo.reducer.past(&state);
        assert_eq!(past.len(), 1);
        assert_eq!(past[0].to_json(), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn zero_limit_keeps_no_history() {
        let (creators, reducer) = bulk();
        let config = UndoConfig::new("PREFIX", ["a"]).with_limit(0);
        let undo = create_undo_components(&config, reducer).unwrap();

        let state = run(&undo.reducer, State::new(), &creators.property("a").unwrap().set(1));
        assert!(undo.reducer.past(&state).is_empty());
        assert!(undo.reducer.reduce(&state, &undo.action_creators.undo()).is_declined());
    }

    #[test]
    fn undo_without_history_declines() {
        let inner = from_fn(|_: &State, action: &Action| match action {
            Action::Other { action_type } if action_type == "UNDEFINED" => Reduction::Declined,
            _ => Reduction::Handled(State::new()),
        });
        let undo = create_undo_components(&UndoConfig::new("PREFIX", ["a"]), inner).unwrap();

        assert!(undo.reducer.reduce(&State::new(), &undo.action_creators.undo()).is_declined());
        assert!(undo.reducer.reduce(&State::new(), &Action::other("UNDEFINED")).is_declined());
    }

    #[test]
    fn declined_transitions_are_not_recorded() {
        let (_, reducer) = bulk();
        let undo = create_undo_components(&UndoConfig::new("PREFIX", ["a"]), reducer).unwrap();

        let state = State::from_json(json!({"a": 1})).unwrap();
        assert!(undo.reducer.reduce(&state, &Action::other("FOREIGN")).is_declined());
        assert!(undo.reducer.past(&state).is_empty());
    }

    #[test]
    fn undo_of_other_prefix_is_delegated() {
        let (creators, reducer) = bulk();
        let undo = create_undo_components(&UndoConfig::new("PREFIX", ["a"]), reducer).unwrap();

        let state = run(&undo.reducer, State::new(), &creators.property("a").unwrap().set(1));
        assert!(undo.reducer.reduce(&state, &Action::undo("OTHER")).is_declined());
        assert_eq!(undo.reducer.past(&state).len(), 1);
    }

    #[test]
    fn history_survives_serialization() {
        let (creators, reducer) = bulk();
        let undo = create_undo_components(&UndoConfig::new("PREFIX", ["a"]), reducer).unwrap();

        let defaults = State::from_json(json!({"a": 0})).unwrap();
        let state = run(&undo.reducer, defaults, &creators.property("a").unwrap().set(7));
        let serialized = serde_json::to_value(&state).unwrap();
        assert_eq!(serialized, json!({"$history": {"PREFIX[a]": [{"a": 0}]}, "a": 7}));

        let restored: State = serde_json::from_value(serialized).unwrap();
        let undone = run(&undo.reducer, restored, &undo.action_creators.undo());
        assert_eq!(undone.to_json(), json!({"a": 0}));
    }

    #[test]
    fn separate_history_keys_do_not_interfere() {
        let (creators, reducer) = bulk();
        let inner = create_undo_components(
            &UndoConfig::new("PREFIX", ["a"]).with_history_key("inner"),
            reducer,
        )
        .unwrap();
        let outer = create_undo_components(
            &UndoConfig::new("OUTER", ["b"]).with_history_key("outer"),
            inner.reducer,
        )
        .unwrap();

        let mut state = State::new();
        state = run(&outer.reducer, state, &creators.property("a").unwrap().set(1));
        state = run(&outer.reducer, state, &creators.property("b").unwrap().set(2));

        // b was absent before both transitions, so the outer history dedups
        assert_eq!(state.history("inner").map(History::len), Some(2));
        assert_eq!(state.history("outer").map(History::len), Some(1));

        // OUTER_undo restores b only
        state = run(&outer.reducer, state, &outer.action_creators.undo());
        assert_eq!(state.to_json(), json!({"a": 1}));
        assert_eq!(state.history("inner").map(History::len), Some(2));

        // PREFIX_undo passes through the outer decorator
        state = run(&outer.reducer, state, &inner.action_creators.undo());
        state = run(&outer.reducer, state, &inner.action_creators.undo());
        assert!(!state.contains_key("a"));
    }

    #[test]
    fn empty_history_declines_to_the_next_decorator() {
        let single = |key: &str| {
            let defaults = State::new().with(key, json!(0));
            let bulk = create_bulk_components(&BulkConfig::new("PREFIX"), &defaults).unwrap();
            let config = UndoConfig::new("PREFIX", [key]);
            let undo = create_undo_components(&config, bulk.reducer).unwrap();
            (bulk.action_creators, undo)
        };
        let (creators_a, undo_a) = single("a");
        let (creators_b, undo_b) = single("b");
        let undo_action = undo_a.action_creators.undo();
        let reducers: Vec<BoxedReducer<State, Action>> =
            vec![Box::new(undo_a.reducer), Box::new(undo_b.reducer)];
        let combined = combine_optional_reducers(reducers);

        let mut state = State::from_json(json!({"a": 0, "b": 0})).unwrap();
        state = run(&combined, state, &creators_a.property("a").unwrap().set(1));
        state = run(&combined, state, &creators_b.property("b").unwrap().set(2));
        assert_eq!(state.history("PREFIX[a]").map(History::len), Some(1));
        assert_eq!(state.history("PREFIX[b]").map(History::len), Some(1));

        // The first decorator undoes `a`, then declines and lets the second undo `b`
        state = run(&combined, state, &undo_action);
        assert_eq!(state.to_json(), json!({"a": 0, "b": 2}));
        state = run(&combined, state, &undo_action);
        assert_eq!(state.to_json(), json!({"a": 0, "b": 0}));
        assert!(combined.reduce(&state, &undo_action).is_declined());
    }

    #[test]
    fn config_defaults_and_deserialization() {
        let config: UndoConfig = serde_json::from_value(json!({
            "actionPrefix": "PREFIX",
            "keysToTrack": ["a", "b"],
            "limit": 5
        }))
        .unwrap();

        assert_eq!(config.limit, Some(5));
        assert_eq!(config.history_key(), "PREFIX[a,b]");
        assert_eq!(config.clone().with_history_key("h").history_key(), "h");
        assert_eq!(UndoConfig::new("P", ["b", "a", "b"]).history_key(), "P[a,b]");
    }

    #[test]
    fn invalid_tracked_key_is_rejected() {
        let (_, reducer) = bulk();
        assert!(create_undo_components(&UndoConfig::new("PREFIX", ["$history"]), reducer).is_err());
    }
}
