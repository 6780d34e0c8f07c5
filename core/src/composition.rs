//! Reducer composition utilities
//!
//! This module provides the two ways reducers are composed:
//! - **`combine_optional_reducers`**: First-match chaining of optional reducers
//! - **`combine_reducers`**: The total top-level wrapper handed to a host
//!
//! # Examples
//!
//! ## Combining Reducers
//!
//! ```
//! use statekit_core::composition::{combine_optional_reducers, combine_reducers};
//! use statekit_core::reducer::{from_fn, BoxedReducer, Reduction};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct AppState {
//!     property: &'static str,
//! }
//!
//! let never: BoxedReducer<AppState, &str> = Box::new(from_fn(|_: &AppState, _: &&str| {
//!     Reduction::Declined
//! }));
//! let on_t1: BoxedReducer<AppState, &str> = Box::new(from_fn(|_: &AppState, action: &&str| {
//!     if *action == "T1" {
//!         Reduction::Handled(AppState { property: "1" })
//!     } else {
//!         Reduction::Declined
//!     }
//! }));
//!
//! let combined = combine_reducers(AppState { property: "0" }, vec![never, on_t1]);
//!
//! assert_eq!(combined.apply(None, &"T1"), AppState { property: "1" });
//! assert_eq!(combined.apply(None, &"T2"), AppState { property: "0" });
//! ```

use crate::reducer::{BoxedReducer, Reducer, Reduction};

/// Chains optional reducers; the first one that handles the action wins.
///
/// Reducers are tried in order. The combined reducer declines only if every
/// input reducer declines. In a well-formed bundle each action `type` is
/// recognized by exactly one reducer, so the result does not depend on the
/// order; callers must keep it that way (two reducers claiming the same
/// action is a configuration error, and only the first is consulted).
///
/// # Examples
///
/// ```
/// use statekit_core::composition::combine_optional_reducers;
/// use statekit_core::reducer::{from_fn, BoxedReducer, Reducer, Reduction};
///
/// let evens: BoxedReducer<i32, i32> = Box::new(from_fn(|s: &i32, a: &i32| {
///     if a % 2 == 0 { Reduction::Handled(s + a) } else { Reduction::Declined }
/// }));
/// let combined = combine_optional_reducers(vec![evens]);
///
/// assert_eq!(combined.reduce(&1, &2), Reduction::Handled(3));
/// assert!(combined.reduce(&1, &3).is_declined());
/// ```
#[must_use]
pub fn combine_optional_reducers<S, A>(
    reducers: Vec<BoxedReducer<S, A>>,
) -> OptionalReducers<S, A> {
    OptionalReducers { reducers }
}

/// First-match combination of optional reducers.
///
/// Created by [`combine_optional_reducers`].
pub struct OptionalReducers<S, A> {
    reducers: Vec<BoxedReducer<S, A>>,
}

impl<S, A> OptionalReducers<S, A> {
    /// Append a reducer with the lowest priority.
    pub fn push(&mut self, reducer: BoxedReducer<S, A>) {
        self.reducers.push(reducer);
    }

    /// Number of chained reducers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether nothing is chained (such a combination declines everything).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S, A> Reducer for OptionalReducers<S, A> {
    type State = S;
    type Action = A;

    fn reduce(&self, state: &S, action: &A) -> Reduction<S> {
        for reducer in &self.reducers {
            if let Reduction::Handled(next) = reducer.reduce(state, action) {
                return Reduction::Handled(next);
            }
        }
        Reduction::Declined
    }
}

/// Combines optional reducers into a total reducer.
///
/// The returned reducer substitutes `initial` when the host has no state
/// yet and returns the input state unchanged when every reducer declines.
#[must_use]
pub fn combine_reducers<S, A>(
    initial: S,
    reducers: Vec<BoxedReducer<S, A>>,
) -> CombinedReducer<OptionalReducers<S, A>>
where
    S: Clone,
{
    CombinedReducer::new(initial, combine_optional_reducers(reducers))
}

/// A total reducer for the host: every action yields a state.
///
/// Created by [`combine_reducers`] or [`CombinedReducer::new`]. It is driven
/// through [`CombinedReducer::apply`] only and does not implement
/// [`Reducer`], so it cannot be wrapped again where a decline must be
/// visible (an undo decorator or a first-match chain).
pub struct CombinedReducer<R: Reducer> {
    initial: R::State,
    reducer: R,
}

impl<R> CombinedReducer<R>
where
    R: Reducer,
    R::State: Clone,
{
    /// Wrap an optional reducer with a default state.
    pub const fn new(initial: R::State, reducer: R) -> Self {
        Self { initial, reducer }
    }

    /// Run one transition.
    ///
    /// `None` is the host's "uninitialized" sentinel and is replaced by the
    /// initial state. Unrecognized actions return a copy of the input state.
    #[must_use]
    pub fn apply(&self, state: Option<&R::State>, action: &R::Action) -> R::State {
        let state = state.unwrap_or(&self.initial);
        self.reducer.reduce(state, action).unwrap_or_else(|| state.clone())
    }

    /// The default state substituted for an uninitialized host.
    #[must_use]
    pub const fn initial_state(&self) -> &R::State {
        &self.initial
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::reducer::from_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        SetName(String),
        Unknown,
    }

    fn counter_reducer() -> BoxedReducer<TestState, TestAction> {
        Box::new(from_fn(|state: &TestState, action: &TestAction| match action {
            TestAction::Increment => Reduction::Handled(TestState {
                counter: state.counter + 1,
                ..state.clone()
            }),
            _ => Reduction::Declined,
        }))
    }

    fn name_reducer() -> BoxedReducer<TestState, TestAction> {
        Box::new(from_fn(|state: &TestState, action: &TestAction| match action {
            TestAction::SetName(name) => Reduction::Handled(TestState {
                name: name.clone(),
                ..state.clone()
            }),
            _ => Reduction::Declined,
        }))
    }

    #[test]
    fn test_combine_optional_reducers() {
        let combined = combine_optional_reducers(vec![counter_reducer(), name_reducer()]);
        let state = TestState::default();

        let state = combined
            .reduce(&state, &TestAction::Increment)
            .into_option()
            .unwrap();
        assert_eq!(state.counter, 1);

        let state = combined
            .reduce(&state, &TestAction::SetName("Alice".to_string()))
            .into_option()
            .unwrap();
        assert_eq!(state.name, "Alice");
        assert_eq!(state.counter, 1);

        assert!(combined.reduce(&state, &TestAction::Unknown).is_declined());
    }

    #[test]
    fn test_first_match_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let spy: BoxedReducer<TestState, TestAction> =
            Box::new(from_fn(move |_: &TestState, _: &TestAction| {
                counted.fetch_add(1, Ordering::SeqCst);
                Reduction::Declined
            }));

        let combined = combine_optional_reducers(vec![counter_reducer(), spy]);
        let _ = combined.reduce(&TestState::default(), &TestAction::Increment);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let _ = combined.reduce(&TestState::default(), &TestAction::Unknown);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_combination_declines() {
        let combined = combine_optional_reducers::<TestState, TestAction>(Vec::new());
        assert!(combined.is_empty());
        assert!(combined.reduce(&TestState::default(), &TestAction::Increment).is_declined());
    }

    #[test]
    fn test_combine_reducers_is_total() {
        let initial = TestState {
            counter: 10,
            name: "initial".to_string(),
        };
        let combined = combine_reducers(initial.clone(), vec![counter_reducer()]);

        // Uninitialized host state falls back to the initial state
        assert_eq!(combined.apply(None, &TestAction::Increment).counter, 11);
        assert_eq!(combined.apply(None, &TestAction::Unknown), initial);

        let existing = TestState::default();
        assert_eq!(combined.apply(Some(&existing), &TestAction::Unknown), existing);
        assert_eq!(combined.initial_state(), &initial);
    }

    #[test]
    fn test_pushed_reducer_has_lowest_priority() {
        let mut combined = combine_optional_reducers(vec![counter_reducer()]);
        combined.push(name_reducer());
        combined.push(Box::new(from_fn(|state: &TestState, _: &TestAction| {
            Reduction::Handled(TestState {
                counter: -1,
                ..state.clone()
            })
        })));
        assert_eq!(combined.len(), 3);

        let state = TestState::default();
        let incremented = combined.reduce(&state, &TestAction::Increment).into_option().unwrap();
        assert_eq!(incremented.counter, 1);

        // Only the catch-all at the back handles what the others decline
        let caught = combined.reduce(&state, &TestAction::Unknown).into_option().unwrap();
        assert_eq!(caught.counter, -1);
    }
}
