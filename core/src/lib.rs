//! # Statekit Core
//!
//! Generated action creators and reducers for immutable state records.
//!
//! Given a description of a state shape, this crate synthesizes a matched
//! pair of action creators and a pure reducer that interprets those actions
//! against one property of the record, then composes the per-property
//! reducers into a reducer for the whole record.
//!
//! ## Core Concepts
//!
//! - **State**: An immutable record of named properties ([`state::State`])
//! - **Action**: A tagged request with a wire `type` string ([`action::Action`])
//! - **Reducer**: Pure function `(State, Action) → Handled(State) | Declined`
//! - **Classification**: `ARRAY`, `BOOLEAN`, `OBJECT` or `GENERIC`, deciding
//!   which verbs a property supports ([`property::PropertyKind`])
//! - **Combinator**: First-match composition of optional reducers
//!
//! ## Architecture
//!
//! ```text
//! create_bulk_components ──► one PropertyReducer per property
//!            │                     │ (branches combined first-match)
//!            ▼                     ▼
//!      BulkReducer ─────► combine_optional_reducers
//!            │
//!            ▼ (optional)
//!      UndoReducer ─────► combine_reducers (total, handed to the host)
//! ```
//!
//! ## Example
//!
//! ```
//! use statekit_core::bulk::{create_bulk_components, BulkConfig};
//! use statekit_core::state::State;
//! use serde_json::json;
//!
//! # fn main() -> statekit_core::Result<()> {
//! let defaults = State::from_json(json!({"a": [], "b": false, "c": {}}))?;
//! let components = create_bulk_components(&BulkConfig::new("PREFIX"), &defaults)?;
//! let creators = &components.action_creators;
//! let reducer = components.reducer.into_combined(defaults.clone());
//!
//! let push = creators.property("a")?.array().unwrap().push(json!(0));
//! let set_true = creators.property("b")?.boolean().unwrap().set_true();
//! let set_x = creators.property("c")?.object().unwrap().set_property("x", json!(1));
//!
//! let state = reducer.apply(None, &push);
//! let state = reducer.apply(Some(&state), &set_true);
//! let state = reducer.apply(Some(&state), &set_x);
//!
//! assert_eq!(state.to_json(), json!({"a": [0], "b": true, "c": {"x": 1}}));
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod bulk;
pub mod composition;
pub mod error;
pub mod filter;
pub mod property;
pub mod schema;
pub mod state;
pub mod undo;

// Re-export commonly used types
pub use action::{Action, PropertyOp, RemoveArgs, ReplaceArgs, Verb};
pub use error::{Error, Result};
pub use property::PropertyKind;
pub use reducer::{Reducer, Reduction};
pub use serde_json::{json, Value};
pub use state::State;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Action) → Reduction<State>`.
///
/// A reducer either handles the action and returns a new state, or declines
/// it. Declining is an explicit variant, never a sentinel data value, so a
/// handled transition whose new state happens to be "empty" is still
/// distinguishable from "not mine".
pub mod reducer {
    use std::marker::PhantomData;
    use std::sync::Arc;

    /// Outcome of running a reducer.
    #[must_use]
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Reduction<S> {
        /// The reducer recognized the action and produced a new state
        Handled(S),
        /// The action is not for this reducer
        Declined,
    }

    impl<S> Reduction<S> {
        /// Whether the action was handled.
        #[must_use]
        pub const fn is_handled(&self) -> bool {
            matches!(self, Self::Handled(_))
        }

        /// Whether the action was declined.
        #[must_use]
        pub const fn is_declined(&self) -> bool {
            matches!(self, Self::Declined)
        }

        /// Convert into an `Option`, `None` meaning declined.
        #[must_use]
        pub fn into_option(self) -> Option<S> {
            match self {
                Self::Handled(state) => Some(state),
                Self::Declined => None,
            }
        }

        /// New state, or `default` when declined.
        #[must_use]
        pub fn unwrap_or(self, default: S) -> S {
            self.into_option().unwrap_or(default)
        }

        /// New state, or the result of `fallback` when declined.
        #[must_use]
        pub fn unwrap_or_else<F: FnOnce() -> S>(self, fallback: F) -> S {
            self.into_option().unwrap_or_else(fallback)
        }

        /// Transform the handled state.
        pub fn map<T, F: FnOnce(S) -> T>(self, f: F) -> Reduction<T> {
            match self {
                Self::Handled(state) => Reduction::Handled(f(state)),
                Self::Declined => Reduction::Declined,
            }
        }

        /// Try `fallback` when declined.
        pub fn or_else<F: FnOnce() -> Self>(self, fallback: F) -> Self {
            match self {
                Self::Handled(state) => Self::Handled(state),
                Self::Declined => fallback(),
            }
        }
    }

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Type Parameters
    ///
    /// - `State`: The record this reducer operates on
    /// - `Action`: The action type this reducer processes
    ///
    /// # Example
    ///
    /// ```
    /// use statekit_core::reducer::{Reducer, Reduction};
    ///
    /// struct CounterReducer;
    ///
    /// impl Reducer for CounterReducer {
    ///     type State = i64;
    ///     type Action = &'static str;
    ///
    ///     fn reduce(&self, state: &i64, action: &&'static str) -> Reduction<i64> {
    ///         match *action {
    ///             "increment" => Reduction::Handled(state + 1),
    ///             _ => Reduction::Declined,
    ///         }
    ///     }
    /// }
    ///
    /// assert_eq!(CounterReducer.reduce(&1, &"increment"), Reduction::Handled(2));
    /// assert!(CounterReducer.reduce(&1, &"other").is_declined());
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// Reduce an action into a new state, or decline it.
        ///
        /// Must be pure: no I/O, no interior mutation, same output for the
        /// same inputs. The input state is never modified.
        fn reduce(&self, state: &Self::State, action: &Self::Action) -> Reduction<Self::State>;
    }

    /// Heap-allocated reducer, the unit of composition.
    pub type BoxedReducer<S, A> = Box<dyn Reducer<State = S, Action = A> + Send + Sync>;

    impl<R: Reducer + ?Sized> Reducer for Box<R> {
        type State = R::State;
        type Action = R::Action;

        fn reduce(&self, state: &Self::State, action: &Self::Action) -> Reduction<Self::State> {
            (**self).reduce(state, action)
        }
    }

    impl<R: Reducer + ?Sized> Reducer for Arc<R> {
        type State = R::State;
        type Action = R::Action;

        fn reduce(&self, state: &Self::State, action: &Self::Action) -> Reduction<Self::State> {
            (**self).reduce(state, action)
        }
    }

    /// Reducer backed by a closure. Created by [`from_fn`].
    pub struct FnReducer<F, S, A> {
        f: F,
        _phantom: PhantomData<fn(&S, &A)>,
    }

    /// Turn a closure into a [`Reducer`].
    ///
    /// ```
    /// use statekit_core::reducer::{from_fn, Reducer, Reduction};
    ///
    /// let double = from_fn(|state: &i32, _action: &()| Reduction::Handled(state * 2));
    /// assert_eq!(double.reduce(&4, &()), Reduction::Handled(8));
    /// ```
    pub const fn from_fn<S, A, F>(f: F) -> FnReducer<F, S, A>
    where
        F: Fn(&S, &A) -> Reduction<S>,
    {
        FnReducer {
            f,
            _phantom: PhantomData,
        }
    }

    impl<F, S, A> Reducer for FnReducer<F, S, A>
    where
        F: Fn(&S, &A) -> Reduction<S>,
    {
        type State = S;
        type Action = A;

        fn reduce(&self, state: &S, action: &A) -> Reduction<S> {
            (self.f)(state, action)
        }
    }
}
