//! Action-type filtering for action streams.
//!
//! Side-effect layers usually listen to the same dispatch stream as the
//! reducer and only care about a handful of action types.
//! [`ActionTypeFilter`] selects those actions from an iterator or a
//! [`futures::Stream`]; it has no runtime of its own.
//!
//! # Example
//!
//! ```
//! use statekit_core::filter::ActionTypeFilter;
//! use statekit_core::Action;
//!
//! let filter = ActionTypeFilter::new(["PREFIX_undo"]);
//! let actions = vec![Action::other("PING"), Action::undo("PREFIX")];
//!
//! let selected: Vec<Action> = filter.filter_iter(actions).collect();
//! assert_eq!(selected.len(), 1);
//! ```

use crate::action::Action;
use futures::future;
use futures::stream::{Stream, StreamExt};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

type ActionPredicate = Arc<dyn Fn(&Action) -> bool + Send + Sync>;

/// Selects actions by `type`, optionally narrowed by a predicate.
#[derive(Clone)]
pub struct ActionTypeFilter {
    types: BTreeSet<String>,
    predicate: Option<ActionPredicate>,
}

impl ActionTypeFilter {
    /// Accept actions whose `type` is one of `types`.
    pub fn new<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            predicate: None,
        }
    }

    /// Additionally require `predicate` to hold.
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Action) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Accepted `type` strings.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    /// Whether `action` passes the filter.
    #[must_use]
    pub fn matches(&self, action: &Action) -> bool {
        self.types.contains(&action.action_type())
            && self.predicate.as_ref().is_none_or(|predicate| predicate(action))
    }

    /// Keep the matching actions of an iterator.
    pub fn filter_iter<'a, I>(&'a self, actions: I) -> impl Iterator<Item = Action> + 'a
    where
        I: IntoIterator<Item = Action>,
        I::IntoIter: 'a,
    {
        actions.into_iter().filter(move |action| self.matches(action))
    }

    /// Keep the matching actions of a stream.
    pub fn filter_stream<S>(self, actions: S) -> impl Stream<Item = Action>
    where
        S: Stream<Item = Action>,
    {
        actions.filter(move |action| future::ready(self.matches(action)))
    }
}

impl fmt::Debug for ActionTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTypeFilter")
            .field("types", &self.types)
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}
