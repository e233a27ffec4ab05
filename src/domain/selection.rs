//! Persistent selection state
//!
//! An ordered, duplicate-free sequence of tag identifiers (canonical tag
//! names). Order is meaningful: it drives downstream rendering and reorder.
//! The state is a pure value type; optimistic application and persistence
//! live in the application layer.
//!
//! Selection is independent of any filter: filtering the visible pool never
//! reorders or removes persisted ids, and selecting a tag never hides it
//! from the available view.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The user's ordered choice of tags, keyed by canonical tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionState {
    order: Vec<String>,
}

impl SelectionState {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a selection from ids, keeping first occurrence order and
    /// dropping duplicates.
    #[must_use]
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = Self::new();
        for id in ids {
            state.select(id.into());
        }
        state
    }

    /// Adds an id at the end of the order. Selecting an already-selected id
    /// is a no-op; returns whether the state changed.
    pub fn select(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if id.is_empty() || self.contains(&id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Removes an id, preserving the order of the remaining entries.
    /// Returns whether the state changed.
    pub fn deselect(&mut self, id: &str) -> bool {
        let before = self.order.len();
        self.order.retain(|existing| existing != id);
        self.order.len() != before
    }

    /// Selects every id in the given order; already-selected ids keep their
    /// original position. Returns the number of newly added ids.
    pub fn select_all<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| self.select(*id)).count()
    }

    /// Removes every id in the given set. Returns the number removed.
    pub fn deselect_all<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        ids.into_iter().filter(|id| self.deselect(id)).count()
    }

    /// Empties the selection. Returns whether the state changed.
    pub fn clear(&mut self) -> bool {
        if self.order.is_empty() {
            return false;
        }
        self.order.clear();
        true
    }

    /// Drops ids no longer present in `known`, preserving order, and
    /// returns the dropped ids so callers can report them.
    pub fn retain_known(&mut self, known: &HashSet<&str>) -> Vec<String> {
        let (kept, dropped): (Vec<String>, Vec<String>) = std::mem::take(&mut self.order)
            .into_iter()
            .partition(|id| known.contains(id.as_str()));
        self.order = kept;
        dropped
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.order.iter().any(|existing| existing == id)
    }

    /// Ids in insertion order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
