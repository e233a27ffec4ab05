//! Bounded undo history for selection mutations
//!
//! Every selection-mutating operation pushes a snapshot of the
//! *pre-mutation* state, labeled with the action name, before the mutation
//! is applied. Popping restores the most recent snapshot (classic LIFO).
//! The stack is bounded; pushing beyond capacity evicts the oldest entry.
//! Popping an empty stack is a normal, reported condition, never an error.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::selection::SelectionState;

/// Default number of snapshots retained per session.
pub const DEFAULT_UNDO_DEPTH: usize = 20;

/// Immutable copy of the selection taken before a mutating operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSnapshot {
    pub selection: SelectionState,
    pub action: String,
    pub captured_at: DateTime<Utc>,
}

impl UndoSnapshot {
    /// Captures the given state under an action label.
    #[must_use]
    pub fn capture(selection: &SelectionState, action: impl Into<String>) -> Self {
        Self {
            selection: selection.clone(),
            action: action.into(),
            captured_at: Utc::now(),
        }
    }
}

/// Result of attempting to pop the stack.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    /// The most recent snapshot, removed from the stack.
    Restored(UndoSnapshot),
    /// The stack was empty; nothing to undo.
    UndoUnavailable,
}

/// Bounded LIFO stack of pre-mutation snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoStack {
    entries: VecDeque<UndoSnapshot>,
    capacity: usize,
}

impl UndoStack {
    /// Creates an empty stack holding at most `capacity` snapshots.
    /// A zero capacity is promoted to 1 so a push is never a silent drop.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Pushes a snapshot, evicting the oldest entry beyond capacity.
    pub fn push(&mut self, snapshot: UndoSnapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Removes and returns the most recent snapshot.
    pub fn pop(&mut self) -> UndoOutcome {
        match self.entries.pop_back() {
            Some(snapshot) => UndoOutcome::Restored(snapshot),
            None => UndoOutcome::UndoUnavailable,
        }
    }

    /// The most recent snapshot without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&UndoSnapshot> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_UNDO_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ids: &[&str], action: &str) -> UndoSnapshot {
        UndoSnapshot::capture(&SelectionState::from_ids(ids.iter().copied()), action)
    }

    #[test]
    fn n_pushes_then_n_pops_restore_in_reverse_order() {
        let mut stack = UndoStack::default();
        stack.push(snapshot(&["A"], "select"));
        stack.push(snapshot(&["A", "B"], "select"));
        stack.push(snapshot(&["A", "B", "C"], "select"));

        let UndoOutcome::Restored(third) = stack.pop() else {
            panic!("expected snapshot");
        };
        assert_eq!(third.selection.ids(), ["A", "B", "C"]);

        let UndoOutcome::Restored(second) = stack.pop() else {
            panic!("expected snapshot");
        };
        assert_eq!(second.selection.ids(), ["A", "B"]);

        let UndoOutcome::Restored(first) = stack.pop() else {
            panic!("expected snapshot");
        };
        assert_eq!(first.selection.ids(), ["A"]);

        assert_eq!(stack.pop(), UndoOutcome::UndoUnavailable);
    }

    #[test]
    fn empty_pop_is_reported_not_fatal() {
        let mut stack = UndoStack::with_capacity(4);
        assert_eq!(stack.pop(), UndoOutcome::UndoUnavailable);
    }

    #[test]
    fn pushing_beyond_capacity_evicts_oldest() {
        let mut stack = UndoStack::with_capacity(2);
        stack.push(snapshot(&["A"], "first"));
        stack.push(snapshot(&["B"], "second"));
        stack.push(snapshot(&["C"], "third"));
        assert_eq!(stack.len(), 2);

        let UndoOutcome::Restored(top) = stack.pop() else {
            panic!("expected snapshot");
        };
        assert_eq!(top.action, "third");

        let UndoOutcome::Restored(bottom) = stack.pop() else {
            panic!("expected snapshot");
        };
        assert_eq!(bottom.action, "second");
        assert_eq!(stack.pop(), UndoOutcome::UndoUnavailable);
    }

    #[test]
    fn zero_capacity_is_promoted() {
        let mut stack = UndoStack::with_capacity(0);
        stack.push(snapshot(&["A"], "select"));
        assert_eq!(stack.len(), 1);
    }
}
