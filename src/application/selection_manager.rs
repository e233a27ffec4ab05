//! Session-scoped selection state management
//!
//! Owns the persistent, ordered set of chosen tags for one session,
//! independent of whatever filter is currently applied. Every mutation
//! follows the optimistic two-phase protocol: capture the pre-mutation
//! snapshot, apply locally, persist, and on persistence failure (or
//! timeout) restore the snapshot before surfacing the error. Mutations are
//! serialized by an in-flight guard so undo history and persisted state
//! never interleave inconsistently.
//!
//! The manager is constructor-injected with its store and threaded through
//! every operation; there is deliberately no process-wide singleton.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::domain::repositories::{SelectionStore, SessionSnapshot};
use crate::domain::selection::SelectionState;
use crate::domain::undo::{UndoOutcome, UndoSnapshot};
use crate::domain::value_objects::SessionId;

/// Failures surfaced by selection mutations. By the time one of these
/// reaches the caller, local state has already been rolled back.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("selection sync failed during '{action}', local state rolled back")]
    SyncFailed {
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Outcome of an undo request. An empty stack is a normal condition.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoResult {
    Restored {
        action: String,
        selection: SelectionState,
    },
    UndoUnavailable,
}

/// Manages one session's selection state against a durable store.
pub struct SelectionSessionManager {
    session_id: SessionId,
    store: Arc<dyn SelectionStore>,
    state: RwLock<SessionSnapshot>,
    /// Serializes mutations: a move in flight blocks new mutations until it
    /// completes or rolls back.
    mutation_guard: Mutex<()>,
    persist_timeout: Duration,
}

impl SelectionSessionManager {
    /// Opens a session, resuming the persisted snapshot when one exists.
    pub async fn open(
        session_id: SessionId,
        store: Arc<dyn SelectionStore>,
        undo_depth: usize,
        persist_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let snapshot = match store.load(&session_id).await? {
            Some(existing) => {
                info!(session = %session_id, selected = existing.selection.len(), "resumed persisted selection");
                existing
            }
            None => SessionSnapshot::empty(undo_depth),
        };
        Ok(Self {
            session_id,
            store,
            state: RwLock::new(snapshot),
            mutation_guard: Mutex::new(()),
            persist_timeout,
        })
    }

    /// Current selection, in insertion order.
    pub async fn state(&self) -> SelectionState {
        self.state.read().await.selection.clone()
    }

    /// Number of snapshots currently available to undo.
    pub async fn undo_depth(&self) -> usize {
        self.state.read().await.undo.len()
    }

    /// Adds one tag to the selection.
    pub async fn select(&self, id: &str) -> Result<SelectionState, SelectionError> {
        let id = id.to_string();
        self.mutate("select", move |selection| selection.select(id))
            .await
    }

    /// Removes one tag from the selection.
    pub async fn deselect(&self, id: &str) -> Result<SelectionState, SelectionError> {
        let id = id.to_string();
        self.mutate("deselect", move |selection| selection.deselect(&id))
            .await
    }

    /// Selects every visible tag, preserving existing positions.
    pub async fn select_all(&self, visible_ids: Vec<String>) -> Result<SelectionState, SelectionError> {
        self.mutate("select_all", move |selection| {
            selection.select_all(visible_ids.iter().map(String::as_str)) > 0
        })
        .await
    }

    /// Empties the selection.
    pub async fn clear(&self) -> Result<SelectionState, SelectionError> {
        self.mutate("clear", SelectionState::clear).await
    }

    /// Moves tags into the selection, preserving insertion order.
    pub async fn move_to_selected(&self, ids: Vec<String>) -> Result<SelectionState, SelectionError> {
        self.mutate("move_to_selected", move |selection| {
            selection.select_all(ids.iter().map(String::as_str)) > 0
        })
        .await
    }

    /// Moves tags back out of the selection.
    pub async fn move_to_available(&self, ids: Vec<String>) -> Result<SelectionState, SelectionError> {
        self.mutate("move_to_available", move |selection| {
            selection.deselect_all(ids.iter().map(String::as_str)) > 0
        })
        .await
    }

    /// Pushes an undo checkpoint without changing the selection. Called
    /// ahead of client-side mutations so both sides stay in lockstep.
    pub async fn push_checkpoint(&self, action: &str) -> Result<(), SelectionError> {
        let _guard = self.mutation_guard.lock().await;
        let previous = self.state.read().await.clone();

        let mut next = previous.clone();
        next.undo
            .push(UndoSnapshot::capture(&previous.selection, action));
        next.updated_at = Utc::now();

        *self.state.write().await = next.clone();
        self.confirm_or_rollback(action, previous, &next).await?;
        Ok(())
    }

    /// Pops the most recent snapshot and restores it. An empty stack is
    /// reported as [`UndoResult::UndoUnavailable`], never an error.
    pub async fn undo(&self) -> Result<UndoResult, SelectionError> {
        let _guard = self.mutation_guard.lock().await;
        let previous = self.state.read().await.clone();

        let mut next = previous.clone();
        let snapshot = match next.undo.pop() {
            UndoOutcome::Restored(snapshot) => snapshot,
            UndoOutcome::UndoUnavailable => {
                info!(session = %self.session_id, "undo requested on empty stack");
                return Ok(UndoResult::UndoUnavailable);
            }
        };
        next.selection = snapshot.selection.clone();
        next.updated_at = Utc::now();

        *self.state.write().await = next.clone();
        self.confirm_or_rollback("undo", previous, &next).await?;

        info!(session = %self.session_id, action = %snapshot.action, "restored selection snapshot");
        Ok(UndoResult::Restored {
            action: snapshot.action,
            selection: snapshot.selection,
        })
    }

    /// The optimistic mutation protocol shared by every operation.
    ///
    /// `apply` returns whether the selection changed; unchanged operations
    /// (idempotent re-selects and the like) skip both the undo push and the
    /// persistence round-trip.
    async fn mutate<F>(&self, action: &str, apply: F) -> Result<SelectionState, SelectionError>
    where
        F: FnOnce(&mut SelectionState) -> bool,
    {
        let _guard = self.mutation_guard.lock().await;
        let previous = self.state.read().await.clone();

        let mut selection = previous.selection.clone();
        if !apply(&mut selection) {
            return Ok(previous.selection);
        }

        let mut next = previous.clone();
        next.undo
            .push(UndoSnapshot::capture(&previous.selection, action));
        next.selection = selection;
        next.updated_at = Utc::now();

        // Optimistic local apply, then confirm against the store.
        *self.state.write().await = next.clone();
        self.confirm_or_rollback(action, previous, &next).await?;

        Ok(next.selection)
    }

    /// Persists `next`; on failure or timeout restores `previous` so local
    /// and persisted state never diverge.
    async fn confirm_or_rollback(
        &self,
        action: &str,
        previous: SessionSnapshot,
        next: &SessionSnapshot,
    ) -> Result<(), SelectionError> {
        let result = match timeout(self.persist_timeout, self.store.save(&self.session_id, next)).await
        {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(source)) => source,
            Err(_) => anyhow!("persistence timed out after {:?}", self.persist_timeout),
        };

        warn!(
            session = %self.session_id,
            action,
            error = %result,
            "persistence failed, rolling back selection"
        );
        *self.state.write().await = previous;
        Err(SelectionError::SyncFailed {
            action: action.to_string(),
            source: result,
        })
    }
}
