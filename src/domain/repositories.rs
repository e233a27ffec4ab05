//! Repository interfaces for the reconciliation engine
//!
//! Contains trait definitions for data access patterns: the read-only
//! catalog source consumed by the matcher, and the durable selection store
//! that keeps per-session selection state and undo history across requests.

use async_trait::async_trait;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{CatalogRecord, DohStatus, Lineage};
use crate::domain::selection::SelectionState;
use crate::domain::undo::UndoStack;
use crate::domain::value_objects::SessionId;

/// Read-only access to the canonical product catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Exact lookup by canonical product name.
    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogRecord>>;

    /// Fuzzy-candidate enumeration: every record sharing at least one
    /// normalized token with the query. Implementations may over-return;
    /// the matcher scores and ranks.
    async fn enumerate_candidates(&self, tokens: &[String]) -> Result<Vec<CatalogRecord>>;
}

/// Persisted per-session payload: selection plus undo history, kept in
/// lockstep so an undo is always consistent with what was persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub selection: SelectionState,
    pub undo: UndoStack,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Fresh empty payload with the given undo depth.
    #[must_use]
    pub fn empty(undo_depth: usize) -> Self {
        Self {
            selection: SelectionState::new(),
            undo: UndoStack::with_capacity(undo_depth),
            updated_at: Utc::now(),
        }
    }
}

/// Write access for the one mutation the catalog admits from this engine:
/// per-product lineage and DOH classification edits.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn update_lineage(&self, name: &str, lineage: Option<Lineage>) -> Result<()>;
    async fn update_doh(&self, name: &str, doh: DohStatus) -> Result<()>;
}

/// Durable store for session selection state, keyed by session id.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    async fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>>;
    async fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<()>;
    async fn delete(&self, session: &SessionId) -> Result<()>;
}
