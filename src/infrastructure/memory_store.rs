//! In-memory repository implementations
//!
//! Thread-safe map-backed implementations of the catalog and selection
//! interfaces. These back small installs and the test suites; production
//! deployments use the SQLite implementations.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::catalog::{CatalogRecord, DohStatus, Lineage};
use crate::domain::repositories::{
    CatalogSource, CatalogWriter, SelectionStore, SessionSnapshot,
};
use crate::domain::services::matcher::{normalize_name, tokenize};
use crate::domain::value_objects::SessionId;

/// Map-backed selection store keyed by session id.
#[derive(Default)]
pub struct InMemorySelectionStore {
    rows: RwLock<HashMap<SessionId, SessionSnapshot>>,
}

impl InMemorySelectionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently persisted.
    pub async fn session_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl SelectionStore for InMemorySelectionStore {
    async fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>> {
        Ok(self.rows.read().await.get(session).cloned())
    }

    async fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<()> {
        self.rows.write().await.insert(*session, snapshot.clone());
        Ok(())
    }

    async fn delete(&self, session: &SessionId) -> Result<()> {
        self.rows.write().await.remove(session);
        Ok(())
    }
}

/// Vector-backed catalog with token-overlap candidate enumeration.
#[derive(Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<CatalogRecord>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog pre-seeded with records.
    #[must_use]
    pub fn with_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Inserts or replaces a record by name.
    pub async fn upsert(&self, record: CatalogRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|existing| existing.name == record.name) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|record| record.name.trim().eq_ignore_ascii_case(name.trim()))
            .cloned())
    }

    async fn enumerate_candidates(&self, tokens: &[String]) -> Result<Vec<CatalogRecord>> {
        let records = self.records.read().await;
        let candidates: Vec<CatalogRecord> = records
            .iter()
            .filter(|record| {
                let name_tokens = tokenize(&normalize_name(&record.name));
                tokens.iter().any(|token| name_tokens.contains(token))
            })
            .cloned()
            .collect();
        debug!(tokens = ?tokens, candidates = candidates.len(), "enumerated catalog candidates");
        Ok(candidates)
    }
}

#[async_trait]
impl CatalogWriter for InMemoryCatalog {
    async fn update_lineage(&self, name: &str, lineage: Option<Lineage>) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.name == name)
            .ok_or_else(|| anyhow::anyhow!("no catalog record named '{name}'"))?;
        record.lineage = lineage;
        Ok(())
    }

    async fn update_doh(&self, name: &str, doh: DohStatus) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|record| record.name == name)
            .ok_or_else(|| anyhow::anyhow!("no catalog record named '{name}'"))?;
        record.doh = doh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::SelectionState;

    #[tokio::test]
    async fn selection_store_round_trips_snapshots() {
        let store = InMemorySelectionStore::new();
        let session = SessionId::new();
        assert!(store.load(&session).await.unwrap().is_none());

        let mut snapshot = SessionSnapshot::empty(5);
        snapshot.selection = SelectionState::from_ids(["A", "B"]);
        store.save(&session, &snapshot).await.unwrap();

        let loaded = store.load(&session).await.unwrap().unwrap();
        assert_eq!(loaded.selection.ids(), ["A", "B"]);

        store.delete(&session).await.unwrap();
        assert!(store.load(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn candidate_enumeration_matches_shared_tokens() {
        let catalog = InMemoryCatalog::with_records(vec![
            CatalogRecord::named("Blue Dream by Pagoda - 1g"),
            CatalogRecord::named("Green Crack - 1g"),
        ]);

        let tokens = vec!["blue".to_string(), "dream".to_string()];
        let candidates = catalog.enumerate_candidates(&tokens).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Blue Dream by Pagoda - 1g");
    }

    #[tokio::test]
    async fn find_by_name_is_case_insensitive() {
        let catalog = InMemoryCatalog::with_records(vec![CatalogRecord::named("Blue Dream")]);
        let found = catalog.find_by_name("blue dream").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn writer_updates_lineage_and_doh() {
        let catalog = InMemoryCatalog::with_records(vec![CatalogRecord::named("Blue Dream")]);
        catalog
            .update_lineage("Blue Dream", Some(Lineage::Hybrid))
            .await
            .unwrap();
        catalog.update_doh("Blue Dream", DohStatus::Doh).await.unwrap();

        let record = catalog.find_by_name("Blue Dream").await.unwrap().unwrap();
        assert_eq!(record.lineage, Some(Lineage::Hybrid));
        assert_eq!(record.doh, DohStatus::Doh);

        assert!(catalog.update_doh("Missing", DohStatus::Thc).await.is_err());
    }
}
