//! Batch reconciliation pipeline
//!
//! Normalizes raw incoming JSON records, pulls fuzzy candidates from the
//! catalog source, scores the batch in parallel and merges each record
//! into a tag. Failures are absorbed per record — a bad record or an
//! unreachable candidate query degrades that one record to the synthetic
//! path instead of interrupting the batch.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::incoming::IncomingRecord;
use crate::domain::merged_tag::MergedTag;
use crate::domain::repositories::CatalogSource;
use crate::domain::services::field_merger::merge;
use crate::domain::services::matcher::{MatcherWeights, match_batch, normalize_name, tokenize};

/// Turns ingestion batches into the per-session available tag pool.
pub struct ReconciliationService {
    catalog: Arc<dyn CatalogSource>,
    weights: MatcherWeights,
}

impl ReconciliationService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogSource>, weights: MatcherWeights) -> Self {
        Self { catalog, weights }
    }

    /// Reconciles one batch of raw records into merged tags, in input
    /// order, deduplicated by canonical tag name (first occurrence wins).
    pub async fn reconcile_batch(&self, raw_records: &[serde_json::Value]) -> Result<Vec<MergedTag>> {
        let records: Vec<IncomingRecord> = raw_records
            .iter()
            .map(IncomingRecord::from_value)
            .filter(|record| {
                if record.is_empty() {
                    warn!("skipping incoming record with no identifiable fields");
                    false
                } else {
                    true
                }
            })
            .collect();

        // Candidate enumeration is I/O against the catalog; fetch per
        // record concurrently, then hand the CPU-bound scoring to rayon.
        let lookups = records.iter().map(|record| self.candidates_for(record));
        let candidate_sets = join_all(lookups).await;

        let batch: Vec<(IncomingRecord, Vec<_>)> =
            records.into_iter().zip(candidate_sets).collect();
        let matched = match_batch(&batch, &self.weights);

        let mut seen = HashSet::new();
        let mut tags = Vec::with_capacity(matched.len());
        for (candidate, (incoming, _)) in matched.iter().zip(&batch) {
            let tag = merge(candidate, incoming);
            if tag.name.is_empty() {
                warn!("merged tag has no name, dropping");
                continue;
            }
            if !seen.insert(tag.name.clone()) {
                warn!(tag = %tag.name, "duplicate tag name in batch, keeping first occurrence");
                continue;
            }
            tags.push(tag);
        }

        info!(
            incoming = raw_records.len(),
            merged = tags.len(),
            "reconciled ingestion batch"
        );
        Ok(tags)
    }

    /// Reconciles a single record; the batch path with one element.
    pub async fn reconcile_one(&self, raw: &serde_json::Value) -> Result<Option<MergedTag>> {
        let mut tags = self.reconcile_batch(std::slice::from_ref(raw)).await?;
        Ok(tags.drain(..).next())
    }

    /// Enumerates candidates for one record, absorbing catalog failures
    /// into an empty set (which degrades the record to the synthetic path).
    async fn candidates_for(&self, record: &IncomingRecord) -> Vec<crate::domain::catalog::CatalogRecord> {
        let reference = if record.name.trim().is_empty() {
            &record.strain
        } else {
            &record.name
        };
        let tokens = tokenize(&normalize_name(reference));
        if tokens.is_empty() {
            return Vec::new();
        }
        match self.catalog.enumerate_candidates(&tokens).await {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(record = %reference, error = %error, "candidate enumeration failed, record degrades to synthetic");
                Vec::new()
            }
        }
    }
}
