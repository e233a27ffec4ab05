//! Data Transfer Objects for the reconciliation engine
//!
//! Contains DTOs for data exchange between the use cases and the UI/API
//! layer that drives them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::application::filter_engine::FacetOptions;
use crate::domain::merged_tag::MergedTag;
use crate::domain::selection::SelectionState;

// ============================================================================
// Selection DTOs
// ============================================================================

/// Which side of the picker tags are moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    ToSelected,
    ToAvailable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveTagsRequest {
    pub tags: Vec<String>,
    pub direction: MoveDirection,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SelectionStateResponse {
    /// Selected tag ids in insertion order.
    pub selected: Vec<String>,
    /// Ids from the request that were not present in the pool.
    pub unknown: Vec<String>,
    /// Snapshots currently available to undo.
    pub undo_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveSelectionStateRequest {
    pub action_type: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct UndoResponse {
    pub restored: bool,
    pub message: String,
    pub selected: Vec<String>,
}

impl UndoResponse {
    #[must_use]
    pub fn restored(action: &str, selection: &SelectionState) -> Self {
        Self {
            restored: true,
            message: format!("restored state before '{action}'"),
            selected: selection.ids().to_vec(),
        }
    }

    #[must_use]
    pub fn nothing_to_undo(current: &SelectionState) -> Self {
        Self {
            restored: false,
            message: "nothing to undo".to_string(),
            selected: current.ids().to_vec(),
        }
    }
}

// ============================================================================
// Metadata edit DTOs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLineageRequest {
    pub tag_name: String,
    /// Wire form of the lineage ("HYBRID_SATIVA", ...), or empty to clear.
    pub lineage: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDohRequest {
    pub product_name: String,
    pub doh_status: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct UpdateMetadataResponse {
    pub applied: bool,
    pub message: String,
}

// ============================================================================
// Filter DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct FilterOptionsResponse {
    pub options: FacetOptions,
    /// How many tags the active filters leave visible.
    pub visible_count: usize,
}

// ============================================================================
// Ingestion DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct IngestResponse {
    pub pool_size: usize,
    pub hybrid_matches: usize,
    pub catalog_only: usize,
    pub synthetic: usize,
}

impl IngestResponse {
    #[must_use]
    pub fn summarize(pool: &[MergedTag]) -> Self {
        use crate::domain::merged_tag::TagSource;
        let mut response = Self {
            pool_size: pool.len(),
            hybrid_matches: 0,
            catalog_only: 0,
            synthetic: 0,
        };
        for tag in pool {
            match tag.source {
                TagSource::HybridMatch => response.hybrid_matches += 1,
                TagSource::CatalogOnly => response.catalog_only += 1,
                TagSource::IncomingSynthetic => response.synthetic += 1,
            }
        }
        response
    }
}
