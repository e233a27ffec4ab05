//! Merged tag entity
//!
//! The unit the rest of the engine operates on: a union of catalog fields
//! and incoming priority fields with per-field provenance resolved by the
//! field merger. Tags are identified by their canonical display name.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::domain::catalog::{CatalogRecord, DohStatus, Lineage};

/// Which sources contributed to a merged tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum TagSource {
    #[serde(rename = "Hybrid Match")]
    HybridMatch,
    #[serde(rename = "Catalog Only")]
    CatalogOnly,
    #[serde(rename = "Incoming Only (synthetic)")]
    IncomingSynthetic,
}

impl TagSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HybridMatch => "Hybrid Match",
            Self::CatalogOnly => "Catalog Only",
            Self::IncomingSynthetic => "Incoming Only (synthetic)",
        }
    }
}

impl std::fmt::Display for TagSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reconciled product tag held in the per-session available pool.
///
/// String fields use the empty string for "absent"; no field is ever
/// dropped by the merge, so downstream consumers can index every column
/// unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MergedTag {
    /// Canonical display name; doubles as the tag identifier.
    pub name: String,
    pub vendor: String,
    pub brand: String,
    pub product_type: String,
    pub lineage: Option<Lineage>,
    pub weight: String,
    pub units: String,
    pub doh: DohStatus,
    pub price: String,
    pub batch_number: String,
    pub sku: String,
    pub room: String,
    pub quantity: String,
    pub strain: String,
    pub thc_percentage: String,
    pub cbd_percentage: String,
    pub total_cannabinoids: String,
    /// Lab-derived tag list (terpenes), comma-joined.
    pub tags: String,
    pub description: String,
    pub source: TagSource,
    /// Matcher confidence for hybrid matches; 0.0 for the other sources.
    pub match_score: f64,
}

impl MergedTag {
    /// Builds a tag straight from a catalog record, with no incoming data.
    #[must_use]
    pub fn from_catalog(record: &CatalogRecord) -> Self {
        Self {
            name: record.name.clone(),
            vendor: record.vendor.clone(),
            brand: record.brand.clone(),
            product_type: record.product_type.clone(),
            lineage: record.lineage,
            weight: record.canonical_weight(),
            units: record.units.clone(),
            doh: record.doh,
            price: String::new(),
            batch_number: String::new(),
            sku: String::new(),
            room: String::new(),
            quantity: String::new(),
            strain: String::new(),
            thc_percentage: String::new(),
            cbd_percentage: String::new(),
            total_cannabinoids: String::new(),
            tags: String::new(),
            description: String::new(),
            source: TagSource::CatalogOnly,
            match_score: 0.0,
        }
    }

    /// True when the tag is flagged as high-CBD, either by DOH
    /// classification or lineage.
    #[must_use]
    pub fn is_high_cbd(&self) -> bool {
        self.doh == DohStatus::Cbd
            || matches!(self.lineage, Some(Lineage::Cbd | Lineage::CbdBlend))
    }
}
