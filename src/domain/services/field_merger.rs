//! Field-priority merge of catalog and incoming records
//!
//! Incoming wins the transactional fields (price, weight, test results,
//! batch/SKU/room/quantity, description, lab tags); the catalog wins the
//! structural identity fields (display name, vendor, brand, product type,
//! lineage, units, DOH). For every field: priority source if non-empty,
//! else fallback source, else empty string. The merge is total and pure —
//! it never fails and never drops a field.

use crate::domain::incoming::IncomingRecord;
use crate::domain::merged_tag::{MergedTag, TagSource};
use crate::domain::services::matcher::MatchCandidate;

/// Combines a matched (or synthetic) catalog candidate with the incoming
/// record it was matched against.
#[must_use]
pub fn merge(candidate: &MatchCandidate, incoming: &IncomingRecord) -> MergedTag {
    let catalog = &candidate.record;
    let source = if candidate.synthetic {
        TagSource::IncomingSynthetic
    } else {
        TagSource::HybridMatch
    };

    MergedTag {
        // Structural identity: catalog first, incoming as fallback.
        name: fallback(&catalog.name, &incoming.name),
        vendor: fallback(&catalog.vendor, &incoming.vendor),
        brand: fallback(&catalog.brand, &incoming.brand),
        product_type: fallback(&catalog.product_type, &incoming.product_type),
        lineage: catalog.lineage,
        units: catalog.units.trim().to_string(),
        doh: catalog.doh,

        // Transactional data: incoming first, catalog as fallback.
        weight: priority(&incoming.weight, &catalog.canonical_weight()),
        price: priority(&incoming.price, ""),
        batch_number: priority(&incoming.batch_number, ""),
        sku: priority(&incoming.sku, ""),
        room: priority(&incoming.room, ""),
        quantity: priority(&incoming.quantity, ""),
        strain: priority(&incoming.strain, ""),
        thc_percentage: priority(&incoming.thc_percentage, ""),
        cbd_percentage: priority(&incoming.cbd_percentage, ""),
        total_cannabinoids: priority(&incoming.total_cannabinoids, ""),
        tags: incoming.terpene_tags(),
        description: priority(&incoming.description, ""),

        source,
        match_score: candidate.score,
    }
}

/// Priority rule: the first non-empty value wins, else empty string.
fn priority(preferred: &str, fallback: &str) -> String {
    let preferred = preferred.trim();
    if preferred.is_empty() {
        fallback.trim().to_string()
    } else {
        preferred.to_string()
    }
}

/// Fallback fields read the same rule with the catalog side preferred.
fn fallback(catalog: &str, incoming: &str) -> String {
    priority(catalog, incoming)
}
