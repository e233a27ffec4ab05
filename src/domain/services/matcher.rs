//! Fuzzy product matcher
//!
//! Ranks catalog candidates against an incoming record by normalized token
//! overlap with substring/prefix and vendor/brand/weight agreement bonuses.
//! Ties resolve by lexicographic catalog-name order, so identical inputs
//! always produce identical output. Records that clear no candidate fall
//! back to a synthetic catalog record built from the incoming fields —
//! nothing is ever dropped from a batch.

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::catalog::{CatalogRecord, Lineage, canonicalize_weight};
use crate::domain::incoming::IncomingRecord;

/// Two scores within this distance are considered tied.
const SCORE_EPSILON: f64 = 1e-9;

static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical regex"));
static TRAILING_BY_VENDOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+by\s+[a-z0-9 .&'-]+$").expect("by-vendor regex"));
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alphanumeric regex"));

/// Tunable scoring weights. The defaults were calibrated against observed
/// catalog/incoming pairs; they are parameters, not invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherWeights {
    /// Multiplier on the token-overlap ratio.
    pub token_overlap: f64,
    /// Fixed bonus when the catalog name contains the incoming name.
    pub substring_bonus: f64,
    /// Additional bonus when the catalog name starts with the incoming name.
    pub prefix_bonus: f64,
    /// Bonus when both sides name the same vendor.
    pub vendor_bonus: f64,
    /// Bonus when both sides name the same brand.
    pub brand_bonus: f64,
    /// Bonus when both sides carry the same canonical weight.
    pub weight_bonus: f64,
    /// Minimum accepted score; below this a synthetic record is emitted.
    pub accept_threshold: f64,
}

impl Default for MatcherWeights {
    fn default() -> Self {
        Self {
            token_overlap: 1.0,
            substring_bonus: 0.3,
            prefix_bonus: 0.15,
            vendor_bonus: 0.1,
            brand_bonus: 0.1,
            weight_bonus: 0.05,
            accept_threshold: 0.45,
        }
    }
}

/// One ranked catalog candidate for an incoming record.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub record: CatalogRecord,
    /// Clamped to [0, 1].
    pub score: f64,
    /// Normalized catalog name used for deterministic tie-breaking.
    pub tie_break_key: String,
    /// True when no catalog candidate cleared the acceptance threshold and
    /// the record was synthesized from the incoming fields.
    pub synthetic: bool,
}

/// Normalizes a product name for comparison: lowercase, parentheticals and
/// trailing "by <vendor>" clauses stripped, punctuation collapsed to
/// single spaces.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let without_parens = PARENTHETICAL.replace_all(&lowered, " ");
    let without_vendor = TRAILING_BY_VENDOR.replace(without_parens.trim(), "");
    NON_ALPHANUMERIC
        .replace_all(&without_vendor, " ")
        .trim()
        .to_string()
}

/// Splits a normalized name into its tokens.
#[must_use]
pub fn tokenize(normalized: &str) -> Vec<String> {
    normalized
        .split_whitespace()
        .map(ToString::to_string)
        .collect()
}

/// Scores one catalog candidate against a normalized incoming record.
#[must_use]
pub fn score_candidate(
    incoming: &IncomingRecord,
    incoming_norm: &str,
    incoming_tokens: &[String],
    candidate: &CatalogRecord,
    weights: &MatcherWeights,
) -> f64 {
    let candidate_norm = normalize_name(&candidate.name);
    let candidate_tokens = tokenize(&candidate_norm);

    let mut score = 0.0;

    let shorter = incoming_tokens.len().min(candidate_tokens.len());
    if shorter > 0 {
        let overlap = incoming_tokens
            .iter()
            .filter(|token| candidate_tokens.contains(token))
            .count();
        score += weights.token_overlap * (overlap as f64 / shorter as f64);
    }

    if !incoming_norm.is_empty() && candidate_norm.contains(incoming_norm) {
        score += weights.substring_bonus;
        if candidate_norm.starts_with(incoming_norm) {
            score += weights.prefix_bonus;
        }
    }

    if field_agrees(&incoming.vendor, &candidate.vendor) {
        score += weights.vendor_bonus;
    }
    if field_agrees(&incoming.brand, &candidate.brand) {
        score += weights.brand_bonus;
    }
    if weight_agrees(&incoming.weight, candidate) {
        score += weights.weight_bonus;
    }

    score.clamp(0.0, 1.0)
}

/// Ranks all candidates for one incoming record and returns the winner, or
/// a synthetic record when nothing clears the acceptance threshold.
#[must_use]
pub fn match_record(
    incoming: &IncomingRecord,
    candidates: &[CatalogRecord],
    weights: &MatcherWeights,
) -> MatchCandidate {
    let reference = if incoming.name.trim().is_empty() {
        &incoming.strain
    } else {
        &incoming.name
    };
    let incoming_norm = normalize_name(reference);
    let incoming_tokens = tokenize(&incoming_norm);

    let mut best: Option<(f64, String, &CatalogRecord)> = None;
    let mut tied_with_best = 0usize;

    for candidate in candidates {
        let score = score_candidate(incoming, &incoming_norm, &incoming_tokens, candidate, weights);
        let key = candidate.name.to_lowercase();

        match &best {
            None => best = Some((score, key, candidate)),
            Some((best_score, best_key, _)) => {
                if score > best_score + SCORE_EPSILON {
                    best = Some((score, key, candidate));
                    tied_with_best = 0;
                } else if (score - best_score).abs() <= SCORE_EPSILON {
                    tied_with_best += 1;
                    // Equal scores resolve by lexicographic catalog name.
                    if key < *best_key {
                        best = Some((score, key, candidate));
                    }
                }
            }
        }
    }

    if let Some((score, key, record)) = best {
        if score >= weights.accept_threshold {
            if tied_with_best > 0 {
                warn!(
                    incoming = %reference,
                    winner = %record.name,
                    ties = tied_with_best,
                    "ambiguous match resolved by lexicographic tie-break"
                );
            }
            debug!(incoming = %reference, winner = %record.name, score, "matched catalog record");
            return MatchCandidate {
                record: record.clone(),
                score,
                tie_break_key: key,
                synthetic: false,
            };
        }
    }

    info!(incoming = %reference, "no catalog match above threshold, synthesizing record");
    let record = synthetic_record(incoming);
    MatchCandidate {
        tie_break_key: record.name.to_lowercase(),
        record,
        score: 0.0,
        synthetic: true,
    }
}

/// Scores a batch of incoming records in parallel. Each record is paired
/// with its own candidate set; scoring shares no mutable state, so the
/// fan-out is embarrassingly parallel and order-preserving.
#[must_use]
pub fn match_batch(
    batch: &[(IncomingRecord, Vec<CatalogRecord>)],
    weights: &MatcherWeights,
) -> Vec<MatchCandidate> {
    batch
        .par_iter()
        .map(|(incoming, candidates)| match_record(incoming, candidates, weights))
        .collect()
}

/// Builds the forward-progress fallback: a catalog record populated only
/// from the incoming record's own fields.
#[must_use]
pub fn synthetic_record(incoming: &IncomingRecord) -> CatalogRecord {
    let name = if incoming.name.trim().is_empty() {
        incoming.strain.trim()
    } else {
        incoming.name.trim()
    };
    let (weight, units) = split_weight(&incoming.weight);
    CatalogRecord {
        name: name.to_string(),
        vendor: incoming.vendor.trim().to_string(),
        brand: incoming.brand.trim().to_string(),
        product_type: incoming.product_type.trim().to_string(),
        lineage: Lineage::parse(&incoming.strain),
        weight,
        units,
        doh: Default::default(),
    }
}

fn field_agrees(incoming: &str, catalog: &str) -> bool {
    let a = incoming.trim();
    let b = catalog.trim();
    !a.is_empty() && !b.is_empty() && a.eq_ignore_ascii_case(b)
}

fn weight_agrees(incoming_weight: &str, candidate: &CatalogRecord) -> bool {
    let catalog_weight = candidate.canonical_weight();
    if incoming_weight.trim().is_empty() || catalog_weight.is_empty() {
        return false;
    }
    canonicalize_weight(incoming_weight) == catalog_weight
}

/// Splits a raw weight string into its numeric value and unit suffix.
fn split_weight(raw: &str) -> (Option<f64>, String) {
    let trimmed = raw.trim();
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match numeric.parse::<f64>() {
        Ok(value) => (Some(value), trimmed[numeric.len()..].trim().to_string()),
        Err(_) => (None, String::new()),
    }
}
