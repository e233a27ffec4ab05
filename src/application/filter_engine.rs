//! Filter-aware views over the tag pool
//!
//! Computes the visible subset of tags and the option sets of each filter
//! facet. A tag is visible iff it matches every active facet. Facet option
//! sets narrow with the filtered subset, with one deliberate exception:
//! while only the vendor facet is active, the remaining facets keep
//! offering options from the full pool so legitimate combinations are not
//! hidden before the user commits to a vendor-specific context.
//!
//! Recomputation is cached by a composite key over all active filter
//! values, and a monotonically increasing generation counter implements
//! latest-wins: results computed for a superseded filter input are
//! discarded rather than applied out of order.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use ts_rs::TS;

use crate::domain::catalog::canonicalize_weight;
use crate::domain::merged_tag::MergedTag;

/// Active filter values; `None` stands for the "All" position of a facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FilterState {
    pub vendor: Option<String>,
    pub brand: Option<String>,
    pub product_type: Option<String>,
    pub lineage: Option<String>,
    pub weight: Option<String>,
    pub doh: Option<String>,
    pub high_cbd: Option<bool>,
}

impl FilterState {
    /// All facets at their "All" position.
    #[must_use]
    pub fn clear() -> Self {
        Self::default()
    }

    /// True when no facet is active.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        *self == Self::default()
    }

    /// True when a facet other than vendor is active.
    #[must_use]
    pub fn non_vendor_facet_active(&self) -> bool {
        self.brand.is_some()
            || self.product_type.is_some()
            || self.lineage.is_some()
            || self.weight.is_some()
            || self.doh.is_some()
            || self.high_cbd.is_some()
    }

    /// True when the tag matches every active facet.
    #[must_use]
    pub fn matches(&self, tag: &MergedTag) -> bool {
        facet_matches(self.vendor.as_deref(), &tag.vendor)
            && facet_matches(self.brand.as_deref(), &tag.brand)
            && facet_matches(self.product_type.as_deref(), &tag.product_type)
            && self.lineage.as_deref().is_none_or(|wanted| {
                tag.lineage
                    .is_some_and(|lineage| lineage.as_str().eq_ignore_ascii_case(wanted.trim()))
            })
            && self.weight.as_deref().is_none_or(|wanted| {
                canonicalize_weight(&tag.weight) == canonicalize_weight(wanted)
            })
            && facet_matches(self.doh.as_deref(), tag.doh.as_str())
            && self.high_cbd.is_none_or(|wanted| tag.is_high_cbd() == wanted)
    }

    /// Composite cache key over all active facet values.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let composite = format!(
            "v={}|b={}|t={}|l={}|w={}|d={}|c={}",
            self.vendor.as_deref().unwrap_or("All"),
            self.brand.as_deref().unwrap_or("All"),
            self.product_type.as_deref().unwrap_or("All"),
            self.lineage.as_deref().unwrap_or("All"),
            self.weight.as_deref().unwrap_or("All"),
            self.doh.as_deref().unwrap_or("All"),
            self.high_cbd.map_or("All".to_string(), |v| v.to_string()),
        );
        blake3::hash(composite.as_bytes()).to_hex().to_string()
    }
}

fn facet_matches(wanted: Option<&str>, actual: &str) -> bool {
    wanted.is_none_or(|value| actual.trim().eq_ignore_ascii_case(value.trim()))
}

/// Distinct values offered for each facet, sorted for stable display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FacetOptions {
    pub vendors: Vec<String>,
    pub brands: Vec<String>,
    pub product_types: Vec<String>,
    pub lineages: Vec<String>,
    pub weights: Vec<String>,
    pub doh_statuses: Vec<String>,
}

impl FacetOptions {
    fn from_pool<'a, I>(tags: I) -> Self
    where
        I: IntoIterator<Item = &'a MergedTag> + Clone,
    {
        Self {
            vendors: distinct(tags.clone(), |tag| Some(tag.vendor.clone())),
            brands: distinct(tags.clone(), |tag| Some(tag.brand.clone())),
            product_types: distinct(tags.clone(), |tag| Some(tag.product_type.clone())),
            lineages: distinct(tags.clone(), |tag| {
                tag.lineage.map(|lineage| lineage.as_str().to_string())
            }),
            weights: distinct(tags.clone(), |tag| {
                let weight = canonicalize_weight(&tag.weight);
                (!weight.is_empty()).then_some(weight)
            }),
            doh_statuses: distinct(tags, |tag| Some(tag.doh.as_str().to_string())),
        }
    }
}

fn distinct<'a, I, F>(tags: I, extract: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a MergedTag>,
    F: Fn(&MergedTag) -> Option<String>,
{
    let set: BTreeSet<String> = tags
        .into_iter()
        .filter_map(|tag| extract(tag))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    set.into_iter().collect()
}

/// Computes the visible subset: every tag matching all active facets, in
/// pool order. Clearing all filters returns exactly the original pool.
#[must_use]
pub fn compute_visible(pool: &[MergedTag], filters: &FilterState) -> Vec<MergedTag> {
    pool.iter()
        .filter(|tag| filters.matches(tag))
        .cloned()
        .collect()
}

/// Facet computation with a per-session cache and latest-wins guard.
pub struct FilterEngine {
    cache: Mutex<HashMap<String, FacetOptions>>,
    generation: AtomicU64,
    recompute_token: Mutex<CancellationToken>,
}

impl FilterEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            recompute_token: Mutex::new(CancellationToken::new()),
        }
    }

    /// Starts a new recomputation, superseding any in-flight one. Returns
    /// the generation to compare before applying the result, plus a token
    /// that fires when a newer input arrives.
    pub fn begin_recompute(&self) -> (u64, CancellationToken) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let previous = {
            let mut slot = self.recompute_token.lock().expect("recompute token lock");
            std::mem::replace(&mut *slot, token.clone())
        };
        previous.cancel();
        (generation, token)
    }

    /// True while no newer recomputation has been started.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Computes (or returns the cached) facet option sets for the given
    /// filter state.
    pub fn facet_options(&self, pool: &[MergedTag], filters: &FilterState) -> FacetOptions {
        let key = filters.cache_key();
        if let Some(cached) = self.cache.lock().expect("facet cache lock").get(&key) {
            debug!(key = %key, "facet options served from cache");
            return cached.clone();
        }

        // Vendor-only narrowing keeps the other facets reading from the
        // full pool; any non-vendor facet narrows everything.
        let options = if filters.non_vendor_facet_active() {
            let visible = compute_visible(pool, filters);
            FacetOptions::from_pool(visible.iter())
        } else {
            FacetOptions::from_pool(pool.iter())
        };

        self.cache
            .lock()
            .expect("facet cache lock")
            .insert(key, options.clone());
        options
    }

    /// Drops every cached entry; called when the pool is replaced.
    pub fn invalidate(&self) {
        self.cache.lock().expect("facet cache lock").clear();
    }
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{CatalogRecord, DohStatus, Lineage};

    fn tag(name: &str, vendor: &str, brand: &str, lineage: Lineage, weight: f64) -> MergedTag {
        let mut record = CatalogRecord::named(name);
        record.vendor = vendor.to_string();
        record.brand = brand.to_string();
        record.lineage = Some(lineage);
        record.weight = Some(weight);
        record.product_type = "Flower".to_string();
        MergedTag::from_catalog(&record)
    }

    fn pool() -> Vec<MergedTag> {
        vec![
            tag("Blue Dream - 1g", "420 Farms", "Pagoda", Lineage::Hybrid, 1.0),
            tag("Green Crack - 1g", "420 Farms", "Sticky Budz", Lineage::Sativa, 1.0),
            tag("Remedy Tincture", "Evergreen", "Fairwinds", Lineage::Cbd, 3.5),
        ]
    }

    #[test]
    fn clear_filters_round_trip_to_original_pool() {
        let pool = pool();
        let narrowed = compute_visible(&pool, &FilterState {
            vendor: Some("420 Farms".to_string()),
            ..FilterState::default()
        });
        assert_eq!(narrowed.len(), 2);

        let restored = compute_visible(&pool, &FilterState::clear());
        assert_eq!(restored, pool);
    }

    #[test]
    fn visibility_requires_every_active_facet() {
        let pool = pool();
        let filters = FilterState {
            vendor: Some("420 Farms".to_string()),
            lineage: Some("SATIVA".to_string()),
            ..FilterState::default()
        };
        let visible = compute_visible(&pool, &filters);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Green Crack - 1g");
    }

    #[test]
    fn weight_facet_compares_canonical_values() {
        let pool = pool();
        let filters = FilterState {
            weight: Some("1.0".to_string()),
            ..FilterState::default()
        };
        assert_eq!(compute_visible(&pool, &filters).len(), 2);
    }

    #[test]
    fn high_cbd_facet_selects_cbd_lineages() {
        let pool = pool();
        let filters = FilterState {
            high_cbd: Some(true),
            ..FilterState::default()
        };
        let visible = compute_visible(&pool, &filters);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Remedy Tincture");
    }

    #[test]
    fn scenario_c_vendor_only_keeps_full_option_sets() {
        let engine = FilterEngine::new();
        let pool = pool();

        let vendor_only = FilterState {
            vendor: Some("420 Farms".to_string()),
            ..FilterState::default()
        };
        let options = engine.facet_options(&pool, &vendor_only);
        // Brands and lineages still reflect the full pool.
        assert_eq!(options.brands, ["Fairwinds", "Pagoda", "Sticky Budz"]);
        assert_eq!(options.lineages, ["CBD", "HYBRID", "SATIVA"]);

        let vendor_and_brand = FilterState {
            vendor: Some("420 Farms".to_string()),
            brand: Some("Pagoda".to_string()),
            ..FilterState::default()
        };
        let narrowed = engine.facet_options(&pool, &vendor_and_brand);
        assert_eq!(narrowed.brands, ["Pagoda"]);
        assert_eq!(narrowed.lineages, ["HYBRID"]);
        assert_eq!(narrowed.vendors, ["420 Farms"]);
    }

    #[test]
    fn facet_options_are_cached_per_filter_key() {
        let engine = FilterEngine::new();
        let pool = pool();
        let filters = FilterState {
            vendor: Some("420 Farms".to_string()),
            ..FilterState::default()
        };

        let first = engine.facet_options(&pool, &filters);
        // Same filters against a different pool slice hit the cache; the
        // pool is invalidated explicitly on ingestion.
        let second = engine.facet_options(&pool[..1], &filters);
        assert_eq!(first, second);

        engine.invalidate();
        let third = engine.facet_options(&pool[..1], &filters);
        assert_ne!(first, third);
    }

    #[test]
    fn newer_generation_supersedes_older() {
        let engine = FilterEngine::new();
        let (first_generation, first_token) = engine.begin_recompute();
        assert!(engine.is_current(first_generation));
        assert!(!first_token.is_cancelled());

        let (second_generation, second_token) = engine.begin_recompute();
        assert!(!engine.is_current(first_generation));
        assert!(first_token.is_cancelled());
        assert!(engine.is_current(second_generation));
        assert!(!second_token.is_cancelled());
    }

    #[test]
    fn cache_key_distinguishes_filter_states() {
        let a = FilterState {
            vendor: Some("420 Farms".to_string()),
            ..FilterState::default()
        };
        let b = FilterState {
            brand: Some("420 Farms".to_string()),
            ..FilterState::default()
        };
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), a.cache_key());
    }
}
