//! Property tests for the engine's core laws
//!
//! Determinism of the matcher, totality and priority of the merge, the
//! selection round-trip, the undo stack law and the filter round-trip.

use proptest::prelude::*;

use tag_reconciler::application::filter_engine::{FilterState, compute_visible};
use tag_reconciler::domain::catalog::CatalogRecord;
use tag_reconciler::domain::merged_tag::MergedTag;
use tag_reconciler::domain::selection::SelectionState;
use tag_reconciler::domain::services::field_merger::merge;
use tag_reconciler::domain::services::matcher::{MatcherWeights, match_record};
use tag_reconciler::domain::undo::{UndoOutcome, UndoSnapshot, UndoStack};
use tag_reconciler::IncomingRecord;

fn name_strategy() -> impl Strategy<Value = String> {
    // Product-ish names: words, digits, some punctuation the normalizer
    // must cope with.
    proptest::string::string_regex("[A-Za-z0-9#.'& -]{0,40}").expect("regex strategy")
}

fn field_strategy() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9. ]{0,20}").expect("regex strategy")
}

proptest! {
    /// Identical inputs always produce the identical candidate and score.
    #[test]
    fn matcher_is_deterministic(
        incoming_name in name_strategy(),
        catalog_names in proptest::collection::vec(name_strategy(), 0..8),
    ) {
        let incoming = IncomingRecord::named(incoming_name);
        let candidates: Vec<CatalogRecord> = catalog_names
            .iter()
            .map(|name| CatalogRecord::named(name.clone()))
            .collect();
        let weights = MatcherWeights::default();

        let first = match_record(&incoming, &candidates, &weights);
        let second = match_record(&incoming, &candidates, &weights);
        prop_assert_eq!(&first.record.name, &second.record.name);
        prop_assert_eq!(first.synthetic, second.synthetic);
        prop_assert!((first.score - second.score).abs() < f64::EPSILON);
    }

    /// The winner does not depend on candidate order.
    #[test]
    fn matcher_ignores_candidate_order(
        incoming_name in name_strategy(),
        catalog_names in proptest::collection::vec(name_strategy(), 0..8),
    ) {
        let incoming = IncomingRecord::named(incoming_name);
        let forward: Vec<CatalogRecord> = catalog_names
            .iter()
            .map(|name| CatalogRecord::named(name.clone()))
            .collect();
        let mut reversed = forward.clone();
        reversed.reverse();
        let weights = MatcherWeights::default();

        let a = match_record(&incoming, &forward, &weights);
        let b = match_record(&incoming, &reversed, &weights);
        prop_assert_eq!(a.record.name.to_lowercase(), b.record.name.to_lowercase());
        prop_assert!((a.score - b.score).abs() < f64::EPSILON);
    }

    /// Merge priority: a non-empty incoming value always wins; an empty one
    /// falls back to the catalog; the result is never missing.
    #[test]
    fn merge_respects_priority_and_totality(
        incoming_price in field_strategy(),
        incoming_weight in field_strategy(),
        catalog_vendor in field_strategy(),
        incoming_vendor in field_strategy(),
    ) {
        let incoming = IncomingRecord {
            name: "Product".to_string(),
            price: incoming_price.clone(),
            weight: incoming_weight.clone(),
            vendor: incoming_vendor.clone(),
            ..IncomingRecord::default()
        };
        let mut record = CatalogRecord::named("Product");
        record.vendor = catalog_vendor.clone();
        let candidate = match_record(&incoming, &[record], &MatcherWeights::default());
        let tag = merge(&candidate, &incoming);

        // Priority field: incoming wins when non-empty.
        if !incoming_price.trim().is_empty() {
            prop_assert_eq!(&tag.price, incoming_price.trim());
        } else {
            prop_assert_eq!(&tag.price, "");
        }
        if !incoming_weight.trim().is_empty() {
            prop_assert_eq!(&tag.weight, incoming_weight.trim());
        }

        // Fallback field: catalog wins, incoming fills gaps, never absent.
        if !catalog_vendor.trim().is_empty() {
            prop_assert_eq!(&tag.vendor, catalog_vendor.trim());
        } else if !incoming_vendor.trim().is_empty() {
            prop_assert_eq!(&tag.vendor, incoming_vendor.trim());
        } else {
            prop_assert_eq!(&tag.vendor, "");
        }
    }

    /// select then deselect returns the exact prior state.
    #[test]
    fn selection_select_deselect_round_trip(
        existing in proptest::collection::vec("[a-z]{1,8}", 0..10),
        new_id in "[A-Z]{1,8}",
    ) {
        let original = SelectionState::from_ids(existing.iter().map(String::as_str));
        prop_assume!(!original.contains(&new_id));

        let mut state = original.clone();
        state.select(new_id.clone());
        state.deselect(&new_id);
        prop_assert_eq!(state, original);
    }

    /// After N pushes, N pops restore in reverse order and the (N+1)th pop
    /// reports UndoUnavailable.
    #[test]
    fn undo_stack_law(count in 1usize..12) {
        let mut stack = UndoStack::with_capacity(32);
        let states: Vec<SelectionState> = (0..count)
            .map(|i| SelectionState::from_ids((0..=i).map(|j| format!("tag-{j}"))))
            .collect();
        for state in &states {
            stack.push(UndoSnapshot::capture(state, "step"));
        }

        for expected in states.iter().rev() {
            match stack.pop() {
                UndoOutcome::Restored(snapshot) => {
                    prop_assert_eq!(&snapshot.selection, expected);
                }
                UndoOutcome::UndoUnavailable => prop_assert!(false, "stack exhausted early"),
            }
        }
        prop_assert_eq!(stack.pop(), UndoOutcome::UndoUnavailable);
    }

    /// Filtering then clearing returns exactly the original pool.
    #[test]
    fn filter_round_trip(
        vendors in proptest::collection::vec("[a-z]{1,6}", 1..6),
        filter_vendor in proptest::option::of("[a-z]{1,6}"),
    ) {
        let pool: Vec<MergedTag> = vendors
            .iter()
            .enumerate()
            .map(|(index, vendor)| {
                let mut record = CatalogRecord::named(format!("tag-{index}"));
                record.vendor = vendor.clone();
                MergedTag::from_catalog(&record)
            })
            .collect();

        let filters = FilterState { vendor: filter_vendor, ..FilterState::default() };
        let narrowed = compute_visible(&pool, &filters);
        prop_assert!(narrowed.len() <= pool.len());

        let restored = compute_visible(&pool, &FilterState::clear());
        prop_assert_eq!(restored, pool);
    }
}
