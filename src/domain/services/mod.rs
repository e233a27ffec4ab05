//! Domain services - reconciliation algorithms
//!
//! Pure, deterministic services: the fuzzy matcher that ranks catalog
//! candidates against incoming records, and the field merger that combines
//! both sources into one tag under fixed priority rules.

pub mod field_merger;
pub mod matcher;

pub use field_merger::merge;
pub use matcher::{MatchCandidate, MatcherWeights, match_batch, match_record, normalize_name};
