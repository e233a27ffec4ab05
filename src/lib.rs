//! Tag Reconciler - Product Reconciliation & Selection-State Engine
//!
//! This crate matches loosely-structured incoming product records against a
//! canonical product catalog, merges fields from both sources under
//! deterministic priority rules, and manages an interactive, filter-aware,
//! undo-capable selection of the resulting tags for downstream label
//! rendering.

// Module declarations
pub mod domain;
pub mod application;
pub mod infrastructure;

// Re-export the primary entry points for easier access
pub use application::use_cases::TagUseCases;
pub use domain::catalog::{CatalogRecord, DohStatus, Lineage};
pub use domain::incoming::IncomingRecord;
pub use domain::merged_tag::{MergedTag, TagSource};
pub use domain::value_objects::SessionId;
