//! Canonical catalog product entities
//!
//! The catalog is the durable, read-only side of the reconciliation: records
//! here are owned by the Catalog Source and only ever modified through the
//! lineage/DOH editor in the application layer.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lineage classification of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lineage {
    Sativa,
    Indica,
    Hybrid,
    HybridSativa,
    HybridIndica,
    Cbd,
    CbdBlend,
    Mixed,
    Para,
}

impl Lineage {
    /// Parses a lineage from loosely formatted input ("hybrid/sativa",
    /// "CBD Blend", "HYBRID_INDICA" all resolve to the same variant).
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let canonical: String = raw
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        match canonical.trim_matches('_') {
            "SATIVA" => Some(Self::Sativa),
            "INDICA" => Some(Self::Indica),
            "HYBRID" => Some(Self::Hybrid),
            "HYBRID_SATIVA" | "SATIVA_HYBRID" => Some(Self::HybridSativa),
            "HYBRID_INDICA" | "INDICA_HYBRID" => Some(Self::HybridIndica),
            "CBD" => Some(Self::Cbd),
            "CBD_BLEND" => Some(Self::CbdBlend),
            "MIXED" => Some(Self::Mixed),
            "PARA" | "PARAPHERNALIA" => Some(Self::Para),
            _ => None,
        }
    }

    /// Canonical wire representation, matching the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sativa => "SATIVA",
            Self::Indica => "INDICA",
            Self::Hybrid => "HYBRID",
            Self::HybridSativa => "HYBRID_SATIVA",
            Self::HybridIndica => "HYBRID_INDICA",
            Self::Cbd => "CBD",
            Self::CbdBlend => "CBD_BLEND",
            Self::Mixed => "MIXED",
            Self::Para => "PARA",
        }
    }
}

impl std::fmt::Display for Lineage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Washington DOH compliance classification of a catalog product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DohStatus {
    #[default]
    None,
    Doh,
    Thc,
    Cbd,
}

impl DohStatus {
    /// Parses a DOH status from loosely formatted input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NONE" | "" => Some(Self::None),
            "DOH" | "GENERAL" | "GENERAL_USE" => Some(Self::Doh),
            "THC" | "HIGH_THC" => Some(Self::Thc),
            "CBD" | "HIGH_CBD" => Some(Self::Cbd),
            _ => None,
        }
    }

    /// Canonical wire representation, matching the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Doh => "DOH",
            Self::Thc => "THC",
            Self::Cbd => "CBD",
        }
    }
}

impl std::fmt::Display for DohStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical product entry as held by the catalog source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogRecord {
    pub name: String,
    pub vendor: String,
    pub brand: String,
    pub product_type: String,
    pub lineage: Option<Lineage>,
    pub weight: Option<f64>,
    pub units: String,
    pub doh: DohStatus,
}

impl CatalogRecord {
    /// Creates a record with only a name; remaining fields start empty.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vendor: String::new(),
            brand: String::new(),
            product_type: String::new(),
            lineage: None,
            weight: None,
            units: String::new(),
            doh: DohStatus::None,
        }
    }

    /// Canonical display form of the weight, with trailing zeros trimmed so
    /// "1.0" and "1" compare equal across sources.
    #[must_use]
    pub fn canonical_weight(&self) -> String {
        self.weight.map(format_weight).unwrap_or_default()
    }
}

/// Formats a numeric weight in canonical form (no trailing zeros).
#[must_use]
pub fn format_weight(weight: f64) -> String {
    let formatted = format!("{weight:.3}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Normalizes an arbitrary weight string to canonical form for comparison.
/// Non-numeric input is lowercased and trimmed instead.
#[must_use]
pub fn canonicalize_weight(raw: &str) -> String {
    let trimmed = raw.trim();
    let numeric: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match numeric.parse::<f64>() {
        Ok(value) => {
            let suffix: String = trimmed[numeric.len()..]
                .trim()
                .to_ascii_lowercase();
            if suffix.is_empty() {
                format_weight(value)
            } else {
                format!("{}{}", format_weight(value), suffix)
            }
        }
        Err(_) => trimmed.to_ascii_lowercase(),
    }
}
