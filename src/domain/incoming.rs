//! Incoming record normalization
//!
//! Raw incoming product data arrives as loosely structured JSON with many
//! alternate key spellings for the same concept ("weight", "unit_weight",
//! "unitWeight", ...). All aliases are resolved once here, at the ingestion
//! boundary, through an explicit synonym table; every consumer downstream
//! sees exactly one canonical schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Alias spellings accepted for each canonical field, first match wins.
const FIELD_SYNONYMS: &[(&str, &[&str])] = &[
    ("name", &["name", "title", "product_name", "productName", "item_name"]),
    ("price", &["price", "unit_price", "unitPrice", "price_each", "retail_price"]),
    ("weight", &["weight", "unit_weight", "unitWeight", "net_weight", "size"]),
    ("strain", &["strain", "strain_name", "strainName"]),
    ("sku", &["sku", "internal_id", "internalId", "inventory_id", "item_number"]),
    ("batch_number", &["batch_number", "batchNumber", "batch", "lot_number"]),
    ("room", &["room", "room_name", "location"]),
    ("quantity", &["quantity", "qty", "quantity_on_hand", "quantityOnHand"]),
    ("thc_percentage", &["thc_percentage", "thcPercentage", "thc_percent", "thc"]),
    ("cbd_percentage", &["cbd_percentage", "cbdPercentage", "cbd_percent", "cbd"]),
    ("total_cannabinoids", &["total_cannabinoids", "totalCannabinoids", "total_cannabinoid_percentage"]),
    ("vendor", &["vendor", "vendor_name", "vendorName", "supplier", "distributor"]),
    ("brand", &["brand", "brand_name", "brandName", "producer"]),
    ("product_type", &["product_type", "productType", "category", "type"]),
    ("description", &["description", "desc", "notes"]),
];

/// Keys under which nested lab result data may arrive.
const LAB_RESULT_KEYS: &[&str] = &["lab_result_data", "labResultData", "lab_results", "lab_data"];

/// Canonical normalized form of one raw incoming product record.
///
/// String fields use the empty string for "absent" — the merge rules treat
/// empty and missing identically, so the distinction is dropped here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomingRecord {
    pub name: String,
    pub price: String,
    pub weight: String,
    pub strain: String,
    pub sku: String,
    pub batch_number: String,
    pub room: String,
    pub quantity: String,
    pub thc_percentage: String,
    pub cbd_percentage: String,
    pub total_cannabinoids: String,
    pub vendor: String,
    pub brand: String,
    pub product_type: String,
    pub description: String,
    pub terpenes: Vec<String>,
}

impl IncomingRecord {
    /// Creates a record with only a name; remaining fields start empty.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Normalizes one raw JSON object into the canonical schema.
    ///
    /// Unknown keys are ignored; scalar values are coerced to trimmed
    /// strings; nested lab result data fills the test-result fields only
    /// where a top-level value did not already claim them.
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        let mut record = Self::default();
        let Some(object) = raw.as_object() else {
            return record;
        };

        for (canonical, aliases) in FIELD_SYNONYMS {
            let Some(value) = aliases.iter().find_map(|alias| object.get(*alias)) else {
                continue;
            };
            let text = scalar_to_string(value);
            match *canonical {
                "name" => record.name = text,
                "price" => record.price = text,
                "weight" => record.weight = text,
                "strain" => record.strain = text,
                "sku" => record.sku = text,
                "batch_number" => record.batch_number = text,
                "room" => record.room = text,
                "quantity" => record.quantity = text,
                "thc_percentage" => record.thc_percentage = text,
                "cbd_percentage" => record.cbd_percentage = text,
                "total_cannabinoids" => record.total_cannabinoids = text,
                "vendor" => record.vendor = text,
                "brand" => record.brand = text,
                "product_type" => record.product_type = text,
                "description" => record.description = text,
                _ => {}
            }
        }

        if let Some(lab) = LAB_RESULT_KEYS
            .iter()
            .find_map(|key| object.get(*key))
            .and_then(Value::as_object)
        {
            if record.thc_percentage.is_empty() {
                if let Some(thc) = lab.get("thc") {
                    record.thc_percentage = scalar_to_string(thc);
                }
            }
            if record.cbd_percentage.is_empty() {
                if let Some(cbd) = lab.get("cbd") {
                    record.cbd_percentage = scalar_to_string(cbd);
                }
            }
            if record.total_cannabinoids.is_empty() {
                if let Some(total) = lab.get("total_cannabinoids").or_else(|| lab.get("totalCannabinoids")) {
                    record.total_cannabinoids = scalar_to_string(total);
                }
            }
            if let Some(terpenes) = lab.get("terpenes").and_then(Value::as_array) {
                record.terpenes = terpenes.iter().filter_map(terpene_name).collect();
            }
        }

        record
    }

    /// Returns true if the record carries nothing identifiable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.strain.trim().is_empty() && self.sku.trim().is_empty()
    }

    /// The terpene list flattened for the merged tag field.
    #[must_use]
    pub fn terpene_tags(&self) -> String {
        self.terpenes.join(", ")
    }
}

/// Coerces a scalar JSON value to a trimmed string; arrays/objects/null
/// collapse to empty rather than leaking their JSON syntax into fields.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Terpene entries arrive either as bare strings or `{"name": ...}` objects.
fn terpene_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_alias_spellings() {
        let raw = json!({
            "title": "Blue Dream",
            "unit_price": "35.00",
            "unitWeight": 1.0,
            "lot_number": "BD1",
            "qty": 12
        });
        let record = IncomingRecord::from_value(&raw);
        assert_eq!(record.name, "Blue Dream");
        assert_eq!(record.price, "35.00");
        assert_eq!(record.weight, "1.0");
        assert_eq!(record.batch_number, "BD1");
        assert_eq!(record.quantity, "12");
    }

    #[test]
    fn first_alias_wins_over_later_spellings() {
        let raw = json!({"name": "Canonical", "title": "Ignored"});
        let record = IncomingRecord::from_value(&raw);
        assert_eq!(record.name, "Canonical");
    }

    #[test]
    fn lab_results_fill_unclaimed_test_fields() {
        let raw = json!({
            "name": "Sour Tsunami",
            "lab_result_data": {
                "thc": 8.2,
                "cbd": "11.5",
                "total_cannabinoids": 21.3,
                "terpenes": ["Myrcene", {"name": "Limonene"}, {"value": 1.2}]
            }
        });
        let record = IncomingRecord::from_value(&raw);
        assert_eq!(record.thc_percentage, "8.2");
        assert_eq!(record.cbd_percentage, "11.5");
        assert_eq!(record.total_cannabinoids, "21.3");
        assert_eq!(record.terpenes, vec!["Myrcene", "Limonene"]);
        assert_eq!(record.terpene_tags(), "Myrcene, Limonene");
    }

    #[test]
    fn top_level_thc_beats_lab_result_thc() {
        let raw = json!({
            "name": "X",
            "thc_percentage": "22.0",
            "lab_result_data": {"thc": 8.2}
        });
        let record = IncomingRecord::from_value(&raw);
        assert_eq!(record.thc_percentage, "22.0");
    }

    #[test]
    fn non_object_input_yields_empty_record() {
        let record = IncomingRecord::from_value(&json!("just a string"));
        assert!(record.is_empty());
    }

    #[test]
    fn containers_do_not_leak_json_syntax() {
        let raw = json!({"name": "X", "price": {"amount": 35}, "room": null});
        let record = IncomingRecord::from_value(&raw);
        assert_eq!(record.price, "");
        assert_eq!(record.room, "");
    }
}
