//! Decoding of raw metafield records into typed values.
//!
//! Decoding never fails: anything that does not parse as its declared type is
//! kept as the raw string.

use std::collections::HashMap;
use std::str::FromStr;

use crate::domain::entities::metafield::{MetafieldRecord, MetafieldType, MetafieldValue};

/// Decoded fields, addressable flat by key or grouped by namespace.
///
/// When two namespaces carry the same key, the flat view keeps the last one seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMetafields {
    fields: HashMap<String, MetafieldValue>,
    namespaces: HashMap<String, HashMap<String, MetafieldValue>>,
}

impl DecodedMetafields {
    pub fn get(&self, key: &str) -> Option<&MetafieldValue> {
        self.fields.get(key)
    }

    pub fn namespace(&self, namespace: &str) -> Option<&HashMap<String, MetafieldValue>> {
        self.namespaces.get(namespace)
    }

    pub fn get_in(&self, namespace: &str, key: &str) -> Option<&MetafieldValue> {
        self.namespaces.get(namespace)?.get(key)
    }

    /// Integer view of `key`, `None` when absent or not numeric.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(MetafieldValue::as_i64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decode one value according to its declared type name.
pub fn decode_value(value_type: &str, value: &str) -> MetafieldValue {
    let declared = MetafieldType::from_str(value_type).ok();

    if declared == Some(MetafieldType::Json) || value.starts_with('{') || value.starts_with('[') {
        return serde_json::from_str(value)
            .map(MetafieldValue::Json)
            .unwrap_or_else(|_| MetafieldValue::Text(value.to_string()));
    }

    match declared {
        Some(MetafieldType::Boolean) => MetafieldValue::Bool(value == "true"),
        Some(MetafieldType::NumberInteger | MetafieldType::NumberDecimal) => value
            .trim()
            .parse::<f64>()
            .map(MetafieldValue::Number)
            .unwrap_or_else(|_| MetafieldValue::Text(value.to_string())),
        _ => MetafieldValue::Text(value.to_string()),
    }
}

pub fn decode_record(record: &MetafieldRecord) -> MetafieldValue {
    decode_value(&record.value_type, &record.value)
}

/// Decode a list of records into a flat map plus namespace sub-maps.
pub fn decode(records: &[MetafieldRecord]) -> DecodedMetafields {
    let mut decoded = DecodedMetafields::default();

    for record in records {
        if record.key.is_empty() {
            continue;
        }
        let value = decode_record(record);

        if let Some(namespace) = record.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            decoded
                .namespaces
                .entry(namespace.to_string())
                .or_default()
                .insert(record.key.clone(), value.clone());
        }
        decoded.fields.insert(record.key.clone(), value);
    }

    decoded
}
