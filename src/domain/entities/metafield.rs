use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Default namespace for every field the app stores on its installation.
pub const DEFAULT_NAMESPACE: &str = "tree_planting";

pub const TOTAL_USAGE_KEY: &str = "total_usage";
/// Counter written by early versions of the app, read as a last-resort usage value.
pub const LEGACY_DONATION_COUNT_KEY: &str = "donation_count";
pub const CURRENT_PLAN_KEY: &str = "current_plan";
pub const PLAN_LAST_UPDATED_KEY: &str = "plan_last_updated";
pub const STATISTICS_KEY: &str = "statistics";
pub const DONATION_PRODUCT_ID_KEY: &str = "donation_product_id";
pub const LEGACY_PRODUCT_ID_KEY: &str = "product_id";
pub const DONATION_VARIANT_ID_KEY: &str = "donation_variant_id";
pub const DONATION_AMOUNT_KEY: &str = "donation_amount";
pub const DONATION_ENABLED_KEY: &str = "donation_enabled";
pub const CART_ENABLED_KEY: &str = "cart_enabled";

/// `usage_{YYYY-MM}`
pub fn usage_key(period: &str) -> String {
    format!("usage_{period}")
}

/// `order_{orderId}`
pub fn order_key(order_id: &str) -> String {
    format!("order_{order_id}")
}

/// `limit_exceeded_{unix_millis}`
pub fn limit_exceeded_key(unix_millis: i64) -> String {
    format!("limit_exceeded_{unix_millis}")
}

/// Declared metafield type, as accepted by `metafieldsSet`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MetafieldType {
    SingleLineTextField,
    Boolean,
    Json,
    NumberInteger,
    NumberDecimal,
    DateTime,
}

/// A raw metafield as returned by the store: everything is a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetafieldRecord {
    #[serde(default)]
    pub namespace: Option<String>,
    pub key: String,
    pub value: String,
    /// Kept as the raw type name so unknown types can still pass through.
    #[serde(rename = "type")]
    pub value_type: String,
}

impl MetafieldRecord {
    pub fn new(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value_type: MetafieldType,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            key: key.into(),
            value: value.into(),
            value_type: value_type.as_ref().to_string(),
        }
    }
}

/// Decoded metafield value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetafieldValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Json(serde_json::Value),
}

impl MetafieldValue {
    /// Integer view of the value. Numbers are truncated, numeric strings are parsed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetafieldValue::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            MetafieldValue::Number(_) => None,
            MetafieldValue::Text(s) => s.trim().parse::<i64>().ok(),
            MetafieldValue::Json(serde_json::Value::Number(n)) => n.as_i64(),
            MetafieldValue::Json(_) | MetafieldValue::Bool(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetafieldValue::Number(n) => Some(*n),
            MetafieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            MetafieldValue::Json(serde_json::Value::Number(n)) => n.as_f64(),
            MetafieldValue::Json(_) | MetafieldValue::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetafieldValue::Text(s) => Some(s),
            MetafieldValue::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetafieldValue::Bool(b) => Some(*b),
            MetafieldValue::Json(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Identifier view: strings as-is, integral numbers without a fractional part.
    pub fn as_id(&self) -> Option<String> {
        match self {
            MetafieldValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            MetafieldValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(format!("{}", *n as i64))
            }
            MetafieldValue::Json(serde_json::Value::Number(n)) => Some(n.to_string()),
            MetafieldValue::Json(serde_json::Value::String(s)) if !s.is_empty() => {
                Some(s.clone())
            }
            _ => None,
        }
    }
}
