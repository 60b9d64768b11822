use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Identifier as it appears in webhook payloads: numeric REST ids or `gid://` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{}", n),
            RawId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// `orders/create` webhook body. Only the fields the donation flow reads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderPayload {
    pub id: Option<RawId>,
    pub name: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub currency: Option<String>,
    pub customer: Option<OrderCustomer>,
}

impl OrderPayload {
    pub fn currency_or_default(&self) -> String {
        self.currency
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("USD")
            .to_string()
    }

    pub fn customer_email(&self) -> Option<String> {
        self.customer.as_ref().and_then(|c| c.email.clone())
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrderCustomer {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LineItem {
    pub product_id: Option<RawId>,
    pub variant_id: Option<RawId>,
    pub quantity: Option<i64>,
    /// REST payloads send prices as strings ("5.00"); tolerate numbers too.
    pub price: Option<JsonValue>,
    pub price_set: Option<PriceSet>,
    pub properties: Option<Vec<LineItemProperty>>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PriceSet {
    pub shop_money: Option<Money>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Money {
    pub amount: Option<JsonValue>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineItemProperty {
    pub name: String,
    #[serde(default)]
    pub value: JsonValue,
}

/// What happened to an order the first time it was seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Trees counted against the monthly usage.
    #[default]
    Recorded,
    /// Blocked by the free plan limit; not counted.
    LimitExceeded,
}

/// Per-order audit record stored under `order_{orderId}`.
///
/// Its presence marks the order as handled. Snapshots written before `status`
/// existed decode as `Recorded`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    pub order_id: Option<RawId>,
    #[serde(default)]
    pub status: OrderStatus,
    pub order_name: String,
    pub trees: i64,
    pub amount: f64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Audit record stored under `limit_exceeded_{millis}` when the free tier is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitExceededRecord {
    pub order_id: String,
    pub attempted: i64,
    pub timestamp: DateTime<Utc>,
}
