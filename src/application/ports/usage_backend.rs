use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{app_error::AppResult, domain::entities::order::RawId};

/// Usage event posted to the external billing backend for every donation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub shop_domain: String,
    pub order_id: Option<RawId>,
    pub order_name: String,
    pub trees_planted: i64,
    pub amount: f64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Shop metadata pushed to the backend when the merchant opens the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreInfo {
    pub shop_domain: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub plan_name: Option<String>,
}

/// External billing backend. Callers treat every call as best effort.
#[async_trait]
pub trait UsageBackendPort: Send + Sync {
    /// `POST /usage`
    async fn send_usage(&self, event: &UsageEvent) -> AppResult<JsonValue>;

    /// `POST /store/sync`
    async fn sync_store(&self, store: &StoreInfo) -> AppResult<JsonValue>;

    /// `GET /usage/{shopDomain}`
    async fn get_usage(&self, shop_domain: &str) -> AppResult<JsonValue>;
}
