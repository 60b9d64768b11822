use async_trait::async_trait;
use serde::Serialize;

use crate::{
    app_error::AppResult,
    domain::entities::{pricing_plan::PlanDefinition, subscription::ActiveSubscription},
};

/// Result of creating a subscription: the merchant must approve it at `confirmation_url`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionCreated {
    pub subscription_id: String,
    pub confirmation_url: String,
}

/// A metered charge against a usage-priced subscription line item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageCharge {
    pub line_item_id: String,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    /// Repeated charges with the same key are recorded once.
    pub idempotency_key: Option<String>,
}

/// Subscription billing service of the commerce platform.
///
/// An instance is bound to one shop, like `MetafieldStoreTrait`.
#[async_trait]
pub trait BillingProviderPort: Send + Sync {
    async fn list_active_subscriptions(&self) -> AppResult<Vec<ActiveSubscription>>;

    /// Create a recurring subscription pending merchant approval.
    async fn create_subscription(
        &self,
        plan: &PlanDefinition,
        return_url: &str,
        test: bool,
    ) -> AppResult<SubscriptionCreated>;

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()>;

    /// Record a usage charge. Returns the usage record id.
    async fn record_usage_charge(&self, charge: &UsageCharge) -> AppResult<String>;
}
