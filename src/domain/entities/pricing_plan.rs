use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Monthly donation ceiling for shops on the free plan.
pub const FREE_PLAN_MONTHLY_LIMIT: i64 = 5000;

/// Billing interval used by every paid plan.
pub const PLAN_INTERVAL: &str = "EVERY_30_DAYS";

pub const PLAN_CURRENCY: &str = "USD";

/// Pricing tier of a shop.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PricingPlan {
    #[default]
    Free,
    Essential,
    Professional,
}

impl PricingPlan {
    /// Human-readable plan name
    pub fn display_name(&self) -> &'static str {
        match self {
            PricingPlan::Free => "Free",
            PricingPlan::Essential => "Essential",
            PricingPlan::Professional => "Professional",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, PricingPlan::Free)
    }

    /// Recurring price as the billing API formats it ("6.99"). `None` for free.
    pub fn monthly_price(&self) -> Option<&'static str> {
        match self {
            PricingPlan::Free => None,
            PricingPlan::Essential => Some("6.99"),
            PricingPlan::Professional => Some("29.99"),
        }
    }

    pub fn monthly_price_amount(&self) -> f64 {
        match self {
            PricingPlan::Free => 0.0,
            PricingPlan::Essential => 6.99,
            PricingPlan::Professional => 29.99,
        }
    }

    /// In-app monthly donation limit. Paid tiers are capped by the billing service instead.
    pub fn usage_limit(&self) -> Option<i64> {
        match self {
            PricingPlan::Free => Some(FREE_PLAN_MONTHLY_LIMIT),
            PricingPlan::Essential | PricingPlan::Professional => None,
        }
    }

    /// Definition used when creating a subscription. `None` for free.
    pub fn definition(&self) -> Option<PlanDefinition> {
        let price = self.monthly_price()?;
        Some(PlanDefinition {
            plan: *self,
            name: format!("Tree Planting - {} Plan", self.display_name()),
            price: price.to_string(),
            currency: PLAN_CURRENCY.to_string(),
            interval: PLAN_INTERVAL.to_string(),
        })
    }
}

/// Recurring subscription definition sent to the billing service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDefinition {
    pub plan: PricingPlan,
    pub name: String,
    pub price: String,
    pub currency: String,
    pub interval: String,
}
