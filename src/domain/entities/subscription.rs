use serde::{Deserialize, Serialize};

use super::pricing_plan::PricingPlan;

/// Active app subscription as reported by the billing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSubscription {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub test: bool,
    #[serde(default)]
    pub line_items: Vec<SubscriptionLineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLineItem {
    #[serde(default)]
    pub id: Option<String>,
    pub plan: Option<SubscriptionLineItemPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLineItemPlan {
    pub pricing_details: Option<PricingDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyV2 {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum PricingDetails {
    #[serde(rename_all = "camelCase")]
    AppRecurringPricing {
        #[serde(default)]
        interval: Option<String>,
        price: MoneyV2,
    },
    #[serde(rename_all = "camelCase")]
    AppUsagePricing {
        #[serde(default)]
        terms: Option<String>,
        balance_used: Option<MoneyV2>,
        capped_amount: Option<MoneyV2>,
    },
    #[serde(other)]
    Unknown,
}

impl ActiveSubscription {
    /// Recurring price of the first line item, if it is a recurring one.
    pub fn recurring_price(&self) -> Option<&MoneyV2> {
        match self.line_items.first()?.plan.as_ref()?.pricing_details.as_ref()? {
            PricingDetails::AppRecurringPricing { price, .. } => Some(price),
            _ => None,
        }
    }

    /// Line item that accepts usage records, if the subscription has one.
    pub fn usage_line_item_id(&self) -> Option<&str> {
        self.line_items
            .iter()
            .find(|item| {
                matches!(
                    item.plan.as_ref().and_then(|p| p.pricing_details.as_ref()),
                    Some(PricingDetails::AppUsagePricing { .. })
                )
            })
            .and_then(|item| item.id.as_deref())
    }

    /// Whether this subscription represents `plan`, by name or by recurring price.
    pub fn matches_plan(&self, plan: PricingPlan) -> bool {
        let Some(expected_price) = plan.monthly_price() else {
            return false;
        };

        if self.name.contains(plan.display_name()) {
            return true;
        }

        match (
            self.recurring_price()
                .and_then(|p| p.amount.trim().parse::<f64>().ok()),
            expected_price.parse::<f64>().ok(),
        ) {
            (Some(actual), Some(expected)) => (actual - expected).abs() < 0.005,
            _ => false,
        }
    }
}
