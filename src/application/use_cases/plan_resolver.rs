use std::{str::FromStr, sync::Arc};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::metafield_codec,
        ports::{
            billing_provider::{BillingProviderPort, SubscriptionCreated},
            metafield_store::MetafieldStoreTrait,
        },
    },
    domain::entities::{
        metafield::{CURRENT_PLAN_KEY, MetafieldType, PLAN_LAST_UPDATED_KEY},
        pricing_plan::PricingPlan,
        subscription::ActiveSubscription,
    },
};

/// Billing options shared by every shop.
#[derive(Debug, Clone)]
pub struct BillingSettings {
    /// Where the merchant lands after approving a subscription.
    pub return_url: String,
    /// Create test charges.
    pub test: bool,
}

/// Paid plans in the order they take precedence.
const PAID_PLANS: [PricingPlan; 2] = [PricingPlan::Professional, PricingPlan::Essential];

/// Plan a set of active subscriptions grants, highest tier first.
pub fn plan_from_subscriptions(subscriptions: &[ActiveSubscription]) -> Option<PricingPlan> {
    PAID_PLANS
        .into_iter()
        .find(|plan| subscriptions.iter().any(|sub| sub.matches_plan(*plan)))
}

/// Works out which plan a shop is on and changes it.
///
/// Live subscriptions win over the stored plan; the stored plan is only a fallback
/// when the billing service has nothing or cannot be reached.
#[derive(Clone)]
pub struct PlanResolver {
    store: Arc<dyn MetafieldStoreTrait>,
    billing: Arc<dyn BillingProviderPort>,
    namespace: String,
    settings: BillingSettings,
}

impl PlanResolver {
    pub fn new(
        store: Arc<dyn MetafieldStoreTrait>,
        billing: Arc<dyn BillingProviderPort>,
        namespace: impl Into<String>,
        settings: BillingSettings,
    ) -> Self {
        Self {
            store,
            billing,
            namespace: namespace.into(),
            settings,
        }
    }

    /// Active subscriptions, empty when the billing service fails.
    pub async fn active_subscriptions(&self) -> Vec<ActiveSubscription> {
        match self.billing.list_active_subscriptions().await {
            Ok(subs) => subs,
            Err(e) => {
                warn!(error = %e, "Failed to list active subscriptions");
                Vec::new()
            }
        }
    }

    /// Plan currently in effect. Never fails; defaults to free.
    #[instrument(skip(self))]
    pub async fn resolve_effective_plan(&self) -> PricingPlan {
        let subscriptions = self.active_subscriptions().await;
        if let Some(plan) = plan_from_subscriptions(&subscriptions) {
            return plan;
        }
        self.stored_plan().await
    }

    /// Plan recorded in the store, free when absent or unrecognised.
    pub async fn stored_plan(&self) -> PricingPlan {
        let record = match self.store.get(&self.namespace, CURRENT_PLAN_KEY).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Failed to read stored plan");
                return PricingPlan::Free;
            }
        };

        record
            .map(|r| metafield_codec::decode_record(&r))
            .and_then(|value| value.as_str().map(str::to_owned))
            .and_then(|name| PricingPlan::from_str(name.trim()).ok())
            .unwrap_or_default()
    }

    /// Record `plan` together with the time of the change.
    pub async fn set_plan(&self, plan: PricingPlan) -> AppResult<()> {
        self.store
            .set(
                &self.namespace,
                CURRENT_PLAN_KEY,
                MetafieldType::SingleLineTextField,
                plan.as_ref(),
            )
            .await?;
        self.store
            .set(
                &self.namespace,
                PLAN_LAST_UPDATED_KEY,
                MetafieldType::DateTime,
                &Utc::now().to_rfc3339(),
            )
            .await?;

        info!(plan = %plan, "Stored plan updated");
        Ok(())
    }

    /// Start a subscription for a paid plan. The merchant still has to approve it.
    pub async fn subscribe(&self, plan: PricingPlan) -> AppResult<SubscriptionCreated> {
        let definition = plan.definition().ok_or_else(|| {
            AppError::InvalidInput(format!("{} plan has no subscription", plan.display_name()))
        })?;

        let created = self
            .billing
            .create_subscription(&definition, &self.settings.return_url, self.settings.test)
            .await?;

        info!(
            plan = %plan,
            subscription_id = %created.subscription_id,
            "Subscription created, awaiting approval"
        );
        Ok(created)
    }

    /// Cancel every active subscription, then store the free plan.
    pub async fn downgrade_to_free(&self) -> AppResult<()> {
        let subscriptions = self.billing.list_active_subscriptions().await?;
        for subscription in &subscriptions {
            self.billing.cancel_subscription(&subscription.id).await?;
            info!(subscription_id = %subscription.id, "Subscription cancelled");
        }
        self.set_plan(PricingPlan::Free).await
    }

    /// Store whatever plan the live subscriptions grant. Called after the merchant
    /// returns from approving a charge.
    pub async fn confirm_plan(&self) -> AppResult<PricingPlan> {
        let subscriptions = self.billing.list_active_subscriptions().await?;
        let plan = plan_from_subscriptions(&subscriptions).unwrap_or_default();
        self.set_plan(plan).await?;
        Ok(plan)
    }
}
