use tracing::debug;

use crate::{
    application::use_cases::{plan_resolver::PlanResolver, usage_ledger::UsageLedger},
    domain::entities::pricing_plan::PricingPlan,
};

/// Outcome of a limit check, kept for logging and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitCheck {
    pub plan: PricingPlan,
    /// Only read for plans with an in-app limit.
    pub current_usage: Option<i64>,
    pub reached: bool,
}

/// Whether `usage` exhausts the in-app allowance of `plan`.
pub fn limit_reached_for(plan: PricingPlan, usage: i64) -> bool {
    plan.usage_limit().is_some_and(|limit| usage >= limit)
}

/// Gate in front of the usage ledger for shops on the free plan.
#[derive(Clone)]
pub struct LimitEnforcer {
    plans: PlanResolver,
    ledger: UsageLedger,
}

impl LimitEnforcer {
    pub fn new(plans: PlanResolver, ledger: UsageLedger) -> Self {
        Self { plans, ledger }
    }

    pub async fn check(&self) -> LimitCheck {
        let plan = self.plans.resolve_effective_plan().await;
        if plan.usage_limit().is_none() {
            return LimitCheck {
                plan,
                current_usage: None,
                reached: false,
            };
        }

        let usage = self.ledger.current_usage().await;
        let reached = limit_reached_for(plan, usage);
        debug!(plan = %plan, usage, reached, "Usage limit checked");

        LimitCheck {
            plan,
            current_usage: Some(usage),
            reached,
        }
    }

    pub async fn is_limit_reached(&self) -> bool {
        self.check().await.reached
    }
}
