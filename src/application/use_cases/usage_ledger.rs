use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::{
            metafield_codec::{self, DecodedMetafields},
            period::current_period,
        },
        ports::metafield_store::MetafieldStoreTrait,
    },
    domain::entities::{
        metafield::{
            LEGACY_DONATION_COUNT_KEY, MetafieldType, STATISTICS_KEY, TOTAL_USAGE_KEY, usage_key,
        },
        pricing_plan::PricingPlan,
        statistics::StatisticsAggregate,
    },
};

/// Usage figures shown on the pricing page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageSummary {
    pub plan: PricingPlan,
    pub period: String,
    pub current_usage: i64,
    pub total_usage: i64,
    /// `None` means unlimited.
    pub usage_limit: Option<i64>,
    pub remaining: Option<i64>,
    pub limit_reached: bool,
    pub monthly_price: f64,
}

/// Monthly and lifetime donation counters kept in the shop's metafields.
///
/// Increments are read-modify-write against a store without transactions.
/// `write_lock` serializes them for one shop within this process; writers in
/// other processes can still interleave and lose an update.
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn MetafieldStoreTrait>,
    namespace: String,
    write_lock: Arc<Mutex<()>>,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn MetafieldStoreTrait>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Share a lock with other ledgers of the same shop.
    pub fn with_write_lock(mut self, write_lock: Arc<Mutex<()>>) -> Self {
        self.write_lock = write_lock;
        self
    }

    /// The counters `usage_for_period` needs for `period`, read by key.
    async fn load_counters(&self, period: &str) -> AppResult<DecodedMetafields> {
        let monthly_key = usage_key(period);
        let records = self
            .store
            .get_many(
                &self.namespace,
                &[&monthly_key, TOTAL_USAGE_KEY, LEGACY_DONATION_COUNT_KEY],
            )
            .await?;
        Ok(metafield_codec::decode(&records))
    }

    /// Donations counted for the current month.
    ///
    /// Falls back to the lifetime counter, then the legacy counter, when the
    /// month has no field yet. Read failures count as zero.
    pub async fn current_usage(&self) -> i64 {
        let period = current_period();
        match self.load_counters(&period).await {
            Ok(fields) => usage_for_period(&fields, &period),
            Err(e) => {
                warn!(error = %e, "Failed to read usage, assuming zero");
                0
            }
        }
    }

    pub async fn total_usage(&self) -> i64 {
        match self.load_counters(&current_period()).await {
            Ok(fields) => fields.get_i64(TOTAL_USAGE_KEY).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "Failed to read total usage, assuming zero");
                0
            }
        }
    }

    /// Add `amount` donations to this month and to the lifetime counter.
    ///
    /// The month continues from `current_usage`, so a month without its own
    /// field yet starts from the fallback value the limit check saw.
    ///
    /// Returns the new monthly total. A failed read aborts before anything is
    /// written. A failed write skips only that field; the first such error is
    /// returned after the remaining steps ran. Statistics failures are logged only.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn increment_usage(&self, amount: i64) -> AppResult<i64> {
        if amount <= 0 {
            return Err(AppError::InvalidInput(format!(
                "usage increment must be positive, got {}",
                amount
            )));
        }

        let _guard = self.write_lock.lock().await;

        let period = current_period();
        let monthly_key = usage_key(&period);
        let fields = self.load_counters(&period).await?;

        let mut first_error = None;

        let new_monthly = usage_for_period(&fields, &period) + amount;
        if let Err(e) = self
            .write_counter(&monthly_key, new_monthly)
            .await
        {
            error!(error = %e, key = %monthly_key, "Failed to write monthly usage");
            first_error.get_or_insert(e);
        }

        let new_total = fields.get_i64(TOTAL_USAGE_KEY).unwrap_or(0) + amount;
        if let Err(e) = self.write_counter(TOTAL_USAGE_KEY, new_total).await {
            error!(error = %e, key = TOTAL_USAGE_KEY, "Failed to write total usage");
            first_error.get_or_insert(e);
        }

        if let Err(e) = self.update_statistics(amount, &period).await {
            error!(error = %e, "Failed to update statistics");
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        info!(
            monthly = new_monthly,
            total = new_total,
            period = %period,
            "Usage incremented"
        );
        Ok(new_monthly)
    }

    async fn write_counter(&self, key: &str, value: i64) -> AppResult<()> {
        self.store
            .set(
                &self.namespace,
                key,
                MetafieldType::NumberInteger,
                &value.to_string(),
            )
            .await
    }

    /// Current statistics aggregate; a missing or unreadable blob yields the default.
    pub async fn statistics(&self) -> StatisticsAggregate {
        match self.read_statistics().await {
            Ok(Some(stats)) => stats,
            Ok(None) => StatisticsAggregate::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read statistics, using defaults");
                StatisticsAggregate::default()
            }
        }
    }

    async fn read_statistics(&self) -> AppResult<Option<StatisticsAggregate>> {
        let Some(record) = self.store.get(&self.namespace, STATISTICS_KEY).await? else {
            return Ok(None);
        };
        serde_json::from_str(&record.value)
            .map(Some)
            .map_err(|e| AppError::Internal(format!("malformed statistics blob: {}", e)))
    }

    /// Re-read the aggregate, add `count` donations, and write it back whole.
    ///
    /// A malformed stored blob is left untouched.
    async fn update_statistics(&self, count: i64, period: &str) -> AppResult<StatisticsAggregate> {
        let mut stats = self.read_statistics().await?.unwrap_or_default();
        stats.record_donations(period, count, Utc::now());

        let raw = serde_json::to_string(&stats)
            .map_err(|e| AppError::Internal(format!("failed to serialize statistics: {}", e)))?;
        self.store
            .set(&self.namespace, STATISTICS_KEY, MetafieldType::Json, &raw)
            .await?;

        Ok(stats)
    }

    /// Usage figures for `plan` from a single read of the store.
    pub async fn usage_summary(&self, plan: PricingPlan) -> UsageSummary {
        let period = current_period();
        let (current_usage, total_usage) = match self.load_counters(&period).await {
            Ok(fields) => (
                usage_for_period(&fields, &period),
                fields.get_i64(TOTAL_USAGE_KEY).unwrap_or(0),
            ),
            Err(e) => {
                warn!(error = %e, "Failed to read usage for summary");
                (0, 0)
            }
        };

        let usage_limit = plan.usage_limit();
        UsageSummary {
            plan,
            period,
            current_usage,
            total_usage,
            usage_limit,
            remaining: usage_limit.map(|limit| (limit - current_usage).max(0)),
            limit_reached: usage_limit.is_some_and(|limit| current_usage >= limit),
            monthly_price: plan.monthly_price_amount(),
        }
    }
}

fn usage_for_period(fields: &DecodedMetafields, period: &str) -> i64 {
    if let Some(value) = fields.get(&usage_key(period)) {
        return value.as_i64().unwrap_or(0);
    }
    fields
        .get_i64(TOTAL_USAGE_KEY)
        .or_else(|| fields.get_i64(LEGACY_DONATION_COUNT_KEY))
        .unwrap_or(0)
}
