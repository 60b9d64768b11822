use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::global_id::normalize_raw_id,
        ports::{
            billing_provider::UsageCharge,
            usage_backend::{UsageBackendPort, UsageEvent},
        },
        use_cases::{
            donation_detector::{DonationMatch, detect},
            shop_services::{ShopServices, ShopServicesFactory},
        },
    },
    domain::entities::{
        metafield::{MetafieldType, limit_exceeded_key, order_key},
        order::{LimitExceededRecord, OrderPayload, OrderSnapshot, OrderStatus},
    },
};

/// Path an order took through the webhook handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// No donation line items. Nothing written, nothing forwarded.
    NoDonation,
    /// The order was already recorded by an earlier delivery.
    Duplicate,
    /// Free plan exhausted: audit record written, usage not counted, event forwarded.
    LimitExceeded,
    /// Usage counted and event forwarded.
    Recorded,
    /// No admin access to the shop: event forwarded, nothing stored.
    Unrecorded,
}

pub struct OrderWebhookUseCases {
    shops: Arc<ShopServicesFactory>,
    usage_backend: Arc<dyn UsageBackendPort>,
}

impl OrderWebhookUseCases {
    pub fn new(shops: Arc<ShopServicesFactory>, usage_backend: Arc<dyn UsageBackendPort>) -> Self {
        Self {
            shops,
            usage_backend,
        }
    }

    /// Handle one `orders/create` delivery. Never fails: every error is logged and
    /// the remaining steps still run.
    #[instrument(skip(self, shop, order), fields(shop = %shop, order_name = ?order.name))]
    pub async fn process_order(&self, shop: &str, order: &OrderPayload) -> WebhookOutcome {
        let services = match self.shops.for_shop(shop).await {
            Ok(services) => Some(services),
            Err(e) => {
                warn!(error = %e, "No admin access, checking donation properties only");
                None
            }
        };

        let product = match &services {
            Some(services) => services.donation_product().await,
            None => Default::default(),
        };

        let Some(donation) = detect(order, &product) else {
            debug!(
                configured = product.is_configured(),
                line_items = order.line_items.len(),
                "No donation items in order"
            );
            return WebhookOutcome::NoDonation;
        };

        let order_id = order.id.as_ref().and_then(normalize_raw_id);
        info!(
            order_id = ?order_id,
            trees = donation.quantity,
            amount = donation.amount,
            "Donation order detected"
        );

        let Some(services) = services else {
            self.forward_usage(shop, order, &donation).await;
            return WebhookOutcome::Unrecorded;
        };

        // Held until the order is marked, so a concurrent redelivery waits and
        // then sees the marker.
        let order_guard = services.order_lock.lock().await;

        if let Some(order_id) = &order_id
            && self.already_recorded(&services, order_id).await
        {
            info!(order_id = %order_id, "Order already recorded, skipping redelivery");
            return WebhookOutcome::Duplicate;
        }

        let limit = services.limits.check().await;
        if limit.reached {
            warn!(
                plan = %limit.plan,
                usage = ?limit.current_usage,
                attempted = donation.quantity,
                "Free plan limit reached, usage not counted"
            );
            if let Err(e) = self
                .write_limit_exceeded(&services, order_id.as_deref(), donation.quantity)
                .await
            {
                error!(error = %e, "Failed to write limit exceeded record");
            }
            if let Some(order_id) = &order_id
                && let Err(e) = self
                    .write_snapshot(&services, order_id, order, &donation, OrderStatus::LimitExceeded)
                    .await
            {
                error!(order_id = %order_id, error = %e, "Failed to mark blocked order");
            }
            drop(order_guard);

            self.forward_usage(shop, order, &donation).await;
            return WebhookOutcome::LimitExceeded;
        }

        match services.ledger.increment_usage(donation.quantity).await {
            Ok(monthly) => info!(monthly_usage = monthly, "Donation usage recorded"),
            Err(e) => error!(error = %e, "Failed to increment usage"),
        }

        if let Some(order_id) = &order_id
            && let Err(e) = self
                .write_snapshot(&services, order_id, order, &donation, OrderStatus::Recorded)
                .await
        {
            error!(order_id = %order_id, error = %e, "Failed to write order snapshot");
        }
        drop(order_guard);

        if limit.plan.is_paid() {
            self.record_usage_charge(&services, order, order_id.as_deref(), &donation)
                .await;
        }

        self.forward_usage(shop, order, &donation).await;
        WebhookOutcome::Recorded
    }

    async fn already_recorded(&self, services: &ShopServices, order_id: &str) -> bool {
        match services
            .store
            .get(&services.namespace, &order_key(order_id))
            .await
        {
            Ok(record) => record.is_some(),
            Err(e) => {
                warn!(order_id, error = %e, "Failed to check order snapshot");
                false
            }
        }
    }

    async fn write_snapshot(
        &self,
        services: &ShopServices,
        order_id: &str,
        order: &OrderPayload,
        donation: &DonationMatch,
        status: OrderStatus,
    ) -> AppResult<()> {
        let snapshot = OrderSnapshot {
            order_id: order.id.clone(),
            status,
            order_name: order_name(order, Some(order_id)),
            trees: donation.quantity,
            amount: donation.amount,
            currency: order.currency_or_default(),
            created_at: Utc::now(),
        };
        let raw = serde_json::to_string(&snapshot)
            .map_err(|e| AppError::Internal(format!("failed to serialize snapshot: {}", e)))?;

        services
            .store
            .set(&services.namespace, &order_key(order_id), MetafieldType::Json, &raw)
            .await
    }

    async fn write_limit_exceeded(
        &self,
        services: &ShopServices,
        order_id: Option<&str>,
        attempted: i64,
    ) -> AppResult<()> {
        let now = Utc::now();
        let record = LimitExceededRecord {
            order_id: order_id.unwrap_or("unknown").to_string(),
            attempted,
            timestamp: now,
        };
        let raw = serde_json::to_string(&record).map_err(|e| {
            AppError::Internal(format!("failed to serialize limit record: {}", e))
        })?;

        services
            .store
            .set(
                &services.namespace,
                &limit_exceeded_key(now.timestamp_millis()),
                MetafieldType::Json,
                &raw,
            )
            .await
    }

    /// Charge the donation against the usage-priced line item of the active
    /// subscription, when there is one.
    async fn record_usage_charge(
        &self,
        services: &ShopServices,
        order: &OrderPayload,
        order_id: Option<&str>,
        donation: &DonationMatch,
    ) {
        if donation.amount <= 0.0 {
            return;
        }

        let subscriptions = services.plans.active_subscriptions().await;
        let Some(line_item_id) = subscriptions
            .iter()
            .find_map(|sub| sub.usage_line_item_id())
        else {
            debug!("No usage-priced line item, skipping usage charge");
            return;
        };

        let charge = UsageCharge {
            line_item_id: line_item_id.to_string(),
            amount: donation.amount,
            currency: order.currency_or_default(),
            description: format!(
                "{} tree(s) planted - order {}",
                donation.quantity,
                order_name(order, order_id)
            ),
            idempotency_key: order_id.map(|id| format!("order-{}", id)),
        };

        match services.billing.record_usage_charge(&charge).await {
            Ok(record_id) => info!(usage_record_id = %record_id, "Usage charge recorded"),
            Err(e) => error!(error = %e, "Failed to record usage charge"),
        }
    }

    async fn forward_usage(&self, shop: &str, order: &OrderPayload, donation: &DonationMatch) {
        let event = UsageEvent {
            shop_domain: shop.to_string(),
            order_id: order.id.clone(),
            order_name: order_name(order, None),
            trees_planted: donation.quantity,
            amount: donation.amount,
            currency: order.currency_or_default(),
            customer_email: order.customer_email(),
            timestamp: Utc::now(),
        };

        match self.usage_backend.send_usage(&event).await {
            Ok(_) => debug!("Usage forwarded to backend"),
            Err(e) => error!(
                shop,
                order_id = ?order.id,
                error = %e,
                "Failed to forward usage to backend"
            ),
        }
    }
}

fn order_name(order: &OrderPayload, order_id: Option<&str>) -> String {
    order
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .or_else(|| order_id.map(|id| format!("#{}", id)))
        .or_else(|| order.id.as_ref().map(|id| format!("#{}", id)))
        .unwrap_or_else(|| "unknown".to_string())
}
