use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::metafield_codec::{self, DecodedMetafields},
        ports::{billing_provider::BillingProviderPort, metafield_store::MetafieldStoreTrait},
        use_cases::{
            donation_detector::{DonationProductRef, DonationSettings},
            limit_enforcer::LimitEnforcer,
            plan_resolver::{BillingSettings, PlanResolver},
            usage_ledger::UsageLedger,
        },
        validators::is_valid_shop_domain,
    },
};

/// Admin API clients bound to a single shop.
#[derive(Clone)]
pub struct ShopClients {
    pub store: Arc<dyn MetafieldStoreTrait>,
    pub billing: Arc<dyn BillingProviderPort>,
}

#[async_trait]
pub trait ShopConnectorTrait: Send + Sync {
    /// Build clients for `shop` from its stored session.
    /// Fails with `AppError::SessionNotFound` when the app is not installed there.
    async fn connect(&self, shop: &str) -> AppResult<ShopClients>;
}

/// One write lock per shop, shared by every ledger of that shop in this process.
#[derive(Default)]
pub struct ShopLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ShopLocks {
    pub fn lock_for(&self, shop: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(shop.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Everything the app does against one shop.
#[derive(Clone)]
pub struct ShopServices {
    pub shop: String,
    pub namespace: String,
    pub store: Arc<dyn MetafieldStoreTrait>,
    pub billing: Arc<dyn BillingProviderPort>,
    pub ledger: UsageLedger,
    pub plans: PlanResolver,
    pub limits: LimitEnforcer,
    /// Held while an order is checked, counted and marked, so two deliveries
    /// of one order cannot both pass the duplicate check.
    pub order_lock: Arc<Mutex<()>>,
}

impl ShopServices {
    pub fn new(
        shop: impl Into<String>,
        clients: ShopClients,
        namespace: impl Into<String>,
        billing_settings: BillingSettings,
        write_lock: Arc<Mutex<()>>,
        order_lock: Arc<Mutex<()>>,
    ) -> Self {
        let namespace = namespace.into();
        let ledger = UsageLedger::new(clients.store.clone(), namespace.clone())
            .with_write_lock(write_lock);
        let plans = PlanResolver::new(
            clients.store.clone(),
            clients.billing.clone(),
            namespace.clone(),
            billing_settings,
        );
        let limits = LimitEnforcer::new(plans.clone(), ledger.clone());

        Self {
            shop: shop.into(),
            namespace,
            store: clients.store,
            billing: clients.billing,
            ledger,
            plans,
            limits,
            order_lock,
        }
    }

    pub async fn load_fields(&self, keys: &[&str]) -> AppResult<DecodedMetafields> {
        let records = self.store.get_many(&self.namespace, keys).await?;
        Ok(metafield_codec::decode(&records))
    }

    pub async fn donation_settings(&self) -> AppResult<DonationSettings> {
        Ok(DonationSettings::from_fields(
            &self.load_fields(DonationSettings::KEYS).await?,
        ))
    }

    /// Configured donation product; unconfigured when settings cannot be read.
    pub async fn donation_product(&self) -> DonationProductRef {
        match self.donation_settings().await {
            Ok(settings) => settings.product_ref(),
            Err(e) => {
                warn!(shop = %self.shop, error = %e, "Failed to load donation settings");
                DonationProductRef::default()
            }
        }
    }
}

/// Builds `ShopServices` for a shop domain.
pub struct ShopServicesFactory {
    connector: Arc<dyn ShopConnectorTrait>,
    write_locks: ShopLocks,
    order_locks: ShopLocks,
    namespace: String,
    billing_settings: BillingSettings,
}

impl ShopServicesFactory {
    pub fn new(
        connector: Arc<dyn ShopConnectorTrait>,
        namespace: impl Into<String>,
        billing_settings: BillingSettings,
    ) -> Self {
        Self {
            connector,
            write_locks: ShopLocks::default(),
            order_locks: ShopLocks::default(),
            namespace: namespace.into(),
            billing_settings,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn for_shop(&self, shop: &str) -> AppResult<ShopServices> {
        if !is_valid_shop_domain(shop) {
            return Err(AppError::InvalidInput(format!("invalid shop domain: {}", shop)));
        }

        let clients = self.connector.connect(shop).await?;
        Ok(ShopServices::new(
            shop,
            clients,
            self.namespace.clone(),
            self.billing_settings.clone(),
            self.write_locks.lock_for(shop),
            self.order_locks.lock_for(shop),
        ))
    }
}
