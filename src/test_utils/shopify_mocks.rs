//! In-memory implementations of the shop-bound Shopify ports.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::{
            billing_provider::{BillingProviderPort, SubscriptionCreated, UsageCharge},
            metafield_store::MetafieldStoreTrait,
        },
        use_cases::shop_services::{ShopClients, ShopConnectorTrait},
    },
    domain::entities::{
        metafield::{MetafieldRecord, MetafieldType},
        pricing_plan::PlanDefinition,
        subscription::ActiveSubscription,
    },
};

// ============================================================================
// InMemoryMetafieldStore
// ============================================================================

#[derive(Default)]
pub struct InMemoryMetafieldStore {
    pub records: Mutex<HashMap<(String, String), MetafieldRecord>>,
    writes: Mutex<usize>,
    failing_keys: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    get_all_cap: Mutex<Option<usize>>,
    yielding: AtomicBool,
}

impl InMemoryMetafieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without counting it as a write.
    pub fn put(&self, namespace: &str, key: &str, value_type: MetafieldType, value: &str) {
        self.records.lock().unwrap().insert(
            (namespace.to_string(), key.to_string()),
            MetafieldRecord::new(namespace, key, value_type, value),
        );
    }

    pub fn put_integer(&self, namespace: &str, key: &str, value: i64) {
        self.put(namespace, key, MetafieldType::NumberInteger, &value.to_string());
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), key.to_string()))
            .map(|r| r.value.clone())
    }

    pub fn integer(&self, namespace: &str, key: &str) -> Option<i64> {
        self.raw(namespace, key).and_then(|v| v.parse().ok())
    }

    pub fn keys_with_prefix(&self, namespace: &str, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, key)| ns == namespace && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of `set` and `delete` calls made through the port.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes_for(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Return at most `cap` records from `get_all`, like a single unpaginated page.
    pub fn cap_get_all(&self, cap: usize) {
        *self.get_all_cap.lock().unwrap() = Some(cap);
    }

    /// Yield to the runtime inside every call, as a network round trip would.
    pub fn yield_on_calls(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }

    async fn maybe_yield(&self) {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    fn check_read(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Shopify("metafield read failed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetafieldStoreTrait for InMemoryMetafieldStore {
    async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<MetafieldRecord>> {
        self.maybe_yield().await;
        self.check_read()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned())
    }

    async fn get_all(&self, namespace: &str) -> AppResult<Vec<MetafieldRecord>> {
        self.maybe_yield().await;
        self.check_read()?;
        let cap = self.get_all_cap.lock().unwrap().unwrap_or(usize::MAX);
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, record)| record.clone())
            .take(cap)
            .collect())
    }

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value_type: MetafieldType,
        value: &str,
    ) -> AppResult<()> {
        self.maybe_yield().await;
        *self.writes.lock().unwrap() += 1;
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(AppError::Shopify(format!("metafieldsSet failed for {}", key)));
        }
        self.put(namespace, key, value_type, value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> AppResult<()> {
        self.maybe_yield().await;
        *self.writes.lock().unwrap() += 1;
        self.records
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}

// ============================================================================
// InMemoryBillingProvider
// ============================================================================

#[derive(Default)]
pub struct InMemoryBillingProvider {
    pub subscriptions: Mutex<Vec<ActiveSubscription>>,
    created: Mutex<Vec<(PlanDefinition, String, bool)>>,
    cancelled: Mutex<Vec<String>>,
    charges: Mutex<Vec<UsageCharge>>,
    fail_listing: AtomicBool,
}

impl InMemoryBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscription(&self, subscription: ActiveSubscription) {
        self.subscriptions.lock().unwrap().push(subscription);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// `(plan, return_url, test)` for every created subscription.
    pub fn created_subscriptions(&self) -> Vec<(PlanDefinition, String, bool)> {
        self.created.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn usage_charges(&self) -> Vec<UsageCharge> {
        self.charges.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingProviderPort for InMemoryBillingProvider {
    async fn list_active_subscriptions(&self) -> AppResult<Vec<ActiveSubscription>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(AppError::Shopify("activeSubscriptions query failed".into()));
        }
        Ok(self.subscriptions.lock().unwrap().clone())
    }

    async fn create_subscription(
        &self,
        plan: &PlanDefinition,
        return_url: &str,
        test: bool,
    ) -> AppResult<SubscriptionCreated> {
        let mut created = self.created.lock().unwrap();
        created.push((plan.clone(), return_url.to_string(), test));
        let n = created.len();

        Ok(SubscriptionCreated {
            subscription_id: format!("gid://shopify/AppSubscription/{}", n),
            confirmation_url: format!(
                "https://admin.shopify.com/charges/{}/confirm_recurring_application_charge",
                n
            ),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != subscription_id);
        if subscriptions.len() == before {
            return Err(AppError::NotFound);
        }
        self.cancelled
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }

    async fn record_usage_charge(&self, charge: &UsageCharge) -> AppResult<String> {
        let mut charges = self.charges.lock().unwrap();
        charges.push(charge.clone());
        Ok(format!("gid://shopify/AppUsageRecord/{}", charges.len()))
    }
}

// ============================================================================
// InMemoryShopConnector
// ============================================================================

/// Hands out pre-registered clients; unknown shops have no session.
#[derive(Default)]
pub struct InMemoryShopConnector {
    shops: HashMap<String, ShopClients>,
}

impl InMemoryShopConnector {
    pub fn with_shop(
        mut self,
        shop: &str,
        store: Arc<InMemoryMetafieldStore>,
        billing: Arc<InMemoryBillingProvider>,
    ) -> Self {
        self.shops
            .insert(shop.to_string(), ShopClients { store, billing });
        self
    }
}

#[async_trait]
impl ShopConnectorTrait for InMemoryShopConnector {
    async fn connect(&self, shop: &str) -> AppResult<ShopClients> {
        self.shops
            .get(shop)
            .cloned()
            .ok_or(AppError::SessionNotFound)
    }
}
