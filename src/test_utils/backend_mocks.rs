//! Recording usage backend and in-memory session store.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    app_error::{AppError, AppResult},
    application::ports::usage_backend::{StoreInfo, UsageBackendPort, UsageEvent},
    infra::session_store::ShopSessionStoreTrait,
};

// ============================================================================
// RecordingUsageBackend
// ============================================================================

#[derive(Default)]
pub struct RecordingUsageBackend {
    events: Mutex<Vec<UsageEvent>>,
    stores: Mutex<Vec<StoreInfo>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingUsageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as a 503 would.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Successfully delivered usage events.
    pub fn usage_events(&self) -> Vec<UsageEvent> {
        self.events.lock().unwrap().clone()
    }

    /// `send_usage` calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn synced_stores(&self) -> Vec<StoreInfo> {
        self.stores.lock().unwrap().clone()
    }

    fn check(&self) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::UsageBackend("503 Service Unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageBackendPort for RecordingUsageBackend {
    async fn send_usage(&self, event: &UsageEvent) -> AppResult<JsonValue> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.events.lock().unwrap().push(event.clone());
        Ok(json!({ "success": true }))
    }

    async fn sync_store(&self, store: &StoreInfo) -> AppResult<JsonValue> {
        self.check()?;
        self.stores.lock().unwrap().push(store.clone());
        Ok(json!({ "success": true }))
    }

    async fn get_usage(&self, shop_domain: &str) -> AppResult<JsonValue> {
        self.check()?;
        let trees: i64 = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.shop_domain == shop_domain)
            .map(|e| e.trees_planted)
            .sum();
        Ok(json!({ "shopDomain": shop_domain, "treesPlanted": trees }))
    }
}

// ============================================================================
// InMemorySessionStore
// ============================================================================

#[derive(Default)]
pub struct InMemorySessionStore {
    tokens: Mutex<HashMap<String, String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_session(&self, shop: &str) -> bool {
        self.tokens.lock().unwrap().contains_key(shop)
    }

    pub fn with_token(self, shop: &str, token: &str) -> Self {
        self.tokens
            .lock()
            .unwrap()
            .insert(shop.to_string(), token.to_string());
        self
    }
}

#[async_trait]
impl ShopSessionStoreTrait for InMemorySessionStore {
    async fn access_token(&self, shop: &str) -> AppResult<Option<SecretString>> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .get(shop)
            .map(|t| SecretString::from(t.clone())))
    }

    async fn delete(&self, shop: &str) -> AppResult<()> {
        self.tokens.lock().unwrap().remove(shop);
        Ok(())
    }
}
