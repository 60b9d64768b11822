//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` creates an `AppState` whose Shopify, session and
//! backend dependencies are in-memory mocks.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        order_webhook::OrderWebhookUseCases,
        plan_resolver::BillingSettings,
        shop_services::ShopServicesFactory,
        store_sync::StoreSyncUseCases,
    },
    domain::entities::metafield::DEFAULT_NAMESPACE,
    infra::config::{AppConfig, DEFAULT_SHOPIFY_API_VERSION, DEFAULT_USAGE_BACKEND_URL},
    test_utils::{
        InMemoryBillingProvider, InMemoryMetafieldStore, InMemorySessionStore,
        InMemoryShopConnector, RecordingUsageBackend,
    },
};

pub const TEST_SHOPIFY_API_KEY: &str = "test-api-key";
pub const TEST_SHOPIFY_API_SECRET: &str = "test-api-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        redis_url: "redis://127.0.0.1:6379".to_string(),
        app_url: "https://trees.example.com".parse().unwrap(),
        shopify_api_version: DEFAULT_SHOPIFY_API_VERSION.to_string(),
        shopify_api_key: TEST_SHOPIFY_API_KEY.to_string(),
        shopify_api_secret: SecretString::from(TEST_SHOPIFY_API_SECRET.to_string()),
        billing_test: true,
        usage_backend_url: DEFAULT_USAGE_BACKEND_URL.to_string(),
        metafield_namespace: DEFAULT_NAMESPACE.to_string(),
    }
}

pub struct TestAppStateBuilder {
    connector: InMemoryShopConnector,
    backend: Arc<RecordingUsageBackend>,
    sessions: Arc<InMemorySessionStore>,
    config: AppConfig,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            connector: InMemoryShopConnector::default(),
            backend: Arc::new(RecordingUsageBackend::new()),
            sessions: Arc::new(InMemorySessionStore::new()),
            config: test_config(),
        }
    }

    /// Register a shop with admin access backed by the given mocks.
    pub fn with_shop(
        mut self,
        shop: &str,
        store: Arc<InMemoryMetafieldStore>,
        billing: Arc<InMemoryBillingProvider>,
    ) -> Self {
        self.connector = self.connector.with_shop(shop, store, billing);
        self
    }

    pub fn with_backend(mut self, backend: Arc<RecordingUsageBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<InMemorySessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn build(self) -> AppState {
        let billing_settings = BillingSettings {
            return_url: self.config.billing_return_url(),
            test: self.config.billing_test,
        };
        let shop_services = Arc::new(ShopServicesFactory::new(
            Arc::new(self.connector),
            self.config.metafield_namespace.clone(),
            billing_settings,
        ));

        AppState {
            order_webhook_use_cases: Arc::new(OrderWebhookUseCases::new(
                shop_services.clone(),
                self.backend.clone(),
            )),
            store_sync_use_cases: Arc::new(StoreSyncUseCases::new(self.backend)),
            shop_services,
            sessions: self.sessions,
            config: Arc::new(self.config),
        }
    }
}
