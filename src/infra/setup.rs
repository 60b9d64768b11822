use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        order_webhook::OrderWebhookUseCases, plan_resolver::BillingSettings,
        shop_services::ShopServicesFactory, store_sync::StoreSyncUseCases,
    },
    infra::{
        config::AppConfig,
        error::InfraError,
        http_client::try_build_client,
        session_store::{RedisSessionStore, ShopSessionStoreTrait},
        shopify_client::ShopifyConnector,
        usage_backend_client::UsageBackendClient,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let http_client = try_build_client().map_err(InfraError::HttpClient)?;

    let sessions: Arc<dyn ShopSessionStoreTrait> =
        Arc::new(RedisSessionStore::new(&config.redis_url).await?);

    let connector = Arc::new(ShopifyConnector::new(
        http_client.clone(),
        sessions.clone(),
        config.shopify_api_version.clone(),
    ));

    let usage_backend = Arc::new(UsageBackendClient::new(
        http_client,
        config.usage_backend_url.clone(),
    ));

    let shop_services = Arc::new(ShopServicesFactory::new(
        connector,
        config.metafield_namespace.clone(),
        BillingSettings {
            return_url: config.billing_return_url(),
            test: config.billing_test,
        },
    ));

    let order_webhook_use_cases =
        OrderWebhookUseCases::new(shop_services.clone(), usage_backend.clone());
    let store_sync_use_cases = StoreSyncUseCases::new(usage_backend);

    Ok(AppState {
        config: Arc::new(config),
        shop_services,
        order_webhook_use_cases: Arc::new(order_webhook_use_cases),
        store_sync_use_cases: Arc::new(store_sync_use_cases),
        sessions,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "plant_trees_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
