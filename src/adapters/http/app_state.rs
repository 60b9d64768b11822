use std::sync::Arc;

use crate::{
    application::use_cases::{
        order_webhook::OrderWebhookUseCases, shop_services::ShopServicesFactory,
        store_sync::StoreSyncUseCases,
    },
    infra::{config::AppConfig, session_store::ShopSessionStoreTrait},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub shop_services: Arc<ShopServicesFactory>,
    pub order_webhook_use_cases: Arc<OrderWebhookUseCases>,
    pub store_sync_use_cases: Arc<StoreSyncUseCases>,
    pub sessions: Arc<dyn ShopSessionStoreTrait>,
}

