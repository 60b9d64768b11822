use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{
    app_error::AppResult,
    application::ports::usage_backend::{StoreInfo, UsageBackendPort},
};

/// Shop metadata and usage exchanged with the external billing backend.
pub struct StoreSyncUseCases {
    backend: Arc<dyn UsageBackendPort>,
}

impl StoreSyncUseCases {
    pub fn new(backend: Arc<dyn UsageBackendPort>) -> Self {
        Self { backend }
    }

    /// Push shop metadata. Best effort: `None` when the backend failed.
    pub async fn sync(&self, store: &StoreInfo) -> Option<JsonValue> {
        match self.backend.sync_store(store).await {
            Ok(response) => {
                info!(shop = %store.shop_domain, "Store synced with usage backend");
                Some(response)
            }
            Err(e) => {
                warn!(shop = %store.shop_domain, error = %e, "Store sync failed");
                None
            }
        }
    }

    /// Usage as the backend has recorded it.
    pub async fn backend_usage(&self, shop_domain: &str) -> AppResult<JsonValue> {
        self.backend.get_usage(shop_domain).await
    }
}
