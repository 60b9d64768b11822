use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::usage_backend::{StoreInfo, UsageBackendPort, UsageEvent},
};

/// JSON client for the external usage backend.
#[derive(Clone)]
pub struct UsageBackendClient {
    client: Client,
    base_url: String,
}

impl UsageBackendClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn handle_response(&self, response: reqwest::Response) -> AppResult<JsonValue> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UsageBackend(format!("Failed to read response: {}", e)))?;

        tracing::debug!(status = %status, body = %body, "Usage backend response");

        if !status.is_success() {
            return Err(AppError::UsageBackend(format!(
                "Usage backend error: {} - {}",
                status, body
            )));
        }

        if body.trim().is_empty() {
            return Ok(JsonValue::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            AppError::UsageBackend(format!("Failed to parse usage backend response: {}", e))
        })
    }
}

#[async_trait]
impl UsageBackendPort for UsageBackendClient {
    async fn send_usage(&self, event: &UsageEvent) -> AppResult<JsonValue> {
        let response = self
            .client
            .post(self.url("/usage"))
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::UsageBackend(format!("Usage request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn sync_store(&self, store: &StoreInfo) -> AppResult<JsonValue> {
        let response = self
            .client
            .post(self.url("/store/sync"))
            .json(store)
            .send()
            .await
            .map_err(|e| AppError::UsageBackend(format!("Store sync request failed: {}", e)))?;

        self.handle_response(response).await
    }

    async fn get_usage(&self, shop_domain: &str) -> AppResult<JsonValue> {
        let response = self
            .client
            .get(self.url(&format!("/usage/{}", shop_domain)))
            .send()
            .await
            .map_err(|e| AppError::UsageBackend(format!("Usage lookup failed: {}", e)))?;

        self.handle_response(response).await
    }
}
