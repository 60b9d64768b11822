//! Shopify webhook handlers.
//!
//! Deliveries are acknowledged with `200` no matter what happened; failures are
//! logged. HMAC verification happens in front of this service.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use tracing::{info, warn};

use crate::{
    adapters::http::app_state::AppState, application::validators::is_valid_shop_domain,
    domain::entities::order::OrderPayload,
};

const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/create", post(orders_create))
        .route("/app/uninstalled", post(app_uninstalled))
}

fn shop_domain(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SHOP_DOMAIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|shop| is_valid_shop_domain(shop))
}

/// POST /webhooks/orders/create
async fn orders_create(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(shop) = shop_domain(&headers) else {
        warn!("orders/create without a valid shop domain header");
        return StatusCode::OK;
    };

    let order: OrderPayload = match serde_json::from_slice(&body) {
        Ok(order) => order,
        Err(e) => {
            warn!(shop = %shop, error = %e, "Unparseable orders/create payload");
            return StatusCode::OK;
        }
    };

    let outcome = app_state
        .order_webhook_use_cases
        .process_order(&shop, &order)
        .await;
    info!(shop = %shop, outcome = ?outcome, "orders/create handled");

    StatusCode::OK
}

/// POST /webhooks/app/uninstalled
async fn app_uninstalled(State(app_state): State<AppState>, headers: HeaderMap) -> StatusCode {
    let Some(shop) = shop_domain(&headers) else {
        warn!("app/uninstalled without a valid shop domain header");
        return StatusCode::OK;
    };

    match app_state.sessions.delete(&shop).await {
        Ok(()) => info!(shop = %shop, "Session removed after uninstall"),
        Err(e) => warn!(shop = %shop, error = %e, "Failed to remove session after uninstall"),
    }

    StatusCode::OK
}
