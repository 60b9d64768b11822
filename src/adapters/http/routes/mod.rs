pub mod shops;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

/// Admin API, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new().nest("/shops", shops::router())
}

/// Platform webhooks, mounted under `/webhooks`.
pub fn webhook_router() -> Router<AppState> {
    webhooks::router()
}
