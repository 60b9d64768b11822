use std::str::FromStr;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, header::AUTHORIZATION},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{
        jwt, ports::usage_backend::StoreInfo, use_cases::shop_services::ShopServices,
        validators::is_valid_shop_domain,
    },
    domain::entities::pricing_plan::PricingPlan,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{shop}/usage", get(get_usage))
        .route("/{shop}/statistics", get(get_statistics))
        .route("/{shop}/settings", get(get_settings))
        .route("/{shop}/billing/confirm", post(confirm_plan))
        .route("/{shop}/billing/{plan}", post(change_plan))
        .route("/{shop}/sync", post(sync_store))
        .route("/{shop}/backend-usage", get(get_backend_usage))
}

// ============================================================================
// Session token gate
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Require an embedded-app session token issued for `shop`.
fn authorize(app_state: &AppState, headers: &HeaderMap, shop: &str) -> AppResult<()> {
    if !is_valid_shop_domain(shop) {
        return Err(AppError::InvalidInput(format!("invalid shop domain: {}", shop)));
    }

    let token = bearer_token(headers).ok_or(AppError::InvalidCredentials)?;
    jwt::authorize_shop(
        token,
        &app_state.config.shopify_api_secret,
        &app_state.config.shopify_api_key,
        shop,
    )?;
    Ok(())
}

async fn authorized_services(
    app_state: &AppState,
    headers: &HeaderMap,
    shop: &str,
) -> AppResult<ShopServices> {
    authorize(app_state, headers, shop)?;
    app_state.shop_services.for_shop(shop).await
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/shops/{shop}/usage
async fn get_usage(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(shop): Path<String>,
) -> AppResult<impl IntoResponse> {
    let services = authorized_services(&app_state, &headers, &shop).await?;
    let plan = services.plans.resolve_effective_plan().await;
    Ok(Json(services.ledger.usage_summary(plan).await))
}

/// GET /api/shops/{shop}/statistics
async fn get_statistics(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(shop): Path<String>,
) -> AppResult<impl IntoResponse> {
    let services = authorized_services(&app_state, &headers, &shop).await?;
    Ok(Json(services.ledger.statistics().await))
}

/// GET /api/shops/{shop}/settings
async fn get_settings(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(shop): Path<String>,
) -> AppResult<impl IntoResponse> {
    let services = authorized_services(&app_state, &headers, &shop).await?;
    Ok(Json(services.donation_settings().await?))
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum PlanChangeResponse {
    /// The merchant must approve the charge at `confirmation_url`.
    PendingApproval {
        plan: PricingPlan,
        confirmation_url: String,
    },
    Active {
        plan: PricingPlan,
    },
}

/// POST /api/shops/{shop}/billing/{plan}
async fn change_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path((shop, plan)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    authorize(&app_state, &headers, &shop)?;
    let plan = PricingPlan::from_str(&plan)
        .map_err(|_| AppError::InvalidInput(format!("unknown plan: {}", plan)))?;
    let services = app_state.shop_services.for_shop(&shop).await?;

    if !plan.is_paid() {
        services.plans.downgrade_to_free().await?;
        return Ok(Json(PlanChangeResponse::Active { plan }));
    }

    let created = services.plans.subscribe(plan).await?;
    Ok(Json(PlanChangeResponse::PendingApproval {
        plan,
        confirmation_url: created.confirmation_url,
    }))
}

/// POST /api/shops/{shop}/billing/confirm
async fn confirm_plan(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(shop): Path<String>,
) -> AppResult<impl IntoResponse> {
    let services = authorized_services(&app_state, &headers, &shop).await?;
    let plan = services.plans.confirm_plan().await?;
    Ok(Json(PlanChangeResponse::Active { plan }))
}

#[derive(Debug, Deserialize)]
struct SyncStoreRequest {
    name: Option<String>,
    email: Option<String>,
    country: Option<String>,
    currency: Option<String>,
    plan_name: Option<String>,
}

#[derive(Serialize)]
struct SyncStoreResponse {
    synced: bool,
    backend: Option<JsonValue>,
}

/// POST /api/shops/{shop}/sync
async fn sync_store(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(shop): Path<String>,
    Json(payload): Json<SyncStoreRequest>,
) -> AppResult<impl IntoResponse> {
    authorize(&app_state, &headers, &shop)?;
    let info = StoreInfo {
        shop_domain: shop,
        name: payload.name,
        email: payload.email,
        country: payload.country,
        currency: payload.currency,
        plan_name: payload.plan_name,
    };

    let backend = app_state.store_sync_use_cases.sync(&info).await;
    Ok(Json(SyncStoreResponse {
        synced: backend.is_some(),
        backend,
    }))
}

/// GET /api/shops/{shop}/backend-usage
async fn get_backend_usage(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Path(shop): Path<String>,
) -> AppResult<impl IntoResponse> {
    authorize(&app_state, &headers, &shop)?;
    Ok(Json(
        app_state.store_sync_use_cases.backend_usage(&shop).await?,
    ))
}
