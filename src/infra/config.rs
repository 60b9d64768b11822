use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::domain::entities::metafield::DEFAULT_NAMESPACE;

pub const DEFAULT_SHOPIFY_API_VERSION: &str = "2025-10";
pub const DEFAULT_USAGE_BACKEND_URL: &str = "https://tree-backend-navy.vercel.app/api";

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Redis holding shop sessions written by the install flow.
    pub redis_url: String,
    /// Public URL of the embedded app; billing approvals return to `{app_url}/app/pricing`.
    pub app_url: Url,
    pub shopify_api_version: String,
    /// Client id of the app; the audience of embedded-app session tokens.
    pub shopify_api_key: String,
    /// Client secret signing embedded-app session tokens.
    pub shopify_api_secret: SecretString,
    /// Create test charges. Must be switched off in production.
    pub billing_test: bool,
    /// Base URL of the external usage backend, without trailing slash.
    pub usage_backend_url: String,
    pub metafield_namespace: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let app_url: Url = get_env("SHOPIFY_APP_URL");
        let shopify_api_version: String = get_env_default(
            "SHOPIFY_API_VERSION",
            DEFAULT_SHOPIFY_API_VERSION.to_string(),
        );
        let shopify_api_key: String = get_env("SHOPIFY_API_KEY");
        let shopify_api_secret: SecretString =
            SecretString::new(get_env::<String>("SHOPIFY_API_SECRET").into());
        // Default to test charges; production must opt out explicitly
        let billing_test: bool = get_env_default("SHOPIFY_BILLING_TEST", true);
        let usage_backend_url: String =
            get_env_default("USAGE_BACKEND_URL", DEFAULT_USAGE_BACKEND_URL.to_string());
        let metafield_namespace: String =
            get_env_default("METAFIELD_NAMESPACE", DEFAULT_NAMESPACE.to_string());

        Self {
            bind_addr,
            cors_origin,
            redis_url,
            app_url,
            shopify_api_version,
            shopify_api_key,
            shopify_api_secret,
            billing_test,
            usage_backend_url: usage_backend_url.trim_end_matches('/').to_string(),
            metafield_namespace,
        }
    }

    pub fn billing_return_url(&self) -> String {
        pricing_url(&self.app_url)
    }
}

fn pricing_url(app_url: &Url) -> String {
    format!("{}/app/pricing", app_url.as_str().trim_end_matches('/'))
}
