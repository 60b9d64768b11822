pub mod app;
pub mod config;
pub mod error;
pub mod http_client;
pub mod session_store;
pub mod setup;
pub mod shopify_client;
pub mod usage_backend_client;
