pub mod billing_provider;
pub mod metafield_store;
pub mod usage_backend;
