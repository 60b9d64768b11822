pub mod donation_detector;
pub mod limit_enforcer;
pub mod order_webhook;
pub mod plan_resolver;
pub mod shop_services;
pub mod store_sync;
pub mod usage_ledger;
