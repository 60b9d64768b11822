//! Test utilities.
//!
//! This module provides:
//! - In-memory implementations of the Shopify ports (metafields, billing, sessions)
//! - A recording usage backend
//! - Test data factories for orders, subscriptions and store info
//! - `TestAppStateBuilder` for HTTP-level tests

mod app_state_builder;
mod backend_mocks;
mod factories;
mod shopify_mocks;

pub use app_state_builder::*;
pub use backend_mocks::*;
pub use factories::*;
pub use shopify_mocks::*;
