pub mod metafield;
pub mod order;
pub mod pricing_plan;
pub mod statistics;
pub mod subscription;
