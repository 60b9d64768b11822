use async_trait::async_trait;

use crate::{
    app_error::AppResult,
    domain::entities::metafield::{MetafieldRecord, MetafieldType},
};

/// Key-value store backed by the app installation's metafields.
///
/// An instance is bound to one shop; every call is scoped to that shop's installation.
/// Values are always strings on the wire, typed by `MetafieldType`.
#[async_trait]
pub trait MetafieldStoreTrait: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> AppResult<Option<MetafieldRecord>>;

    /// Records stored under any of `keys`. Missing keys are simply absent.
    ///
    /// Counters and settings are read through here rather than `get_all`, whose
    /// size grows with every recorded order.
    async fn get_many(&self, namespace: &str, keys: &[&str]) -> AppResult<Vec<MetafieldRecord>> {
        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self.get(namespace, key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn get_all(&self, namespace: &str) -> AppResult<Vec<MetafieldRecord>>;

    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value_type: MetafieldType,
        value: &str,
    ) -> AppResult<()>;

    async fn delete(&self, namespace: &str, key: &str) -> AppResult<()>;
}
