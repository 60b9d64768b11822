use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use secrecy::SecretString;

use crate::{
    app_error::{AppError, AppResult},
    infra::error::InfraError,
};

/// Offline access tokens of the shops that installed the app.
///
/// Tokens are written by the install flow; this service only reads them and
/// drops them on uninstall.
#[async_trait]
pub trait ShopSessionStoreTrait: Send + Sync {
    async fn access_token(&self, shop: &str) -> AppResult<Option<SecretString>>;

    async fn delete(&self, shop: &str) -> AppResult<()>;
}

#[derive(Clone)]
pub struct RedisSessionStore {
    manager: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }

    fn key(shop: &str) -> String {
        format!("shopify_session:{shop}")
    }
}

#[async_trait]
impl ShopSessionStoreTrait for RedisSessionStore {
    async fn access_token(&self, shop: &str) -> AppResult<Option<SecretString>> {
        let mut conn = self.manager.clone();

        let raw: Option<String> = conn
            .get(Self::key(shop))
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))?;

        Ok(raw.filter(|t| !t.is_empty()).map(SecretString::from))
    }

    async fn delete(&self, shop: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let _: () = conn
            .del(Self::key(shop))
            .await
            .map_err(|e| AppError::SessionStore(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_is_scoped_by_shop() {
        assert_eq!(
            RedisSessionStore::key("green-goods.myshopify.com"),
            "shopify_session:green-goods.myshopify.com"
        );
    }
}
