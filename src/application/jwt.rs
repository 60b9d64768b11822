use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::app_error::{AppError, AppResult};

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
const SESSION_TOKEN_LEEWAY_SECS: u64 = 10;

// ============================================================================
// Embedded App Session Token
// ============================================================================

/// Claims of the session token App Bridge sends from the embedded admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokenClaims {
    /// `https://{shop}/admin`
    pub iss: String,
    /// `https://{shop}`
    pub dest: String,
    /// The app's API key.
    pub aud: String,
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
    pub iat: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

impl SessionTokenClaims {
    /// Shop the token was issued for. `None` when `iss` and `dest` disagree.
    pub fn shop(&self) -> Option<&str> {
        let shop = self.dest.strip_prefix("https://")?;
        let rest = self.iss.strip_prefix(&self.dest)?;
        (rest.is_empty() || rest.starts_with('/')).then_some(shop)
    }
}

pub fn verify_session_token(
    token: &str,
    api_secret: &SecretString,
    api_key: &str,
) -> AppResult<SessionTokenClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[api_key]);
    validation.validate_nbf = true;
    validation.leeway = SESSION_TOKEN_LEEWAY_SECS;

    decode::<SessionTokenClaims>(
        token,
        &DecodingKey::from_secret(api_secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!(error = %e, "Session token rejected");
        AppError::InvalidCredentials
    })
}

/// Verify `token` and that it belongs to `shop`.
pub fn authorize_shop(
    token: &str,
    api_secret: &SecretString,
    api_key: &str,
    shop: &str,
) -> AppResult<SessionTokenClaims> {
    let claims = verify_session_token(token, api_secret, api_key)?;
    if claims.shop() != Some(shop) {
        tracing::warn!(shop, dest = %claims.dest, "Session token issued for another shop");
        return Err(AppError::InvalidCredentials);
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        TEST_SHOPIFY_API_KEY, TEST_SHOPIFY_API_SECRET, create_test_session_token,
    };

    const SHOP: &str = "green-goods.myshopify.com";

    fn secret() -> SecretString {
        SecretString::from(TEST_SHOPIFY_API_SECRET.to_string())
    }

    #[test]
    fn accepts_token_for_the_shop() {
        let token = create_test_session_token(SHOP, |_| {});

        let claims = authorize_shop(&token, &secret(), TEST_SHOPIFY_API_KEY, SHOP).unwrap();
        assert_eq!(claims.shop(), Some(SHOP));
    }

    #[test]
    fn rejects_token_for_another_shop() {
        let token = create_test_session_token("other.myshopify.com", |_| {});

        assert!(matches!(
            authorize_shop(&token, &secret(), TEST_SHOPIFY_API_KEY, SHOP),
            Err(AppError::InvalidCredentials)
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let token = create_test_session_token(SHOP, |c| {
            c.exp = c.iat - 120;
            c.nbf = c.iat - 180;
        });

        assert!(verify_session_token(&token, &secret(), TEST_SHOPIFY_API_KEY).is_err());
    }

    #[test]
    fn rejects_wrong_audience_and_secret() {
        let token = create_test_session_token(SHOP, |_| {});

        assert!(verify_session_token(&token, &secret(), "another-app").is_err());
        assert!(
            verify_session_token(&token, &SecretString::from("wrong".to_string()), TEST_SHOPIFY_API_KEY)
                .is_err()
        );
    }

    #[test]
    fn mismatched_issuer_has_no_shop() {
        let token = create_test_session_token(SHOP, |c| {
            c.iss = "https://other.myshopify.com/admin".to_string();
        });

        assert!(matches!(
            authorize_shop(&token, &secret(), TEST_SHOPIFY_API_KEY, SHOP),
            Err(AppError::InvalidCredentials)
        ));
    }
}
