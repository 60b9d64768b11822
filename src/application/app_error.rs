use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Shopify API error: {0}")]
    Shopify(String),

    #[error("Usage backend error: {0}")]
    UsageBackend(String),

    #[error("Session store error: {0}")]
    SessionStore(String),

    #[error("No session for shop")]
    SessionNotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    ShopifyError,
    UsageBackendError,
    SessionStoreError,
    SessionNotFound,
    InvalidCredentials,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ShopifyError => "SHOPIFY_ERROR",
            ErrorCode::UsageBackendError => "USAGE_BACKEND_ERROR",
            ErrorCode::SessionStoreError => "SESSION_STORE_ERROR",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
