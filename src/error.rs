use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures coming out of the user/post stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} already exists")]
    DuplicateKey { field: &'static str },

    #[error("record not found")]
    NotFound,

    /// Pool exhausted, connection dropped or call timed out. Worth retrying.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{field} already exists, please choose another")]
    DuplicateKey { field: &'static str },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Login unsuccessful. Please check email and password")]
    InvalidCredential,

    #[error("That is an invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("You are not allowed to modify this resource")]
    Forbidden,

    #[error("Please log in to access this page")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateKey { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredential | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Store(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { field } => AppError::DuplicateKey { field },
            other => AppError::Store(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(e) => {
                tracing::error!(error = %e, retryable = e.is_retryable(), "store error");
                if e.is_retryable() {
                    "Service temporarily unavailable, please retry".to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
            AppError::Internal(detail) => {
                tracing::error!(error = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
