use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::money::Money;

/// Business-rule rejections and store failures raised by the ledger.
///
/// Messages carry the concrete numbers so a front-end can show them as is.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("User not found")]
    NotFound(String),

    #[error("User with NFC ID {0} already exists")]
    AlreadyExists(String),

    #[error("User is underage and cannot purchase alcoholic cocktails")]
    Forbidden,

    #[error("Insufficient balance. Current: {current}, Required: {required}")]
    InsufficientFunds { current: Money, required: Money },

    #[error("Balance cannot go below {minimum}. Current: {current}, Requested: {requested}")]
    BelowMinimum {
        current: Money,
        requested: Money,
        minimum: Money,
    },

    #[error("{0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(&'static str),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Ledger(LedgerError::Validation(rejection.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(e) => match e {
                LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
                LedgerError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
                LedgerError::Forbidden => StatusCode::FORBIDDEN,
                LedgerError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
                LedgerError::BelowMinimum { .. } => StatusCode::BAD_REQUEST,
                LedgerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                LedgerError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::Ledger(LedgerError::Unavailable(ref e)) => {
                tracing::error!("Database error: {:?}", e);
                "An internal database error occurred".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
