//! Unified error handling for Logboard Core

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Query timeout after {0} ms")]
    QueryTimeout(u64),

    #[error("Request superseded by a newer search")]
    Superseded,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status code and public message for this error.
    fn public_parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::QueryTimeout(_) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Query timeout - try refining your search filters",
            ),
            AppError::Superseded => (StatusCode::CONFLICT, "Request superseded"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            AppError::OAuth(_) => (StatusCode::BAD_GATEWAY, "Authentication service error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.public_parts().0
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }
}

/// Full error text attached to error responses.
///
/// Only surfaced to clients outside production, by
/// [`crate::middleware::error_response::normalize_error_response`].
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.public_parts();

        match &self {
            AppError::Database(e) => tracing::error!("Database error: {:?}", e),
            AppError::QueryTimeout(ms) => tracing::warn!("Query exceeded {} ms deadline", ms),
            AppError::OAuth(msg) => tracing::error!("OAuth error: {}", msg),
            AppError::Internal(e) => tracing::error!("Internal error: {:?}", e),
            AppError::Unauthorized(_) | AppError::BadRequest(_) | AppError::Superseded => {
                tracing::debug!("{}", self)
            }
        }

        let mut response = (status, Json(ErrorResponse::new(message))).into_response();
        response
            .extensions_mut()
            .insert(ErrorDetail(self.to_string()));
        response
    }
}
