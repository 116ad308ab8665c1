//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use edp_cache::CacheError;
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Result type alias for API handlers
pub type ApiResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Cache(ref err) => {
                tracing::error!(kind = err.kind(), "dataset load failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.kind(), err.to_string())
            },
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            },
        };

        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}
