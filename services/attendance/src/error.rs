//! Custom error types for the attendance service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use common::error::StoreError;

/// Custom error type for the attendance service
///
/// Every handler failure comes from the store taxonomy; this wrapper
/// only maps it onto HTTP status codes.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Store(StoreError::Connectivity(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Persistence backend unavailable".to_string(),
            ),
            ApiError::Store(err @ StoreError::Constraint(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ApiError::Store(err @ StoreError::InvalidState(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
