//! Custom error types for the processing gateway

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the processing gateway handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// No valid, verified session. The only shape unauthenticated callers
    /// ever see, regardless of why verification failed.
    #[error("EMAIL_REQUIRED")]
    EmailRequired,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The requested job output does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anything internal; details stay server-side
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::EmailRequired => (StatusCode::UNAUTHORIZED, "EMAIL_REQUIRED".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
