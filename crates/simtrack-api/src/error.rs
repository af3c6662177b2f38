//! Error types for the API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.
//! Not-found and validation errors are client errors; database failures
//! surface as 500s.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use simtrack_db::DbError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A request failed validation before reaching the stores.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// A data-layer operation failed.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Validation(msg) | Self::InvalidUuid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Db(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("database error: {e}"),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Parse a UUID from a path segment, returning an [`ApiError`] on failure.
pub fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}
