//! Error-to-status mapping for the HTTP surface.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use curio_catalog::CatalogError;
use curio_visibility::VisibilityError;
use serde::Serialize;
use tracing::error;

/// API-level error with a fixed status mapping.
#[derive(Debug)]
pub enum ApiError {
    /// No authenticated principal on the request (401).
    Unauthenticated,
    /// Authenticated but not allowed, e.g. non-admin on an admin route (403).
    Forbidden,
    /// Bad entity type, mode, or request shape (400).
    Validation(String),
    /// Unknown user or target (404).
    NotFound(String),
    /// Catalog or recompute unavailable (503).
    Unavailable(String),
    /// Anything else (500). Details are logged, not leaked.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "authentication required".to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "admin role required".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => {
                error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization error: {err}"))
    }
}

impl From<VisibilityError> for ApiError {
    fn from(err: VisibilityError) -> Self {
        match err {
            VisibilityError::Validation(msg) => ApiError::Validation(msg),
            VisibilityError::NotFound(msg) => ApiError::NotFound(msg),
            VisibilityError::Catalog(CatalogError::Unavailable(msg)) => ApiError::Unavailable(msg),
            VisibilityError::Timeout => {
                ApiError::Unavailable("recompute timed out".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
