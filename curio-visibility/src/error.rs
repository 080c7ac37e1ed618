//! Error types for the visibility engine.

use curio_catalog::CatalogError;
use curio_types::UnknownValue;
use thiserror::Error;

/// Result type for visibility operations.
pub type VisibilityResult<T> = Result<T, VisibilityError>;

/// Errors that can occur in visibility operations.
#[derive(Debug, Error)]
pub enum VisibilityError {
    /// Bad entity type, mode, or request shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown user or target.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The entity catalog could not enumerate a type; the per-user
    /// recompute pass is aborted with no partial write.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The recompute deadline elapsed before the write phase.
    #[error("recompute timed out")]
    Timeout,
}

impl From<UnknownValue> for VisibilityError {
    fn from(err: UnknownValue) -> Self {
        VisibilityError::Validation(err.to_string())
    }
}
