//! Entity catalog interface over the Curio mirror.
//!
//! The visibility engine never talks to the mirror tables directly; it
//! consumes the [`EntityCatalog`] and [`UserDirectory`] traits defined
//! here. Two implementations ship with the crate:
//!
//! - [`SqliteCatalog`] reads the mirror database the sync pipeline
//!   maintains
//! - [`MemoryCatalog`] backs tests and can simulate an unavailable
//!   upstream per entity type
//!
//! A catalog must be constructed and injected explicitly before any
//! recompute runs; "catalog not ready" surfaces as the distinct
//! [`CatalogError::Unavailable`] failure rather than an empty result.

mod catalog;
mod memory;
mod sqlite;

pub use catalog::{EntityCatalog, UserDirectory};
pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog cannot enumerate the requested data.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// Underlying mirror storage error.
    #[error("catalog storage error: {0}")]
    Storage(String),
}
