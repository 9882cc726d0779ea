//! Error types for the indexing crate.

use catalog_search_repository::StoreError;
use catalog_search_shared::CategoryError;
use thiserror::Error;

/// A single entity could not be turned into a document.
///
/// Build errors are recovered per entity: the entity is skipped and reported,
/// the surrounding batch carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentBuildError {
    #[error("Category error: {0}")]
    Category(#[from] CategoryError),

    #[error("Invalid product {id}: {reason}")]
    InvalidProduct { id: i64, reason: String },
}

impl DocumentBuildError {
    pub fn invalid_product(id: i64, reason: impl Into<String>) -> Self {
        Self::InvalidProduct {
            id,
            reason: reason.into(),
        }
    }
}

/// Errors raised by indexing and index lifecycle operations.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// The document store rejected or failed a request.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A single-document operation could not build its document.
    #[error("Build error: {0}")]
    Build(#[from] DocumentBuildError),

    /// The index lifecycle could not make progress.
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// The caller supplied an unusable request.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl IndexingError {
    pub fn lifecycle(msg: impl Into<String>) -> Self {
        Self::Lifecycle(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
