//! Error types for the query side.

use catalog_search_repository::StoreError;
use thiserror::Error;

/// Errors that can occur while serving a search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    /// The search criteria cannot be compiled into a request.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The document store failed the request.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SearchError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
