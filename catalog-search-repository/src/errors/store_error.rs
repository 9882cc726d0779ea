//! Document store error types.
//!
//! This module defines the errors a document store adapter can raise. Per-item
//! bulk failures are not errors; they are reported in the bulk response.

use thiserror::Error;

/// Errors that can occur while talking to the document store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The store could not be reached or refused service.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A mapping could not be applied because it conflicts with the existing one.
    #[error("Mapping conflict: {0}")]
    MappingConflict(String),

    /// The named index or alias does not exist.
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// An index with that name already exists.
    #[error("Index already exists: {0}")]
    IndexAlreadyExists(String),

    /// The store rejected the request.
    #[error("Request error: {0}")]
    RequestError(String),

    /// Failed to parse a response from the store.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a mapping conflict error.
    pub fn mapping_conflict(msg: impl Into<String>) -> Self {
        Self::MappingConflict(msg.into())
    }

    /// Create an index not found error.
    pub fn index_not_found(name: impl Into<String>) -> Self {
        Self::IndexNotFound(name.into())
    }

    /// Create an index already exists error.
    pub fn index_already_exists(name: impl Into<String>) -> Self {
        Self::IndexAlreadyExists(name.into())
    }

    /// Create a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::RequestError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// True for errors worth retrying later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
