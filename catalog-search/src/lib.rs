//! # Catalog Search
//!
//! Entry point and configuration for the faceted catalog search service.
//!
//! This crate wires a document store into the indexer and the query service
//! and exposes both through the `catalog-search` command line.

pub mod commands;
pub mod config;

pub use config::{Backend, Dependencies, LogFormat, Settings};

use thiserror::Error;

use catalog_search_indexer::IndexingError;
use catalog_search_query::SearchError;
use catalog_search_repository::StoreError;
use catalog_search_shared::CategoryError;

/// Errors that can occur while starting or running a command.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A command line argument could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Store error.
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    /// Indexing error.
    #[error("Indexing error: {0}")]
    IndexingError(#[from] IndexingError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Catalog generation error.
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CategoryError),

    /// Output serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
