//! # Catalog Search Indexer
//!
//! Owns the document schema and the lifecycle of the site indices.
//!
//! ## Architecture
//!
//! 1. **Schema**: index settings with the per-locale analysis chain, and strict
//!    mappings derived from the category facet table
//! 2. **Documents**: products, groups and properties rendered as index documents
//! 3. **Loader**: bulk indexing with per-entity failure reports
//! 4. **Lifecycle**: timestamped generations behind a stable alias

pub mod document;
pub mod errors;
pub mod lifecycle;
pub mod loader;
pub mod sample;
pub mod schema;

pub use document::DocumentBuilder;
pub use errors::{DocumentBuildError, IndexingError};
pub use lifecycle::{
    GenerationState, IndexLifecycleManager, IndexSource, LifecycleConfig, RecreateReport,
};
pub use loader::{IndexFailure, IndexReport, IndexStage, ProductIndexer};
pub use sample::SampleCatalog;
pub use schema::{index_settings, MappingBuilder};
