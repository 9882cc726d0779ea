//! # Catalog Search Query
//!
//! The read side of the catalog search service.
//!
//! ## Architecture
//!
//! 1. **Compiler**: turns [`SearchCriteria`](catalog_search_shared::SearchCriteria)
//!    into a relevance clause, filters, sort and rescore
//! 2. **Facets**: plans one aggregation per facet code and decodes the buckets
//! 3. **Service**: runs searches, product lookups, suggestions and
//!    similar-product queries against a document store

pub mod compiler;
pub mod decode;
pub mod errors;
pub mod facets;
pub mod service;

pub use compiler::{escape_query_chars, QueryCompiler};
pub use errors::SearchError;
pub use facets::FacetPlanner;
pub use service::ProductQueryService;
