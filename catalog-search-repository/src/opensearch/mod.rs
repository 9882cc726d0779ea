//! OpenSearch implementation of the document store.
//!
//! This module provides a concrete implementation of `DocumentStore`
//! using OpenSearch as the backend.

mod client;
mod queries;

pub use client::OpenSearchClient;
pub use queries::{build_search_body, render_query};
