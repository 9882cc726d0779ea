//! # Catalog Search Repository
//!
//! This crate provides the document store capability used by the catalog
//! search service: the store-agnostic query tree and request types, the
//! `DocumentStore` trait, and two implementations, OpenSearch and in-memory.

pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod types;

pub use errors::StoreError;
pub use interfaces::DocumentStore;
pub use memory::MemoryDocumentStore;
pub use opensearch::OpenSearchClient;
pub use types::{
    AggregationBucket, AggregationResult, AggregationSpec, BulkItem, BulkItemResult,
    BulkResponse, DocumentRef, JoinField, JoinParent, QueryNode, RangeBucketSpec, Rescore,
    SearchHit, SearchRequest, SearchResponse, SortSpec, StoredDocument, SuggestOption,
    SuggestRequest,
};
