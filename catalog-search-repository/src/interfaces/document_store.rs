//! Document store trait definition.
//!
//! This module defines the abstract interface to the document store, allowing
//! different backends (OpenSearch, in-memory) behind the same services.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::StoreError;
use crate::types::{
    BulkItem, BulkResponse, SearchRequest, SearchResponse, StoredDocument, SuggestOption,
    SuggestRequest,
};

/// Abstracts the underlying document store.
///
/// Implementations are injected into the query service, the bulk indexer and
/// the lifecycle manager as `Arc<dyn DocumentStore>`. Names passed as `index`
/// may be a concrete index or an alias, unless stated otherwise.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a query with aggregations, sorting and paging.
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, StoreError>;

    /// Fetch one document. `fields` restricts the returned source; empty means all.
    async fn get_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<Option<StoredDocument>, StoreError>;

    /// Completion suggestions for a text prefix.
    async fn suggest(&self, request: &SuggestRequest) -> Result<Vec<SuggestOption>, StoreError>;

    /// Write many documents in one call.
    ///
    /// Per-item failures are reported in the response; an `Err` means the
    /// call as a whole failed.
    async fn bulk_write(&self, items: &[BulkItem]) -> Result<BulkResponse, StoreError>;

    /// Write one document, replacing any previous version.
    async fn index_document(&self, item: &BulkItem) -> Result<(), StoreError>;

    /// Delete one document. Returns `false` when it did not exist.
    async fn delete_document(&self, index: &str, doc_type: &str, id: &str)
        -> Result<bool, StoreError>;

    async fn document_exists(&self, index: &str, doc_type: &str, id: &str)
        -> Result<bool, StoreError>;

    /// Create a concrete index with the given settings body.
    async fn create_index(&self, name: &str, settings: &Value) -> Result<(), StoreError>;

    /// Apply the mapping of one document type.
    async fn put_mapping(&self, index: &str, doc_type: &str, mapping: &Value)
        -> Result<(), StoreError>;

    async fn alias_add(&self, index: &str, alias: &str) -> Result<(), StoreError>;

    async fn alias_remove(&self, index: &str, alias: &str) -> Result<(), StoreError>;

    /// Point `alias` at `add` and detach it from every index in `remove`, in
    /// one step. Indices in `remove` that do not carry the alias are skipped.
    async fn alias_swap(&self, alias: &str, add: &str, remove: &[String]) -> Result<(), StoreError>;

    /// True only for a concrete index of that name, not an alias.
    async fn index_exists(&self, name: &str) -> Result<bool, StoreError>;

    async fn alias_exists(&self, alias: &str) -> Result<bool, StoreError>;

    /// Names of all concrete indices.
    async fn list_indices(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a concrete index. Returns `false` when it did not exist.
    async fn delete_index(&self, name: &str) -> Result<bool, StoreError>;

    /// Make recent writes visible to search.
    async fn refresh(&self, index: &str) -> Result<(), StoreError>;

    /// Run a named analyzer of an index over some text.
    async fn analyze(&self, index: &str, analyzer: &str, text: &str)
        -> Result<Vec<String>, StoreError>;

    /// Check whether the store is reachable and healthy.
    async fn health_check(&self) -> Result<bool, StoreError>;
}
