//! In-memory document store.
//!
//! Keeps indices, mappings and aliases in process and evaluates the query tree
//! directly over JSON sources. Used as the test double for every service in
//! the workspace and for local runs without a cluster.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::memory::eval::{aggregate, root_values, scalar_string, sort_hits, Evaluator, Scope, Scored};
use crate::memory::mapping::{
    analyze, empty_mapping, hidden_nested_paths, merge_mapping, text_tokens, validate_document,
};
use crate::types::{
    BulkItem, BulkItemResult, BulkResponse, DocumentRef, JoinParent, QueryNode, SearchHit,
    SearchRequest, SearchResponse, SortSpec, StoredDocument, SuggestOption, SuggestRequest,
};

/// A stored document.
#[derive(Debug, Clone)]
pub(crate) struct MemoryDocument {
    pub doc_type: String,
    pub id: String,
    pub parent: Option<JoinParent>,
    pub source: Value,
    pub seq: u64,
}

#[derive(Debug, Default)]
struct MemoryIndex {
    settings: Value,
    mappings: BTreeMap<String, Value>,
    documents: BTreeMap<(String, String), MemoryDocument>,
    next_seq: u64,
}

impl MemoryIndex {
    fn hidden_paths(&self) -> BTreeSet<String> {
        self.mappings.values().flat_map(hidden_nested_paths).collect()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    indices: BTreeMap<String, MemoryIndex>,
    /// alias -> indices it points at
    aliases: BTreeMap<String, BTreeSet<String>>,
    unavailable: bool,
    failing_deletes: BTreeSet<String>,
}

impl MemoryState {
    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::unavailable("in-memory store marked unavailable"));
        }
        Ok(())
    }

    /// Concrete indices behind a name.
    fn resolve(&self, name: &str) -> Result<Vec<String>, StoreError> {
        if self.indices.contains_key(name) {
            return Ok(vec![name.to_string()]);
        }
        match self.aliases.get(name) {
            Some(targets) if !targets.is_empty() => Ok(targets.iter().cloned().collect()),
            _ => Err(StoreError::index_not_found(name)),
        }
    }

    /// The single index a write to `name` lands in.
    fn resolve_write(&self, name: &str) -> Result<String, StoreError> {
        let mut targets = self.resolve(name)?;
        if targets.len() != 1 {
            return Err(StoreError::request(format!(
                "alias [{}] points to {} indices, cannot write through it",
                name,
                targets.len()
            )));
        }
        Ok(targets.remove(0))
    }

    fn write(&mut self, item: &BulkItem) -> Result<(), StoreError> {
        let target = self.resolve_write(&item.index)?;
        let index = self
            .indices
            .get_mut(&target)
            .ok_or_else(|| StoreError::index_not_found(&target))?;

        if let Some(mapping) = index.mappings.get(&item.doc_type) {
            validate_document(mapping, &item.body).map_err(StoreError::request)?;
        }

        let seq = index.next_seq;
        index.next_seq += 1;
        index.documents.insert(
            (item.doc_type.clone(), item.id.clone()),
            MemoryDocument {
                doc_type: item.doc_type.clone(),
                id: item.id.clone(),
                parent: item.join.as_ref().and_then(|join| join.parent.clone()),
                source: item.body.clone(),
                seq,
            },
        );
        Ok(())
    }

    fn find_document(&self, index: &str, doc_type: &str, id: &str) -> Result<Option<&MemoryDocument>, StoreError> {
        let key = (doc_type.to_string(), id.to_string());
        for name in self.resolve(index)? {
            if let Some(doc) = self.indices.get(&name).and_then(|i| i.documents.get(&key)) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }
}

/// Document store held entirely in memory.
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(MemoryDocumentStore::new());
/// store.create_index("comwebsite20240101000000000", &settings).await?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: RwLock<MemoryState>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail as if the store were unreachable.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Make deletion of `index` fail until cleared.
    pub async fn fail_index_deletion(&self, index: impl Into<String>) {
        self.state.write().await.failing_deletes.insert(index.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing_deletes.clear();
        state.unavailable = false;
    }

    /// Indices an alias points at, sorted.
    pub async fn alias_targets(&self, alias: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .aliases
            .get(alias)
            .map(|targets| targets.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of documents of `doc_type` behind `name`.
    pub async fn document_count(&self, name: &str, doc_type: &str) -> usize {
        let state = self.state.read().await;
        state
            .resolve(name)
            .unwrap_or_default()
            .iter()
            .filter_map(|index| state.indices.get(index))
            .map(|index| {
                index
                    .documents
                    .values()
                    .filter(|doc| doc.doc_type == doc_type)
                    .count()
            })
            .sum()
    }

    /// The stored mapping of one document type.
    pub async fn mapping(&self, index: &str, doc_type: &str) -> Option<Value> {
        let state = self.state.read().await;
        let target = state.resolve_write(index).ok()?;
        state.indices.get(&target)?.mappings.get(doc_type).cloned()
    }
}

/// Tokens of the `like` documents of every more-like-this clause in a tree.
fn collect_like(
    state: &MemoryState,
    node: &QueryNode,
    tokens: &mut HashSet<String>,
    docs: &mut HashSet<(String, String)>,
) {
    match node {
        QueryNode::MoreLikeThis { fields, like, .. } => {
            for DocumentRef { index, doc_type, id } in like {
                docs.insert((doc_type.clone(), id.clone()));
                if let Ok(Some(doc)) = state.find_document(index, doc_type, id) {
                    for field in fields {
                        for value in root_values(&doc.source, field, &BTreeSet::new()) {
                            if let Some(text) = scalar_string(value) {
                                tokens.extend(text_tokens(&text));
                            }
                        }
                    }
                }
            }
        }
        QueryNode::Bool {
            must,
            filter,
            should,
            ..
        } => {
            for child in must.iter().chain(filter).chain(should) {
                collect_like(state, child, tokens, docs);
            }
        }
        QueryNode::Nested { query, .. }
        | QueryNode::HasChild { query, .. }
        | QueryNode::FunctionScore { query, .. } => collect_like(state, query, tokens, docs),
        _ => {}
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    #[instrument(skip(self, request), fields(indices = ?request.indices))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;

        let mut names = BTreeSet::new();
        for name in &request.indices {
            names.extend(state.resolve(name)?);
        }
        let names: Vec<String> = names.into_iter().collect();

        let mut like_tokens = HashSet::new();
        let mut like_docs = HashSet::new();
        collect_like(&state, &request.query, &mut like_tokens, &mut like_docs);

        let mut matched: Vec<Scored<'_>> = Vec::new();
        let mut hidden = BTreeSet::new();
        for (position, name) in names.iter().enumerate() {
            let Some(index) = state.indices.get(name) else {
                continue;
            };
            let index_hidden = index.hidden_paths();
            let evaluator = Evaluator {
                documents: &index.documents,
                hidden: &index_hidden,
                like_tokens: &like_tokens,
                like_docs: &like_docs,
            };

            let mut docs: Vec<&MemoryDocument> = index.documents.values().collect();
            docs.sort_by_key(|doc| doc.seq);
            for doc in docs {
                if !request.document_types.is_empty() && !request.document_types.contains(&doc.doc_type) {
                    continue;
                }
                if let Some(score) = evaluator.score(&request.query, doc, Scope::Root) {
                    matched.push(Scored {
                        doc,
                        score,
                        position: (position, doc.seq),
                    });
                }
            }

            hidden.extend(index_hidden);
        }

        let docs: Vec<&MemoryDocument> = matched.iter().map(|hit| hit.doc).collect();
        let aggregations = request
            .aggregations
            .iter()
            .map(|spec| aggregate(spec, &docs, &hidden))
            .collect();

        sort_hits(&mut matched, &request.sort);

        if let Some(rescore) = &request.rescore {
            let window = rescore.window_size.min(matched.len());
            for hit in matched.iter_mut().take(window) {
                let Some(index) = state.indices.get(&names[hit.position.0]) else {
                    continue;
                };
                let evaluator = Evaluator {
                    documents: &index.documents,
                    hidden: &hidden,
                    like_tokens: &like_tokens,
                    like_docs: &like_docs,
                };
                let boost = evaluator
                    .score(&rescore.query, hit.doc, Scope::Root)
                    .map_or(0.0, |s| s * rescore.rescore_query_weight);
                hit.score = hit.score * rescore.query_weight + boost;
            }
            sort_hits(&mut matched[..window], &[]);
        }

        let total = matched.len() as u64;
        let scored = request.sort.is_empty()
            || request.sort.iter().any(|spec| matches!(spec, SortSpec::Score));
        let hits = matched
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|hit| SearchHit {
                id: hit.doc.id.clone(),
                doc_type: hit.doc.doc_type.clone(),
                score: scored.then_some(hit.score),
                source: hit.doc.source.clone(),
            })
            .collect();

        debug!(total = total, "Search evaluated");

        Ok(SearchResponse {
            total,
            hits,
            aggregations,
        })
    }

    async fn get_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<Option<StoredDocument>, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;

        let Some(doc) = state.find_document(index, doc_type, id)? else {
            return Ok(None);
        };

        let source = if fields.is_empty() {
            doc.source.clone()
        } else {
            let selected = doc
                .source
                .as_object()
                .map(|map| {
                    map.iter()
                        .filter(|(key, _)| fields.contains(&key.as_str()))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();
            Value::Object(selected)
        };

        Ok(Some(StoredDocument {
            id: doc.id.clone(),
            doc_type: doc.doc_type.clone(),
            source,
        }))
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<Vec<SuggestOption>, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;

        let prefix = request.text.trim().to_lowercase();
        let mut found = BTreeSet::new();
        for name in &request.indices {
            for index in state.resolve(name)? {
                let Some(index) = state.indices.get(&index) else {
                    continue;
                };
                for doc in index.documents.values() {
                    for value in root_values(&doc.source, &request.field, &BTreeSet::new()) {
                        if let Some(text) = scalar_string(value) {
                            if text.to_lowercase().starts_with(&prefix) {
                                found.insert(text);
                            }
                        }
                    }
                }
            }
        }

        Ok(found
            .into_iter()
            .take(request.size)
            .map(|text| SuggestOption { text, score: 1.0 })
            .collect())
    }

    #[instrument(skip(self, items), fields(item_count = items.len()))]
    async fn bulk_write(&self, items: &[BulkItem]) -> Result<BulkResponse, StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        let items = items
            .iter()
            .map(|item| {
                let outcome = state.write(item);
                BulkItemResult {
                    doc_type: item.doc_type.clone(),
                    id: item.id.clone(),
                    success: outcome.is_ok(),
                    error: outcome.err().map(|e| e.to_string()),
                }
            })
            .collect();

        Ok(BulkResponse { items })
    }

    async fn index_document(&self, item: &BulkItem) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;
        state.write(item)
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        let target = state.resolve_write(index)?;
        let removed = state
            .indices
            .get_mut(&target)
            .and_then(|index| index.documents.remove(&(doc_type.to_string(), id.to_string())));
        Ok(removed.is_some())
    }

    async fn document_exists(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.find_document(index, doc_type, id)?.is_some())
    }

    async fn create_index(&self, name: &str, settings: &Value) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if state.indices.contains_key(name) || state.aliases.contains_key(name) {
            return Err(StoreError::index_already_exists(name));
        }

        state.indices.insert(
            name.to_string(),
            MemoryIndex {
                settings: settings.clone(),
                ..MemoryIndex::default()
            },
        );
        info!(index = %name, "Index created");
        Ok(())
    }

    async fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &Value,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        for target in state.resolve(index)? {
            let Some(index) = state.indices.get_mut(&target) else {
                continue;
            };
            let existing = index
                .mappings
                .get(doc_type)
                .cloned()
                .unwrap_or_else(empty_mapping);
            let merged = merge_mapping(&existing, mapping)?;
            index.mappings.insert(doc_type.to_string(), merged);
        }
        Ok(())
    }

    async fn alias_add(&self, index: &str, alias: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if !state.indices.contains_key(index) {
            return Err(StoreError::index_not_found(index));
        }
        if state.indices.contains_key(alias) {
            return Err(StoreError::request(format!(
                "invalid alias name [{}], an index exists with the same name",
                alias
            )));
        }

        state
            .aliases
            .entry(alias.to_string())
            .or_default()
            .insert(index.to_string());
        Ok(())
    }

    async fn alias_remove(&self, index: &str, alias: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        let removed = state
            .aliases
            .get_mut(alias)
            .map(|targets| targets.remove(index))
            .unwrap_or(false);
        if !removed {
            return Err(StoreError::index_not_found(format!(
                "alias [{}] is not set on [{}]",
                alias, index
            )));
        }
        state.aliases.retain(|_, targets| !targets.is_empty());
        Ok(())
    }

    async fn alias_swap(&self, alias: &str, add: &str, remove: &[String]) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if !state.indices.contains_key(add) {
            return Err(StoreError::index_not_found(add));
        }
        if state.indices.contains_key(alias) {
            return Err(StoreError::request(format!(
                "invalid alias name [{}], an index exists with the same name",
                alias
            )));
        }

        let targets = state.aliases.entry(alias.to_string()).or_default();
        for index in remove.iter().filter(|index| index.as_str() != add) {
            targets.remove(index);
        }
        targets.insert(add.to_string());
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.indices.contains_key(name))
    }

    async fn alias_exists(&self, alias: &str) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.aliases.contains_key(alias))
    }

    async fn list_indices(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;
        Ok(state.indices.keys().cloned().collect())
    }

    async fn delete_index(&self, name: &str) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        state.ensure_available()?;

        if state.failing_deletes.contains(name) {
            return Err(StoreError::request(format!("deletion of [{}] rejected", name)));
        }
        if state.indices.remove(name).is_none() {
            return Ok(false);
        }
        for targets in state.aliases.values_mut() {
            targets.remove(name);
        }
        state.aliases.retain(|_, targets| !targets.is_empty());

        info!(index = %name, "Index deleted");
        Ok(true)
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;
        state.resolve(index).map(|_| ())
    }

    async fn analyze(
        &self,
        index: &str,
        analyzer: &str,
        text: &str,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        state.ensure_available()?;

        let target = state.resolve_write(index)?;
        let settings = state
            .indices
            .get(&target)
            .map(|index| &index.settings)
            .ok_or_else(|| StoreError::index_not_found(&target))?;
        analyze(settings, analyzer, text)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(!self.state.read().await.unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AggregationSpec, JoinField, RangeBucketSpec, Rescore};
    use serde_json::json;

    fn item(index: &str, doc_type: &str, id: &str, body: Value) -> BulkItem {
        BulkItem {
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            id: id.to_string(),
            join: None,
            body,
        }
    }

    async fn store_with_products() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store.create_index("shop1", &json!({})).await.unwrap();
        store.alias_add("shop1", "shop").await.unwrap();
        store
            .put_mapping(
                "shop1",
                "product",
                &json!({
                    "dynamic": "strict",
                    "properties": {
                        "title": { "type": "text" },
                        "price": { "type": "double" },
                        "boostfactor": { "type": "float" }
                    }
                }),
            )
            .await
            .unwrap();

        let items: Vec<BulkItem> = (0..5)
            .map(|i| {
                item(
                    "shop",
                    "product",
                    &i.to_string(),
                    json!({ "title": format!("Title {}", i), "price": i as f64, "boostfactor": i as f64 / 10.0 }),
                )
            })
            .collect();
        let response = store.bulk_write(&items).await.unwrap();
        assert_eq!(response.succeeded(), 5);
        store
    }

    #[tokio::test]
    async fn test_bulk_write_reports_strict_mapping_failures() {
        let store = store_with_products().await;

        let response = store
            .bulk_write(&[
                item("shop", "product", "10", json!({ "title": "ok" })),
                item("shop", "product", "11", json!({ "title": "bad", "colour": "red" })),
            ])
            .await
            .unwrap();

        assert_eq!(response.succeeded(), 1);
        assert_eq!(response.failed(), 1);
        assert!(response.items[1].error.as_ref().unwrap().contains("colour"));
        assert_eq!(store.document_count("shop", "product").await, 6);
    }

    #[tokio::test]
    async fn test_search_with_paging_range_and_function_score() {
        let store = store_with_products().await;

        let mut request = SearchRequest::new(
            vec!["shop".to_string()],
            vec!["product".to_string()],
            QueryNode::FunctionScore {
                query: Box::new(QueryNode::MatchAll),
                field: "boostfactor".to_string(),
                factor: 1.0,
                missing: 0.0,
            },
        );
        request.size = 2;
        request.aggregations = vec![AggregationSpec::Range {
            name: "price".to_string(),
            field: "price".to_string(),
            ranges: vec![RangeBucketSpec {
                key: "0-2".to_string(),
                from: Some(0.0),
                to: Some(2.0),
            }],
        }];

        let response = store.search(&request).await.unwrap();

        assert_eq!(response.total, 5);
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.hits[0].id, "4");
        assert_eq!(response.aggregation("price").unwrap().buckets[0].doc_count, 2);
    }

    #[tokio::test]
    async fn test_rescore_reorders_window() {
        let store = store_with_products().await;

        let mut request = SearchRequest::new(
            vec!["shop".to_string()],
            vec![],
            QueryNode::MatchAll,
        );
        request.rescore = Some(Rescore {
            window_size: 5,
            query: QueryNode::term("price", "3"),
            query_weight: 1.0,
            rescore_query_weight: 1.5,
        });

        let response = store.search(&request).await.unwrap();
        assert_eq!(response.hits[0].id, "3");
        assert_eq!(response.hits[0].score, Some(2.5));
    }

    #[tokio::test]
    async fn test_field_sort_hides_scores() {
        let store = store_with_products().await;

        let mut request = SearchRequest::new(vec!["shop".to_string()], vec![], QueryNode::MatchAll);
        request.sort = vec![SortSpec::Field {
            field: "price".to_string(),
            order: catalog_search_shared::SortOrder::Desc,
            missing_last: true,
        }];

        let response = store.search(&request).await.unwrap();
        assert_eq!(response.hits[0].id, "4");
        assert_eq!(response.hits[0].score, None);
    }

    #[tokio::test]
    async fn test_has_child() {
        let store = MemoryDocumentStore::new();
        store.create_index("shop", &json!({})).await.unwrap();
        let mut parent = item("shop", "product", "1", json!({ "title": "one" }));
        parent.join = Some(JoinField::root("product"));
        let mut other = item("shop", "product", "2", json!({ "title": "two" }));
        other.join = Some(JoinField::root("product"));
        let mut child = item("shop", "productproperty", "110000", json!({ "color": "brown" }));
        child.join = Some(JoinField::child("productproperty", "product", "1"));
        store.bulk_write(&[parent, other, child]).await.unwrap();

        let request = SearchRequest::new(
            vec!["shop".to_string()],
            vec!["product".to_string()],
            QueryNode::has_child("productproperty", QueryNode::term("color", "brown")),
        );
        let response = store.search(&request).await.unwrap();

        assert_eq!(response.total, 1);
        assert_eq!(response.hits[0].id, "1");
    }

    #[tokio::test]
    async fn test_aliases_and_index_deletion() {
        let store = store_with_products().await;

        assert!(store.alias_exists("shop").await.unwrap());
        assert!(!store.index_exists("shop").await.unwrap());
        assert!(store.index_exists("shop1").await.unwrap());
        assert!(matches!(
            store.create_index("shop", &json!({})).await,
            Err(StoreError::IndexAlreadyExists(_))
        ));

        store.fail_index_deletion("shop1").await;
        assert!(store.delete_index("shop1").await.is_err());
        store.clear_failures().await;

        assert!(store.delete_index("shop1").await.unwrap());
        assert!(!store.alias_exists("shop").await.unwrap());
        assert!(!store.delete_index("shop1").await.unwrap());
    }

    #[tokio::test]
    async fn test_alias_swap_moves_alias_in_one_step() {
        let store = store_with_products().await;
        store.create_index("shop2", &json!({})).await.unwrap();
        store.create_index("shop3", &json!({})).await.unwrap();

        store
            .alias_swap("shop", "shop2", &["shop1".to_string(), "shop3".to_string()])
            .await
            .unwrap();
        assert_eq!(store.alias_targets("shop").await, vec!["shop2".to_string()]);

        store.alias_add("shop3", "shop").await.unwrap();
        store.alias_remove("shop2", "shop").await.unwrap();
        assert_eq!(store.alias_targets("shop").await, vec!["shop3".to_string()]);

        assert!(matches!(
            store.alias_swap("shop", "missing", &["shop3".to_string()]).await,
            Err(StoreError::IndexNotFound(_))
        ));
        assert_eq!(store.alias_targets("shop").await, vec!["shop3".to_string()]);

        store.set_unavailable(true).await;
        assert!(store.alias_swap("shop", "shop1", &["shop3".to_string()]).await.is_err());
        store.set_unavailable(false).await;
        assert_eq!(store.alias_targets("shop").await, vec!["shop3".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = store_with_products().await;
        store.set_unavailable(true).await;

        let request = SearchRequest::new(vec!["shop".to_string()], vec![], QueryNode::MatchAll);
        assert!(matches!(
            store.search(&request).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(!store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_get_document_and_suggest() {
        let store = MemoryDocumentStore::new();
        store.create_index("shop", &json!({})).await.unwrap();
        store
            .bulk_write(&[
                item("shop", "product", "1", json!({ "title": "one", "keywords": ["Keyword 1"] })),
                item("shop", "product", "2", json!({ "title": "two", "keywords": ["Keyword 2", "Other"] })),
            ])
            .await
            .unwrap();

        let doc = store
            .get_document("shop", "product", "1", &["title"])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.source, json!({ "title": "one" }));
        assert!(store
            .get_document("shop", "product", "9", &[])
            .await
            .unwrap()
            .is_none());

        let options = store
            .suggest(&SuggestRequest {
                indices: vec!["shop".to_string()],
                field: "keywords".to_string(),
                text: "keyword".to_string(),
                size: 20,
            })
            .await
            .unwrap();
        let texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["Keyword 1", "Keyword 2"]);
    }
}
