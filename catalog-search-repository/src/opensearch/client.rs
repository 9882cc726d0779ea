//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `DocumentStore`
//! using the OpenSearch Rust client.
//!
//! A modern index carries a single mapping type, so the logical document type
//! travels in a `doc_type` keyword field, ids are prefixed with the type and
//! parent/child links use the `relation` join field with routing to the parent.

use async_trait::async_trait;
use catalog_search_shared::schema::fields;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{
        IndicesAnalyzeParts, IndicesCreateParts, IndicesDeleteParts, IndicesExistsAliasParts,
        IndicesGetParts, IndicesPutMappingParts, IndicesRefreshParts,
    },
    BulkParts, DeleteParts, ExistsParts, GetParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::errors::StoreError;
use crate::interfaces::DocumentStore;
use crate::opensearch::queries::{build_search_body, document_id, parse_search_response};
use crate::types::{
    BulkItem, BulkItemResult, BulkResponse, SearchRequest, SearchResponse, StoredDocument,
    SuggestOption, SuggestRequest,
};

/// Name of the completion suggester in suggest requests.
const SUGGESTION_NAME: &str = "catalog_suggest";

/// OpenSearch document store.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200").await?;
/// let healthy = client.health_check().await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(StoreError)` - If the URL is invalid or the transport cannot be built
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::unavailable(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| StoreError::unavailable(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }

    /// Source as written: the body plus the type and join fields.
    fn stored_source(item: &BulkItem) -> Value {
        let mut source = match &item.body {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        source.insert(fields::DOC_TYPE.to_string(), json!(item.doc_type));

        if let Some(join) = &item.join {
            let relation = match &join.parent {
                Some(parent) => json!({
                    "name": join.name,
                    "parent": document_id(&parent.doc_type, &parent.id)
                }),
                None => json!({ "name": join.name }),
            };
            source.insert(fields::RELATION.to_string(), relation);
        }

        Value::Object(source)
    }

    /// Routing key; children are routed to their parent's shard.
    fn routing(item: &BulkItem) -> Option<String> {
        item.join
            .as_ref()
            .and_then(|join| join.parent.as_ref())
            .map(|parent| document_id(&parent.doc_type, &parent.id))
    }

    /// One `_aliases` body; the cluster applies all actions atomically.
    fn alias_swap_body(alias: &str, add: &str, remove: &[String]) -> Value {
        let mut actions = vec![json!({ "add": { "index": add, "alias": alias } })];
        actions.extend(
            remove
                .iter()
                .filter(|index| index.as_str() != add)
                .map(|index| json!({ "remove": { "index": index, "alias": alias, "must_exist": false } })),
        );
        json!({ "actions": actions })
    }

    /// Turn a non-success response into an error, classified by the failure type.
    async fn check(response: Response, context: &str) -> Result<Response, StoreError> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!(status = %status, body = %body, context = %context, "OpenSearch request failed");

        let message = format!("{} failed with status {}: {}", context, status, body);
        Err(match status.as_u16() {
            404 => StoreError::index_not_found(message),
            429 | 502 | 503 | 504 => StoreError::unavailable(message),
            _ if body.contains("resource_already_exists_exception") => {
                StoreError::index_already_exists(message)
            }
            _ if body.contains("index_not_found_exception") => StoreError::index_not_found(message),
            _ => StoreError::request(message),
        })
    }

    async fn json(response: Response) -> Result<Value, StoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| StoreError::parse(e.to_string()))
    }
}

fn transport_error(e: opensearch::Error) -> StoreError {
    StoreError::unavailable(e.to_string())
}

#[async_trait]
impl DocumentStore for OpenSearchClient {
    #[instrument(skip(self, request), fields(indices = ?request.indices))]
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, StoreError> {
        let body = build_search_body(request);
        let indices: Vec<&str> = request.indices.iter().map(String::as_str).collect();

        debug!(body = %body, "Executing search");

        let response = self
            .client
            .search(SearchParts::Index(&indices))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::check(response, "Search").await?;
        let body = Self::json(response).await?;

        parse_search_response(&body, &request.aggregations)
    }

    async fn get_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        fields: &[&str],
    ) -> Result<Option<StoredDocument>, StoreError> {
        let doc_id = document_id(doc_type, id);
        let request = self.client.get(GetParts::IndexId(index, &doc_id));
        let request = if fields.is_empty() {
            request
        } else {
            request._source_includes(fields)
        };

        let response = request.send().await.map_err(transport_error)?;
        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }

        let response = Self::check(response, "Get").await?;
        let body = Self::json(response).await?;

        if !body["found"].as_bool().unwrap_or(false) {
            return Ok(None);
        }

        Ok(Some(StoredDocument {
            id: id.to_string(),
            doc_type: doc_type.to_string(),
            source: body["_source"].clone(),
        }))
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<Vec<SuggestOption>, StoreError> {
        let indices: Vec<&str> = request.indices.iter().map(String::as_str).collect();
        let body = json!({
            "_source": false,
            "suggest": {
                SUGGESTION_NAME: {
                    "prefix": request.text,
                    "completion": {
                        "field": request.field,
                        "size": request.size,
                        "skip_duplicates": true
                    }
                }
            }
        });

        let response = self
            .client
            .search(SearchParts::Index(&indices))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::check(response, "Suggest").await?;
        let body = Self::json(response).await?;

        let options = body["suggest"][SUGGESTION_NAME]
            .as_array()
            .into_iter()
            .flatten()
            .flat_map(|entry| entry["options"].as_array().cloned().unwrap_or_default())
            .filter_map(|option| {
                Some(SuggestOption {
                    text: option["text"].as_str()?.to_string(),
                    score: option["_score"].as_f64().unwrap_or(0.0),
                })
            })
            .collect();

        Ok(options)
    }

    #[instrument(skip(self, items), fields(item_count = items.len()))]
    async fn bulk_write(&self, items: &[BulkItem]) -> Result<BulkResponse, StoreError> {
        if items.is_empty() {
            return Ok(BulkResponse::default());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(items.len() * 2);
        for item in items {
            let mut action = json!({
                "_index": item.index,
                "_id": document_id(&item.doc_type, &item.id)
            });
            if let Some(routing) = Self::routing(item) {
                action["routing"] = json!(routing);
            }
            body.push(json!({ "index": action }).into());
            body.push(Self::stored_source(item).into());
        }

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::check(response, "Bulk").await?;
        let body = Self::json(response).await?;

        let results = body["items"].as_array().cloned().unwrap_or_default();
        let items = items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                let outcome = results.get(position).map(|r| &r["index"]);
                let error = match outcome {
                    None => Some("missing item in bulk response".to_string()),
                    Some(outcome) if outcome.get("error").is_some() => {
                        Some(outcome["error"].to_string())
                    }
                    Some(_) => None,
                };
                if let Some(ref reason) = error {
                    warn!(doc_type = %item.doc_type, id = %item.id, error = %reason, "Bulk item failed");
                }
                BulkItemResult {
                    doc_type: item.doc_type.clone(),
                    id: item.id.clone(),
                    success: error.is_none(),
                    error,
                }
            })
            .collect();

        Ok(BulkResponse { items })
    }

    async fn index_document(&self, item: &BulkItem) -> Result<(), StoreError> {
        let doc_id = document_id(&item.doc_type, &item.id);
        let routing = Self::routing(item);

        let request = self
            .client
            .index(IndexParts::IndexId(&item.index, &doc_id))
            .body(Self::stored_source(item));
        let request = match routing.as_deref() {
            Some(routing) => request.routing(routing),
            None => request,
        };

        let response = request.send().await.map_err(transport_error)?;
        Self::check(response, "Index").await?;

        debug!(doc_id = %doc_id, "Document indexed");
        Ok(())
    }

    async fn delete_document(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        let doc_id = document_id(doc_type, id);

        let response = self
            .client
            .delete(DeleteParts::IndexId(index, &doc_id))
            .send()
            .await
            .map_err(transport_error)?;

        // 404 is acceptable - document may not exist
        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        Self::check(response, "Delete").await?;

        debug!(doc_id = %doc_id, "Document deleted");
        Ok(true)
    }

    async fn document_exists(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
    ) -> Result<bool, StoreError> {
        let doc_id = document_id(doc_type, id);
        let response = self
            .client
            .exists(ExistsParts::IndexId(index, &doc_id))
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status_code().is_success())
    }

    #[instrument(skip(self, settings))]
    async fn create_index(&self, name: &str, settings: &Value) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(name))
            .body(settings.clone())
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response, "Create index").await?;
        info!(index = %name, "Index created");
        Ok(())
    }

    #[instrument(skip(self, mapping))]
    async fn put_mapping(
        &self,
        index: &str,
        doc_type: &str,
        mapping: &Value,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping.clone())
            .send()
            .await
            .map_err(transport_error)?;

        match Self::check(response, "Put mapping").await {
            Ok(_) => {
                debug!(index = %index, doc_type = %doc_type, "Mapping applied");
                Ok(())
            }
            Err(StoreError::RequestError(message)) => Err(StoreError::mapping_conflict(message)),
            Err(e) => Err(e),
        }
    }

    async fn alias_add(&self, index: &str, alias: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": [{ "add": { "index": index, "alias": alias } }] }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response, "Add alias").await?;
        Ok(())
    }

    async fn alias_remove(&self, index: &str, alias: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": [{ "remove": { "index": index, "alias": alias } }] }))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response, "Remove alias").await?;
        Ok(())
    }

    async fn alias_swap(&self, alias: &str, add: &str, remove: &[String]) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(Self::alias_swap_body(alias, add, remove))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response, "Swap alias").await?;
        Ok(())
    }

    async fn index_exists(&self, name: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .indices()
            .get(IndicesGetParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        let response = Self::check(response, "Get index").await?;
        let body = Self::json(response).await?;

        // Getting an alias returns the indices behind it, keyed by their own names.
        Ok(body.get(name).is_some())
    }

    async fn alias_exists(&self, alias: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(transport_error)?;

        Ok(response.status_code().is_success())
    }

    async fn list_indices(&self) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .indices()
            .get(IndicesGetParts::Index(&["_all"]))
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::check(response, "List indices").await?;
        let body = Self::json(response).await?;

        Ok(body
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> Result<bool, StoreError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[name]))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(false);
        }
        Self::check(response, "Delete index").await?;
        info!(index = %name, "Index deleted");
        Ok(true)
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;

        Self::check(response, "Refresh").await?;
        Ok(())
    }

    async fn analyze(
        &self,
        index: &str,
        analyzer: &str,
        text: &str,
    ) -> Result<Vec<String>, StoreError> {
        let response = self
            .client
            .indices()
            .analyze(IndicesAnalyzeParts::Index(index))
            .body(json!({ "analyzer": analyzer, "text": text }))
            .send()
            .await
            .map_err(transport_error)?;

        let response = Self::check(response, "Analyze").await?;
        let body = Self::json(response).await?;

        Ok(body["tokens"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|token| token["token"].as_str().map(str::to_string))
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body = Self::json(response).await?;
        let status = body["status"].as_str().unwrap_or("red");
        debug!(status = %status, "Cluster health");

        Ok(status == "green" || status == "yellow")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JoinField;

    fn property_item() -> BulkItem {
        BulkItem {
            index: "comwebsite20240101000000000".to_string(),
            doc_type: "productproperty".to_string(),
            id: "1320000".to_string(),
            join: Some(JoinField::child("productproperty", "product", "13")),
            body: json!({ "size": "21 inch", "color": "brown" }),
        }
    }

    #[test]
    fn test_alias_swap_is_one_request() {
        let body = OpenSearchClient::alias_swap_body(
            "comwebsite",
            "comwebsite20240102000000000",
            &["comwebsite20240101000000000".to_string()],
        );

        assert_eq!(
            body,
            json!({
                "actions": [
                    { "add": { "index": "comwebsite20240102000000000", "alias": "comwebsite" } },
                    {
                        "remove": {
                            "index": "comwebsite20240101000000000",
                            "alias": "comwebsite",
                            "must_exist": false
                        }
                    }
                ]
            })
        );
    }

    #[test]
    fn test_stored_source_injects_type_and_relation() {
        let source = OpenSearchClient::stored_source(&property_item());

        assert_eq!(source["doc_type"], "productproperty");
        assert_eq!(source["relation"]["name"], "productproperty");
        assert_eq!(source["relation"]["parent"], "product_13");
        assert_eq!(source["size"], "21 inch");
    }

    #[test]
    fn test_routing_follows_parent() {
        assert_eq!(
            OpenSearchClient::routing(&property_item()),
            Some("product_13".to_string())
        );

        let mut root = property_item();
        root.doc_type = "productgroup".to_string();
        root.join = Some(JoinField::root("productgroup"));
        assert_eq!(OpenSearchClient::routing(&root), None);

        let source = OpenSearchClient::stored_source(&root);
        assert_eq!(source["relation"], json!({ "name": "productgroup" }));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = OpenSearchClient::new("not a url").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
