//! OpenSearch request rendering and response parsing.
//!
//! Translates the store-agnostic [`QueryNode`] tree and aggregation specs into
//! the OpenSearch query DSL, and normalizes hits and aggregation buckets back.

use catalog_search_shared::schema::fields;
use catalog_search_shared::SortOrder;
use serde_json::{json, Map, Value};

use crate::errors::StoreError;
use crate::types::{
    AggregationBucket, AggregationResult, AggregationSpec, QueryNode, Rescore, SearchHit,
    SearchRequest, SearchResponse, SortSpec,
};

/// Name of the inner terms aggregation under a nested aggregation.
const NESTED_VALUES_AGG: &str = "values";
/// Name of the reverse-nested count under each nested bucket.
const PARENT_COUNT_AGG: &str = "products";

/// Document id as stored: `{doc_type}_{id}`.
///
/// A single index holds several logical document types whose ids overlap.
pub(crate) fn document_id(doc_type: &str, id: &str) -> String {
    format!("{}_{}", doc_type, id)
}

/// Build the full search body for a request.
pub fn build_search_body(request: &SearchRequest) -> Value {
    let mut body = Map::new();
    body.insert("from".to_string(), json!(request.from));
    body.insert("size".to_string(), json!(request.size));
    body.insert("track_total_hits".to_string(), json!(true));
    body.insert(
        "query".to_string(),
        with_document_types(render_query(&request.query), &request.document_types),
    );

    if !request.aggregations.is_empty() {
        let aggs: Map<String, Value> = request
            .aggregations
            .iter()
            .map(|agg| (agg.name().to_string(), render_aggregation(agg)))
            .collect();
        body.insert("aggs".to_string(), Value::Object(aggs));
    }

    if !request.sort.is_empty() {
        body.insert(
            "sort".to_string(),
            Value::Array(request.sort.iter().map(render_sort).collect()),
        );
    }

    if let Some(rescore) = &request.rescore {
        body.insert(
            "rescore".to_string(),
            render_rescore(rescore, &request.document_types),
        );
    }

    Value::Object(body)
}

/// Restrict a query to the logical document types.
fn with_document_types(query: Value, document_types: &[String]) -> Value {
    if document_types.is_empty() {
        return query;
    }

    json!({
        "bool": {
            "must": [query],
            "filter": [{ "terms": { fields::DOC_TYPE: document_types } }]
        }
    })
}

/// Render a query node into the OpenSearch DSL.
pub fn render_query(node: &QueryNode) -> Value {
    match node {
        QueryNode::MatchAll => json!({ "match_all": {} }),
        QueryNode::QueryString { text, fields } => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(field, weight)| format!("{}^{}", field, weight))
                .collect();
            json!({
                "query_string": {
                    "query": text,
                    "fields": fields
                }
            })
        }
        QueryNode::Term { field, value } => json!({ "term": { field.as_str(): value } }),
        QueryNode::Range {
            field,
            lo,
            hi,
            include_lower,
            include_upper,
        } => {
            let mut bounds = Map::new();
            if let Some(lo) = lo {
                let key = if *include_lower { "gte" } else { "gt" };
                bounds.insert(key.to_string(), json!(lo));
            }
            if let Some(hi) = hi {
                let key = if *include_upper { "lte" } else { "lt" };
                bounds.insert(key.to_string(), json!(hi));
            }
            json!({ "range": { field.as_str(): bounds } })
        }
        QueryNode::Bool {
            must,
            filter,
            should,
            minimum_should_match,
        } => {
            let mut clauses = Map::new();
            for (key, nodes) in [("must", must), ("filter", filter), ("should", should)] {
                if !nodes.is_empty() {
                    clauses.insert(
                        key.to_string(),
                        Value::Array(nodes.iter().map(render_query).collect()),
                    );
                }
            }
            if let Some(minimum) = minimum_should_match {
                clauses.insert("minimum_should_match".to_string(), json!(minimum));
            }
            json!({ "bool": clauses })
        }
        QueryNode::Nested { path, query } => json!({
            "nested": {
                "path": path,
                "query": render_query(query)
            }
        }),
        QueryNode::HasChild { child_type, query } => json!({
            "has_child": {
                "type": child_type,
                "query": render_query(query)
            }
        }),
        QueryNode::FunctionScore {
            query,
            field,
            factor,
            missing,
        } => json!({
            "function_score": {
                "query": render_query(query),
                "field_value_factor": {
                    "field": field,
                    "factor": factor,
                    "missing": missing
                },
                "boost_mode": "sum"
            }
        }),
        QueryNode::MoreLikeThis {
            fields,
            like,
            min_term_freq,
            min_doc_freq,
        } => {
            let like: Vec<Value> = like
                .iter()
                .map(|doc| {
                    json!({
                        "_index": doc.index,
                        "_id": document_id(&doc.doc_type, &doc.id)
                    })
                })
                .collect();
            json!({
                "more_like_this": {
                    "fields": fields,
                    "like": like,
                    "min_term_freq": min_term_freq,
                    "min_doc_freq": min_doc_freq
                }
            })
        }
    }
}

fn render_aggregation(spec: &AggregationSpec) -> Value {
    match spec {
        AggregationSpec::Terms {
            field,
            size,
            order_by_key,
            nested_path,
            ..
        } => {
            let mut terms = json!({ "field": field, "size": size });
            if *order_by_key {
                terms["order"] = json!({ "_key": "asc" });
            }
            match nested_path {
                None => json!({ "terms": terms }),
                Some(path) => json!({
                    "nested": { "path": path },
                    "aggs": {
                        NESTED_VALUES_AGG: {
                            "terms": terms,
                            "aggs": { PARENT_COUNT_AGG: { "reverse_nested": {} } }
                        }
                    }
                }),
            }
        }
        AggregationSpec::Range { field, ranges, .. } => {
            let ranges: Vec<Value> = ranges
                .iter()
                .map(|range| {
                    let mut bucket = json!({ "key": range.key });
                    if let Some(from) = range.from {
                        bucket["from"] = json!(from);
                    }
                    if let Some(to) = range.to {
                        bucket["to"] = json!(to);
                    }
                    bucket
                })
                .collect();
            json!({ "range": { "field": field, "ranges": ranges } })
        }
    }
}

fn render_sort(sort: &SortSpec) -> Value {
    match sort {
        SortSpec::Field {
            field,
            order,
            missing_last,
        } => {
            let order = match order {
                SortOrder::Asc => "asc",
                SortOrder::Desc => "desc",
            };
            let missing = if *missing_last { "_last" } else { "_first" };
            json!({ field.as_str(): { "order": order, "missing": missing } })
        }
        SortSpec::Score => json!({ "_score": { "order": "desc" } }),
    }
}

fn render_rescore(rescore: &Rescore, document_types: &[String]) -> Value {
    json!({
        "window_size": rescore.window_size,
        "query": {
            "rescore_query": with_document_types(render_query(&rescore.query), document_types),
            "query_weight": rescore.query_weight,
            "rescore_query_weight": rescore.rescore_query_weight
        }
    })
}

/// Parse a search response body.
pub fn parse_search_response(
    body: &Value,
    aggregations: &[AggregationSpec],
) -> Result<SearchResponse, StoreError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| StoreError::parse("Response has no hits section"))?;

    let total = match &hits["total"] {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        other => other["value"].as_u64().unwrap_or(0),
    };

    let parsed_hits = hits["hits"]
        .as_array()
        .map(|items| items.iter().filter_map(parse_hit).collect())
        .unwrap_or_default();

    let aggregations = aggregations
        .iter()
        .filter_map(|spec| {
            body.get("aggregations")
                .and_then(|aggs| aggs.get(spec.name()))
                .map(|agg| parse_aggregation(spec, agg))
        })
        .collect();

    Ok(SearchResponse {
        total,
        hits: parsed_hits,
        aggregations,
    })
}

/// Parse a single hit; hits without a document type are skipped.
pub(crate) fn parse_hit(hit: &Value) -> Option<SearchHit> {
    let source = hit.get("_source")?.clone();
    let doc_type = source.get(fields::DOC_TYPE)?.as_str()?.to_string();
    let raw_id = hit.get("_id")?.as_str()?;
    let id = raw_id
        .strip_prefix(&format!("{}_", doc_type))
        .unwrap_or(raw_id)
        .to_string();

    Some(SearchHit {
        id,
        doc_type,
        score: hit.get("_score").and_then(Value::as_f64),
        source,
    })
}

fn parse_aggregation(spec: &AggregationSpec, agg: &Value) -> AggregationResult {
    let buckets = match spec {
        AggregationSpec::Terms {
            nested_path: Some(_),
            ..
        } => parse_buckets(&agg[NESTED_VALUES_AGG]["buckets"], |bucket| {
            bucket[PARENT_COUNT_AGG]["doc_count"].as_u64()
        }),
        _ => parse_buckets(&agg["buckets"], |bucket| bucket["doc_count"].as_u64()),
    };

    AggregationResult {
        name: spec.name().to_string(),
        buckets,
    }
}

fn parse_buckets(buckets: &Value, count: impl Fn(&Value) -> Option<u64>) -> Vec<AggregationBucket> {
    buckets
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|bucket| {
                    let key = bucket_key(bucket)?;
                    Some(AggregationBucket {
                        key,
                        doc_count: count(bucket).unwrap_or(0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn bucket_key(bucket: &Value) -> Option<String> {
    if let Some(key) = bucket.get("key_as_string").and_then(Value::as_str) {
        return Some(key.to_string());
    }
    match bucket.get("key")? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentRef, RangeBucketSpec};

    #[test]
    fn test_document_id() {
        assert_eq!(document_id("product", "7"), "product_7");
    }

    #[test]
    fn test_render_or_and_nested() {
        let node = QueryNode::and(vec![
            QueryNode::or(vec![
                QueryNode::term("categories.searchfacettype_color_level_2.facetfilter", "red"),
                QueryNode::term("categories.searchfacettype_color_level_2.facetfilter", "blue"),
            ]),
            QueryNode::nested(
                "specifications",
                QueryNode::term("specifications.memory", "8 GB"),
            ),
        ]);

        let rendered = render_query(&node);
        let filter = &rendered["bool"]["filter"];
        assert_eq!(filter[0]["bool"]["minimum_should_match"], 1);
        assert_eq!(filter[0]["bool"]["should"].as_array().unwrap().len(), 2);
        assert_eq!(filter[1]["nested"]["path"], "specifications");
        assert_eq!(
            filter[1]["nested"]["query"]["term"]["specifications.memory"],
            "8 GB"
        );
        assert!(rendered["bool"].get("must").is_none());
    }

    #[test]
    fn test_render_range_bounds() {
        let rendered = render_query(&QueryNode::half_open_range("price", Some(0.0), Some(10.0)));
        assert_eq!(rendered["range"]["price"]["gte"], 0.0);
        assert_eq!(rendered["range"]["price"]["lt"], 10.0);
        assert!(rendered["range"]["price"].get("lte").is_none());
    }

    #[test]
    fn test_render_more_like_this_uses_stored_ids() {
        let rendered = render_query(&QueryNode::MoreLikeThis {
            fields: vec!["title".to_string()],
            like: vec![DocumentRef {
                index: "comwebsite".to_string(),
                doc_type: "product".to_string(),
                id: "3".to_string(),
            }],
            min_term_freq: 1,
            min_doc_freq: 1,
        });
        assert_eq!(rendered["more_like_this"]["like"][0]["_id"], "product_3");
    }

    #[test]
    fn test_search_body_structure() {
        let mut request = SearchRequest::new(
            vec!["comwebsite".to_string()],
            vec!["product".to_string()],
            QueryNode::MatchAll,
        );
        request.aggregations = vec![
            AggregationSpec::Terms {
                name: "specification_memory".to_string(),
                field: "specifications.memory".to_string(),
                size: 100,
                order_by_key: true,
                nested_path: Some("specifications".to_string()),
            },
            AggregationSpec::Range {
                name: "product_price_range".to_string(),
                field: "price".to_string(),
                ranges: vec![RangeBucketSpec {
                    key: "0-10".to_string(),
                    from: Some(0.0),
                    to: Some(10.0),
                }],
            },
        ];
        request.sort = vec![
            SortSpec::Field {
                field: "availabledate".to_string(),
                order: SortOrder::Desc,
                missing_last: true,
            },
            SortSpec::Score,
        ];

        let body = build_search_body(&request);

        assert_eq!(body["query"]["bool"]["filter"][0]["terms"]["doc_type"][0], "product");
        assert_eq!(body["query"]["bool"]["must"][0]["match_all"], json!({}));
        assert_eq!(
            body["aggs"]["specification_memory"]["nested"]["path"],
            "specifications"
        );
        assert_eq!(
            body["aggs"]["specification_memory"]["aggs"]["values"]["terms"]["order"]["_key"],
            "asc"
        );
        assert_eq!(body["aggs"]["product_price_range"]["range"]["ranges"][0]["key"], "0-10");
        assert_eq!(body["sort"][0]["availabledate"]["missing"], "_last");
        assert_eq!(body["sort"][1]["_score"]["order"], "desc");
        assert!(body.get("rescore").is_none());
    }

    #[test]
    fn test_parse_search_response() {
        let aggs = vec![
            AggregationSpec::Terms {
                name: "brand".to_string(),
                field: "categories.searchfacettype_brand_level_2.facet".to_string(),
                size: 100,
                order_by_key: true,
                nested_path: None,
            },
            AggregationSpec::Terms {
                name: "memory".to_string(),
                field: "specifications.memory".to_string(),
                size: 100,
                order_by_key: true,
                nested_path: Some("specifications".to_string()),
            },
        ];
        let body = json!({
            "hits": {
                "total": { "value": 2, "relation": "eq" },
                "hits": [
                    { "_id": "product_1", "_score": 1.5, "_source": { "doc_type": "product", "title": "Title 1" } },
                    { "_id": "product_2", "_score": null, "_source": { "doc_type": "product", "title": "Title 2" } },
                    { "_id": "orphan", "_source": { "title": "no type" } }
                ]
            },
            "aggregations": {
                "brand": { "buckets": [ { "key": "Apple", "doc_count": 10 } ] },
                "memory": {
                    "doc_count": 4,
                    "values": { "buckets": [ { "key": "8 GB", "doc_count": 3, "products": { "doc_count": 2 } } ] }
                }
            }
        });

        let response = parse_search_response(&body, &aggs).unwrap();

        assert_eq!(response.total, 2);
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.hits[0].id, "1");
        assert_eq!(response.hits[0].score, Some(1.5));
        assert_eq!(response.hits[1].score, None);
        assert_eq!(response.aggregation("brand").unwrap().buckets[0].doc_count, 10);
        assert_eq!(response.aggregation("memory").unwrap().buckets[0].doc_count, 2);
    }

    #[test]
    fn test_parse_search_response_without_hits() {
        assert!(parse_search_response(&json!({}), &[]).is_err());
    }
}
