//! Store-agnostic request and response types.
//!
//! Queries are expressed as a [`QueryNode`] tree and aggregations as
//! [`AggregationSpec`]s. Adapters translate both into their native form and
//! normalize results back into [`SearchResponse`].

use catalog_search_shared::SortOrder;
use serde::Serialize;
use serde_json::Value;

/// A document addressed by index, type and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub index: String,
    pub doc_type: String,
    pub id: String,
}

/// Query tree evaluated by the document store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryNode {
    MatchAll,
    /// Free text over weighted fields.
    QueryString {
        text: String,
        fields: Vec<(String, f32)>,
    },
    /// Exact match on an unanalyzed value.
    Term { field: String, value: String },
    Range {
        field: String,
        lo: Option<f64>,
        hi: Option<f64>,
        include_lower: bool,
        include_upper: bool,
    },
    Bool {
        must: Vec<QueryNode>,
        filter: Vec<QueryNode>,
        should: Vec<QueryNode>,
        minimum_should_match: Option<u32>,
    },
    /// Evaluate `query` against each element of the nested array at `path`.
    Nested { path: String, query: Box<QueryNode> },
    /// Matches parents with at least one child of `child_type` matching `query`.
    HasChild {
        child_type: String,
        query: Box<QueryNode>,
    },
    /// Adds `field * factor` (or `missing * factor`) to the inner score.
    FunctionScore {
        query: Box<QueryNode>,
        field: String,
        factor: f64,
        missing: f64,
    },
    MoreLikeThis {
        fields: Vec<String>,
        like: Vec<DocumentRef>,
        min_term_freq: u32,
        min_doc_freq: u32,
    },
}

impl QueryNode {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        QueryNode::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Range with an inclusive lower and exclusive upper bound.
    pub fn half_open_range(field: impl Into<String>, lo: Option<f64>, hi: Option<f64>) -> Self {
        QueryNode::Range {
            field: field.into(),
            lo,
            hi,
            include_lower: true,
            include_upper: false,
        }
    }

    /// All clauses must match; none contributes to the score.
    pub fn and(clauses: Vec<QueryNode>) -> Self {
        QueryNode::Bool {
            must: Vec::new(),
            filter: clauses,
            should: Vec::new(),
            minimum_should_match: None,
        }
    }

    /// At least one clause must match.
    pub fn or(clauses: Vec<QueryNode>) -> Self {
        QueryNode::Bool {
            must: Vec::new(),
            filter: Vec::new(),
            should: clauses,
            minimum_should_match: Some(1),
        }
    }

    pub fn nested(path: impl Into<String>, query: QueryNode) -> Self {
        QueryNode::Nested {
            path: path.into(),
            query: Box::new(query),
        }
    }

    pub fn has_child(child_type: impl Into<String>, query: QueryNode) -> Self {
        QueryNode::HasChild {
            child_type: child_type.into(),
            query: Box::new(query),
        }
    }
}

/// One bucket definition of a range aggregation: `[from, to)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeBucketSpec {
    pub key: String,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

/// Aggregation requested alongside a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AggregationSpec {
    /// Distinct values of `field` with per-document counts. With
    /// `nested_path`, values are read from the nested elements and still
    /// counted once per top-level document.
    Terms {
        name: String,
        field: String,
        size: usize,
        order_by_key: bool,
        nested_path: Option<String>,
    },
    Range {
        name: String,
        field: String,
        ranges: Vec<RangeBucketSpec>,
    },
}

impl AggregationSpec {
    pub fn name(&self) -> &str {
        match self {
            AggregationSpec::Terms { name, .. } | AggregationSpec::Range { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SortSpec {
    Field {
        field: String,
        order: SortOrder,
        missing_last: bool,
    },
    Score,
}

/// Second-pass scoring of the top `window_size` hits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rescore {
    pub window_size: usize,
    pub query: QueryNode,
    pub query_weight: f64,
    pub rescore_query_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub indices: Vec<String>,
    pub document_types: Vec<String>,
    pub query: QueryNode,
    pub aggregations: Vec<AggregationSpec>,
    pub sort: Vec<SortSpec>,
    pub rescore: Option<Rescore>,
    pub from: usize,
    pub size: usize,
}

impl SearchRequest {
    pub fn new(indices: Vec<String>, document_types: Vec<String>, query: QueryNode) -> Self {
        Self {
            indices,
            document_types,
            query,
            aggregations: Vec::new(),
            sort: Vec::new(),
            rescore: None,
            from: 0,
            size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub doc_type: String,
    pub score: Option<f64>,
    pub source: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationBucket {
    pub key: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationResult {
    pub name: String,
    pub buckets: Vec<AggregationBucket>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
    pub aggregations: Vec<AggregationResult>,
}

impl SearchResponse {
    pub fn aggregation(&self, name: &str) -> Option<&AggregationResult> {
        self.aggregations.iter().find(|agg| agg.name == name)
    }
}

/// A document fetched by id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub doc_type: String,
    pub source: Value,
}

/// The parent end of a parent/child link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinParent {
    pub doc_type: String,
    pub id: String,
}

/// Parent/child membership of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinField {
    /// Relation name, the document's own type.
    pub name: String,
    /// Absent for roots.
    pub parent: Option<JoinParent>,
}

impl JoinField {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn child(
        name: impl Into<String>,
        parent_type: impl Into<String>,
        parent_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parent: Some(JoinParent {
                doc_type: parent_type.into(),
                id: parent_id.into(),
            }),
        }
    }
}

/// One document write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItem {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub join: Option<JoinField>,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemResult {
    pub doc_type: String,
    pub id: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Per-item outcome of a bulk write, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub items: Vec<BulkItemResult>,
}

impl BulkResponse {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.success).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestRequest {
    pub indices: Vec<String>,
    pub field: String,
    pub text: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestOption {
    pub text: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_requires_one_clause() {
        let node = QueryNode::or(vec![QueryNode::term("a", "1"), QueryNode::term("a", "2")]);
        match node {
            QueryNode::Bool {
                should,
                minimum_should_match,
                must,
                filter,
            } => {
                assert_eq!(should.len(), 2);
                assert_eq!(minimum_should_match, Some(1));
                assert!(must.is_empty());
                assert!(filter.is_empty());
            }
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_bulk_response_counts() {
        let response = BulkResponse {
            items: vec![
                BulkItemResult {
                    doc_type: "product".to_string(),
                    id: "1".to_string(),
                    success: true,
                    error: None,
                },
                BulkItemResult {
                    doc_type: "product".to_string(),
                    id: "2".to_string(),
                    success: false,
                    error: Some("strict mapping".to_string()),
                },
            ],
        };

        assert_eq!(response.succeeded(), 1);
        assert_eq!(response.failed(), 1);
    }
}
