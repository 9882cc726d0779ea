//! Query, aggregation and sort evaluation over JSON sources.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use catalog_search_shared::SortOrder;
use serde_json::Value;

use crate::memory::mapping::text_tokens;
use crate::memory::store::MemoryDocument;
use crate::types::{
    AggregationBucket, AggregationResult, AggregationSpec, QueryNode, SortSpec,
};

/// Where field paths are resolved.
#[derive(Clone, Copy)]
pub(crate) enum Scope<'v> {
    Root,
    /// Inside one element of the nested array at `path`.
    Nested { path: &'v str, element: &'v Value },
}

/// Evaluates queries against the documents of one index.
pub(crate) struct Evaluator<'a> {
    /// All documents of the index, for parent/child lookups.
    pub documents: &'a BTreeMap<(String, String), MemoryDocument>,
    /// Nested paths invisible from the parent document.
    pub hidden: &'a BTreeSet<String>,
    /// Token sets of the `like` documents of any more-like-this clause.
    pub like_tokens: &'a HashSet<String>,
    /// `(doc_type, id)` of the `like` documents.
    pub like_docs: &'a HashSet<(String, String)>,
}

impl<'a> Evaluator<'a> {
    /// Score of `doc` for `node`, or `None` when it does not match.
    pub fn score(&self, node: &QueryNode, doc: &MemoryDocument, scope: Scope<'_>) -> Option<f64> {
        match node {
            QueryNode::MatchAll => Some(1.0),
            QueryNode::QueryString { text, fields } => {
                let query_tokens: HashSet<String> = text_tokens(&unescape(text)).into_iter().collect();
                let mut score = 0.0;
                for (field, weight) in fields {
                    let field_tokens: HashSet<String> = self
                        .values(doc, field, scope)
                        .into_iter()
                        .filter_map(scalar_string)
                        .flat_map(|value| text_tokens(&value))
                        .collect();
                    let hits = query_tokens.intersection(&field_tokens).count();
                    score += hits as f64 * f64::from(*weight);
                }
                (score > 0.0).then_some(score)
            }
            QueryNode::Term { field, value } => self
                .values(doc, field, scope)
                .into_iter()
                .any(|candidate| term_matches(candidate, value))
                .then_some(1.0),
            QueryNode::Range {
                field,
                lo,
                hi,
                include_lower,
                include_upper,
            } => self
                .values(doc, field, scope)
                .into_iter()
                .filter_map(number)
                .any(|n| {
                    let above = match lo {
                        Some(lo) if *include_lower => n >= *lo,
                        Some(lo) => n > *lo,
                        None => true,
                    };
                    let below = match hi {
                        Some(hi) if *include_upper => n <= *hi,
                        Some(hi) => n < *hi,
                        None => true,
                    };
                    above && below
                })
                .then_some(1.0),
            QueryNode::Bool {
                must,
                filter,
                should,
                minimum_should_match,
            } => {
                let mut score = 0.0;
                for clause in must {
                    score += self.score(clause, doc, scope)?;
                }
                for clause in filter {
                    self.score(clause, doc, scope)?;
                }

                let mut matched = 0u32;
                for clause in should {
                    if let Some(s) = self.score(clause, doc, scope) {
                        matched += 1;
                        score += s;
                    }
                }

                let required = minimum_should_match.unwrap_or(
                    if must.is_empty() && filter.is_empty() && !should.is_empty() {
                        1
                    } else {
                        0
                    },
                );
                (matched >= required).then_some(score)
            }
            QueryNode::Nested { path, query } => root_values(&doc.source, path, &BTreeSet::new())
                .into_iter()
                .filter_map(|element| {
                    self.score(query, doc, Scope::Nested { path, element })
                })
                .reduce(f64::max),
            QueryNode::HasChild { child_type, query } => self
                .documents
                .values()
                .filter(|child| {
                    child.doc_type == *child_type
                        && child.parent.as_ref().is_some_and(|parent| {
                            parent.doc_type == doc.doc_type && parent.id == doc.id
                        })
                })
                .any(|child| self.score(query, child, Scope::Root).is_some())
                .then_some(1.0),
            QueryNode::FunctionScore {
                query,
                field,
                factor,
                missing,
            } => {
                let score = self.score(query, doc, scope)?;
                let value = self
                    .values(doc, field, scope)
                    .into_iter()
                    .find_map(number)
                    .unwrap_or(*missing);
                Some(score + value * factor)
            }
            QueryNode::MoreLikeThis { fields, .. } => {
                if self
                    .like_docs
                    .contains(&(doc.doc_type.clone(), doc.id.clone()))
                {
                    return None;
                }
                let tokens: HashSet<String> = fields
                    .iter()
                    .flat_map(|field| self.values(doc, field, scope))
                    .filter_map(scalar_string)
                    .flat_map(|value| text_tokens(&value))
                    .collect();
                let shared = tokens.intersection(self.like_tokens).count();
                (shared > 0).then_some(shared as f64)
            }
        }
    }

    fn values<'d>(&self, doc: &'d MemoryDocument, field: &str, scope: Scope<'d>) -> Vec<&'d Value> {
        match scope {
            Scope::Nested { path, element } => match field.strip_prefix(&format!("{}.", path)) {
                Some(inner) => root_values(element, inner, &BTreeSet::new()),
                None => root_values(&doc.source, field, self.hidden),
            },
            Scope::Root => root_values(&doc.source, field, self.hidden),
        }
    }
}

/// Values at a dotted path. Keys may themselves contain dots; arrays are
/// flattened; paths in `hidden` are not entered.
pub(crate) fn root_values<'v>(source: &'v Value, path: &str, hidden: &BTreeSet<String>) -> Vec<&'v Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect(source, &segments, "", hidden, &mut out);
    out
}

fn collect<'v>(
    value: &'v Value,
    path: &[&str],
    walked: &str,
    hidden: &BTreeSet<String>,
    out: &mut Vec<&'v Value>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect(item, path, walked, hidden, out);
            }
        }
        Value::Null => {}
        _ if path.is_empty() => out.push(value),
        Value::Object(map) => {
            for take in 1..=path.len() {
                let key = path[..take].join(".");
                if let Some(child) = map.get(&key) {
                    let next = if walked.is_empty() {
                        key
                    } else {
                        format!("{}.{}", walked, key)
                    };
                    if hidden.contains(&next) {
                        continue;
                    }
                    collect(child, &path[take..], &next, hidden, out);
                }
            }
        }
        _ => {}
    }
}

/// String form of a scalar value.
pub(crate) fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn term_matches(candidate: &Value, expected: &str) -> bool {
    match candidate {
        Value::String(s) => s == expected,
        Value::Bool(b) => expected.eq_ignore_ascii_case(&b.to_string()),
        Value::Number(n) => match (n.as_f64(), expected.trim().parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        _ => false,
    }
}

/// Strip query-syntax escapes.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Run one aggregation over the matched documents.
pub(crate) fn aggregate(
    spec: &AggregationSpec,
    docs: &[&MemoryDocument],
    hidden: &BTreeSet<String>,
) -> AggregationResult {
    let buckets = match spec {
        AggregationSpec::Terms {
            field,
            size,
            order_by_key,
            nested_path,
            ..
        } => {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for doc in docs {
                let values: BTreeSet<String> = match nested_path {
                    Some(path) => {
                        let inner = field
                            .strip_prefix(&format!("{}.", path))
                            .unwrap_or(field.as_str());
                        root_values(&doc.source, path, &BTreeSet::new())
                            .into_iter()
                            .flat_map(|element| root_values(element, inner, &BTreeSet::new()))
                            .filter_map(scalar_string)
                            .collect()
                    }
                    None => root_values(&doc.source, field, hidden)
                        .into_iter()
                        .filter_map(scalar_string)
                        .collect(),
                };
                for value in values {
                    *counts.entry(value).or_default() += 1;
                }
            }

            let mut buckets: Vec<AggregationBucket> = counts
                .into_iter()
                .map(|(key, doc_count)| AggregationBucket { key, doc_count })
                .collect();
            if !order_by_key {
                buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then(a.key.cmp(&b.key)));
            }
            buckets.truncate(*size);
            buckets
        }
        AggregationSpec::Range { field, ranges, .. } => ranges
            .iter()
            .map(|range| {
                let doc_count = docs
                    .iter()
                    .filter(|doc| {
                        root_values(&doc.source, field, hidden)
                            .into_iter()
                            .filter_map(number)
                            .any(|n| {
                                range.from.map_or(true, |from| n >= from)
                                    && range.to.map_or(true, |to| n < to)
                            })
                    })
                    .count() as u64;
                AggregationBucket {
                    key: range.key.clone(),
                    doc_count,
                }
            })
            .collect(),
    };

    AggregationResult {
        name: spec.name().to_string(),
        buckets,
    }
}

/// A matched document with its score and position in the store.
pub(crate) struct Scored<'a> {
    pub doc: &'a MemoryDocument,
    pub score: f64,
    pub position: (usize, u64),
}

/// Order hits by the sort specs; no specs means by score.
pub(crate) fn sort_hits(hits: &mut [Scored<'_>], sort: &[SortSpec]) {
    hits.sort_by(|a, b| {
        if sort.is_empty() {
            return compare_score(a, b).then(a.position.cmp(&b.position));
        }
        for spec in sort {
            let ordering = match spec {
                SortSpec::Score => compare_score(a, b),
                SortSpec::Field {
                    field,
                    order,
                    missing_last,
                } => compare_field(a.doc, b.doc, field, *order, *missing_last),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.position.cmp(&b.position)
    });
}

fn compare_score(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

fn compare_field(
    a: &MemoryDocument,
    b: &MemoryDocument,
    field: &str,
    order: SortOrder,
    missing_last: bool,
) -> Ordering {
    let empty = BTreeSet::new();
    let left = root_values(&a.source, field, &empty).into_iter().next();
    let right = root_values(&b.source, field, &empty).into_iter().next();

    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => {
            if missing_last {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Some(_), None) => {
            if missing_last {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (Some(left), Some(right)) => {
            let ordering = match (left, right) {
                (Value::Number(x), Value::Number(y)) => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
                _ => scalar_string(left).cmp(&scalar_string(right)),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, source: Value) -> MemoryDocument {
        MemoryDocument {
            doc_type: "product".to_string(),
            id: id.to_string(),
            parent: None,
            source,
            seq: 0,
        }
    }

    #[test]
    fn test_root_values_with_dotted_keys_and_arrays() {
        let source = json!({
            "categories": [
                { "searchfacettype_color_level_2.facetfilter": "red" },
                { "searchfacettype_color_level_2.facetfilter": "blue" }
            ]
        });

        let values = root_values(
            &source,
            "categories.searchfacettype_color_level_2.facetfilter",
            &BTreeSet::new(),
        );
        assert_eq!(values, vec![&json!("red"), &json!("blue")]);
    }

    #[test]
    fn test_hidden_paths_are_not_entered() {
        let source = json!({ "specifications": [{ "memory": "8 GB" }] });
        let mut hidden = BTreeSet::new();
        hidden.insert("specifications".to_string());

        assert!(root_values(&source, "specifications.memory", &hidden).is_empty());
        assert_eq!(
            root_values(&source, "specifications.memory", &BTreeSet::new()).len(),
            1
        );
    }

    #[test]
    fn test_nested_requires_same_element() {
        let documents = BTreeMap::new();
        let hidden = BTreeSet::new();
        let like = HashSet::new();
        let like_docs = HashSet::new();
        let evaluator = Evaluator {
            documents: &documents,
            hidden: &hidden,
            like_tokens: &like,
            like_docs: &like_docs,
        };
        let product = doc(
            "1",
            json!({
                "specifications": [
                    { "resolution": "3200 x 1800", "memory": "8 GB" },
                    { "resolution": "1920 x 1200", "memory": "6 GB" }
                ]
            }),
        );

        let matching = QueryNode::nested(
            "specifications",
            QueryNode::and(vec![
                QueryNode::term("specifications.resolution", "3200 x 1800"),
                QueryNode::term("specifications.memory", "8 GB"),
            ]),
        );
        let crossed = QueryNode::nested(
            "specifications",
            QueryNode::and(vec![
                QueryNode::term("specifications.resolution", "3200 x 1800"),
                QueryNode::term("specifications.memory", "6 GB"),
            ]),
        );

        assert!(evaluator.score(&matching, &product, Scope::Root).is_some());
        assert!(evaluator.score(&crossed, &product, Scope::Root).is_none());
    }

    #[test]
    fn test_query_string_and_terms() {
        let documents = BTreeMap::new();
        let hidden = BTreeSet::new();
        let like = HashSet::new();
        let like_docs = HashSet::new();
        let evaluator = Evaluator {
            documents: &documents,
            hidden: &hidden,
            like_tokens: &like,
            like_docs: &like_docs,
        };
        let product = doc("1", json!({ "title": "Title 1", "soldout": true, "price": 1.0 }));

        let text = |t: &str| QueryNode::QueryString {
            text: t.to_string(),
            fields: vec![("title".to_string(), 1.0)],
        };
        assert!(evaluator.score(&text("title"), &product, Scope::Root).is_some());
        assert!(evaluator.score(&text("tile\\*"), &product, Scope::Root).is_none());
        assert!(evaluator
            .score(&QueryNode::term("soldout", "true"), &product, Scope::Root)
            .is_some());
        assert!(evaluator
            .score(&QueryNode::term("price", "1"), &product, Scope::Root)
            .is_some());
        assert!(evaluator
            .score(
                &QueryNode::half_open_range("price", Some(1.0), Some(2.0)),
                &product,
                Scope::Root
            )
            .is_some());
        assert!(evaluator
            .score(
                &QueryNode::half_open_range("price", Some(0.0), Some(1.0)),
                &product,
                Scope::Root
            )
            .is_none());
    }

    #[test]
    fn test_terms_aggregation_counts_documents_once() {
        let a = doc(
            "1",
            json!({ "specifications": [{ "memory": "6 GB" }, { "memory": "6 GB" }] }),
        );
        let b = doc("2", json!({ "specifications": [{ "memory": "8 GB" }] }));
        let spec = AggregationSpec::Terms {
            name: "memory".to_string(),
            field: "specifications.memory".to_string(),
            size: 100,
            order_by_key: true,
            nested_path: Some("specifications".to_string()),
        };

        let result = aggregate(&spec, &[&a, &b], &BTreeSet::new());
        assert_eq!(
            result.buckets,
            vec![
                AggregationBucket {
                    key: "6 GB".to_string(),
                    doc_count: 1
                },
                AggregationBucket {
                    key: "8 GB".to_string(),
                    doc_count: 1
                },
            ]
        );
    }

    #[test]
    fn test_sort_missing_last() {
        let with_date = doc("1", json!({ "availabledate": "2024-01-02T00:00:00Z" }));
        let older = doc("2", json!({ "availabledate": "2024-01-01T00:00:00Z" }));
        let without = doc("3", json!({}));
        let mut hits = vec![
            Scored {
                doc: &without,
                score: 1.0,
                position: (0, 0),
            },
            Scored {
                doc: &older,
                score: 1.0,
                position: (0, 1),
            },
            Scored {
                doc: &with_date,
                score: 1.0,
                position: (0, 2),
            },
        ];

        sort_hits(
            &mut hits,
            &[SortSpec::Field {
                field: "availabledate".to_string(),
                order: SortOrder::Desc,
                missing_last: true,
            }],
        );

        let ids: Vec<&str> = hits.iter().map(|h| h.doc.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
