//! Facet planning and decoding.
//!
//! Each requested facet code becomes at most one aggregation named after the
//! code, so decoding is a lookup by name.

use tracing::{debug, warn};

use catalog_search_repository::{AggregationResult, AggregationSpec, RangeBucketSpec, SearchResponse};
use catalog_search_shared::schema::fields;
use catalog_search_shared::{FacetKind, FacetResult, FacetValue};

/// Maximum buckets returned for a terms facet.
pub const TERMS_FACET_SIZE: usize = 100;

/// Price-range buckets as `(key, from, to)`, each `[from, to)`.
pub const PRICE_RANGES: [(&str, f64, f64); 3] = [
    ("0-10", 0.0, 10.0),
    ("10-20", 10.0, 20.0),
    ("20-100", 20.0, 100.0),
];

pub struct FacetPlanner;

impl FacetPlanner {
    /// Aggregations for the requested facet codes, in request order.
    ///
    /// Property facets have no aggregation and unknown codes are skipped.
    pub fn plan(codes: &[String]) -> Vec<AggregationSpec> {
        codes.iter().filter_map(|code| Self::plan_one(code)).collect()
    }

    fn plan_one(code: &str) -> Option<AggregationSpec> {
        match FacetKind::parse(code) {
            FacetKind::Category { .. } => Some(AggregationSpec::Terms {
                name: code.to_string(),
                field: fields::category_path(code, fields::FACET),
                size: TERMS_FACET_SIZE,
                order_by_key: true,
                nested_path: None,
            }),
            FacetKind::PriceRange => Some(AggregationSpec::Range {
                name: code.to_string(),
                field: fields::PRICE.to_string(),
                ranges: PRICE_RANGES
                    .iter()
                    .map(|(key, from, to)| RangeBucketSpec {
                        key: key.to_string(),
                        from: Some(*from),
                        to: Some(*to),
                    })
                    .collect(),
            }),
            FacetKind::SpecificationResolution => Some(specification_terms(code, fields::RESOLUTION)),
            FacetKind::SpecificationMemory => Some(specification_terms(code, fields::MEMORY)),
            FacetKind::PropertySize | FacetKind::PropertyColor => {
                debug!(code = %code, "Property facets are not aggregated");
                None
            }
            FacetKind::Field(_) => {
                warn!(code = %code, "Skipping unknown facet code");
                None
            }
        }
    }

    /// Facet results for the planned aggregations, in plan order.
    ///
    /// Zero-count buckets are dropped and facets left without buckets are
    /// omitted.
    pub fn decode(plan: &[AggregationSpec], response: &SearchResponse) -> Vec<FacetResult> {
        plan.iter()
            .filter_map(|spec| response.aggregation(spec.name()))
            .filter_map(decode_one)
            .collect()
    }
}

fn specification_terms(code: &str, field: &str) -> AggregationSpec {
    AggregationSpec::Terms {
        name: code.to_string(),
        field: fields::specification_path(field),
        size: TERMS_FACET_SIZE,
        order_by_key: false,
        nested_path: Some(fields::SPECIFICATIONS.to_string()),
    }
}

fn decode_one(aggregation: &AggregationResult) -> Option<FacetResult> {
    let values: Vec<FacetValue> = aggregation
        .buckets
        .iter()
        .filter(|bucket| bucket.doc_count > 0)
        .map(|bucket| FacetValue {
            name: bucket.key.clone(),
            count: bucket.doc_count,
        })
        .collect();

    if values.is_empty() {
        return None;
    }

    Some(FacetResult {
        code: aggregation.name.clone(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_repository::AggregationBucket;

    fn codes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn aggregation(name: &str, buckets: &[(&str, u64)]) -> AggregationResult {
        AggregationResult {
            name: name.to_string(),
            buckets: buckets
                .iter()
                .map(|(key, doc_count)| AggregationBucket {
                    key: key.to_string(),
                    doc_count: *doc_count,
                })
                .collect(),
        }
    }

    #[test]
    fn test_plan_category_and_price() {
        let plan = FacetPlanner::plan(&codes(&[
            "searchfacettype_brand_level_2",
            "product_price_range",
        ]));

        assert_eq!(
            plan[0],
            AggregationSpec::Terms {
                name: "searchfacettype_brand_level_2".to_string(),
                field: "categories.searchfacettype_brand_level_2.facet".to_string(),
                size: 100,
                order_by_key: true,
                nested_path: None,
            }
        );

        let AggregationSpec::Range { field, ranges, .. } = &plan[1] else {
            panic!("expected a range aggregation");
        };
        assert_eq!(field, "price");
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[1].key, "10-20");
        assert_eq!(ranges[1].from, Some(10.0));
        assert_eq!(ranges[1].to, Some(20.0));
    }

    #[test]
    fn test_plan_specifications_are_nested() {
        let plan = FacetPlanner::plan(&codes(&["specification_memory"]));
        assert_eq!(
            plan,
            vec![AggregationSpec::Terms {
                name: "specification_memory".to_string(),
                field: "specifications.memory".to_string(),
                size: 100,
                order_by_key: false,
                nested_path: Some("specifications".to_string()),
            }]
        );
    }

    #[test]
    fn test_plan_skips_property_and_unknown_codes() {
        let plan = FacetPlanner::plan(&codes(&[
            "product_property_size",
            "product_property_color",
            "nonsense",
            "searchfacettype_age_level_9",
        ]));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_decode_drops_empty_buckets_and_facets() {
        let plan = FacetPlanner::plan(&codes(&[
            "searchfacettype_color_level_2",
            "product_price_range",
            "searchfacettype_age_level_3",
        ]));
        let response = SearchResponse {
            total: 5,
            hits: Vec::new(),
            aggregations: vec![
                aggregation("product_price_range", &[("0-10", 5), ("10-20", 0), ("20-100", 0)]),
                aggregation("searchfacettype_color_level_2", &[("Blue", 0), ("Red", 5)]),
                aggregation("searchfacettype_age_level_3", &[]),
            ],
        };

        let facets = FacetPlanner::decode(&plan, &response);

        assert_eq!(
            facets,
            vec![
                FacetResult {
                    code: "searchfacettype_color_level_2".to_string(),
                    values: vec![FacetValue {
                        name: "Red".to_string(),
                        count: 5
                    }],
                },
                FacetResult {
                    code: "product_price_range".to_string(),
                    values: vec![FacetValue {
                        name: "0-10".to_string(),
                        count: 5
                    }],
                },
            ]
        );
    }
}
