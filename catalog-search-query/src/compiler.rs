//! Compiles [`SearchCriteria`] into a store query tree.
//!
//! The compiled query has two parts: a relevance clause built from the free
//! text, and a filter list that never affects scoring. Filters combine as
//! follows:
//!
//! - single-select pairs are ANDed
//! - field-value maps are AND groups, ORed together
//! - multi-select values of one code are ORed, codes are ANDed
//! - specification facet values go through one nested filter
//! - property filters match child documents
//! - direct specifications match one nested element each

use tracing::{debug, warn};

use catalog_search_repository::{AggregationSpec, QueryNode, Rescore, SearchRequest, SortSpec};
use catalog_search_shared::schema::{
    category_facet_fields, fields, CATEGORY_FACET_PREFIX, PRICE_RANGE_FACET,
    SPECIFICATION_MEMORY_FACET, SPECIFICATION_RESOLUTION_FACET,
};
use catalog_search_shared::{IndexConfig, PropertyFilter, SearchCriteria, Specification};

use crate::errors::SearchError;

pub const TITLE_WEIGHT: f32 = 0.5;
pub const DESCRIPTION_WEIGHT: f32 = 0.15;
pub const CATEGORY_WEIGHT: f32 = 1.0;

pub const SOLD_OUT_QUERY_WEIGHT: f64 = 1.0;
pub const SOLD_OUT_RESCORE_WEIGHT: f64 = 1.5;

/// Characters with a meaning in query-string syntax.
const RESERVED_QUERY_CHARS: &str = "\\+-!():^[]\"{}~*?|&;/";

/// Escape query-string syntax so free text is matched literally.
///
/// Reserved characters and whitespace are prefixed with a backslash.
pub fn escape_query_chars(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if RESERVED_QUERY_CHARS.contains(c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parse a price-range filter value such as `"10-20"` or `"0 - 10"`.
pub fn parse_price_range(value: &str) -> Option<(f64, f64)> {
    let (lo, hi) = value.split_once('-')?;
    let lo = lo.trim().parse::<f64>().ok()?;
    let hi = hi.trim().parse::<f64>().ok()?;
    Some((lo, hi))
}

/// Turns search criteria into a query tree and a complete search request.
#[derive(Debug, Clone)]
pub struct QueryCompiler {
    property_document_type: String,
}

impl QueryCompiler {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            property_document_type: config.property_document_type.to_string(),
        }
    }

    /// Reject criteria that cannot produce a meaningful request.
    pub fn validate(&self, criteria: &SearchCriteria) -> Result<(), SearchError> {
        if criteria.indices().is_empty() {
            return Err(SearchError::validation("no index to search"));
        }
        if criteria.document_types().is_empty() {
            return Err(SearchError::validation("no document type to search"));
        }
        if criteria.specifications().iter().any(Specification::is_blank) {
            return Err(SearchError::validation(
                "specification filter has neither resolution nor memory",
            ));
        }
        if criteria.property_filters().iter().any(PropertyFilter::is_blank) {
            return Err(SearchError::validation(
                "product property filter has neither size nor color",
            ));
        }
        Ok(())
    }

    /// The full query: the relevance clause, wrapped with the filters when
    /// there are any.
    pub fn compile(&self, criteria: &SearchCriteria) -> QueryNode {
        let relevance = self.relevance_clause(criteria);
        if !criteria.has_filters() {
            return relevance;
        }

        let filter = self.filter_clauses(criteria);
        if filter.is_empty() {
            return relevance;
        }

        QueryNode::Bool {
            must: vec![relevance],
            filter,
            should: Vec::new(),
            minimum_should_match: None,
        }
    }

    /// Match-all for blank text, otherwise a weighted query string over the
    /// title, description and every category facet field.
    pub fn relevance_clause(&self, criteria: &SearchCriteria) -> QueryNode {
        let base = match criteria.query() {
            None => QueryNode::MatchAll,
            Some(text) => {
                let mut weighted = vec![
                    (fields::TITLE.to_string(), TITLE_WEIGHT),
                    (fields::DESCRIPTION.to_string(), DESCRIPTION_WEIGHT),
                ];
                weighted.extend(
                    category_facet_fields()
                        .into_iter()
                        .map(|field| (fields::category_path(&field, fields::SUGGEST), CATEGORY_WEIGHT)),
                );
                QueryNode::QueryString {
                    text: escape_query_chars(text),
                    fields: weighted,
                }
            }
        };

        if criteria.use_boosting_factor() {
            QueryNode::FunctionScore {
                query: Box::new(base),
                field: fields::BOOST_FACTOR.to_string(),
                factor: 1.0,
                missing: 0.0,
            }
        } else {
            base
        }
    }

    /// Every filter clause, in a stable order. Empty when the criteria carry
    /// no filters.
    pub fn filter_clauses(&self, criteria: &SearchCriteria) -> Vec<QueryNode> {
        if !criteria.has_filters() {
            return Vec::new();
        }

        let mut filters = Vec::new();

        for (code, value) in criteria.single_select_filters() {
            filters.extend(self.base_filter(code, value));
        }

        let groups: Vec<QueryNode> = criteria
            .field_value_filters()
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                QueryNode::and(
                    group
                        .iter()
                        .map(|(field, value)| QueryNode::term(field, value))
                        .collect(),
                )
            })
            .collect();
        filters.extend(any_of(groups));

        for (code, values) in criteria.multi_select_filters() {
            if values.is_empty() || is_specification_facet(code) {
                continue;
            }
            let clauses: Vec<QueryNode> = values
                .iter()
                .filter_map(|value| self.base_filter(code, value))
                .collect();
            filters.extend(any_of(clauses));
        }

        filters.push(self.specification_facet_filter(criteria));

        if let Some(properties) = self.property_filter(criteria.property_filters()) {
            filters.push(properties);
        }

        if let Some(specifications) = specification_filter(criteria.specifications()) {
            filters.push(specifications);
        }

        debug!(filter_count = filters.len(), "Compiled filters");
        filters
    }

    /// Filter for one facet code and value.
    ///
    /// Category codes match the lower-cased filter variant, the price range
    /// code a half-open `[lo, hi)` range, and anything else a raw term.
    /// Malformed price ranges produce no filter.
    pub fn base_filter(&self, code: &str, value: &str) -> Option<QueryNode> {
        if code.starts_with(CATEGORY_FACET_PREFIX) {
            return Some(QueryNode::term(
                fields::category_path(code, fields::FACET_FILTER),
                value.to_lowercase(),
            ));
        }

        if code == PRICE_RANGE_FACET {
            return match parse_price_range(value) {
                Some((lo, hi)) => Some(QueryNode::half_open_range(fields::PRICE, Some(lo), Some(hi))),
                None => {
                    warn!(value = %value, "Ignoring malformed price range filter");
                    None
                }
            };
        }

        Some(QueryNode::term(code, value))
    }

    /// Second pass moving items that are not sold out forward.
    ///
    /// Only applies to relevance-ordered searches; a field sort disables it.
    pub fn rescore(&self, criteria: &SearchCriteria) -> Option<Rescore> {
        if !criteria.rescore_on_sold_out() || criteria.sort_order().is_some() {
            return None;
        }

        Some(Rescore {
            window_size: criteria.from() + criteria.size(),
            query: QueryNode::term(fields::SOLD_OUT, "false"),
            query_weight: SOLD_OUT_QUERY_WEIGHT,
            rescore_query_weight: SOLD_OUT_RESCORE_WEIGHT,
        })
    }

    /// Availability date (missing last) then score, or pure relevance.
    pub fn sort(&self, criteria: &SearchCriteria) -> Vec<SortSpec> {
        match criteria.sort_order() {
            Some(order) => vec![
                SortSpec::Field {
                    field: fields::AVAILABLE_DATE.to_string(),
                    order,
                    missing_last: true,
                },
                SortSpec::Score,
            ],
            None => Vec::new(),
        }
    }

    /// Validate and assemble the search request.
    pub fn build_request(
        &self,
        criteria: &SearchCriteria,
        aggregations: Vec<AggregationSpec>,
    ) -> Result<SearchRequest, SearchError> {
        self.validate(criteria)?;

        let mut request = SearchRequest::new(
            criteria.indices().to_vec(),
            criteria.document_types().to_vec(),
            self.compile(criteria),
        );
        request.aggregations = aggregations;
        request.sort = self.sort(criteria);
        request.rescore = self.rescore(criteria);
        request.from = criteria.from();
        request.size = criteria.size();
        Ok(request)
    }

    /// Selected resolution and memory facet values, matched within one
    /// specification element. With nothing selected it still requires one
    /// element to exist.
    fn specification_facet_filter(&self, criteria: &SearchCriteria) -> QueryNode {
        let selected = |code: &str| -> Vec<QueryNode> {
            criteria
                .multi_select_filters()
                .iter()
                .filter(|(name, _)| name == code)
                .flat_map(|(_, values)| values.iter())
                .map(|value| {
                    let field = if code == SPECIFICATION_RESOLUTION_FACET {
                        fields::RESOLUTION
                    } else {
                        fields::MEMORY
                    };
                    QueryNode::term(fields::specification_path(field), value)
                })
                .collect()
        };

        let sides: Vec<QueryNode> = [
            any_of(selected(SPECIFICATION_RESOLUTION_FACET)),
            any_of(selected(SPECIFICATION_MEMORY_FACET)),
        ]
        .into_iter()
        .flatten()
        .collect();

        let inner = if sides.is_empty() {
            QueryNode::MatchAll
        } else {
            QueryNode::and(sides)
        };
        QueryNode::nested(fields::SPECIFICATIONS, inner)
    }

    /// Products with at least one property child matching any filter.
    fn property_filter(&self, properties: &[PropertyFilter]) -> Option<QueryNode> {
        let clauses: Vec<QueryNode> = properties
            .iter()
            .filter(|property| !property.is_blank())
            .map(|property| {
                let mut terms = Vec::new();
                if let Some(size) = non_blank(&property.size) {
                    terms.push(QueryNode::term(fields::PROPERTY_SIZE, size.to_lowercase()));
                }
                if let Some(color) = non_blank(&property.color) {
                    terms.push(QueryNode::term(fields::PROPERTY_COLOR, color.to_lowercase()));
                }
                QueryNode::and(terms)
            })
            .collect();

        any_of(clauses).map(|query| QueryNode::has_child(self.property_document_type.clone(), query))
    }
}

/// Products with one specification element matching any of `specifications`.
fn specification_filter(specifications: &[Specification]) -> Option<QueryNode> {
    let clauses: Vec<QueryNode> = specifications
        .iter()
        .filter(|spec| !spec.is_blank())
        .map(|spec| {
            let mut terms = Vec::new();
            if let Some(resolution) = non_blank(&spec.resolution) {
                terms.push(QueryNode::term(
                    fields::specification_path(fields::RESOLUTION),
                    resolution,
                ));
            }
            if let Some(memory) = non_blank(&spec.memory) {
                terms.push(QueryNode::term(fields::specification_path(fields::MEMORY), memory));
            }
            QueryNode::and(terms)
        })
        .collect();

    any_of(clauses).map(|query| QueryNode::nested(fields::SPECIFICATIONS, query))
}

/// None for no clauses, the clause itself for one, an OR group otherwise.
fn any_of(mut clauses: Vec<QueryNode>) -> Option<QueryNode> {
    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(QueryNode::or(clauses)),
    }
}

fn is_specification_facet(code: &str) -> bool {
    code == SPECIFICATION_RESOLUTION_FACET || code == SPECIFICATION_MEMORY_FACET
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_search_shared::SortOrder;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(&IndexConfig::COM_WEBSITE)
    }

    fn criteria() -> catalog_search_shared::SearchCriteriaBuilder {
        SearchCriteria::builder().index("comwebsite").document_type("product")
    }

    fn term(field: &str, value: &str) -> QueryNode {
        QueryNode::term(field, value)
    }

    fn filters_of(query: &QueryNode) -> &[QueryNode] {
        match query {
            QueryNode::Bool { filter, .. } => filter,
            other => panic!("expected a bool query, got {:?}", other),
        }
    }

    fn any_specification() -> QueryNode {
        QueryNode::nested("specifications", QueryNode::MatchAll)
    }

    #[test]
    fn test_escape_query_chars() {
        assert_eq!(escape_query_chars("tile*"), "tile\\*");
        assert_eq!(escape_query_chars("a+b (c)"), "a\\+b\\ \\(c\\)");
        assert_eq!(escape_query_chars("x:y/z\\"), "x\\:y\\/z\\\\");
        assert_eq!(escape_query_chars("plain"), "plain");
    }

    #[test]
    fn test_parse_price_range() {
        assert_eq!(parse_price_range("10-20"), Some((10.0, 20.0)));
        assert_eq!(parse_price_range("0 - 10"), Some((0.0, 10.0)));
        assert_eq!(parse_price_range("cheap"), None);
        assert_eq!(parse_price_range("10-"), None);
    }

    #[test]
    fn test_blank_query_without_filters_is_match_all() {
        let compiled = compiler().compile(&criteria().query("   ").build());
        assert_eq!(compiled, QueryNode::MatchAll);
    }

    #[test]
    fn test_query_string_fields() {
        let compiled = compiler().compile(&criteria().query("mac book").build());
        let QueryNode::QueryString { text, fields } = compiled else {
            panic!("expected a query string");
        };

        assert_eq!(text, "mac\\ book");
        assert_eq!(fields.len(), 2 + 16);
        assert_eq!(fields[0], ("title".to_string(), 0.5));
        assert_eq!(fields[1], ("description".to_string(), 0.15));
        assert!(fields.contains(&(
            "categories.searchfacettype_color_level_4.suggest".to_string(),
            1.0
        )));
    }

    #[test]
    fn test_boosting_factor_wraps_relevance() {
        let compiled = compiler().compile(&criteria().use_boosting_factor(true).build());
        assert_eq!(
            compiled,
            QueryNode::FunctionScore {
                query: Box::new(QueryNode::MatchAll),
                field: "boostfactor".to_string(),
                factor: 1.0,
                missing: 0.0,
            }
        );
    }

    #[test]
    fn test_single_select_filters_are_anded() {
        let compiled = compiler().compile(
            &criteria()
                .single_select("searchfacettype_product_type_level_3", "Macbook")
                .single_select("product_price_range", "10-20")
                .single_select("soldout", "true")
                .build(),
        );

        let QueryNode::Bool { must, .. } = &compiled else {
            panic!("expected a bool query");
        };
        assert_eq!(must, &vec![QueryNode::MatchAll]);
        assert_eq!(
            filters_of(&compiled),
            &[
                term("categories.searchfacettype_product_type_level_3.facetfilter", "macbook"),
                QueryNode::half_open_range("price", Some(10.0), Some(20.0)),
                term("soldout", "true"),
                any_specification(),
            ]
        );
    }

    #[test]
    fn test_malformed_price_range_is_ignored() {
        let compiled = compiler().compile(
            &criteria()
                .single_select("product_price_range", "cheap")
                .single_select("soldout", "false")
                .build(),
        );
        assert_eq!(
            filters_of(&compiled),
            &[term("soldout", "false"), any_specification()]
        );
    }

    #[test]
    fn test_any_filter_requires_a_specification_element() {
        let compiled = compiler().compile(&criteria().single_select("soldout", "false").build());
        assert_eq!(
            filters_of(&compiled),
            &[term("soldout", "false"), any_specification()]
        );

        let malformed = compiler().compile(&criteria().single_select("product_price_range", "cheap").build());
        assert_eq!(filters_of(&malformed), &[any_specification()]);

        let unfiltered = compiler().compile(&criteria().query("macbook").build());
        assert!(matches!(unfiltered, QueryNode::QueryString { .. }));
    }

    #[test]
    fn test_multi_select_filters() {
        let compiled = compiler().compile(
            &criteria()
                .multi_select("searchfacettype_color_level_2", "Red")
                .multi_select("searchfacettype_color_level_2", "Blue")
                .multi_select("searchfacettype_brand_level_2", "Apple")
                .build(),
        );

        assert_eq!(
            filters_of(&compiled),
            &[
                QueryNode::or(vec![
                    term("categories.searchfacettype_color_level_2.facetfilter", "red"),
                    term("categories.searchfacettype_color_level_2.facetfilter", "blue"),
                ]),
                term("categories.searchfacettype_brand_level_2.facetfilter", "apple"),
                any_specification(),
            ]
        );
    }

    #[test]
    fn test_field_value_groups_are_ored() {
        let compiled = compiler().compile(
            &criteria()
                .field_value("soldout", true)
                .field_value("price", 4)
                .field_values(Default::default())
                .field_value("price", 7)
                .build(),
        );

        let filters = filters_of(&compiled);
        let QueryNode::Bool { should, minimum_should_match, .. } = &filters[0] else {
            panic!("expected an OR group");
        };
        assert_eq!(*minimum_should_match, Some(1));
        assert_eq!(should.len(), 3);
    }

    #[test]
    fn test_specification_facet_filter() {
        let compiled = compiler().compile(
            &criteria()
                .multi_select("specification_resolution", "3200 x 1800")
                .multi_select("specification_memory", "8 GB")
                .multi_select("specification_memory", "6 GB")
                .build(),
        );

        assert_eq!(
            filters_of(&compiled),
            &[QueryNode::nested(
                "specifications",
                QueryNode::and(vec![
                    term("specifications.resolution", "3200 x 1800"),
                    QueryNode::or(vec![
                        term("specifications.memory", "8 GB"),
                        term("specifications.memory", "6 GB"),
                    ]),
                ])
            )]
        );
    }

    #[test]
    fn test_property_filters_are_lowercased_in_every_branch() {
        let single = compiler().compile(&criteria().property(Some("21 Inch"), Some("Brown")).build());
        assert_eq!(
            filters_of(&single)[1],
            QueryNode::has_child(
                "productproperty",
                QueryNode::and(vec![term("size", "21 inch"), term("color", "brown")])
            )
        );

        let multiple = compiler().compile(
            &criteria()
                .property(Some("21 Inch"), Some("Brown"))
                .property(None, Some("Purple"))
                .build(),
        );
        assert_eq!(
            filters_of(&multiple)[1],
            QueryNode::has_child(
                "productproperty",
                QueryNode::or(vec![
                    QueryNode::and(vec![term("size", "21 inch"), term("color", "brown")]),
                    QueryNode::and(vec![term("color", "purple")]),
                ])
            )
        );
    }

    #[test]
    fn test_direct_specification_filters() {
        let compiled = compiler().compile(
            &criteria()
                .specification(Some("3200 x 1800"), Some("8 GB"))
                .specification(Some("1920 x 1200"), None)
                .build(),
        );

        assert_eq!(
            filters_of(&compiled)[1],
            QueryNode::nested(
                "specifications",
                QueryNode::or(vec![
                    QueryNode::and(vec![
                        term("specifications.resolution", "3200 x 1800"),
                        term("specifications.memory", "8 GB"),
                    ]),
                    QueryNode::and(vec![term("specifications.resolution", "1920 x 1200")]),
                ])
            )
        );
    }

    #[test]
    fn test_rescore_and_sort() {
        let compiler = compiler();

        let relevance = criteria().from(10).size(5).rescore_on_sold_out(true).build();
        let rescore = compiler.rescore(&relevance).unwrap();
        assert_eq!(rescore.window_size, 15);
        assert_eq!(rescore.query, term("soldout", "false"));
        assert_eq!(rescore.rescore_query_weight, 1.5);
        assert!(compiler.sort(&relevance).is_empty());

        let sorted = criteria()
            .rescore_on_sold_out(true)
            .sort_order(SortOrder::Desc)
            .build();
        assert!(compiler.rescore(&sorted).is_none());
        assert_eq!(
            compiler.sort(&sorted),
            vec![
                SortSpec::Field {
                    field: "availabledate".to_string(),
                    order: SortOrder::Desc,
                    missing_last: true,
                },
                SortSpec::Score,
            ]
        );
    }

    #[test]
    fn test_validation() {
        let compiler = compiler();

        assert!(compiler.validate(&criteria().build()).is_ok());
        assert!(matches!(
            compiler.validate(&SearchCriteria::builder().document_type("product").build()),
            Err(SearchError::Validation(_))
        ));
        assert!(matches!(
            compiler.validate(&SearchCriteria::builder().index("comwebsite").build()),
            Err(SearchError::Validation(_))
        ));
        assert!(compiler
            .validate(&criteria().specification(Some(" "), None).build())
            .is_err());
        assert!(compiler
            .validate(&criteria().property(None, None).build())
            .is_err());
    }

    #[test]
    fn test_build_request() {
        let request = compiler()
            .build_request(&criteria().from(20).size(5).build(), Vec::new())
            .unwrap();

        assert_eq!(request.indices, vec!["comwebsite".to_string()]);
        assert_eq!(request.document_types, vec!["product".to_string()]);
        assert_eq!(request.from, 20);
        assert_eq!(request.size, 5);
        assert_eq!(request.query, QueryNode::MatchAll);
        assert!(request.rescore.is_none());
    }
}
