//! Search criteria passed from callers to the query service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{is_blank, Specification};

/// Default page size when none is given.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort direction for the availability-date sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A size/color pair matched against product property documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub size: Option<String>,
    pub color: Option<String>,
}

impl PropertyFilter {
    pub fn is_blank(&self) -> bool {
        is_blank(&self.size) && is_blank(&self.color)
    }
}

/// Immutable description of one search request.
///
/// Built with [`SearchCriteria::builder`]; the query compiler only ever reads it.
///
/// # Example
///
/// ```ignore
/// let criteria = SearchCriteria::builder()
///     .index("comwebsite")
///     .document_type("product")
///     .query("macbook")
///     .facet("searchfacettype_brand_level_2")
///     .multi_select("searchfacettype_color_level_2", "Red")
///     .multi_select("searchfacettype_color_level_2", "Blue")
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    indices: Vec<String>,
    document_types: Vec<String>,
    query: Option<String>,
    from: usize,
    size: usize,
    facet_codes: Vec<String>,
    single_select_filters: Vec<(String, String)>,
    multi_select_filters: Vec<(String, Vec<String>)>,
    field_value_filters: Vec<BTreeMap<String, String>>,
    property_filters: Vec<PropertyFilter>,
    specifications: Vec<Specification>,
    sort_order: Option<SortOrder>,
    rescore_on_sold_out: bool,
    use_boosting_factor: bool,
    no_facets: bool,
}

impl SearchCriteria {
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    pub fn document_types(&self) -> &[String] {
        &self.document_types
    }

    /// Free text, if any non-blank text was supplied.
    pub fn query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }

    pub fn from(&self) -> usize {
        self.from
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn facet_codes(&self) -> &[String] {
        &self.facet_codes
    }

    /// Single-select filters in insertion order; the last value wins per code.
    pub fn single_select_filters(&self) -> &[(String, String)] {
        &self.single_select_filters
    }

    /// Multi-select groups in first-insertion order.
    pub fn multi_select_filters(&self) -> &[(String, Vec<String>)] {
        &self.multi_select_filters
    }

    pub fn field_value_filters(&self) -> &[BTreeMap<String, String>] {
        &self.field_value_filters
    }

    pub fn property_filters(&self) -> &[PropertyFilter] {
        &self.property_filters
    }

    pub fn specifications(&self) -> &[Specification] {
        &self.specifications
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort_order
    }

    pub fn rescore_on_sold_out(&self) -> bool {
        self.rescore_on_sold_out
    }

    pub fn use_boosting_factor(&self) -> bool {
        self.use_boosting_factor
    }

    pub fn no_facets(&self) -> bool {
        self.no_facets
    }

    /// True when any filter group is non-empty.
    pub fn has_filters(&self) -> bool {
        !self.single_select_filters.is_empty()
            || !self.multi_select_filters.is_empty()
            || !self.field_value_filters.is_empty()
            || !self.property_filters.is_empty()
            || !self.specifications.is_empty()
    }
}

/// Builder for [`SearchCriteria`].
#[derive(Debug, Clone)]
pub struct SearchCriteriaBuilder {
    criteria: SearchCriteria,
}

impl Default for SearchCriteriaBuilder {
    fn default() -> Self {
        Self {
            criteria: SearchCriteria {
                indices: Vec::new(),
                document_types: Vec::new(),
                query: None,
                from: 0,
                size: DEFAULT_PAGE_SIZE,
                facet_codes: Vec::new(),
                single_select_filters: Vec::new(),
                multi_select_filters: Vec::new(),
                field_value_filters: Vec::new(),
                property_filters: Vec::new(),
                specifications: Vec::new(),
                sort_order: None,
                rescore_on_sold_out: false,
                use_boosting_factor: false,
                no_facets: false,
            },
        }
    }
}

impl SearchCriteriaBuilder {
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.criteria.indices.push(index.into());
        self
    }

    pub fn document_type(mut self, document_type: impl Into<String>) -> Self {
        self.criteria.document_types.push(document_type.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.criteria.query = Some(query.into());
        self
    }

    pub fn from(mut self, from: usize) -> Self {
        self.criteria.from = from;
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.criteria.size = size;
        self
    }

    pub fn facet(mut self, code: impl Into<String>) -> Self {
        let code = code.into();
        if !self.criteria.facet_codes.contains(&code) {
            self.criteria.facet_codes.push(code);
        }
        self
    }

    pub fn facets<I, S>(self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        codes.into_iter().fold(self, |builder, code| builder.facet(code))
    }

    /// Filter on exactly one value for `code`; replaces an earlier value.
    pub fn single_select(mut self, code: impl Into<String>, value: impl Into<String>) -> Self {
        let code = code.into();
        let value = value.into();
        match self
            .criteria
            .single_select_filters
            .iter_mut()
            .find(|(existing, _)| *existing == code)
        {
            Some(entry) => entry.1 = value,
            None => self.criteria.single_select_filters.push((code, value)),
        }
        self
    }

    /// Add one alternative to the OR-group for `code`.
    pub fn multi_select(mut self, code: impl Into<String>, value: impl Into<String>) -> Self {
        let code = code.into();
        let value = value.into();
        match self
            .criteria
            .multi_select_filters
            .iter_mut()
            .find(|(existing, _)| *existing == code)
        {
            Some((_, values)) => values.push(value),
            None => self.criteria.multi_select_filters.push((code, vec![value])),
        }
        self
    }

    /// Add a field/value map; all pairs of one map must hold together.
    pub fn field_values(mut self, values: BTreeMap<String, String>) -> Self {
        if !values.is_empty() {
            self.criteria.field_value_filters.push(values);
        }
        self
    }

    pub fn field_value(self, field: impl Into<String>, value: impl ToString) -> Self {
        let mut values = BTreeMap::new();
        values.insert(field.into(), value.to_string());
        self.field_values(values)
    }

    pub fn property(mut self, size: Option<&str>, color: Option<&str>) -> Self {
        self.criteria.property_filters.push(PropertyFilter {
            size: size.map(str::to_string),
            color: color.map(str::to_string),
        });
        self
    }

    pub fn specification(mut self, resolution: Option<&str>, memory: Option<&str>) -> Self {
        self.criteria.specifications.push(Specification {
            resolution: resolution.map(str::to_string),
            memory: memory.map(str::to_string),
        });
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.criteria.sort_order = Some(order);
        self
    }

    pub fn rescore_on_sold_out(mut self, enabled: bool) -> Self {
        self.criteria.rescore_on_sold_out = enabled;
        self
    }

    pub fn use_boosting_factor(mut self, enabled: bool) -> Self {
        self.criteria.use_boosting_factor = enabled;
        self
    }

    pub fn no_facets(mut self, enabled: bool) -> Self {
        self.criteria.no_facets = enabled;
        self
    }

    pub fn build(self) -> SearchCriteria {
        self.criteria
    }
}
