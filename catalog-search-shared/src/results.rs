//! Result types returned by the query service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bucket of a facet: a value and how many products carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub name: String,
    pub count: u64,
}

/// A requested facet with its non-empty buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetResult {
    pub code: String,
    pub values: Vec<FacetValue>,
}

/// A product as listed on a result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub title: String,
    pub price: Option<f64>,
    pub sold_out: bool,
    pub score: Option<f64>,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSearchResult {
    pub total_count: u64,
    pub products: Vec<ProductSummary>,
    pub facets: Vec<FacetResult>,
}

impl ProductSearchResult {
    pub fn facet(&self, code: &str) -> Option<&FacetResult> {
        self.facets.iter().find(|facet| facet.code == code)
    }
}

/// A category facet value stored on a product document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryValue {
    pub field: String,
    pub name: String,
}

/// Stored fields of a single product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub sold_out: bool,
    pub available_date: Option<DateTime<Utc>>,
    pub boost_factor: Option<f64>,
    pub keywords: Vec<String>,
    pub categories: Vec<CategoryValue>,
}

/// A completion suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSuggestionEntry {
    pub term: String,
    pub score: f64,
}
