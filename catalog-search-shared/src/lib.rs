//! # Catalog Search Shared
//!
//! Types shared by the catalog search crates: the catalog model and its
//! category hierarchy, search criteria, result types, and the naming table
//! for indices, facets and document fields.

pub mod catalog;
pub mod category;
pub mod criteria;
pub mod results;
pub mod schema;

pub use catalog::{Product, ProductGroup, ProductProperty, Specification};
pub use category::{Category, CategoryError, CategoryId, CategoryTree, FlattenedCategory};
pub use criteria::{PropertyFilter, SearchCriteria, SearchCriteriaBuilder, SortOrder};
pub use results::{
    AutoSuggestionEntry, CategoryValue, FacetResult, FacetValue, ProductDetails,
    ProductSearchResult, ProductSummary,
};
pub use schema::{AnalysisComponent, CategoryFacet, FacetKind, IndexConfig, SupportedLocale};
