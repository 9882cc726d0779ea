//! The product query service: faceted search, product lookup,
//! auto-suggestions and similar products.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use catalog_search_repository::{
    DocumentRef, DocumentStore, QueryNode, SearchRequest, SuggestRequest,
};
use catalog_search_shared::schema::fields;
use catalog_search_shared::{
    AutoSuggestionEntry, IndexConfig, ProductDetails, ProductSearchResult, ProductSummary,
    SearchCriteria,
};

use crate::compiler::QueryCompiler;
use crate::decode::{product_details, product_summary};
use crate::errors::SearchError;
use crate::facets::FacetPlanner;

/// Maximum number of completion suggestions returned.
pub const SUGGESTION_SIZE: usize = 20;

/// Stored fields returned by [`ProductQueryService::get_product`].
pub const PRODUCT_FIELDS: [&str; 8] = [
    fields::TITLE,
    fields::DESCRIPTION,
    fields::SOLD_OUT,
    fields::AVAILABLE_DATE,
    fields::KEYWORDS,
    fields::PRICE,
    fields::BOOST_FACTOR,
    fields::CATEGORIES,
];

/// Read side of the catalog, backed by any [`DocumentStore`].
pub struct ProductQueryService {
    store: Arc<dyn DocumentStore>,
}

impl ProductQueryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Run a faceted search.
    ///
    /// Facets are only aggregated when codes were requested and `no_facets`
    /// is not set.
    #[instrument(skip(self, config, criteria), fields(site = %config.site, query = ?criteria.query()))]
    pub async fn search_products(
        &self,
        config: &IndexConfig,
        criteria: &SearchCriteria,
    ) -> Result<ProductSearchResult, SearchError> {
        let compiler = QueryCompiler::new(config);

        let plan = if criteria.no_facets() {
            Vec::new()
        } else {
            FacetPlanner::plan(criteria.facet_codes())
        };

        let request = compiler.build_request(criteria, plan.clone())?;
        let response = self.store.search(&request).await?;

        let products = response.hits.iter().filter_map(product_summary).collect();
        let facets = FacetPlanner::decode(&plan, &response);

        info!(
            total = response.total,
            facet_count = facets.len(),
            "Search completed"
        );

        Ok(ProductSearchResult {
            total_count: response.total,
            products,
            facets,
        })
    }

    /// Stored fields of one product, or `None` when it is not indexed.
    #[instrument(skip(self, config), fields(site = %config.site))]
    pub async fn get_product(
        &self,
        config: &IndexConfig,
        product_id: i64,
    ) -> Result<Option<ProductDetails>, SearchError> {
        let document = self
            .store
            .get_document(
                config.alias,
                config.document_type,
                &product_id.to_string(),
                &PRODUCT_FIELDS,
            )
            .await?;

        Ok(document.as_ref().and_then(product_details))
    }

    /// Completion suggestions for a typed prefix. Blank text suggests nothing.
    #[instrument(skip(self, config), fields(site = %config.site))]
    pub async fn auto_suggestions(
        &self,
        config: &IndexConfig,
        text: &str,
    ) -> Result<Vec<AutoSuggestionEntry>, SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let request = SuggestRequest {
            indices: vec![config.alias.to_string()],
            field: fields::KEYWORDS.to_string(),
            text: text.to_string(),
            size: SUGGESTION_SIZE,
        };

        let options = self.store.suggest(&request).await?;
        debug!(count = options.len(), "Suggestions found");

        Ok(options
            .into_iter()
            .map(|option| AutoSuggestionEntry {
                term: option.text,
                score: option.score,
            })
            .collect())
    }

    /// Products whose `like_fields` resemble those of `product_id`, excluding
    /// the product itself.
    #[instrument(skip(self, config, like_fields), fields(site = %config.site))]
    pub async fn find_similar_products(
        &self,
        config: &IndexConfig,
        like_fields: &[&str],
        product_id: i64,
    ) -> Result<Vec<ProductSummary>, SearchError> {
        if like_fields.is_empty() {
            return Err(SearchError::validation("no fields to compare"));
        }

        let id = product_id.to_string();
        let query = QueryNode::MoreLikeThis {
            fields: like_fields.iter().map(|field| field.to_string()).collect(),
            like: vec![DocumentRef {
                index: config.alias.to_string(),
                doc_type: config.document_type.to_string(),
                id: id.clone(),
            }],
            min_term_freq: 1,
            min_doc_freq: 1,
        };

        let request = SearchRequest::new(
            vec![config.alias.to_string()],
            vec![config.document_type.to_string()],
            query,
        );
        let response = self.store.search(&request).await?;
        debug!(total = response.total, "Similar products found");

        Ok(response
            .hits
            .iter()
            .filter(|hit| hit.id != id)
            .filter_map(product_summary)
            .collect())
    }
}
