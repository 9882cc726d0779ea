//! Bulk indexing pipeline.
//!
//! Builds documents for products, groups and properties and submits them to
//! the document store as one bulk write per call. Entities that fail to build
//! are skipped and reported; items the store rejects are reported as well.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use catalog_search_repository::{BulkItem, BulkResponse, DocumentStore, JoinField};
use catalog_search_shared::{CategoryTree, IndexConfig, Product, ProductGroup};

use crate::document::DocumentBuilder;
use crate::errors::IndexingError;

/// Where an entity failed on its way into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStage {
    /// The document could not be built.
    Build,
    /// The store rejected the document.
    Write,
}

/// One entity that did not make it into the index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexFailure {
    pub doc_type: String,
    pub id: String,
    pub stage: IndexStage,
    pub message: String,
}

/// Summary of a bulk indexing call.
///
/// Partial failures are data, not errors: `failures` lists every entity that
/// was skipped at build time or rejected by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    /// Entities considered, whether or not they built.
    pub total: usize,
    /// Documents the store accepted.
    pub succeeded: usize,
    /// Entities that failed to build or write.
    pub failed: usize,
    pub failures: Vec<IndexFailure>,
}

impl IndexReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    fn build_failure(&mut self, doc_type: &str, id: impl ToString, message: impl ToString) {
        self.total += 1;
        self.failed += 1;
        self.failures.push(IndexFailure {
            doc_type: doc_type.to_string(),
            id: id.to_string(),
            stage: IndexStage::Build,
            message: message.to_string(),
        });
    }

    fn record_bulk(&mut self, response: &BulkResponse) {
        self.total += response.items.len();
        for item in &response.items {
            if item.success {
                self.succeeded += 1;
            } else {
                self.failed += 1;
                self.failures.push(IndexFailure {
                    doc_type: item.doc_type.clone(),
                    id: item.id.clone(),
                    stage: IndexStage::Write,
                    message: item
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown bulk failure".to_string()),
                });
            }
        }
    }
}

/// Indexes catalog entities into a site index.
///
/// The `*_into` variants write into an explicit physical index; the others
/// write through the site alias.
pub struct ProductIndexer {
    store: Arc<dyn DocumentStore>,
    documents: DocumentBuilder,
}

impl ProductIndexer {
    pub fn new(store: Arc<dyn DocumentStore>, categories: Arc<CategoryTree>) -> Self {
        Self {
            store,
            documents: DocumentBuilder::new(categories),
        }
    }

    pub fn documents(&self) -> &DocumentBuilder {
        &self.documents
    }

    /// Index products through the site alias.
    pub async fn index_all(
        &self,
        config: &IndexConfig,
        products: &[Product],
    ) -> Result<IndexReport, IndexingError> {
        self.index_all_into(config.alias, config, products).await
    }

    /// Index products into `index` with one bulk write.
    #[instrument(skip(self, config, products), fields(product_count = products.len()))]
    pub async fn index_all_into(
        &self,
        index: &str,
        config: &IndexConfig,
        products: &[Product],
    ) -> Result<IndexReport, IndexingError> {
        let mut report = IndexReport::default();
        let mut items = Vec::with_capacity(products.len());

        for product in products {
            match self.product_item(index, config, product, None) {
                Ok(item) => items.push(item),
                Err(e) => {
                    error!(product_id = product.id, error = %e, "Failed to build product document");
                    report.build_failure(config.document_type, product.id, e);
                }
            }
        }

        self.submit(&mut report, &items).await?;
        Ok(report)
    }

    /// Index product groups, their products and the products' properties
    /// through the site alias.
    pub async fn index_all_groups(
        &self,
        config: &IndexConfig,
        groups: &[ProductGroup],
        with_parent_link: bool,
    ) -> Result<IndexReport, IndexingError> {
        self.index_all_groups_into(config.alias, config, groups, with_parent_link)
            .await
    }

    /// Index product groups into `index` with one bulk write.
    ///
    /// With `with_parent_link`, products are joined to their group and
    /// properties to their product. Property documents get the composite id
    /// from [`catalog_search_shared::ProductProperty::document_id`].
    #[instrument(skip(self, config, groups), fields(group_count = groups.len()))]
    pub async fn index_all_groups_into(
        &self,
        index: &str,
        config: &IndexConfig,
        groups: &[ProductGroup],
        with_parent_link: bool,
    ) -> Result<IndexReport, IndexingError> {
        let mut report = IndexReport::default();
        let mut items = Vec::new();

        for group in groups {
            items.push(BulkItem {
                index: index.to_string(),
                doc_type: config.group_document_type.to_string(),
                id: group.id.to_string(),
                join: with_parent_link.then(|| JoinField::root(config.group_document_type)),
                body: self.documents.group_document(group),
            });

            for product in &group.products {
                let join = with_parent_link.then(|| {
                    JoinField::child(
                        config.document_type,
                        config.group_document_type,
                        group.id.to_string(),
                    )
                });

                match self.product_item(index, config, product, join) {
                    Ok(item) => items.push(item),
                    Err(e) => {
                        error!(
                            product_id = product.id,
                            group_id = group.id,
                            error = %e,
                            "Failed to build product document"
                        );
                        report.build_failure(config.document_type, product.id, e);
                        continue;
                    }
                }

                for property in &product.properties {
                    items.push(BulkItem {
                        index: index.to_string(),
                        doc_type: config.property_document_type.to_string(),
                        id: property.document_id(product.id),
                        join: with_parent_link.then(|| {
                            JoinField::child(
                                config.property_document_type,
                                config.document_type,
                                product.id.to_string(),
                            )
                        }),
                        body: self.documents.property_document(property),
                    });
                }
            }
        }

        self.submit(&mut report, &items).await?;
        Ok(report)
    }

    /// Index a single product through the site alias.
    #[instrument(skip(self, config, product), fields(product_id = product.id))]
    pub async fn index_one(&self, config: &IndexConfig, product: &Product) -> Result<(), IndexingError> {
        let item = self.product_item(config.alias, config, product, None)?;
        self.store.index_document(&item).await?;
        debug!(product_id = product.id, "Indexed product");
        Ok(())
    }

    /// Delete a product document. Returns false when it did not exist.
    #[instrument(skip(self, config))]
    pub async fn delete_one(&self, config: &IndexConfig, product_id: i64) -> Result<bool, IndexingError> {
        let deleted = self
            .store
            .delete_document(config.alias, config.document_type, &product_id.to_string())
            .await?;
        if !deleted {
            warn!(product_id, "Product to delete was not found");
        }
        Ok(deleted)
    }

    pub async fn exists(&self, config: &IndexConfig, product_id: i64) -> Result<bool, IndexingError> {
        Ok(self
            .store
            .document_exists(config.alias, config.document_type, &product_id.to_string())
            .await?)
    }

    fn product_item(
        &self,
        index: &str,
        config: &IndexConfig,
        product: &Product,
        join: Option<JoinField>,
    ) -> Result<BulkItem, crate::errors::DocumentBuildError> {
        Ok(BulkItem {
            index: index.to_string(),
            doc_type: config.document_type.to_string(),
            id: product.id.to_string(),
            join,
            body: self.documents.product_document(product)?,
        })
    }

    async fn submit(&self, report: &mut IndexReport, items: &[BulkItem]) -> Result<(), IndexingError> {
        if items.is_empty() {
            info!(failed = report.failed, "No documents to index");
            return Ok(());
        }

        let response = self.store.bulk_write(items).await.map_err(|e| {
            error!(error = %e, count = items.len(), "Bulk write failed");
            e
        })?;
        report.record_bulk(&response);

        if report.failed > 0 {
            warn!(
                total = report.total,
                succeeded = report.succeeded,
                failed = report.failed,
                "Bulk indexing completed with failures"
            );
        } else {
            info!(total = report.total, "Bulk indexing completed");
        }
        Ok(())
    }
}
