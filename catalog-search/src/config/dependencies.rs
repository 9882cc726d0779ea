//! Dependency initialization and wiring for the catalog search service.

use std::sync::Arc;

use clap::ValueEnum;
use tracing::info;

use catalog_search_indexer::{IndexLifecycleManager, ProductIndexer, RecreateReport, SampleCatalog};
use catalog_search_query::ProductQueryService;
use catalog_search_repository::{DocumentStore, MemoryDocumentStore, OpenSearchClient};

use crate::config::Settings;
use crate::AppError;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// A running OpenSearch cluster.
    Opensearch,
    /// An in-process store, seeded with the sample catalog on startup.
    Memory,
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub settings: Settings,
    pub catalog: SampleCatalog,
    pub store: Arc<dyn DocumentStore>,
    pub lifecycle: IndexLifecycleManager,
    pub query: ProductQueryService,
}

impl Dependencies {
    /// Initialize all dependencies for `backend`.
    ///
    /// The OpenSearch backend must be reachable and healthy. The memory
    /// backend starts empty and is filled with the sample catalog.
    pub async fn new(settings: Settings, backend: Backend) -> Result<Self, AppError> {
        info!(
            backend = ?backend,
            opensearch_url = %settings.opensearch_url,
            sites = settings.sites.len(),
            parent_relationship = settings.parent_relationship,
            "Initializing dependencies"
        );

        let store: Arc<dyn DocumentStore> = match backend {
            Backend::Opensearch => Arc::new(Self::opensearch(&settings.opensearch_url).await?),
            Backend::Memory => Arc::new(MemoryDocumentStore::new()),
        };

        let dependencies = Self::with_store(settings, store)?;

        if backend == Backend::Memory {
            dependencies.setup().await?;
        }

        Ok(dependencies)
    }

    /// Wire the services around an existing store.
    pub fn with_store(settings: Settings, store: Arc<dyn DocumentStore>) -> Result<Self, AppError> {
        let catalog = SampleCatalog::generate()?;

        let indexer = ProductIndexer::new(store.clone(), catalog.categories.clone());
        let lifecycle = IndexLifecycleManager::new(store.clone(), indexer, settings.lifecycle.clone());
        let query = ProductQueryService::new(store.clone());

        Ok(Self {
            settings,
            catalog,
            store,
            lifecycle,
            query,
        })
    }

    /// Recreate every configured site index from the sample catalog.
    pub async fn setup(&self) -> Result<Vec<RecreateReport>, AppError> {
        let reports = self
            .lifecycle
            .setup_all_indices(
                &self.settings.sites,
                &self.catalog.groups,
                self.settings.parent_relationship,
            )
            .await?;

        for report in &reports {
            info!(
                alias = %report.alias,
                generation = %report.generation,
                succeeded = report.indexing.succeeded,
                failed = report.indexing.failed,
                "Site index ready"
            );
        }

        Ok(reports)
    }

    async fn opensearch(url: &str) -> Result<OpenSearchClient, AppError> {
        let client = OpenSearchClient::new(url)
            .await
            .map_err(|e| AppError::config(format!("Failed to create OpenSearch client: {}", e)))?;

        let healthy = client
            .health_check()
            .await
            .map_err(|e| AppError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(AppError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");
        Ok(client)
    }
}
