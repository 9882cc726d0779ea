//! Alias-based index lifecycle.
//!
//! Each site is served through a stable alias. Rebuilding creates a new
//! timestamp-suffixed generation next to the live one, fills it, repoints the
//! alias and only then drains the older generations:
//!
//! ```text
//! Absent -> Building -> Live -> Draining -> Absent
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use catalog_search_repository::{DocumentStore, StoreError};
use catalog_search_shared::{IndexConfig, Product, ProductGroup};

use crate::errors::IndexingError;
use crate::loader::{IndexReport, ProductIndexer};
use crate::schema::{index_settings, MappingBuilder};

/// Timestamp suffix appended to the alias to name a generation.
const GENERATION_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Lifecycle state of one physical index generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Absent,
    /// Created and being filled; not yet reachable through the alias.
    Building,
    /// Serving through the alias.
    Live,
    /// Superseded; alias removed, deletion pending or failed.
    Draining,
}

/// Retry policy for draining old generations.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Extra attempts after the first failed deletion.
    pub cleanup_retries: u32,
    pub cleanup_retry_delay: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cleanup_retries: 2,
            cleanup_retry_delay: Duration::from_millis(250),
        }
    }
}

/// What a new generation is filled with.
#[derive(Debug, Clone, Copy)]
pub enum IndexSource<'a> {
    Products(&'a [Product]),
    Groups {
        groups: &'a [ProductGroup],
        parent_relationship: bool,
    },
}

/// Outcome of one [`IndexLifecycleManager::recreate`] run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecreateReport {
    pub alias: String,
    /// The generation now serving the alias.
    pub generation: String,
    pub indexing: IndexReport,
    /// Older generations that were deleted.
    pub drained: Vec<String>,
    /// Older generations whose deletion failed; they no longer serve traffic.
    pub stale: Vec<String>,
}

impl RecreateReport {
    /// State of a generation as left by this run.
    pub fn state_of(&self, index: &str) -> GenerationState {
        if index == self.generation {
            GenerationState::Live
        } else if self.stale.iter().any(|name| name == index) {
            GenerationState::Draining
        } else {
            GenerationState::Absent
        }
    }
}

/// Builds, swaps and drains index generations.
pub struct IndexLifecycleManager {
    store: Arc<dyn DocumentStore>,
    indexer: ProductIndexer,
    config: LifecycleConfig,
}

impl IndexLifecycleManager {
    pub fn new(store: Arc<dyn DocumentStore>, indexer: ProductIndexer, config: LifecycleConfig) -> Self {
        Self {
            store,
            indexer,
            config,
        }
    }

    pub fn indexer(&self) -> &ProductIndexer {
        &self.indexer
    }

    /// Rebuild a site index as a new generation and swap the alias to it.
    ///
    /// The alias keeps serving the previous generation until the new one is
    /// created, mapped, filled and refreshed, then moves off every older
    /// generation in the same swap that attaches it. Failing to drain an older
    /// generation is logged and reported in [`RecreateReport::stale`]; it
    /// never fails the run.
    #[instrument(skip(self, config, source), fields(alias = %config.alias))]
    pub async fn recreate(
        &self,
        config: &IndexConfig,
        source: IndexSource<'_>,
    ) -> Result<RecreateReport, IndexingError> {
        let alias = config.alias;
        let generation = self.next_generation_name(alias).await?;
        let parent_relationship = matches!(
            source,
            IndexSource::Groups {
                parent_relationship: true,
                ..
            }
        );

        info!(index = %generation, state = ?GenerationState::Building, "Creating index generation");
        self.store
            .create_index(&generation, &index_settings(config))
            .await?;

        let indexing = match self
            .build_generation(&generation, config, source, parent_relationship)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                error!(index = %generation, error = %e, "Failed to build index generation");
                if let Err(cleanup) = self.store.delete_index(&generation).await {
                    warn!(index = %generation, error = %cleanup, "Failed to delete unfinished generation");
                }
                return Err(e);
            }
        };

        // A concrete index squatting on the alias name blocks the alias.
        if self.store.index_exists(alias).await? {
            warn!(index = %alias, "Deleting concrete index named like the alias");
            self.store.delete_index(alias).await?;
        }

        let older = self.older_generations(alias, &generation).await?;
        self.store.alias_swap(alias, &generation, &older).await?;
        info!(
            index = %generation,
            state = ?GenerationState::Live,
            detached = older.len(),
            "Alias repointed"
        );

        let mut drained = Vec::new();
        let mut stale = Vec::new();
        for old in older {
            info!(index = %old, state = ?GenerationState::Draining, "Draining old generation");
            match self.drain(&old).await {
                Ok(()) => drained.push(old),
                Err(e) => {
                    warn!(index = %old, error = %e, "Old generation left behind");
                    stale.push(old);
                }
            }
        }

        info!(
            index = %generation,
            indexed = indexing.succeeded,
            failed = indexing.failed,
            drained = drained.len(),
            stale = stale.len(),
            "Index generation live"
        );

        Ok(RecreateReport {
            alias: alias.to_string(),
            generation,
            indexing,
            drained,
            stale,
        })
    }

    /// Recreate every given site index from a product-group catalog.
    pub async fn setup_all_indices(
        &self,
        configs: &[IndexConfig],
        groups: &[ProductGroup],
        parent_relationship: bool,
    ) -> Result<Vec<RecreateReport>, IndexingError> {
        let mut reports = Vec::with_capacity(configs.len());
        for config in configs {
            let report = self
                .recreate(
                    config,
                    IndexSource::Groups {
                        groups,
                        parent_relationship,
                    },
                )
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Run `text` through an analyzer of the index behind `alias`.
    pub async fn analyze_text(
        &self,
        alias: &str,
        analyzer: &str,
        text: &str,
    ) -> Result<Vec<String>, IndexingError> {
        if analyzer.trim().is_empty() {
            return Err(IndexingError::validation("analyzer name is blank"));
        }
        Ok(self.store.analyze(alias, analyzer, text).await?)
    }

    async fn build_generation(
        &self,
        generation: &str,
        config: &IndexConfig,
        source: IndexSource<'_>,
        parent_relationship: bool,
    ) -> Result<IndexReport, IndexingError> {
        let mappings = MappingBuilder::new(*config).with_parent_relationship(parent_relationship);
        for (doc_type, mapping) in mappings.mappings() {
            self.store.put_mapping(generation, doc_type, &mapping).await?;
        }

        let report = match source {
            IndexSource::Products(products) => {
                self.indexer
                    .index_all_into(generation, config, products)
                    .await?
            }
            IndexSource::Groups {
                groups,
                parent_relationship,
            } => {
                self.indexer
                    .index_all_groups_into(generation, config, groups, parent_relationship)
                    .await?
            }
        };

        self.store.refresh(generation).await?;
        Ok(report)
    }

    /// `<alias><yyyyMMddHHmmssSSS>`, advanced a millisecond at a time until
    /// the name is free.
    async fn next_generation_name(&self, alias: &str) -> Result<String, IndexingError> {
        let mut at: DateTime<Utc> = Utc::now();
        loop {
            let name = generation_name(alias, at);
            if !self.store.index_exists(&name).await? {
                return Ok(name);
            }
            debug!(index = %name, "Generation name taken");
            at += chrono::Duration::milliseconds(1);
        }
    }

    async fn older_generations(&self, alias: &str, current: &str) -> Result<Vec<String>, IndexingError> {
        let mut older: Vec<String> = self
            .store
            .list_indices()
            .await?
            .into_iter()
            .filter(|name| name.starts_with(alias) && name != current)
            .collect();
        older.sort();
        Ok(older)
    }

    async fn drain(&self, index: &str) -> Result<(), StoreError> {
        let mut attempt = 0;
        loop {
            match self.store.delete_index(index).await {
                Ok(_) => {
                    info!(index = %index, state = ?GenerationState::Absent, "Old generation deleted");
                    return Ok(());
                }
                Err(e) if attempt < self.config.cleanup_retries => {
                    attempt += 1;
                    warn!(index = %index, attempt, error = %e, "Retrying old generation deletion");
                    tokio::time::sleep(self.config.cleanup_retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn generation_name(alias: &str, at: DateTime<Utc>) -> String {
    format!("{}{}", alias, at.format(GENERATION_FORMAT))
}
