//! Discovery engine – the entry point for every kindred operation.
//!
//! [`Discovery`] wires the work store, the encoder, the primary backend and
//! the fallback scan together and exposes the public surface: `search`,
//! `reindex` and `reindex_batch`, plus the maintenance extras used by the
//! CLI.

use std::sync::Arc;

use kindred_db::{
    open_neighbor_backend, open_work_store, NeighborBackend, Work, WorkId, WorkKind, WorkStore,
};
use tracing::{debug, info};

use crate::config::{DiscoveryConfig, SearchDefaults};
use crate::encoder::VectorEncoder;
use crate::errors::DiscoveryError;
use crate::fallback::FallbackMatcher;
use crate::maintainer::IndexMaintainer;
use crate::model_adapter::ModelVectorEncoder;
use crate::search::{SearchOutcome, SearchService};
use crate::types::{BatchReport, SearchRequest, SearchResponse};

// ============================================================================
// Discovery
// ============================================================================

/// The main engine for kindred operations.
///
/// # Construction
///
/// Use [`Discovery::from_config`] for typical usage, or [`Discovery::new`]
/// to inject a custom store, backend or encoder (tests, embedding hosts).
///
/// # Example
///
/// ```ignore
/// use kindred_core::{Discovery, DiscoveryConfig};
///
/// let discovery = Discovery::from_config(DiscoveryConfig::load(None)?)?;
/// let response = discovery.search("a lighthouse keeper", None, None, None);
/// for hit in response.results {
///     println!("{} {:.3}", hit.work.title, hit.score);
/// }
/// ```
pub struct Discovery {
    config: DiscoveryConfig,
    store: Arc<dyn WorkStore>,
    search: SearchService,
    maintainer: IndexMaintainer,
}

impl Discovery {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Build an engine from configuration.
    ///
    /// Opens the work store, creates the encoder and opens the primary
    /// backend. The encoder does not contact its provider here; a missing
    /// API key only shows up as unavailable embeddings later.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened, the embedding
    /// provider is not compiled in, or the backend configuration is invalid.
    pub fn from_config(config: DiscoveryConfig) -> Result<Self, DiscoveryError> {
        let store = open_work_store(&config.store)?;
        let encoder: Arc<dyn VectorEncoder> =
            Arc::new(ModelVectorEncoder::from_config(&config.embedding)?);
        let backend = open_neighbor_backend(&config.backend, config.embedding.dimension)?;

        debug!(
            "Discovery ready: encoder '{}', backend '{}'",
            encoder.model_id(),
            backend.name()
        );

        let mut discovery = Self::new(store, backend, encoder, config.search.clone());
        discovery.config = config;
        Ok(discovery)
    }

    /// Build an engine from explicit parts.
    pub fn new(
        store: Arc<dyn WorkStore>,
        backend: Arc<dyn NeighborBackend>,
        encoder: Arc<dyn VectorEncoder>,
        defaults: SearchDefaults,
    ) -> Self {
        let fallback = FallbackMatcher::new(store.clone(), defaults.parallel_fallback);
        let search = SearchService::new(encoder.clone(), backend, fallback);
        let maintainer = IndexMaintainer::new(store.clone(), encoder);

        let config = DiscoveryConfig {
            search: defaults,
            ..DiscoveryConfig::default()
        };

        Self {
            config,
            store,
            search,
            maintainer,
        }
    }

    /// Get the configuration this engine was built from.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Get the work store.
    pub fn store(&self) -> &Arc<dyn WorkStore> {
        &self.store
    }

    /// Name of the primary backend.
    pub fn backend_name(&self) -> &'static str {
        self.search.backend_name()
    }

    // -------------------------------------------------------------------------
    // Search
    // -------------------------------------------------------------------------

    /// Find works similar to `query`.
    ///
    /// `limit` and `threshold` default to the configured search defaults
    /// (10 and 0.7 unless overridden). Never fails: problems yield
    /// `success: false` with no results.
    pub fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
        kind: Option<WorkKind>,
    ) -> SearchResponse {
        let request = SearchRequest::new(query)
            .with_limit(limit.unwrap_or(self.config.search.limit))
            .with_threshold(threshold.unwrap_or(self.config.search.threshold))
            .with_kind(kind);
        self.search_request(&request)
    }

    /// Run a prepared request.
    pub fn search_request(&self, request: &SearchRequest) -> SearchResponse {
        self.search.search(request)
    }

    /// Run a prepared request and keep the detailed outcome.
    pub fn search_outcome(&self, request: &SearchRequest) -> SearchOutcome {
        self.search.run(request)
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    /// Recompute the embedding of one work. Returns `false` on any failure.
    pub fn reindex(&self, id: &WorkId) -> bool {
        self.maintainer.update_one(id)
    }

    /// Like [`reindex`](Self::reindex) but reports why it failed.
    pub fn try_reindex(&self, id: &WorkId) -> Result<(), DiscoveryError> {
        self.maintainer.try_update_one(id)
    }

    /// Recompute embeddings for `ids` in order.
    pub fn reindex_batch(&self, ids: &[WorkId]) -> BatchReport {
        self.maintainer.update_many(ids)
    }

    /// [`reindex_batch`](Self::reindex_batch) with a per-id callback.
    pub fn reindex_batch_with<F>(&self, ids: &[WorkId], on_each: F) -> BatchReport
    where
        F: FnMut(&WorkId, bool),
    {
        self.maintainer.update_many_with(ids, on_each)
    }

    /// Embed every work that has no embedding yet.
    pub fn backfill(&self) -> Result<BatchReport, DiscoveryError> {
        self.backfill_with(|_, _, _| {})
    }

    /// [`backfill`](Self::backfill) with a callback receiving the id, its
    /// outcome and the number of pending works.
    pub fn backfill_with<F>(&self, mut on_each: F) -> Result<BatchReport, DiscoveryError>
    where
        F: FnMut(&WorkId, bool, usize),
    {
        let pending = self.store.ids_missing_embedding()?;
        let total = pending.len();
        info!("Backfilling {} works without embeddings", total);

        Ok(self
            .maintainer
            .update_many_with(&pending, |id, ok| on_each(id, ok, total)))
    }

    /// Insert or replace works in the store. Returns the number written.
    pub fn import(&self, works: &[Work]) -> Result<usize, DiscoveryError> {
        let written = self.store.upsert(works)?;
        info!("Imported {} works", written);
        Ok(written)
    }

    /// Rebuild the local LanceDB mirror from the work store.
    ///
    /// Returns the number of rows written.
    #[cfg(feature = "lancedb")]
    pub fn sync_index(&self) -> Result<usize, DiscoveryError> {
        use kindred_db::{LanceDbNeighborBackend, WorkFilter};

        let works = self.store.scan_embedded(&WorkFilter::new())?;
        let index = LanceDbNeighborBackend::open(
            self.config.backend.lancedb_path(),
            self.config.embedding.dimension,
        )?;
        let rows = index.mirror(&works)?;
        info!(
            "Mirrored {} of {} embedded works into {}",
            rows,
            works.len(),
            index.path().display()
        );
        Ok(rows)
    }
}
