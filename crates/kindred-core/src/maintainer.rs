//! Embedding maintenance: (re)compute and persist work vectors.
//!
//! Maintenance is best-effort. A failure for one work is logged and
//! reported as `false`; it never aborts a batch and never propagates to the
//! caller's create/update path.

use std::sync::Arc;

use kindred_db::{DbError, Work, WorkId, WorkStore};
use tracing::{debug, warn};

use crate::encoder::VectorEncoder;
use crate::errors::DiscoveryError;
use crate::types::BatchReport;

/// Text that represents a work for embedding: the title, then the
/// description on its own line if there is one.
///
/// An empty description counts as absent. Fields are joined as stored; the
/// encoder trims the ends. Returns `None` when there is nothing but
/// whitespace to embed.
pub fn embedding_text(work: &Work) -> Option<String> {
    let text = match work.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => format!("{}\n{}", work.title, description),
        None => work.title.clone(),
    };

    (!text.trim().is_empty()).then_some(text)
}

/// Computes and stores embeddings for works.
pub struct IndexMaintainer {
    store: Arc<dyn WorkStore>,
    encoder: Arc<dyn VectorEncoder>,
}

impl IndexMaintainer {
    pub fn new(store: Arc<dyn WorkStore>, encoder: Arc<dyn VectorEncoder>) -> Self {
        Self { store, encoder }
    }

    /// Recompute and store the embedding of one work.
    ///
    /// Returns `false` (after logging) when the work is missing, has no text,
    /// the encoder yields nothing, or the write fails.
    pub fn update_one(&self, id: &WorkId) -> bool {
        match self.try_update_one(id) {
            Ok(()) => true,
            Err(DiscoveryError::WorkNotFound(_)) => {
                warn!("Cannot index {}: work not found", id);
                false
            }
            Err(e) => {
                warn!("Cannot index {}: {}", id, e);
                false
            }
        }
    }

    /// Like [`update_one`](Self::update_one) but reports why it failed.
    pub fn try_update_one(&self, id: &WorkId) -> Result<(), DiscoveryError> {
        let work = self
            .store
            .get(id)?
            .ok_or_else(|| DiscoveryError::WorkNotFound(id.to_string()))?;

        let text =
            embedding_text(&work).ok_or_else(|| DiscoveryError::NothingToEmbed(id.to_string()))?;

        let vector = self
            .encoder
            .encode(&text)
            .ok_or_else(|| DiscoveryError::EncodingUnavailable {
                reason: format!("encoder '{}' produced no vector", self.encoder.model_id()),
            })?;

        self.store
            .set_embedding(id, &vector)
            .map_err(|e| match e {
                DbError::WorkNotFound { id } => DiscoveryError::WorkNotFound(id),
                other => DiscoveryError::Persistence {
                    id: id.to_string(),
                    message: other.to_string(),
                },
            })?;

        debug!("Indexed {} ({} dims)", id, vector.len());
        Ok(())
    }

    /// Re-index `ids` one after another.
    ///
    /// Duplicates are processed each time they appear; `failed_ids` keeps
    /// input order.
    pub fn update_many(&self, ids: &[WorkId]) -> BatchReport {
        self.update_many_with(ids, |_, _| {})
    }

    /// [`update_many`](Self::update_many) with a callback after each id.
    pub fn update_many_with<F>(&self, ids: &[WorkId], mut on_each: F) -> BatchReport
    where
        F: FnMut(&WorkId, bool),
    {
        let report = ids.iter().fold(BatchReport::default(), |report, id| {
            let ok = self.update_one(id);
            on_each(id, ok);
            report.record(id, ok)
        });

        debug!(
            "Batch re-index: {} ok, {} failed",
            report.success_count,
            report.failed_ids.len()
        );
        report
    }
}
