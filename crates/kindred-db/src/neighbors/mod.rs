//! Primary nearest-neighbor backends.
//!
//! A backend answers "which works are closest to this vector" in a single
//! call, without the caller scanning the corpus. Any error returned here is
//! treated upstream as "primary unavailable" and triggers the fallback scan.
//!
//! ## Available Backends
//!
//! - `rpc` (default): database-side search function over HTTP
//! - `lancedb` (feature): local ANN table mirrored from the work store
//! - `disabled`: always fails, forcing the fallback path

mod disabled;
mod rpc;

#[cfg(feature = "lancedb")]
mod lancedb;

pub use disabled::DisabledBackend;
pub use rpc::RpcNeighborBackend;

#[cfg(feature = "lancedb")]
pub use self::lancedb::LanceDbNeighborBackend;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{NeighborBackendConfig, NeighborBackendKind, BACKEND_URL_ENV};
use crate::error::DbResult;
use crate::works::WorkSummary;

// ============================================================================
// Query / Match
// ============================================================================

/// Parameters of one nearest-neighbor lookup.
#[derive(Debug, Clone, Copy)]
pub struct NeighborQuery<'a> {
    /// Query vector.
    pub embedding: &'a [f32],

    /// Minimum cosine similarity of returned matches.
    pub threshold: f32,

    /// Maximum number of matches.
    pub limit: usize,
}

impl<'a> NeighborQuery<'a> {
    pub fn new(embedding: &'a [f32], threshold: f32, limit: usize) -> Self {
        Self {
            embedding,
            threshold,
            limit,
        }
    }
}

/// A work returned by a backend with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborMatch {
    pub work: WorkSummary,
    pub similarity: f32,
}

// ============================================================================
// NeighborBackend trait
// ============================================================================

/// A database-side similarity search.
///
/// Returns matches at or above `threshold`, best first, at most `limit`.
pub trait NeighborBackend: Send + Sync {
    /// Run one lookup.
    fn query(&self, query: &NeighborQuery<'_>) -> DbResult<Vec<NeighborMatch>>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

// ============================================================================
// Factory
// ============================================================================

/// Open the primary backend described by `config`.
///
/// `dimension` is the encoder dimension; only the LanceDB backend needs it.
/// An RPC backend without a URL degrades to [`DisabledBackend`] with a
/// warning, so a missing URL costs speed, not results.
pub fn open_neighbor_backend(
    config: &NeighborBackendConfig,
    dimension: usize,
) -> DbResult<Arc<dyn NeighborBackend>> {
    debug!("Opening neighbor backend '{}'", config.kind);

    match config.kind {
        NeighborBackendKind::Rpc => match config.resolved_url() {
            Some(url) => Ok(Arc::new(RpcNeighborBackend::new(&url, config)?)),
            None => {
                warn!(
                    "No RPC URL configured (backend.url or ${}); searches will use the fallback scan",
                    BACKEND_URL_ENV
                );
                Ok(Arc::new(DisabledBackend))
            }
        },

        NeighborBackendKind::Disabled => Ok(Arc::new(DisabledBackend)),

        #[cfg(feature = "lancedb")]
        NeighborBackendKind::LanceDb => Ok(Arc::new(LanceDbNeighborBackend::open(
            config.lancedb_path(),
            dimension,
        )?)),

        #[cfg(not(feature = "lancedb"))]
        NeighborBackendKind::LanceDb => {
            let _ = dimension;
            Err(crate::error::DbError::config(format!(
                "Backend 'lancedb' is not available (feature not enabled). Available backends: {}",
                available_backends().join(", ")
            )))
        }
    }
}

/// Get a list of available backend names.
#[allow(clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = vec!["rpc"];

    #[cfg(feature = "lancedb")]
    backends.push("lancedb");

    backends.push("disabled");
    backends
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn test_available_backends() {
        let backends = available_backends();
        assert!(backends.contains(&"rpc"));
        assert!(backends.contains(&"disabled"));
        assert_eq!(backends.contains(&"lancedb"), cfg!(feature = "lancedb"));
    }

    #[test]
    fn test_disabled_kind_opens_disabled_backend() {
        let backend = open_neighbor_backend(&NeighborBackendConfig::disabled(), 4).unwrap();
        assert_eq!(backend.name(), "disabled");
        let err = backend
            .query(&NeighborQuery::new(&[1.0, 0.0, 0.0, 0.0], 0.5, 5))
            .unwrap_err();
        assert!(matches!(err, DbError::BackendDisabled));
    }

    #[test]
    fn test_rpc_kind_with_url_opens_rpc_backend() {
        let config = NeighborBackendConfig::rpc("http://127.0.0.1:9");
        let backend = open_neighbor_backend(&config, 4).unwrap();
        assert_eq!(backend.name(), "rpc");
    }

    #[cfg(not(feature = "lancedb"))]
    #[test]
    fn test_lancedb_kind_without_feature() {
        let config = NeighborBackendConfig {
            kind: NeighborBackendKind::LanceDb,
            ..NeighborBackendConfig::default()
        };
        assert!(matches!(
            open_neighbor_backend(&config, 4),
            Err(DbError::Config { .. })
        ));
    }
}
