//! Two-tier similarity search.
//!
//! The query is encoded once. The primary nearest-neighbor backend is tried
//! first; if it fails for any reason the same vector is handed to the
//! [`FallbackMatcher`]. Neither tier's failure reaches the caller: the
//! outcome degrades to an empty, unsuccessful response instead.

use std::sync::Arc;

use kindred_db::{NeighborBackend, NeighborQuery};
use tracing::{debug, info, warn};

use crate::encoder::VectorEncoder;
use crate::errors::DiscoveryError;
use crate::fallback::FallbackMatcher;
use crate::types::{SearchHit, SearchMode, SearchRequest, SearchResponse};

/// What a search run produced, before it is flattened into a response.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The query was empty or whitespace; nothing was called.
    EmptyQuery,
    /// The encoder returned no vector; no backend was called.
    NoEmbedding,
    /// Results from the primary backend.
    Primary(Vec<SearchHit>),
    /// Results from the in-process scan after the primary failed.
    Fallback {
        hits: Vec<SearchHit>,
        primary_error: DiscoveryError,
    },
    /// Both tiers failed.
    Unavailable {
        primary_error: DiscoveryError,
        fallback_error: DiscoveryError,
    },
}

impl SearchOutcome {
    /// Convert to the public response for `query`.
    pub fn into_response(self, query: &str) -> SearchResponse {
        let (success, results, mode, message) = match self {
            SearchOutcome::EmptyQuery => (
                false,
                Vec::new(),
                SearchMode::EmptyQuery,
                Some("query is empty".to_string()),
            ),
            SearchOutcome::NoEmbedding => (
                false,
                Vec::new(),
                SearchMode::EmbeddingUnavailable,
                Some("could not embed the query".to_string()),
            ),
            SearchOutcome::Primary(hits) => (true, hits, SearchMode::Primary, None),
            SearchOutcome::Fallback { hits, .. } => (true, hits, SearchMode::Fallback, None),
            SearchOutcome::Unavailable { fallback_error, .. } => (
                false,
                Vec::new(),
                SearchMode::Unavailable,
                Some(fallback_error.to_string()),
            ),
        };

        SearchResponse {
            success,
            results,
            mode,
            query: query.to_string(),
            message,
        }
    }
}

/// Orchestrates encoder, primary backend and fallback.
pub struct SearchService {
    encoder: Arc<dyn VectorEncoder>,
    backend: Arc<dyn NeighborBackend>,
    fallback: FallbackMatcher,
}

impl SearchService {
    pub fn new(
        encoder: Arc<dyn VectorEncoder>,
        backend: Arc<dyn NeighborBackend>,
        fallback: FallbackMatcher,
    ) -> Self {
        Self {
            encoder,
            backend,
            fallback,
        }
    }

    /// Name of the primary backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Run a search and return the public response.
    pub fn search(&self, request: &SearchRequest) -> SearchResponse {
        self.run(request).into_response(&request.query)
    }

    /// Run a search and report which path produced the results.
    pub fn run(&self, request: &SearchRequest) -> SearchOutcome {
        if request.query.trim().is_empty() {
            debug!("Empty query, skipping search");
            return SearchOutcome::EmptyQuery;
        }

        let Some(vector) = self.encoder.encode(&request.query) else {
            warn!("No embedding for query, returning no results");
            return SearchOutcome::NoEmbedding;
        };

        let primary_error = match self.query_primary(&vector, request) {
            Ok(hits) => {
                debug!(
                    "Primary backend '{}' returned {} results",
                    self.backend.name(),
                    hits.len()
                );
                return SearchOutcome::Primary(hits);
            }
            Err(e) => e,
        };

        warn!(
            "Primary backend '{}' failed, using fallback scan: {}",
            self.backend.name(),
            primary_error
        );

        match self
            .fallback
            .find(&vector, request.threshold, request.limit, request.kind)
        {
            Ok(hits) => {
                info!("Fallback scan returned {} results", hits.len());
                SearchOutcome::Fallback {
                    hits,
                    primary_error,
                }
            }
            Err(fallback_error) => {
                warn!("Fallback scan failed: {}", fallback_error);
                SearchOutcome::Unavailable {
                    primary_error,
                    fallback_error,
                }
            }
        }
    }

    fn query_primary(
        &self,
        vector: &[f32],
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, DiscoveryError> {
        let matches = self
            .backend
            .query(&NeighborQuery::new(vector, request.threshold, request.limit))
            .map_err(|e| DiscoveryError::BackendUnavailable {
                backend: self.backend.name().to_string(),
                reason: e.to_string(),
            })?;

        // The backend applies threshold and limit; the type filter is ours.
        // Rows without a type cannot satisfy a filter.
        Ok(matches
            .into_iter()
            .filter(|m| request.kind.map_or(true, |k| m.work.kind == Some(k)))
            .map(|m| SearchHit::new(m.work, m.similarity))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_db::{DisabledBackend, JsonlWorkStore, Work, WorkKind, WorkStore};

    struct Fixed(Vec<f32>);

    impl VectorEncoder for Fixed {
        fn embed_text(&self, _text: &str) -> Result<Vec<f32>, DiscoveryError> {
            Ok(self.0.clone())
        }
        fn dimension(&self) -> usize {
            self.0.len()
        }
        fn model_id(&self) -> &str {
            "fixed"
        }
    }

    fn service(encoder: Vec<f32>) -> SearchService {
        let store = JsonlWorkStore::in_memory();
        store
            .upsert(&[Work::new("w", "W", WorkKind::Novel).with_embedding(vec![1.0, 0.0])])
            .unwrap();
        let store: Arc<dyn WorkStore> = Arc::new(store);
        SearchService::new(
            Arc::new(Fixed(encoder)),
            Arc::new(DisabledBackend),
            FallbackMatcher::new(store, false),
        )
    }

    #[test]
    fn test_empty_query_response() {
        let response = service(vec![1.0, 0.0]).search(&SearchRequest::new("   "));
        assert!(!response.success);
        assert!(response.results.is_empty());
        assert_eq!(response.mode, SearchMode::EmptyQuery);
    }

    #[test]
    fn test_disabled_backend_falls_back() {
        let response = service(vec![1.0, 0.0]).search(&SearchRequest::new("lighthouse"));
        assert!(response.success);
        assert_eq!(response.mode, SearchMode::Fallback);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.query, "lighthouse");
    }

    #[test]
    fn test_wrong_dimension_encoder_is_embedding_unavailable() {
        struct Liar;
        impl VectorEncoder for Liar {
            fn embed_text(&self, _text: &str) -> Result<Vec<f32>, DiscoveryError> {
                Ok(vec![1.0])
            }
            fn dimension(&self) -> usize {
                2
            }
            fn model_id(&self) -> &str {
                "liar"
            }
        }

        let store: Arc<dyn WorkStore> = Arc::new(JsonlWorkStore::in_memory());
        let service = SearchService::new(
            Arc::new(Liar),
            Arc::new(DisabledBackend),
            FallbackMatcher::new(store, false),
        );
        let response = service.search(&SearchRequest::new("anything"));
        assert!(!response.success);
        assert_eq!(response.mode, SearchMode::EmbeddingUnavailable);
    }
}
