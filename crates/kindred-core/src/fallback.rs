//! Exhaustive in-process nearest-neighbor scan.
//!
//! Used when the primary backend fails. Loads every visible, embedded work
//! (narrowed by type), scores it against the query with cosine similarity,
//! keeps scores at or above the threshold, sorts best first and truncates.
//!
//! Cost is O(N · D) per query over the whole visible corpus and nothing is
//! cached between queries. There is no cap on N: capping would change which
//! works are found.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use kindred_db::{Work, WorkFilter, WorkKind, WorkStore};
use rayon::prelude::*;
use tracing::debug;

use crate::errors::DiscoveryError;
use crate::similarity::cosine_similarity;
use crate::types::SearchHit;

/// Brute-force cosine matcher over the work store.
pub struct FallbackMatcher {
    store: Arc<dyn WorkStore>,
    parallel: bool,
}

enum Scored {
    Hit(SearchHit),
    Below,
    WrongDimension,
}

impl FallbackMatcher {
    /// Create a matcher. `parallel` scores candidates on the rayon pool;
    /// output is identical either way.
    pub fn new(store: Arc<dyn WorkStore>, parallel: bool) -> Self {
        Self { store, parallel }
    }

    /// Find the works most similar to `query`.
    ///
    /// Results are sorted by descending score; ties keep ascending id order.
    /// Stored vectors whose length differs from `query` are skipped.
    pub fn find(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
        kind: Option<WorkKind>,
    ) -> Result<Vec<SearchHit>, DiscoveryError> {
        let started = Instant::now();
        let candidates = self.store.scan_embedded(&WorkFilter::new().with_kind(kind))?;

        let score = |work: &Work| -> Scored {
            let Some(stored) = work.embedding.as_deref() else {
                return Scored::Below;
            };
            if stored.len() != query.len() {
                return Scored::WrongDimension;
            }
            let similarity = cosine_similarity(query, stored);
            if similarity >= threshold {
                Scored::Hit(SearchHit::new(work.summary(), similarity))
            } else {
                Scored::Below
            }
        };

        // Both branches preserve scan order, which the stable sort relies on.
        let scored: Vec<Scored> = if self.parallel {
            candidates.par_iter().map(score).collect()
        } else {
            candidates.iter().map(score).collect()
        };

        let mut skipped = 0usize;
        let mut hits = Vec::new();
        for s in scored {
            match s {
                Scored::Hit(hit) => hits.push(hit),
                Scored::WrongDimension => skipped += 1,
                Scored::Below => {}
            }
        }

        if skipped > 0 {
            debug!(
                "Fallback skipped {} stored vectors whose dimension is not {}",
                skipped,
                query.len()
            );
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);

        debug!(
            "Fallback scanned {} works, returned {} in {:?}",
            candidates.len(),
            hits.len(),
            started.elapsed()
        );
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_db::{JsonlWorkStore, ModerationStatus};

    fn unit(angle_cos: f32) -> Vec<f32> {
        vec![angle_cos, (1.0 - angle_cos * angle_cos).max(0.0).sqrt()]
    }

    fn store_with(works: Vec<Work>) -> Arc<dyn WorkStore> {
        let store = JsonlWorkStore::in_memory();
        store.upsert(&works).unwrap();
        Arc::new(store)
    }

    fn ids(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.work.id.as_str()).collect()
    }

    #[test]
    fn test_threshold_sort_and_limit() {
        let store = store_with(vec![
            Work::new("a", "A", WorkKind::Novel).with_embedding(unit(0.4)),
            Work::new("b", "B", WorkKind::Novel).with_embedding(unit(0.9)),
            Work::new("c", "C", WorkKind::Novel).with_embedding(unit(0.75)),
        ]);
        let query = [1.0, 0.0];

        for parallel in [false, true] {
            let matcher = FallbackMatcher::new(store.clone(), parallel);
            let hits = matcher.find(&query, 0.7, 10, None).unwrap();
            assert_eq!(ids(&hits), vec!["b", "c"]);
            assert!((hits[0].score - 0.9).abs() < 1e-5);
            assert!((hits[1].score - 0.75).abs() < 1e-5);

            let top = matcher.find(&query, 0.7, 1, None).unwrap();
            assert_eq!(ids(&top), vec!["b"]);
        }
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let store = store_with(vec![
            Work::new("z", "Z", WorkKind::Novel).with_embedding(vec![1.0, 0.0]),
            Work::new("m", "M", WorkKind::Novel).with_embedding(vec![2.0, 0.0]),
            Work::new("a", "A", WorkKind::Novel).with_embedding(vec![3.0, 0.0]),
        ]);
        let hits = FallbackMatcher::new(store, true)
            .find(&[1.0, 0.0], 0.5, 10, None)
            .unwrap();
        assert_eq!(ids(&hits), vec!["a", "m", "z"]);
    }

    #[test]
    fn test_skips_wrong_dimension_and_hidden_works() {
        let store = store_with(vec![
            Work::new("ok", "Ok", WorkKind::Novel).with_embedding(vec![1.0, 0.0]),
            Work::new("old", "Old", WorkKind::Novel).with_embedding(vec![1.0, 0.0, 0.0]),
            Work::new("blocked", "Blocked", WorkKind::Novel)
                .with_embedding(vec![1.0, 0.0])
                .with_blocked(true),
            Work::new("pending", "Pending", WorkKind::Novel)
                .with_embedding(vec![1.0, 0.0])
                .with_status(ModerationStatus::Pending),
        ]);
        let hits = FallbackMatcher::new(store, false)
            .find(&[1.0, 0.0], 0.0, 10, None)
            .unwrap();
        assert_eq!(ids(&hits), vec!["ok"]);
    }

    #[test]
    fn test_type_filter() {
        let store = store_with(vec![
            Work::new("n", "N", WorkKind::Novel).with_embedding(vec![1.0, 0.0]),
            Work::new("v", "V", WorkKind::Video).with_embedding(vec![1.0, 0.0]),
        ]);
        let hits = FallbackMatcher::new(store, false)
            .find(&[1.0, 0.0], 0.5, 10, Some(WorkKind::Video))
            .unwrap();
        assert_eq!(ids(&hits), vec!["v"]);
    }

    #[test]
    fn test_zero_query_matches_nothing_above_zero() {
        let store = store_with(vec![
            Work::new("n", "N", WorkKind::Novel).with_embedding(vec![1.0, 0.0])
        ]);
        let hits = FallbackMatcher::new(store, false)
            .find(&[0.0, 0.0], 0.1, 10, None)
            .unwrap();
        assert!(hits.is_empty());
    }
}
