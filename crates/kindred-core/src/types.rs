//! Request and response types of the discovery API.

use kindred_db::{WorkId, WorkKind, WorkSummary};
use serde::{Deserialize, Serialize};

/// Default number of results.
pub const DEFAULT_LIMIT: usize = 10;

/// Default minimum cosine similarity.
pub const DEFAULT_THRESHOLD: f32 = 0.7;

// ============================================================================
// SearchRequest
// ============================================================================

/// A "find similar work" query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,

    /// Maximum number of results.
    pub limit: usize,

    /// Minimum cosine similarity of a result.
    pub threshold: f32,

    /// Restrict results to one work type.
    pub kind: Option<WorkKind>,
}

impl SearchRequest {
    /// Create a request with default limit and threshold.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
            kind: None,
        }
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the similarity threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the type filter.
    pub fn with_kind(mut self, kind: Option<WorkKind>) -> Self {
        self.kind = kind;
        self
    }
}

// ============================================================================
// SearchHit / SearchMode / SearchResponse
// ============================================================================

/// One ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(flatten)]
    pub work: WorkSummary,

    /// Cosine similarity to the query.
    pub score: f32,
}

impl SearchHit {
    pub fn new(work: WorkSummary, score: f32) -> Self {
        Self { work, score }
    }

    pub fn id(&self) -> &WorkId {
        &self.work.id
    }
}

/// Which path produced a search response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchMode {
    /// The nearest-neighbor backend answered.
    Primary,
    /// The backend failed; results come from the in-process scan.
    Fallback,
    /// The query was empty; nothing was called.
    EmptyQuery,
    /// The encoder produced no vector for the query.
    EmbeddingUnavailable,
    /// Neither path could run.
    Unavailable,
}

impl SearchMode {
    /// Get the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Primary => "primary",
            SearchMode::Fallback => "fallback",
            SearchMode::EmptyQuery => "emptyQuery",
            SearchMode::EmbeddingUnavailable => "embeddingUnavailable",
            SearchMode::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public result of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Whether a search actually ran (primary or fallback).
    pub success: bool,

    /// Ranked results, best first.
    pub results: Vec<SearchHit>,

    /// Path that produced the results.
    pub mode: SearchMode,

    /// The query as received.
    pub query: String,

    /// Human-readable reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// BatchReport
// ============================================================================

/// Outcome of a batch re-index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Number of ids whose embedding was written.
    pub success_count: usize,

    /// Ids that failed, in input order.
    pub failed_ids: Vec<WorkId>,
}

impl BatchReport {
    /// Fold one outcome into the report.
    pub fn record(mut self, id: &WorkId, ok: bool) -> Self {
        if ok {
            self.success_count += 1;
        } else {
            self.failed_ids.push(id.clone());
        }
        self
    }

    /// Number of ids processed.
    pub fn total(&self) -> usize {
        self.success_count + self.failed_ids.len()
    }

    /// Whether every id succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed_ids.is_empty()
    }
}
