//! Searchable works and the store that holds their embeddings.
//!
//! A [`Work`] carries its current embedding (or none). The store is the
//! single source of truth for embeddings: the fallback scan reads from it
//! and the maintainer writes to it.

mod jsonl;

pub use jsonl::JsonlWorkStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{DbError, DbResult};
use crate::literal::embedding_literal;

// ============================================================================
// WorkId
// ============================================================================

/// Opaque identifier of a work (usually a UUID string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkId(String);

impl WorkId {
    /// Create a new work ID.
    pub fn new(id: impl Into<String>) -> Self {
        WorkId(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkId {
    fn from(id: &str) -> Self {
        WorkId(id.to_string())
    }
}

impl From<String> for WorkId {
    fn from(id: String) -> Self {
        WorkId(id)
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// WorkKind / ModerationStatus
// ============================================================================

/// Type tag of a work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkKind {
    #[default]
    Novel,
    Webtoon,
    Video,
}

impl WorkKind {
    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Novel => "novel",
            WorkKind::Webtoon => "webtoon",
            WorkKind::Video => "video",
        }
    }
}

impl std::fmt::Display for WorkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "novel" => Ok(WorkKind::Novel),
            "webtoon" => Ok(WorkKind::Webtoon),
            "video" => Ok(WorkKind::Video),
            other => Err(DbError::config(format!(
                "unknown work type '{}' (expected novel, webtoon or video)",
                other
            ))),
        }
    }
}

/// Moderation state of a work.
///
/// Rows without a status are approved, the same as [`Work::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    #[default]
    Approved,
    Rejected,
}

// ============================================================================
// Work
// ============================================================================

/// A searchable work as persisted in the store.
///
/// Field names follow the `works` table columns so rows exported from the
/// database import unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: WorkId,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: WorkKind,

    #[serde(default)]
    pub thumbnail_url: Option<String>,

    #[serde(default)]
    pub view_count: u64,

    #[serde(default)]
    pub vote_count: u64,

    #[serde(default)]
    pub status: ModerationStatus,

    #[serde(default)]
    pub is_blocked: bool,

    /// Current embedding, stored in vector literal form.
    #[serde(default, with = "embedding_literal")]
    pub embedding: Option<Vec<f32>>,

    /// When `embedding` was last written.
    #[serde(default)]
    pub embedded_at: Option<DateTime<Utc>>,
}

impl Work {
    /// Create a new, approved, not-yet-embedded work.
    pub fn new(id: impl Into<WorkId>, title: impl Into<String>, kind: WorkKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            kind,
            thumbnail_url: None,
            view_count: 0,
            vote_count: 0,
            status: ModerationStatus::default(),
            is_blocked: false,
            embedding: None,
            embedded_at: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the moderation status.
    pub fn with_status(mut self, status: ModerationStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the blocked flag.
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.is_blocked = blocked;
        self
    }

    /// Set the embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Whether the work may appear in search results.
    pub fn is_visible(&self) -> bool {
        !self.is_blocked && self.status == ModerationStatus::Approved
    }

    /// The fields carried into search results.
    pub fn summary(&self) -> WorkSummary {
        WorkSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            kind: Some(self.kind),
            thumbnail_url: self.thumbnail_url.clone(),
            view_count: self.view_count,
            vote_count: self.vote_count,
        }
    }
}

/// The display fields of a work that travel with a search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSummary {
    pub id: WorkId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `None` when the source row carried no type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<WorkKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub view_count: u64,
    pub vote_count: u64,
}

// ============================================================================
// WorkFilter
// ============================================================================

/// Filter applied when scanning the store for embedded works.
///
/// Scans only ever return visible works; the filter narrows further.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkFilter {
    pub kind: Option<WorkKind>,
}

impl WorkFilter {
    /// Create an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one work type.
    pub fn with_kind(mut self, kind: Option<WorkKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Check whether an embedded work passes this filter.
    pub fn matches(&self, work: &Work) -> bool {
        work.embedding.is_some()
            && work.is_visible()
            && self.kind.map(|k| k == work.kind).unwrap_or(true)
    }
}

// ============================================================================
// WorkStore trait
// ============================================================================

/// Storage for works and their embeddings.
///
/// Implementations must be `Send + Sync`: searches read concurrently with
/// maintenance writes.
pub trait WorkStore: Send + Sync {
    /// Load one work.
    fn get(&self, id: &WorkId) -> DbResult<Option<Work>>;

    /// Replace the embedding of one work and stamp `embedded_at`.
    ///
    /// The write is all-or-nothing. Returns [`DbError::WorkNotFound`] if the
    /// work does not exist.
    fn set_embedding(&self, id: &WorkId, embedding: &[f32]) -> DbResult<()>;

    /// Snapshot of every visible, embedded work matching `filter`, in
    /// ascending id order.
    fn scan_embedded(&self, filter: &WorkFilter) -> DbResult<Vec<Work>>;

    /// Ids of all works without an embedding, in ascending id order.
    fn ids_missing_embedding(&self) -> DbResult<Vec<WorkId>>;

    /// Insert or replace works. Returns the number written.
    fn upsert(&self, works: &[Work]) -> DbResult<usize>;

    /// Number of works in the store.
    fn len(&self) -> DbResult<usize>;

    /// Check if the store is empty.
    fn is_empty(&self) -> DbResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Open the work store described by `config`.
pub fn open_work_store(config: &StoreConfig) -> DbResult<Arc<dyn WorkStore>> {
    debug!("Opening work store at {:?}", config.path);
    Ok(Arc::new(JsonlWorkStore::open(&config.path)?))
}
