//! # kindred-core
//!
//! Semantic "find similar work" engine.
//!
//! Free text is turned into a vector by a [`VectorEncoder`], sent to the
//! primary nearest-neighbor backend, and answered from an exhaustive
//! in-process scan ([`FallbackMatcher`]) when that backend fails. Work
//! embeddings are kept current by the [`IndexMaintainer`].
//!
//! ## Main Types
//!
//! - [`Discovery`] – the entry point for all operations
//! - [`DiscoveryConfig`] – YAML configuration
//! - [`SearchResponse`] / [`BatchReport`] – public results
//! - [`DiscoveryError`] – domain-specific error type
//!
//! ## Example
//!
//! ```ignore
//! use kindred_core::{Discovery, DiscoveryConfig, WorkId};
//!
//! let discovery = Discovery::from_config(DiscoveryConfig::load(None)?)?;
//!
//! // Keep an edited work's vector current
//! discovery.reindex(&WorkId::from("w-42"));
//!
//! let response = discovery.search("haunted lighthouse", Some(5), None, None);
//! println!("{} results via {}", response.results.len(), response.mode);
//! ```

// Modules
pub mod config;
pub mod encoder;
pub mod engine;
pub mod errors;
pub mod fallback;
pub mod maintainer;
pub mod model_adapter;
pub mod search;
pub mod similarity;
pub mod types;

// Re-exports for convenience
pub use config::{DiscoveryConfig, SearchDefaults, CONFIG_PATH_ENV};
pub use encoder::VectorEncoder;
pub use engine::Discovery;
pub use errors::DiscoveryError;
pub use fallback::FallbackMatcher;
pub use maintainer::{embedding_text, IndexMaintainer};
pub use model_adapter::ModelVectorEncoder;
pub use search::{SearchOutcome, SearchService};
pub use similarity::cosine_similarity;
pub use types::{
    BatchReport, SearchHit, SearchMode, SearchRequest, SearchResponse, DEFAULT_LIMIT,
    DEFAULT_THRESHOLD,
};

// Storage types callers need to build requests and read results
pub use kindred_db::{Work, WorkId, WorkKind, WorkSummary};
