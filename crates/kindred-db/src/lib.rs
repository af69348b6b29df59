//! # kindred-db
//!
//! Storage layer for kindred: works and their embeddings, the vector literal
//! wire form, and the primary nearest-neighbor backends.
//!
//! Keeping this apart from `kindred-core` means the search logic can be
//! tested against in-memory stores and fake backends, and heavy storage
//! dependencies (LanceDB, Arrow) stay behind a feature.
//!
//! ## Architecture
//!
//! ```text
//! kindred-cli → kindred-core → (traits)
//!                    ↑
//!               kindred-db    (WorkStore, NeighborBackend)
//!               kindred-model (EmbeddingModel)
//! ```
//!
//! ## Features
//!
//! - `lancedb`: LanceDB mirror answering primary queries locally
//!
//! ## Usage
//!
//! ```ignore
//! use kindred_db::{open_neighbor_backend, open_work_store, NeighborQuery};
//!
//! let store = open_work_store(&StoreConfig::default())?;
//! let backend = open_neighbor_backend(&NeighborBackendConfig::default(), 1536)?;
//!
//! let matches = backend.query(&NeighborQuery::new(&embedding, 0.7, 10))?;
//! ```

pub mod config;
pub mod error;
pub mod literal;
pub mod neighbors;
pub mod works;

pub use config::{
    NeighborBackendConfig, NeighborBackendKind, StoreConfig, BACKEND_URL_ENV,
    DEFAULT_RPC_API_KEY_ENV, DEFAULT_RPC_FUNCTION, LANCEDB_TABLE_NAME,
};
pub use error::{DbError, DbResult};
pub use literal::{format_vector, parse_vector};
pub use neighbors::{
    available_backends, open_neighbor_backend, DisabledBackend, NeighborBackend, NeighborMatch,
    NeighborQuery, RpcNeighborBackend,
};
pub use works::{
    open_work_store, JsonlWorkStore, ModerationStatus, Work, WorkFilter, WorkId, WorkKind,
    WorkStore, WorkSummary,
};

#[cfg(feature = "lancedb")]
pub use neighbors::LanceDbNeighborBackend;
