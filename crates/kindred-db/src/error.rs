//! Error types for kindred-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kindred-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in kindred-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Work store errors
    // ========================================================================
    /// No work with this id exists in the store.
    #[error("Work not found: {id}")]
    WorkNotFound { id: String },

    /// Work store I/O error.
    #[error("Work store I/O error at {path}: {message}")]
    StoreIo { path: PathBuf, message: String },

    /// Work store parse error.
    #[error("Work store parse error at {path}:{line}: {message}")]
    StoreParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A vector literal could not be parsed or produced.
    #[error("Invalid vector literal: {message}")]
    VectorLiteral { message: String },

    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    // ========================================================================
    // Neighbor backend errors
    // ========================================================================
    /// The RPC call never produced an HTTP response.
    #[error("RPC request to {url} failed: {message}")]
    Rpc { url: String, message: String },

    /// The RPC endpoint answered with a non-success status.
    #[error("RPC returned HTTP {status}: {body}")]
    RpcStatus { status: u16, body: String },

    /// The remote function does not exist.
    #[error("RPC function '{function}' not found")]
    RpcNotFound { function: String },

    /// The RPC endpoint answered 2xx with rows we could not read.
    #[error("Malformed RPC response: {message}")]
    RpcMalformed { message: String },

    /// The neighbor backend is switched off in configuration.
    #[error("Neighbor backend is disabled")]
    BackendDisabled,

    /// LanceDB error.
    #[cfg(feature = "lancedb")]
    #[error("LanceDB error: {message}")]
    LanceDb { message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a work-not-found error.
    pub fn work_not_found(id: impl Into<String>) -> Self {
        Self::WorkNotFound { id: id.into() }
    }

    /// Create a store I/O error.
    pub fn store_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StoreIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector literal error.
    pub fn vector_literal(message: impl Into<String>) -> Self {
        Self::VectorLiteral {
            message: message.into(),
        }
    }

    /// Create an RPC transport error.
    pub fn rpc(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error means the remote search function is missing.
    pub fn is_call_not_found(&self) -> bool {
        matches!(self, Self::RpcNotFound { .. })
    }
}

#[cfg(feature = "lancedb")]
impl From<lancedb::Error> for DbError {
    fn from(err: lancedb::Error) -> Self {
        Self::LanceDb {
            message: err.to_string(),
        }
    }
}
