//! Error types for kindred-core.

use std::path::PathBuf;

use thiserror::Error;

use kindred_db::DbError;
use kindred_model::ModelError;

/// Domain-specific errors for discovery operations.
///
/// None of these reach a search caller: the search path turns each of them
/// into an empty or degraded result. They surface from configuration
/// loading, from `try_*` maintenance calls and from backfill.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The encoder produced no vector.
    #[error("Embedding unavailable: {reason}")]
    EncodingUnavailable {
        /// Why no vector was produced.
        reason: String,
    },

    /// The primary nearest-neighbor backend failed.
    #[error("Neighbor backend `{backend}` unavailable: {reason}")]
    BackendUnavailable {
        /// Backend name.
        backend: String,
        /// Description of the failure.
        reason: String,
    },

    /// Writing a vector to the store failed.
    #[error("Failed to persist embedding for `{id}`: {message}")]
    Persistence {
        /// The affected work.
        id: String,
        /// Description of the failure.
        message: String,
    },

    /// Two vectors that must share a dimension do not.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the active encoder.
        expected: usize,
        /// Dimension actually seen.
        actual: usize,
    },

    /// The requested work does not exist.
    #[error("Work `{0}` not found.")]
    WorkNotFound(String),

    /// The work has no text to embed.
    #[error("Work `{0}` has no title or description to embed.")]
    NothingToEmbed(String),

    /// Reading from the work store failed.
    #[error("Work store error: {0}")]
    Storage(String),

    /// Configuration file could not be read or parsed.
    #[error("Config invalid at {path}: {message}")]
    InvalidConfigFile {
        /// Path of the config file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiscoveryError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }
}

// ============================================================================
// Error Conversion
// ============================================================================

impl From<DbError> for DiscoveryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::WorkNotFound { id } => DiscoveryError::WorkNotFound(id),
            DbError::DimensionMismatch { expected, actual } => {
                DiscoveryError::DimensionMismatch { expected, actual }
            }
            DbError::Config { message } => DiscoveryError::invalid_configuration(
                message,
                "Check the `store` and `backend` sections of the config file.",
            ),
            DbError::Io(io) => DiscoveryError::Io(io),
            other => DiscoveryError::Storage(other.to_string()),
        }
    }
}

impl From<ModelError> for DiscoveryError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::DimensionMismatch {
                expected, actual, ..
            } => DiscoveryError::DimensionMismatch { expected, actual },
            ModelError::InvalidConfig { message } => DiscoveryError::invalid_configuration(
                message,
                "Check the `embedding` section of the config file.",
            ),
            other => DiscoveryError::EncodingUnavailable {
                reason: other.to_string(),
            },
        }
    }
}
