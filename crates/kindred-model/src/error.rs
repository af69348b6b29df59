//! Error types for kindred-model.
//!
//! Errors say what went wrong and, where it helps, how to fix it. None of
//! them are fatal to a search: the core crate turns every encoder error into
//! "no vector available".

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kindred-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in kindred-model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Provider errors
    // ========================================================================
    /// Provider not available in this build or configuration.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// The API key environment variable is unset or empty.
    #[error("API key not set: export {env} to enable the remote embedding provider")]
    MissingApiKey { env: String },

    /// The request never produced an HTTP response (DNS, TLS, timeout...).
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The provider answered with a non-success status (auth, rate limit...).
    #[error("Provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The provider answered 2xx but the body was not an embedding.
    #[error("Malformed provider response: {message}")]
    MalformedResponse { message: String },

    /// The provider returned a vector of the wrong length.
    #[error("Embedding dimension mismatch for model '{model_id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        model_id: String,
        expected: usize,
        actual: usize,
    },

    // ========================================================================
    // Local model errors
    // ========================================================================
    /// Model files not found at expected location.
    #[error("{}", format_model_not_found(.model_id, .path))]
    ModelNotFound { model_id: String, path: PathBuf },

    /// Failed to load model.
    #[error("Failed to load model '{model_id}': {message}")]
    ModelLoad { model_id: String, message: String },

    /// Model configuration invalid or corrupted.
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    /// Tokenization failed.
    #[error("Tokenization failed: {message}")]
    Tokenization { message: String },

    /// Embedding generation failed.
    #[error("Embedding failed for model '{model_id}': {message}")]
    EmbeddingFailed { model_id: String, message: String },

    /// Device not available.
    #[error("Compute device not available: {reason}\n\nSet `embedding.device: cpu` in ~/.kindred/config.yaml to use CPU-only inference.")]
    DeviceNotAvailable { reason: String },

    // ========================================================================
    // I/O errors
    // ========================================================================
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_model_not_found(model_id: &str, path: &std::path::Path) -> String {
    format!(
        "Model not found: {model_id}\n\n\
        Expected at: {}\n\n\
        The directory must contain config.json, model.safetensors and tokenizer.json.\n\
        Set `embedding.localPath` or $KINDRED_MODELS_DIR to point at it.",
        path.display()
    )
}

// ============================================================================
// Error constructors
// ============================================================================

impl ModelError {
    /// Create a model load error.
    pub fn model_load(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create an embedding failed error.
    pub fn embedding_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create a tokenization error.
    pub fn tokenization(message: impl Into<String>) -> Self {
        Self::Tokenization {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a malformed response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Whether the provider refused us (auth or rate limit) rather than failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == 401 || *status == 403 || *status == 429)
            || matches!(self, Self::MissingApiKey { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_classification() {
        let rate_limited = ModelError::Status {
            status: 429,
            body: "slow down".to_string(),
        };
        assert!(rate_limited.is_rejection());

        let missing = ModelError::MissingApiKey {
            env: "OPENAI_API_KEY".to_string(),
        };
        assert!(missing.is_rejection());

        let server = ModelError::Status {
            status: 500,
            body: String::new(),
        };
        assert!(!server.is_rejection());
        assert!(!ModelError::transport("http://x", "timeout").is_rejection());
    }

    #[test]
    fn test_model_not_found_message_mentions_path() {
        let err = ModelError::ModelNotFound {
            model_id: "all-MiniLM-L6-v2".to_string(),
            path: PathBuf::from("/models/all-MiniLM-L6-v2"),
        };
        let msg = err.to_string();
        assert!(msg.contains("all-MiniLM-L6-v2"));
        assert!(msg.contains("/models/all-MiniLM-L6-v2"));
    }
}
