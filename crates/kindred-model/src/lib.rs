//! # kindred-model
//!
//! Encoder layer for kindred: turns text into dense vectors.
//!
//! This crate owns every embedding provider kindred can talk to:
//!
//! - **Remote** (`remote` feature, default): an OpenAI-compatible
//!   `/v1/embeddings` endpoint over HTTP.
//! - **Candle** (`embedded` feature): local BERT/RoBERTa inference with
//!   mean pooling and L2 normalisation.
//!
//! ## Design Principles
//!
//! 1. **Production-only**: no mock implementations. Test doubles live in consuming crates.
//! 2. **Fail loudly here, degrade upstream**: providers return `ModelError`; the
//!    core crate decides that an error means "no vector right now".
//! 3. **Provider-agnostic**: the [`EmbeddingModel`] trait does not leak HTTP or Candle types.
//!
//! ## Usage
//!
//! ```ignore
//! use kindred_model::{create_embedding_model, EmbeddingConfig};
//!
//! let config = EmbeddingConfig::default();
//! let model = create_embedding_model(&config)?;
//!
//! let embeddings = model.embed(&["A quiet fantasy about a lighthouse keeper"])?;
//! assert_eq!(embeddings[0].len(), model.dimension());
//! ```

pub mod config;
pub mod error;

#[cfg(feature = "remote")]
mod remote;

#[cfg(feature = "embedded")]
mod embedding;

// Re-export error types
pub use error::{ModelError, ModelResult};

// Re-export config types (canonical source of truth)
pub use config::{
    DevicePreference, EmbeddingConfig, EmbeddingProviderKind, HuggingFaceModelConfig,
    ModelArchitecture, ModelInfo,
};

/// Default embedding model ID.
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "text-embedding-ada-002";

/// Dimension of [`DEFAULT_EMBEDDING_MODEL_ID`].
pub const DEFAULT_DIMENSION: usize = 1536;

/// Default remote embeddings endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// Default environment variable holding the remote API key.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable that overrides the local models directory.
pub const KINDRED_MODELS_DIR_ENV: &str = "KINDRED_MODELS_DIR";

// ============================================================================
// Embedding Model Trait
// ============================================================================

/// Trait for embedding models.
///
/// Generates dense vector embeddings from text inputs. These embeddings
/// are compared with cosine similarity.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across threads.
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Generate embeddings for a batch of texts.
    ///
    /// Returns one embedding per input text, each of length `dimension()`.
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Generate the embedding for a single text.
    fn embed_one(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::malformed("provider returned no embedding"))
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get model information (ID, dimension, architecture).
    fn model_info(&self) -> &ModelInfo;

    /// Get the model ID.
    fn model_id(&self) -> &str {
        &self.model_info().model_id
    }
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create an embedding model from configuration.
///
/// Construction never contacts the provider: the remote model reads its API
/// key and opens connections on first use.
///
/// # Errors
///
/// Returns `ModelError::ProviderNotAvailable` if the provider's feature is not
/// compiled in, or a load error for local models.
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    match config.provider {
        EmbeddingProviderKind::Remote => create_remote(config),
        EmbeddingProviderKind::Candle => create_candle(config),
    }
}

#[cfg(feature = "remote")]
fn create_remote(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Ok(Box::new(remote::RemoteEmbeddingModel::new(config)?))
}

#[cfg(not(feature = "remote"))]
fn create_remote(_config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "remote".to_string(),
        reason: "kindred was built without the 'remote' feature".to_string(),
    })
}

#[cfg(feature = "embedded")]
fn create_candle(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Ok(Box::new(embedding::CandleEmbeddingModel::new(config)?))
}

#[cfg(not(feature = "embedded"))]
fn create_candle(_config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: "candle".to_string(),
        reason: "kindred was built without the 'embedded' feature. Rebuild with --features embedded."
            .to_string(),
    })
}

/// Names of the providers compiled into this build.
#[allow(clippy::vec_init_then_push)]
pub fn available_providers() -> Vec<&'static str> {
    let mut providers = Vec::new();

    #[cfg(feature = "remote")]
    providers.push("remote");

    #[cfg(feature = "embedded")]
    providers.push("candle");

    providers
}

// ============================================================================
// Re-export implementations (feature-gated)
// ============================================================================

#[cfg(feature = "remote")]
pub use remote::RemoteEmbeddingModel;

#[cfg(feature = "embedded")]
pub use embedding::CandleEmbeddingModel;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Fixed(ModelInfo);

    impl EmbeddingModel for Fixed {
        fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0; self.0.dimension]).collect())
        }

        fn dimension(&self) -> usize {
            self.0.dimension
        }

        fn model_info(&self) -> &ModelInfo {
            &self.0
        }
    }

    #[test]
    fn test_embed_one_uses_batch_path() {
        let model = Fixed(ModelInfo::new("fixed", 3, 16));
        assert_eq!(model.embed_one("hello").unwrap(), vec![1.0, 1.0, 1.0]);
        assert_eq!(model.model_id(), "fixed");
    }

    #[test]
    fn test_candle_unavailable_without_feature() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderKind::Candle,
            ..EmbeddingConfig::default()
        };
        let result = create_embedding_model(&config);
        if cfg!(feature = "embedded") {
            // Model files are absent in the test environment.
            assert!(result.is_err());
        } else {
            assert!(matches!(
                result,
                Err(ModelError::ProviderNotAvailable { .. })
            ));
        }
    }

    #[test]
    fn test_available_providers_matches_features() {
        let providers = available_providers();
        assert_eq!(providers.contains(&"remote"), cfg!(feature = "remote"));
        assert_eq!(providers.contains(&"candle"), cfg!(feature = "embedded"));
    }
}
