//! Adapter layer for kindred-model providers.
//!
//! Wraps a [`kindred_model::EmbeddingModel`] so it satisfies the
//! [`VectorEncoder`] contract.
//!
//! ```text
//! kindred-core (search, maintainer)
//!        ↓
//!   model_adapter (this module)
//!        ↓
//! kindred-model providers (remote HTTP, Candle)
//! ```

use kindred_model::{create_embedding_model, EmbeddingConfig, EmbeddingModel};
use tracing::debug;

use crate::encoder::VectorEncoder;
use crate::errors::DiscoveryError;

/// [`VectorEncoder`] backed by a kindred-model provider.
#[derive(Debug)]
pub struct ModelVectorEncoder {
    model: Box<dyn EmbeddingModel>,
}

impl ModelVectorEncoder {
    /// Wrap an existing model.
    pub fn new(model: Box<dyn EmbeddingModel>) -> Self {
        Self { model }
    }

    /// Build the provider described by `config`.
    ///
    /// Never contacts the provider; a missing API key shows up later as an
    /// unavailable embedding, not here.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, DiscoveryError> {
        debug!(
            "Creating {} encoder '{}' (dim={})",
            config.provider, config.model_id, config.dimension
        );
        let model = create_embedding_model(config)?;
        Ok(Self::new(model))
    }
}

impl VectorEncoder for ModelVectorEncoder {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, DiscoveryError> {
        Ok(self.model.embed_one(text)?)
    }

    fn dimension(&self) -> usize {
        self.model.dimension()
    }

    fn model_id(&self) -> &str {
        self.model.model_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_model::{ModelInfo, ModelResult};

    #[derive(Debug)]
    struct Unreachable(ModelInfo);

    impl EmbeddingModel for Unreachable {
        fn embed(&self, _texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
            Err(kindred_model::ModelError::transport(
                "http://127.0.0.1:9",
                "connection refused",
            ))
        }

        fn dimension(&self) -> usize {
            self.0.dimension
        }

        fn model_info(&self) -> &ModelInfo {
            &self.0
        }
    }

    #[test]
    fn test_transport_failure_is_unavailable_embedding() {
        let encoder = ModelVectorEncoder::new(Box::new(Unreachable(ModelInfo::new("m", 3, 8))));
        assert_eq!(encoder.dimension(), 3);
        assert_eq!(encoder.model_id(), "m");
        assert!(matches!(
            encoder.embed_text("x"),
            Err(DiscoveryError::EncodingUnavailable { .. })
        ));
        assert_eq!(encoder.encode("x"), None);
    }
}
