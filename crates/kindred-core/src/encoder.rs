//! The text → vector contract used by search and maintenance.
//!
//! `encode` never fails: `None` means "no vector right now" (empty text,
//! provider down, key missing, rate limited, malformed answer). It never
//! means "this text has no neighbors".

use tracing::{trace, warn};

use crate::errors::DiscoveryError;

/// A text encoder producing fixed-length vectors.
///
/// Implementors supply the raw provider call; the provided [`encode`]
/// wraps it with the empty-text short-circuit and error swallowing.
///
/// [`encode`]: VectorEncoder::encode
pub trait VectorEncoder: Send + Sync {
    /// Call the provider for already-trimmed, non-empty text.
    fn embed_text(&self, text: &str) -> Result<Vec<f32>, DiscoveryError>;

    /// Length of every vector this encoder produces.
    fn dimension(&self) -> usize;

    /// Identifier of the model behind this encoder.
    ///
    /// Vectors from different model ids must never be compared.
    fn model_id(&self) -> &str;

    /// Encode `text`, or return `None` if no vector can be produced.
    ///
    /// Empty or whitespace-only text returns `None` without calling the
    /// provider. Provider errors and vectors of the wrong length are logged
    /// and return `None`.
    fn encode(&self, text: &str) -> Option<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            trace!("Skipping encode of empty text");
            return None;
        }

        match self.embed_text(text) {
            Ok(vector) if vector.len() == self.dimension() => Some(vector),
            Ok(vector) => {
                warn!(
                    "Encoder '{}' returned {} dimensions, expected {}",
                    self.model_id(),
                    vector.len(),
                    self.dimension()
                );
                None
            }
            Err(e) => {
                warn!("Encoder '{}' failed: {}", self.model_id(), e);
                None
            }
        }
    }
}
