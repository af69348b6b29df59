//! OpenAI-compatible remote embedding model.
//!
//! Speaks the `/v1/embeddings` wire format:
//!
//! ```text
//! POST {endpoint}
//! Authorization: Bearer $OPENAI_API_KEY
//! {"model": "text-embedding-ada-002", "input": ["..."]}
//!
//! 200 {"data": [{"index": 0, "embedding": [0.01, ...]}, ...]}
//! ```
//!
//! No retries happen here. A failed call is reported once and the caller
//! decides what "no vector" means.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{EmbeddingConfig, ModelInfo};
use crate::error::{ModelError, ModelResult};
use crate::EmbeddingModel;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Remote embedding model backed by an HTTP endpoint.
pub struct RemoteEmbeddingModel {
    model_info: ModelInfo,
    endpoint: String,
    api_key_env: String,
    client: Client,
}

impl std::fmt::Debug for RemoteEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEmbeddingModel")
            .field("model_id", &self.model_info.model_id)
            .field("dimension", &self.model_info.dimension)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl RemoteEmbeddingModel {
    /// Create a remote model. Does not touch the network or the API key.
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ModelError::InvalidConfig {
                message: "embedding.endpoint is empty".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ModelError::transport(&config.endpoint, e.to_string()))?;

        debug!(
            "Remote embedding model '{}' at {} (dim={})",
            config.model_id, config.endpoint, config.dimension
        );

        Ok(Self {
            model_info: config.model_info(),
            endpoint: config.endpoint.clone(),
            api_key_env: config.api_key_env.clone(),
            client,
        })
    }

    fn api_key(&self) -> ModelResult<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ModelError::MissingApiKey {
                env: self.api_key_env.clone(),
            })
    }

    fn decode(&self, response: EmbeddingResponse, expected: usize) -> ModelResult<Vec<Vec<f32>>> {
        if response.data.len() != expected {
            return Err(ModelError::malformed(format!(
                "expected {} embeddings, got {}",
                expected,
                response.data.len()
            )));
        }

        let mut data = response.data;
        // Providers may answer out of order; `index` is authoritative when present.
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }

        let dim = self.model_info.dimension;
        data.into_iter()
            .map(|d| {
                if d.embedding.len() != dim {
                    return Err(ModelError::DimensionMismatch {
                        model_id: self.model_info.model_id.clone(),
                        expected: dim,
                        actual: d.embedding.len(),
                    });
                }
                if d.embedding.iter().any(|v| !v.is_finite()) {
                    return Err(ModelError::malformed("embedding contains non-finite values"));
                }
                Ok(d.embedding)
            })
            .collect()
    }
}

impl EmbeddingModel for RemoteEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let api_key = self.api_key()?;
        let body = EmbeddingRequest {
            model: &self.model_info.model_id,
            input: texts,
        };

        trace!("POST {} ({} inputs)", self.endpoint, texts.len());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .map_err(|e| ModelError::transport(&self.endpoint, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| ModelError::malformed(e.to_string()))?;

        self.decode(parsed, texts.len())
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }

    fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(dim: usize) -> RemoteEmbeddingModel {
        let config = EmbeddingConfig::default()
            .with_dimension(dim)
            .with_endpoint("http://127.0.0.1:9/v1/embeddings");
        RemoteEmbeddingModel::new(&config).unwrap()
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = EmbeddingConfig::default().with_endpoint("  ");
        assert!(matches!(
            RemoteEmbeddingModel::new(&config),
            Err(ModelError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_decode_reorders_by_index() {
        let m = model(2);
        let response = EmbeddingResponse {
            data: vec![
                EmbeddingDatum {
                    index: Some(1),
                    embedding: vec![0.0, 1.0],
                },
                EmbeddingDatum {
                    index: Some(0),
                    embedding: vec![1.0, 0.0],
                },
            ],
        };
        let out = m.decode(response, 2).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_decode_rejects_wrong_dimension() {
        let m = model(3);
        let response = EmbeddingResponse {
            data: vec![EmbeddingDatum {
                index: None,
                embedding: vec![1.0, 0.0],
            }],
        };
        assert!(matches!(
            m.decode(response, 1),
            Err(ModelError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        let m = model(2);
        let response = EmbeddingResponse { data: vec![] };
        assert!(matches!(
            m.decode(response, 1),
            Err(ModelError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_empty_batch_makes_no_request() {
        // Port 9 (discard) would fail if contacted.
        let m = model(2);
        assert!(m.embed(&[]).unwrap().is_empty());
    }
}
