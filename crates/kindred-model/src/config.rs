//! Configuration types for kindred-model.
//!
//! [`EmbeddingConfig`] is the single source of truth for which provider
//! encodes text, which model it uses and what dimension it produces. The
//! core crate embeds it verbatim as the `embedding` section of
//! `~/.kindred/config.yaml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{
    DEFAULT_API_KEY_ENV, DEFAULT_DIMENSION, DEFAULT_EMBEDDING_MODEL_ID, DEFAULT_ENDPOINT,
    KINDRED_MODELS_DIR_ENV,
};

/// Extract the model name from a full model ID.
///
/// E.g., "sentence-transformers/all-MiniLM-L6-v2" → "all-MiniLM-L6-v2"
fn extract_model_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}

// ============================================================================
// DevicePreference
// ============================================================================

/// Preference for compute device (local provider only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Auto-select best device (GPU if available, else CPU).
    #[default]
    Auto,
    /// Force GPU (Metal on macOS, CUDA on Linux).
    Gpu,
    /// Force CPU only.
    Cpu,
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "metal" | "cuda" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            _ => Err(format!(
                "Unknown device: '{}'. Use 'auto', 'gpu', or 'cpu'.",
                s
            )),
        }
    }
}

// ============================================================================
// EmbeddingProviderKind
// ============================================================================

/// Embedding provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible HTTP embeddings endpoint.
    #[default]
    Remote,
    /// Local Candle inference.
    Candle,
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Candle => write!(f, "candle"),
        }
    }
}

impl std::str::FromStr for EmbeddingProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "openai" | "http" => Ok(Self::Remote),
            "candle" | "local" | "embedded" => Ok(Self::Candle),
            _ => Err(format!(
                "Unknown provider: '{}'. Use 'remote' or 'candle'.",
                s
            )),
        }
    }
}

// ============================================================================
// ModelArchitecture
// ============================================================================

/// Transformer family of a local model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelArchitecture {
    #[default]
    Bert,
    Roberta,
    /// Hosted model; architecture is not visible to us.
    Remote,
    Unknown,
}

impl std::fmt::Display for ModelArchitecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bert => write!(f, "bert"),
            Self::Roberta => write!(f, "roberta"),
            Self::Remote => write!(f, "remote"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// ModelInfo
// ============================================================================

/// Identity of the encoder that produced a vector.
///
/// Two vectors are only comparable when their `ModelInfo` agree on
/// `model_id` and `dimension`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Model identifier.
    pub model_id: String,
    /// Embedding dimension.
    pub dimension: usize,
    /// Maximum sequence length.
    pub max_seq_len: usize,
    /// Model architecture.
    #[serde(default)]
    pub architecture: ModelArchitecture,
}

impl ModelInfo {
    /// Create new model info.
    pub fn new(model_id: impl Into<String>, dimension: usize, max_seq_len: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            max_seq_len,
            architecture: ModelArchitecture::default(),
        }
    }

    /// Set architecture.
    pub fn with_architecture(mut self, arch: ModelArchitecture) -> Self {
        self.architecture = arch;
        self
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the embedding provider.
///
/// # Example YAML
///
/// ```yaml
/// embedding:
///   provider: remote
///   modelId: text-embedding-ada-002
///   dimension: 1536
///   endpoint: https://api.openai.com/v1/embeddings
///   apiKeyEnv: OPENAI_API_KEY
///   timeoutSecs: 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider type.
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Model ID (e.g., "text-embedding-ada-002").
    #[serde(default = "default_embedding_model_id")]
    pub model_id: String,

    /// Expected vector dimension D. Vectors of any other length are rejected.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Embeddings endpoint for the remote provider.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout for the remote provider, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Device preference (local provider only).
    #[serde(default)]
    pub device: DevicePreference,

    /// Local path to model files (local provider only).
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Maximum sequence length (local provider only).
    #[serde(default = "default_max_seq_len")]
    pub max_sequence_length: usize,
}

fn default_embedding_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_DIMENSION
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_seq_len() -> usize {
    512
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model_id: default_embedding_model_id(),
            dimension: default_dimension(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            device: DevicePreference::default(),
            local_path: None,
            max_sequence_length: default_max_seq_len(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the effective local model path.
    ///
    /// Priority:
    /// 1. Explicit `local_path` if set
    /// 2. `$KINDRED_MODELS_DIR/<model-name>`
    /// 3. `~/.kindred/models/<model-name>`
    ///
    /// Returns the path even if it doesn't exist (caller should validate).
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.local_path {
            return path.clone();
        }

        let name = extract_model_name(&self.model_id);
        if let Some(dir) = std::env::var_os(KINDRED_MODELS_DIR_ENV).filter(|d| !d.is_empty()) {
            return PathBuf::from(dir).join(name);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kindred")
            .join("models")
            .join(name)
    }

    /// Identity of the vectors this configuration produces.
    pub fn model_info(&self) -> ModelInfo {
        let arch = match self.provider {
            EmbeddingProviderKind::Remote => ModelArchitecture::Remote,
            EmbeddingProviderKind::Candle => ModelArchitecture::Unknown,
        };
        ModelInfo::new(&self.model_id, self.dimension, self.max_sequence_length)
            .with_architecture(arch)
    }

    /// Create a config with a specific local path.
    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    /// Create a config with a specific model ID.
    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    /// Create a config pointing at a specific endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Create a config with a specific dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

// ============================================================================
// HuggingFaceModelConfig
// ============================================================================

/// Config.json structure from HuggingFace models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceModelConfig {
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub hidden_size: usize,
    #[serde(default = "default_max_position")]
    pub max_position_embeddings: usize,
    #[serde(default)]
    pub model_type: String,
}

fn default_max_position() -> usize {
    512
}

impl HuggingFaceModelConfig {
    /// Infer architecture from config.
    pub fn infer_architecture(&self) -> ModelArchitecture {
        for arch in &self.architectures {
            let lower = arch.to_lowercase();
            if lower.contains("roberta") {
                return ModelArchitecture::Roberta;
            }
            if lower.contains("bert") {
                return ModelArchitecture::Bert;
            }
        }

        match self.model_type.to_lowercase().as_str() {
            "bert" => ModelArchitecture::Bert,
            "roberta" | "xlm-roberta" => ModelArchitecture::Roberta,
            _ => ModelArchitecture::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_preference_parsing() {
        assert_eq!(
            "auto".parse::<DevicePreference>().unwrap(),
            DevicePreference::Auto
        );
        assert_eq!(
            "metal".parse::<DevicePreference>().unwrap(),
            DevicePreference::Gpu
        );
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(
            "openai".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::Remote
        );
        assert_eq!(
            "local".parse::<EmbeddingProviderKind>().unwrap(),
            EmbeddingProviderKind::Candle
        );
        assert!("ollama".parse::<EmbeddingProviderKind>().is_err());
    }

    #[test]
    fn test_embedding_config_default() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, EmbeddingProviderKind::Remote);
        assert_eq!(config.model_id, DEFAULT_EMBEDDING_MODEL_ID);
        assert_eq!(config.dimension, 1536);
        assert_eq!(config.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_embedding_config_from_yaml_like_json() {
        let config: EmbeddingConfig = serde_json::from_str(
            r#"{"provider":"candle","modelId":"sentence-transformers/all-MiniLM-L6-v2","dimension":384}"#,
        )
        .unwrap();
        assert_eq!(config.provider, EmbeddingProviderKind::Candle);
        assert_eq!(config.dimension, 384);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_effective_model_path_prefers_local_path() {
        let config = EmbeddingConfig::default().with_local_path("/opt/models/minilm");
        assert_eq!(
            config.effective_model_path(),
            PathBuf::from("/opt/models/minilm")
        );
    }

    #[test]
    fn test_extract_model_name() {
        assert_eq!(
            extract_model_name("sentence-transformers/all-MiniLM-L6-v2"),
            "all-MiniLM-L6-v2"
        );
        assert_eq!(extract_model_name("text-embedding-ada-002"), "text-embedding-ada-002");
    }

    #[test]
    fn test_hf_config_infer_architecture() {
        let config = HuggingFaceModelConfig {
            architectures: vec!["BertModel".to_string()],
            hidden_size: 384,
            max_position_embeddings: 512,
            model_type: "bert".to_string(),
        };
        assert_eq!(config.infer_architecture(), ModelArchitecture::Bert);

        let roberta = HuggingFaceModelConfig {
            architectures: vec!["XLMRobertaModel".to_string()],
            model_type: "xlm-roberta".to_string(),
            ..config.clone()
        };
        assert_eq!(roberta.infer_architecture(), ModelArchitecture::Roberta);
    }
}
