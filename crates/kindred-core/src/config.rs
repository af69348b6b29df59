//! Configuration for kindred.
//!
//! [`DiscoveryConfig`] is loaded from YAML (`~/.kindred/config.yaml` by
//! default) and gathers the section types owned by the infrastructure
//! crates:
//!
//! ```yaml
//! embedding:
//!   provider: remote
//!   modelId: text-embedding-ada-002
//!   dimension: 1536
//! store:
//!   path: ~/.kindred/works.jsonl
//! backend:
//!   kind: rpc
//!   url: https://xyz.supabase.co
//!   function: search_similar_works
//! search:
//!   limit: 10
//!   threshold: 0.7
//! ```
//!
//! Every section and key is optional. API keys are never stored here, only
//! the names of the environment variables holding them.

use std::fs;
use std::path::{Path, PathBuf};

use kindred_db::{NeighborBackendConfig, NeighborBackendKind, StoreConfig};
use kindred_model::{EmbeddingConfig, EmbeddingProviderKind};
use serde::{Deserialize, Serialize};

use crate::errors::DiscoveryError;
use crate::types::{DEFAULT_LIMIT, DEFAULT_THRESHOLD};

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "KINDRED_CONFIG";

/// Name of the kindred home directory under `$HOME`.
pub const KINDRED_HOME_DIR: &str = ".kindred";

/// Config file name inside the kindred home directory.
pub const CONFIG_FILENAME: &str = "config.yaml";

// ============================================================================
// SearchDefaults
// ============================================================================

/// Defaults applied when a search does not specify its own parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchDefaults {
    /// Maximum number of results.
    pub limit: usize,

    /// Minimum cosine similarity.
    pub threshold: f32,

    /// Score fallback candidates on the rayon pool.
    pub parallel_fallback: bool,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            threshold: DEFAULT_THRESHOLD,
            parallel_fallback: true,
        }
    }
}

impl SearchDefaults {
    /// Validate the search defaults.
    pub fn validate(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut warnings = Vec::new();

        if self.limit == 0 {
            return Err(DiscoveryError::invalid_configuration(
                "search.limit must be greater than 0",
                "Set search.limit to a positive number (default: 10).",
            ));
        }
        if !self.threshold.is_finite() || !(-1.0..=1.0).contains(&self.threshold) {
            return Err(DiscoveryError::invalid_configuration(
                format!("search.threshold {} is outside [-1, 1]", self.threshold),
                "Cosine similarity ranges from -1 to 1; 0.7 is a good default.",
            ));
        }

        if self.limit > 100 {
            warnings.push(format!(
                "search.limit = {} is large; the fallback scan sorts every match",
                self.limit
            ));
        }
        if self.threshold <= 0.0 {
            warnings.push(format!(
                "search.threshold = {} admits unrelated works",
                self.threshold
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// DiscoveryConfig
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub backend: NeighborBackendConfig,

    #[serde(default)]
    pub search: SearchDefaults,
}

impl DiscoveryConfig {
    /// Load configuration following the usual precedence.
    ///
    /// 1. `explicit` path (the `--config` flag); must exist
    /// 2. `$KINDRED_CONFIG`; must exist
    /// 3. `~/.kindred/config.yaml`; defaults if missing
    pub fn load(explicit: Option<&Path>) -> Result<Self, DiscoveryError> {
        if let Some(path) = explicit {
            return Self::from_existing_path(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::from_existing_path(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidConfigFile`] if the file exists but
    /// cannot be read or parsed, and [`DiscoveryError::InvalidConfiguration`]
    /// if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, DiscoveryError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::read(path)
    }

    fn from_existing_path(path: &Path) -> Result<Self, DiscoveryError> {
        if !path.exists() {
            return Err(DiscoveryError::InvalidConfigFile {
                path: path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }
        Self::read(path)
    }

    fn read(path: &Path) -> Result<Self, DiscoveryError> {
        let content = fs::read_to_string(path).map_err(|e| DiscoveryError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: format!("failed to read: {}", e),
        })?;

        let config = Self::from_yaml(&content).map_err(|e| match e {
            DiscoveryError::InvalidConfigFile { message, .. } => {
                DiscoveryError::InvalidConfigFile {
                    path: path.to_path_buf(),
                    message,
                }
            }
            other => other,
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML, logging any warnings.
    pub fn from_yaml(content: &str) -> Result<Self, DiscoveryError> {
        // An empty file is a valid, all-defaults config.
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| DiscoveryError::InvalidConfigFile {
                path: PathBuf::new(),
                message: format!("failed to parse: {}", e),
            })?
        };

        for warning in config.validate()? {
            tracing::warn!("Config warning: {}", warning);
        }
        Ok(config)
    }

    /// Get the default kindred directory (`~/.kindred`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(KINDRED_HOME_DIR))
    }

    /// Get the default config file path (`~/.kindred/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(CONFIG_FILENAME))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first critical problem as
    /// [`DiscoveryError::InvalidConfiguration`].
    ///
    /// # Warnings
    ///
    /// Non-fatal issues are returned as strings for the caller to log.
    pub fn validate(&self) -> Result<Vec<String>, DiscoveryError> {
        let mut warnings = Vec::new();

        if self.embedding.dimension == 0 {
            return Err(DiscoveryError::invalid_configuration(
                "embedding.dimension must be greater than 0",
                "text-embedding-ada-002 produces 1536 dimensions.",
            ));
        }
        if self.embedding.provider == EmbeddingProviderKind::Remote
            && self.embedding.endpoint.trim().is_empty()
        {
            return Err(DiscoveryError::invalid_configuration(
                "embedding.endpoint is empty",
                "Set embedding.endpoint to an OpenAI-compatible /v1/embeddings URL.",
            ));
        }
        if self.embedding.timeout_secs == 0 {
            warnings.push("embedding.timeoutSecs = 0 is treated as 1 second".to_string());
        }

        if self.backend.kind == NeighborBackendKind::Rpc && self.backend.resolved_url().is_none()
        {
            warnings.push(format!(
                "backend.url is not set (nor ${}); every search will use the fallback scan",
                kindred_db::BACKEND_URL_ENV
            ));
        }
        if self.backend.timeout_secs == 0 {
            warnings.push("backend.timeoutSecs = 0 is treated as 1 second".to_string());
        }

        warnings.extend(self.search.validate()?);
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_yaml_is_default() {
        let config = DiscoveryConfig::from_yaml("").unwrap();
        assert_eq!(config.search.limit, 10);
        assert_eq!(config.search.threshold, 0.7);
        assert_eq!(config.embedding.dimension, 1536);
        assert_eq!(config.embedding.model_id, "text-embedding-ada-002");
        assert_eq!(config.backend.kind, NeighborBackendKind::Rpc);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
embedding:
  dimension: 384
  apiKeyEnv: MY_KEY
backend:
  kind: disabled
search:
  threshold: 0.5
  parallelFallback: false
"#;
        let config = DiscoveryConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.embedding.api_key_env, "MY_KEY");
        assert_eq!(config.embedding.endpoint, "https://api.openai.com/v1/embeddings");
        assert_eq!(config.backend.kind, NeighborBackendKind::Disabled);
        assert_eq!(config.search.threshold, 0.5);
        assert_eq!(config.search.limit, 10);
        assert!(!config.search.parallel_fallback);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for yaml in [
            "embedding:\n  dimension: 0\n",
            "search:\n  limit: 0\n",
            "search:\n  threshold: 1.5\n",
            "embedding:\n  endpoint: ''\n",
        ] {
            assert!(
                matches!(
                    DiscoveryConfig::from_yaml(yaml),
                    Err(DiscoveryError::InvalidConfiguration { .. })
                ),
                "accepted {:?}",
                yaml
            );
        }
    }

    #[test]
    fn test_parse_error_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "search: [not, a, map]\n").unwrap();

        match DiscoveryConfig::from_path(&path) {
            Err(DiscoveryError::InvalidConfigFile { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_default_file_is_default_but_explicit_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");

        assert_eq!(
            DiscoveryConfig::from_path(&missing).unwrap(),
            DiscoveryConfig::default()
        );
        assert!(matches!(
            DiscoveryConfig::load(Some(&missing)),
            Err(DiscoveryError::InvalidConfigFile { .. })
        ));
    }

    #[test]
    fn test_round_trips_through_yaml() {
        let mut config = DiscoveryConfig::default();
        config.backend = NeighborBackendConfig::rpc("https://db.example.com");
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("modelId"));
        assert_eq!(DiscoveryConfig::from_yaml(&yaml).unwrap(), config);
    }
}
