//! Storage and neighbor backend configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

// ============================================================================
// Constants
// ============================================================================

/// Default RPC function performing the database-side similarity search.
pub const DEFAULT_RPC_FUNCTION: &str = "search_similar_works";

/// Default environment variable holding the RPC service key.
pub const DEFAULT_RPC_API_KEY_ENV: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Environment variable supplying the RPC base URL when the config has none.
pub const BACKEND_URL_ENV: &str = "KINDRED_BACKEND_URL";

/// Default RPC timeout in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 10;

/// LanceDB table holding mirrored embeddings.
pub const LANCEDB_TABLE_NAME: &str = "works";

fn kindred_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kindred")
}

// ============================================================================
// StoreConfig
// ============================================================================

/// Where works and their embeddings are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Path of the JSONL work store.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: kindred_home().join("works.jsonl"),
        }
    }
}

impl StoreConfig {
    /// Create a config pointing at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

// ============================================================================
// NeighborBackendConfig
// ============================================================================

/// Which primary nearest-neighbor backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborBackendKind {
    /// PostgREST-style RPC over HTTP.
    #[default]
    Rpc,
    /// Local LanceDB mirror (`lancedb` feature).
    #[serde(rename = "lancedb")]
    LanceDb,
    /// No primary backend; every search takes the fallback path.
    Disabled,
}

impl NeighborBackendKind {
    /// Get the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            NeighborBackendKind::Rpc => "rpc",
            NeighborBackendKind::LanceDb => "lancedb",
            NeighborBackendKind::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for NeighborBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NeighborBackendKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpc" | "postgrest" | "supabase" => Ok(NeighborBackendKind::Rpc),
            "lancedb" | "lance" => Ok(NeighborBackendKind::LanceDb),
            "disabled" | "none" | "off" => Ok(NeighborBackendKind::Disabled),
            other => Err(DbError::config(format!(
                "unknown backend '{}' (expected rpc, lancedb or disabled)",
                other
            ))),
        }
    }
}

/// Configuration of the primary nearest-neighbor backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeighborBackendConfig {
    pub kind: NeighborBackendKind,

    /// Base URL of the RPC server (e.g. `https://xyz.supabase.co`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name of the remote search function.
    pub function: String,

    /// Environment variable holding the service key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// LanceDB directory (defaults to `~/.kindred/index`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for NeighborBackendConfig {
    fn default() -> Self {
        Self {
            kind: NeighborBackendKind::Rpc,
            url: None,
            function: DEFAULT_RPC_FUNCTION.to_string(),
            api_key_env: DEFAULT_RPC_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            path: None,
        }
    }
}

impl NeighborBackendConfig {
    /// Config for an RPC backend at `url`.
    pub fn rpc(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Config with the primary backend switched off.
    pub fn disabled() -> Self {
        Self {
            kind: NeighborBackendKind::Disabled,
            ..Self::default()
        }
    }

    /// The RPC base URL: the configured one, else `$KINDRED_BACKEND_URL`.
    pub fn resolved_url(&self) -> Option<String> {
        self.url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                std::env::var(BACKEND_URL_ENV)
                    .ok()
                    .filter(|u| !u.trim().is_empty())
            })
            .map(|u| u.trim().trim_end_matches('/').to_string())
    }

    /// The LanceDB directory.
    pub fn lancedb_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| kindred_home().join("index"))
    }
}
