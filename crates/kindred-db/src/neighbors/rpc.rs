//! RPC neighbor backend.
//!
//! Calls a database-side search function through a PostgREST-style endpoint:
//!
//! ```text
//! POST {url}/rest/v1/rpc/search_similar_works
//! {"query_embedding": "[0.1,...]", "similarity_threshold": 0.7, "result_limit": 10}
//!
//! 200 [{"id": "...", "title": "...", "type": "novel", ..., "similarity": 0.91}]
//! ```

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{NeighborBackend, NeighborMatch, NeighborQuery};
use crate::config::NeighborBackendConfig;
use crate::error::{DbError, DbResult};
use crate::literal::format_vector;
use crate::works::{WorkId, WorkKind, WorkSummary};

#[derive(Debug, Serialize)]
struct RpcRequest {
    query_embedding: String,
    similarity_threshold: f32,
    result_limit: usize,
}

#[derive(Debug, Deserialize)]
struct RpcRow {
    id: WorkId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<WorkKind>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    view_count: Option<u64>,
    #[serde(default)]
    vote_count: Option<u64>,
    similarity: f32,
}

impl From<RpcRow> for NeighborMatch {
    fn from(row: RpcRow) -> Self {
        NeighborMatch {
            work: WorkSummary {
                id: row.id,
                title: row.title.unwrap_or_default(),
                description: row.description,
                kind: row.kind,
                thumbnail_url: row.thumbnail_url,
                view_count: row.view_count.unwrap_or(0),
                vote_count: row.vote_count.unwrap_or(0),
            },
            similarity: row.similarity,
        }
    }
}

/// Neighbor backend calling a remote search function.
pub struct RpcNeighborBackend {
    endpoint: String,
    function: String,
    api_key_env: String,
    client: Client,
}

impl std::fmt::Debug for RpcNeighborBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcNeighborBackend")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl RpcNeighborBackend {
    /// Create a backend for the server at `base_url`. Does not touch the network.
    pub fn new(base_url: &str, config: &NeighborBackendConfig) -> DbResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(DbError::config("backend.url is empty"));
        }
        if config.function.trim().is_empty() {
            return Err(DbError::config("backend.function is empty"));
        }

        let endpoint = format!("{}/rest/v1/rpc/{}", base_url, config.function.trim());
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| DbError::rpc(&endpoint, e.to_string()))?;

        debug!("RPC neighbor backend at {}", endpoint);

        Ok(Self {
            endpoint,
            function: config.function.trim().to_string(),
            api_key_env: config.api_key_env.clone(),
            client,
        })
    }

    /// Full URL of the search function.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

impl NeighborBackend for RpcNeighborBackend {
    fn query(&self, query: &NeighborQuery<'_>) -> DbResult<Vec<NeighborMatch>> {
        let body = RpcRequest {
            query_embedding: format_vector(query.embedding),
            similarity_threshold: query.threshold,
            result_limit: query.limit,
        };

        trace!(
            "POST {} (dim={}, threshold={}, limit={})",
            self.endpoint,
            query.embedding.len(),
            query.threshold,
            query.limit
        );

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = self.api_key() {
            request = request.header("apikey", &key).bearer_auth(&key);
        }

        let response = request
            .send()
            .map_err(|e| DbError::rpc(&self.endpoint, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DbError::RpcNotFound {
                function: self.function.clone(),
            });
        }
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DbError::RpcStatus {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<RpcRow> = response.json().map_err(|e| DbError::RpcMalformed {
            message: e.to_string(),
        })?;

        debug!("RPC returned {} matches", rows.len());
        Ok(rows.into_iter().map(NeighborMatch::from).collect())
    }

    fn name(&self) -> &'static str {
        "rpc"
    }
}
