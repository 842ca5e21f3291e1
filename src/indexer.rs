//! KV-cache index client — how much of a prompt's prefix each pod already caches
//!
//! The index is an external service. Scores are opaque non-negative numbers,
//! higher meaning more reusable cache. Pods the index does not know about
//! are simply absent from the returned map.

use crate::config::KvCacheIndexerConfig;
use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Path of the scoring endpoint, relative to the index base URL
pub const POD_SCORES_PATH: &str = "/pod-scores";

/// KV-cache index — pod identifier → prefix-reuse score
#[async_trait]
pub trait KvCacheIndexer: Send + Sync {
    /// Score `pod_identifiers` (pod addresses) for a prompt and model
    async fn get_pod_scores(
        &self,
        prompt: &str,
        model: &str,
        pod_identifiers: &[String],
    ) -> Result<HashMap<String, f64>>;
}

#[derive(Debug, Serialize)]
struct PodScoresRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    pod_identifiers: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PodScoresResponse {
    #[serde(default)]
    scores: Vec<PodScoreEntry>,
}

#[derive(Debug, Deserialize)]
struct PodScoreEntry {
    name: String,
    score: f64,
}

/// HTTP client for a KV-cache index service
pub struct HttpKvCacheIndexer {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpKvCacheIndexer {
    /// Create a client for the index described by `config`
    pub fn new(config: &KvCacheIndexerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self::with_client(&config.url, client)
    }

    /// Create a client with a preconfigured HTTP client
    pub fn with_client(url: &str, client: reqwest::Client) -> Self {
        Self {
            endpoint: format!("{}{}", url.trim_end_matches('/'), POD_SCORES_PATH),
            client,
        }
    }

    /// Full scoring endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl KvCacheIndexer for HttpKvCacheIndexer {
    async fn get_pod_scores(
        &self,
        prompt: &str,
        model: &str,
        pod_identifiers: &[String],
    ) -> Result<HashMap<String, f64>> {
        let body = PodScoresRequest {
            prompt,
            model,
            pod_identifiers,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                SchedulerError::Indexer(format!("Request to {} failed: {}", self.endpoint, e))
            })?;

        if !resp.status().is_success() {
            return Err(SchedulerError::Indexer(format!(
                "Index {} returned status {}",
                self.endpoint,
                resp.status()
            )));
        }

        let parsed: PodScoresResponse = resp.json().await.map_err(|e| {
            SchedulerError::Indexer(format!(
                "Failed to parse response from {}: {}",
                self.endpoint, e
            ))
        })?;

        tracing::trace!(
            endpoint = %self.endpoint,
            pods = pod_identifiers.len(),
            scored = parsed.scores.len(),
            "KV-cache index responded"
        );

        Ok(parsed
            .scores
            .into_iter()
            .map(|entry| (entry.name, entry.score))
            .collect())
    }
}
