//! Configuration types for the scheduler
//!
//! Settings are written in HCL (HashiCorp Configuration Language). Each
//! scheduling profile selects a filter tree, a picker and a set of weighted
//! scorers; the `pd` block switches on prefill/decode split scheduling.

mod profile;

pub use profile::{
    FilterKind, LoadAwareScorerConfig, PickerKind, ProfileConfig, ScorerToggle, ScorersConfig,
};

use crate::error::{Result, SchedulerError};
use crate::scheduling::DEFAULT_PROMPT_LENGTH_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level scheduler settings
///
/// # HCL Example
///
/// ```hcl
/// pd {
///   enabled                 = true
///   prompt_length_threshold = 1024
/// }
///
/// kvcache_indexer {
///   url          = "http://kv-indexer:8080"
///   timeout_secs = 2
/// }
///
/// default {
///   scorers {
///     session_affinity {
///       enabled = true
///       weight  = 2
///     }
///   }
/// }
///
/// decode {
///   scorers {
///     kvcache_aware {
///       enabled = true
///     }
///     load_aware {
///       enabled = true
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Prefill/decode split scheduling
    #[serde(default)]
    pub pd: PdConfig,

    /// External KV-cache index, required by the kvcache_aware scorer
    #[serde(default)]
    pub kvcache_indexer: Option<KvCacheIndexerConfig>,

    /// Profile used when split scheduling is disabled
    #[serde(default)]
    pub default: ProfileConfig,

    /// Prefill phase profile; runs after the prefill role filter
    #[serde(default)]
    pub prefill: ProfileConfig,

    /// Decode phase profile; runs after the decode role filter
    #[serde(default)]
    pub decode: ProfileConfig,
}

impl SchedulerSettings {
    /// Load settings from an HCL file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SchedulerError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_hcl(&content)
    }

    /// Parse settings from an HCL string
    pub fn from_hcl(content: &str) -> Result<Self> {
        hcl::from_str(content)
            .map_err(|e| SchedulerError::Config(format!("Failed to parse HCL config: {}", e)))
    }

    /// Profiles by name
    pub fn profiles(&self) -> [(&'static str, &ProfileConfig); 3] {
        [
            ("default", &self.default),
            ("prefill", &self.prefill),
            ("decode", &self.decode),
        ]
    }

    /// Validate the settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.pd.enabled && self.pd.prompt_length_threshold == 0 {
            return Err(SchedulerError::Config(
                "pd.prompt_length_threshold must be greater than 0".to_string(),
            ));
        }

        if let Some(indexer) = &self.kvcache_indexer {
            indexer.validate()?;
        }

        for (name, profile) in self.profiles() {
            for (scorer, weight) in profile.scorers.enabled() {
                if !weight.is_finite() {
                    return Err(SchedulerError::Config(format!(
                        "Profile '{}': scorer '{}' has a non-finite weight",
                        name, scorer
                    )));
                }
            }

            if profile.scorers.load_aware.enabled && profile.scorers.load_aware.queue_threshold == 0 {
                return Err(SchedulerError::Config(format!(
                    "Profile '{}': load_aware.queue_threshold must be greater than 0",
                    name
                )));
            }

            if profile.scorers.kvcache_aware.enabled && self.kvcache_indexer.is_none() {
                return Err(SchedulerError::Config(format!(
                    "Profile '{}' enables the kvcache_aware scorer but no kvcache_indexer is configured",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Prefill/decode split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdConfig {
    /// Split long prompts across a prefill pod and a decode pod
    #[serde(default)]
    pub enabled: bool,

    /// Prompt length in bytes from which requests are split (default: 100)
    #[serde(default = "default_prompt_length_threshold")]
    pub prompt_length_threshold: usize,
}

fn default_prompt_length_threshold() -> usize {
    DEFAULT_PROMPT_LENGTH_THRESHOLD
}

impl Default for PdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prompt_length_threshold: default_prompt_length_threshold(),
        }
    }
}

/// KV-cache index service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvCacheIndexerConfig {
    /// Base URL of the index service
    pub url: String,

    /// Request timeout in seconds (default: 2)
    #[serde(default = "default_indexer_timeout")]
    pub timeout_secs: u64,
}

fn default_indexer_timeout() -> u64 {
    2
}

impl KvCacheIndexerConfig {
    fn validate(&self) -> Result<()> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(SchedulerError::Config(format!(
                "kvcache_indexer.url must be an http(s) URL, got '{}'",
                self.url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SchedulerError::Config(
                "kvcache_indexer.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
