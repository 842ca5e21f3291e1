//! Profile configuration — filter, picker and scorers of one scheduling profile

use crate::scheduling::filter::LowLatencyConfig;
use crate::scheduling::scorer::DEFAULT_QUEUE_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Filter tree run before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    /// Queue / LoRA / KV-cache decision tree
    #[default]
    LowLatency,
    /// Keep every pod
    None,
}

impl std::str::FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "low-latency" => Ok(Self::LowLatency),
            "none" => Ok(Self::None),
            other => Err(format!("unknown filter: {}", other)),
        }
    }
}

/// Final selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PickerKind {
    /// Highest score, random among ties
    #[default]
    MaxScore,
    /// Uniformly random, ignoring scores
    Random,
}

impl std::str::FromStr for PickerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "max-score" => Ok(Self::MaxScore),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown picker: {}", other)),
        }
    }
}

/// Enablement and weight of one scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorerToggle {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for ScorerToggle {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: default_weight(),
        }
    }
}

/// Load-aware scorer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadAwareScorerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Queue length at which a pod scores zero (default: 128)
    #[serde(default = "default_queue_threshold")]
    pub queue_threshold: usize,
}

fn default_queue_threshold() -> usize {
    DEFAULT_QUEUE_THRESHOLD
}

impl Default for LoadAwareScorerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: default_weight(),
            queue_threshold: default_queue_threshold(),
        }
    }
}

/// Scorers of one profile; all disabled unless configured
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorersConfig {
    /// Prefer pods already serving the target adapter
    #[serde(default)]
    pub active_lora: ScorerToggle,
    /// Steer sessions back to their previous pod
    #[serde(default)]
    pub session_affinity: ScorerToggle,
    /// Prefer pods holding the prompt prefix in KV cache (needs `kvcache_indexer`)
    #[serde(default)]
    pub kvcache_aware: ScorerToggle,
    /// Prefer pods with short waiting queues
    #[serde(default)]
    pub load_aware: LoadAwareScorerConfig,
}

impl ScorersConfig {
    /// (name, weight) of every enabled scorer
    pub fn enabled(&self) -> Vec<(&'static str, f64)> {
        let mut enabled = Vec::new();
        if self.active_lora.enabled {
            enabled.push(("active_lora", self.active_lora.weight));
        }
        if self.session_affinity.enabled {
            enabled.push(("session_affinity", self.session_affinity.weight));
        }
        if self.kvcache_aware.enabled {
            enabled.push(("kvcache_aware", self.kvcache_aware.weight));
        }
        if self.load_aware.enabled {
            enabled.push(("load_aware", self.load_aware.weight));
        }
        enabled
    }
}

/// One scheduling profile
///
/// # Example
///
/// ```hcl
/// decode {
///   filter = "low-latency"
///   picker = "max-score"
///   low_latency {
///     queue_threshold = 64
///   }
///   scorers {
///     load_aware {
///       enabled = true
///       weight  = 1
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Filter tree (default: low-latency)
    #[serde(default)]
    pub filter: FilterKind,
    /// Thresholds of the low-latency tree
    #[serde(default)]
    pub low_latency: LowLatencyConfig,
    /// Picker (default: max-score)
    #[serde(default)]
    pub picker: PickerKind,
    /// Scorer toggles and weights
    #[serde(default)]
    pub scorers: ScorersConfig,
}
