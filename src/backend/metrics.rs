//! Pod metrics — point-in-time load and adapter state

use super::Pod;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Load metrics scraped from a model server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Requests waiting in the server queue
    #[serde(default)]
    pub waiting_queue_size: usize,
    /// Requests currently running
    #[serde(default)]
    pub running_queue_size: usize,
    /// KV-cache occupancy fraction in [0, 1]
    #[serde(default)]
    pub kv_cache_usage_percent: f64,
    /// LoRA adapters currently loaded
    #[serde(default)]
    pub active_models: HashSet<String>,
    /// Maximum number of adapters that can be active at once
    #[serde(default)]
    pub max_active_models: usize,
}

impl Metrics {
    /// Whether the given adapter is already loaded
    pub fn has_active_model(&self, model: &str) -> bool {
        self.active_models.contains(model)
    }

    /// Whether another adapter can be loaded without evicting one
    pub fn has_adapter_capacity(&self) -> bool {
        self.active_models.len() < self.max_active_models
    }
}

/// A pod paired with its metrics — one entry of a scheduling snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodMetrics {
    /// Pod identity
    pub pod: Pod,
    /// Metrics at snapshot time
    #[serde(default)]
    pub metrics: Metrics,
}

impl PodMetrics {
    /// Pair a pod with its metrics
    pub fn new(pod: Pod, metrics: Metrics) -> Self {
        Self { pod, metrics }
    }
}

impl std::fmt::Display for PodMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, role={}, queue={}, kv={:.2})",
            self.pod.namespaced_name,
            self.pod.address,
            self.pod.role,
            self.metrics.waiting_queue_size,
            self.metrics.kv_cache_usage_percent
        )
    }
}
