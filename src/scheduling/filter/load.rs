//! Load-based filters — least-queuing, least-KV-cache and the low-latency tree

use super::predicate::{low_lora_cost, queue_threshold};
use super::{BasicFilter, DecisionTreeFilter};
use crate::scheduling::types::{Candidate, SchedulingContext};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Keep pods whose waiting queue is within a low-water-mark band above the minimum.
///
/// The band is `(max - min) / len(pods)`, so with queues `[0, 3, 10]` the
/// pods at 0 and 3 are kept.
pub fn least_queuing() -> BasicFilter {
    BasicFilter::new("least-queuing", least_queuing_filter_func)
}

fn least_queuing_filter_func(_ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
    let (Some(min), Some(max)) = (
        pods.iter().map(|pm| pm.metrics.waiting_queue_size).min(),
        pods.iter().map(|pm| pm.metrics.waiting_queue_size).max(),
    ) else {
        return Ok(Vec::new());
    };

    let band = (max - min) / pods.len();
    Ok(pods
        .iter()
        .filter(|pm| {
            let queue = pm.metrics.waiting_queue_size;
            queue >= min && queue <= min + band
        })
        .cloned()
        .collect())
}

/// Keep pods whose KV-cache occupancy is within a low-water-mark band above the minimum
pub fn least_kv_cache() -> BasicFilter {
    BasicFilter::new("least-kv-cache", least_kv_cache_filter_func)
}

fn least_kv_cache_filter_func(_ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
    if pods.is_empty() {
        return Ok(Vec::new());
    }

    let (min, max) = pods.iter().fold((f64::MAX, f64::MIN), |(lo, hi), pm| {
        let kv = pm.metrics.kv_cache_usage_percent;
        (lo.min(kv), hi.max(kv))
    });

    let band = (max - min) / pods.len() as f64;
    Ok(pods
        .iter()
        .filter(|pm| {
            let kv = pm.metrics.kv_cache_usage_percent;
            kv >= min && kv <= min + band
        })
        .cloned()
        .collect())
}

/// Keep pods that can serve the request's adapter without an eviction
pub fn lora_affinity() -> BasicFilter {
    low_lora_cost().into_filter("lora-affinity")
}

/// Keep pods whose waiting queue is at or below `threshold`
pub fn low_queue(threshold: usize) -> BasicFilter {
    queue_threshold(threshold).into_filter("low-queue")
}

/// Thresholds for the low-latency decision tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowLatencyConfig {
    /// Queue length above which LoRA affinity stops being preferred
    #[serde(default = "default_queue_threshold")]
    pub queue_threshold: usize,
}

fn default_queue_threshold() -> usize {
    128
}

impl Default for LowLatencyConfig {
    fn default() -> Self {
        Self {
            queue_threshold: default_queue_threshold(),
        }
    }
}

/// Default filter tree for latency-sensitive traffic
///
/// ```text
/// low-queue ──ok──▶ lora-affinity ──▶ least-queuing ──▶ least-kv-cache
///     │
///     └─empty─▶ least-queuing ──▶ lora-affinity ──▶ least-kv-cache
/// ```
pub fn low_latency(config: LowLatencyConfig) -> DecisionTreeFilter {
    let queue_then_kv = || {
        DecisionTreeFilter::new(least_queuing()).on_success(least_kv_cache())
    };

    let affinity_first = DecisionTreeFilter::new(lora_affinity())
        .on_success(queue_then_kv())
        .on_failure(queue_then_kv());

    let queue_first = DecisionTreeFilter::new(least_queuing()).on_success(
        DecisionTreeFilter::new(lora_affinity())
            .on_success(least_kv_cache())
            .on_failure(least_kv_cache()),
    );

    DecisionTreeFilter::new(low_queue(config.queue_threshold))
        .on_success(affinity_first)
        .on_failure(queue_first)
}
