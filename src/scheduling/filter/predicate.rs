//! Pod predicates — composable yes/no checks that become filters

use super::BasicFilter;
use crate::backend::PodMetrics;
use crate::scheduling::types::SchedulingContext;
use std::sync::Arc;

type PredicateFn = dyn Fn(&SchedulingContext, &PodMetrics) -> bool + Send + Sync;

/// A predicate over one pod in the context of one request
#[derive(Clone)]
pub struct PodPredicate(Arc<PredicateFn>);

impl PodPredicate {
    /// Wrap a predicate function
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&SchedulingContext, &PodMetrics) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Evaluate the predicate
    pub fn test(&self, ctx: &SchedulingContext, pod: &PodMetrics) -> bool {
        (self.0)(ctx, pod)
    }

    /// Both predicates must hold
    pub fn and(self, other: PodPredicate) -> Self {
        Self::new(move |ctx, pod| self.test(ctx, pod) && other.test(ctx, pod))
    }

    /// Turn the predicate into an order-preserving filter
    pub fn into_filter(self, name: impl Into<String>) -> BasicFilter {
        BasicFilter::new(name, move |ctx, pods| {
            Ok(pods.iter().filter(|pm| self.test(ctx, pm)).cloned().collect())
        })
    }
}

/// Waiting queue at or below `threshold`
pub fn queue_threshold(threshold: usize) -> PodPredicate {
    PodPredicate::new(move |_, pm| pm.metrics.waiting_queue_size <= threshold)
}

/// KV-cache occupancy at or below `threshold`
pub fn kv_cache_threshold(threshold: f64) -> PodPredicate {
    PodPredicate::new(move |_, pm| pm.metrics.kv_cache_usage_percent <= threshold)
}

/// The target adapter is already loaded, or there is room to load it
pub fn low_lora_cost() -> PodPredicate {
    PodPredicate::new(|ctx, pm| {
        pm.metrics.has_active_model(ctx.request.target_model()) || pm.metrics.has_adapter_capacity()
    })
}
