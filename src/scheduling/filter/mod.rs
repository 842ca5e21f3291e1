//! Filter chain — narrows the candidate pod list before scoring
//!
//! Filters are composed into a binary decision tree: each node applies one
//! filter, then continues with `on_success` when pods remain or with
//! `on_failure` when none do. A node without a matching successor returns
//! its own output.

mod load;
mod predicate;
mod role;

pub use load::{
    least_kv_cache, least_queuing, lora_affinity, low_latency, low_queue, LowLatencyConfig,
};
pub use predicate::{kv_cache_threshold, low_lora_cost, queue_threshold, PodPredicate};
pub use role::{decode_filter, prefill_filter};

use super::types::{Candidate, SchedulingContext};
use crate::error::Result;
use std::sync::Arc;

/// Filter trait — candidates in, narrowed candidates out
///
/// Filters only read pod metrics and request data. An error aborts the
/// whole scheduling call.
pub trait Filter: Send + Sync {
    /// Filter name for logging
    fn name(&self) -> &str;

    /// Narrow `pods`; the output may be empty
    fn filter(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>>;
}

impl<F: Filter + ?Sized> Filter for Arc<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn filter(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
        (**self).filter(ctx, pods)
    }
}

type FilterFn = dyn Fn(&SchedulingContext, &[Candidate]) -> Result<Vec<Candidate>> + Send + Sync;

/// A named filter backed by a function
pub struct BasicFilter {
    name: String,
    func: Box<FilterFn>,
}

impl BasicFilter {
    /// Wrap a filter function
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&SchedulingContext, &[Candidate]) -> Result<Vec<Candidate>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl Filter for BasicFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn filter(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
        let filtered = (self.func)(ctx, pods)?;
        tracing::trace!(
            filter = self.name,
            before = pods.len(),
            after = filtered.len(),
            "Filter applied"
        );
        Ok(filtered)
    }
}

/// Decision tree node
///
/// `on_success` receives the node's output; `on_failure` receives the
/// node's input, so it can fall back to a looser policy over the same pods.
pub struct DecisionTreeFilter {
    current: Arc<dyn Filter>,
    on_success: Option<Arc<dyn Filter>>,
    on_failure: Option<Arc<dyn Filter>>,
}

impl DecisionTreeFilter {
    /// Create a leaf node
    pub fn new(current: impl Filter + 'static) -> Self {
        Self {
            current: Arc::new(current),
            on_success: None,
            on_failure: None,
        }
    }

    /// Continue with `next` when the current filter keeps some pods
    pub fn on_success(mut self, next: impl Filter + 'static) -> Self {
        self.on_success = Some(Arc::new(next));
        self
    }

    /// Continue with `next` when the current filter keeps no pods
    pub fn on_failure(mut self, next: impl Filter + 'static) -> Self {
        self.on_failure = Some(Arc::new(next));
        self
    }
}

impl Filter for DecisionTreeFilter {
    fn name(&self) -> &str {
        self.current.name()
    }

    fn filter(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
        let filtered = self.current.filter(ctx, pods)?;

        if !filtered.is_empty() {
            match &self.on_success {
                Some(next) => next.filter(ctx, &filtered),
                None => Ok(filtered),
            }
        } else {
            match &self.on_failure {
                Some(next) => {
                    tracing::trace!(
                        filter = self.current.name(),
                        fallback = next.name(),
                        "Filter kept no pods, falling back"
                    );
                    next.filter(ctx, pods)
                }
                None => Ok(filtered),
            }
        }
    }
}

/// Pass-through filter
pub struct NoopFilter;

impl Filter for NoopFilter {
    fn name(&self) -> &str {
        "noop"
    }

    fn filter(&self, _ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
        Ok(pods.to_vec())
    }
}
