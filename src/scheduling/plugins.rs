//! Plugin configuration — the filter tree, scorers, picker and post-response hooks of one scheduler

use super::filter::{Filter, NoopFilter};
use super::picker::{MaxScorePicker, Picker};
use super::scorer::{Scorer, ScorerManager};
use super::types::SchedulingContext;
use crate::backend::PodMetrics;
use std::sync::Arc;

/// Hook run once the pod that served a request is known
pub trait PostResponse: Send + Sync {
    /// Plugin name for logging
    fn name(&self) -> &str;

    /// Inspect the serving pod and record headers on the context
    fn post_response(&self, ctx: &mut SchedulingContext, pod: &PodMetrics);
}

/// Plugins wired into one scheduler
///
/// Built once at startup and shared read-only by every scheduling call.
#[derive(Clone)]
pub struct PluginConfig {
    /// Root of the filter decision tree
    pub filter: Arc<dyn Filter>,
    /// Weighted scorers
    pub scorers: ScorerManager,
    /// Final selection
    pub picker: Arc<dyn Picker>,
    /// Post-response hooks, run in order
    pub post_response: Vec<Arc<dyn PostResponse>>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            filter: Arc::new(NoopFilter),
            scorers: ScorerManager::new(),
            picker: Arc::new(MaxScorePicker),
            post_response: Vec::new(),
        }
    }
}

impl PluginConfig {
    /// No filtering, no scorers, max-score picker
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the filter tree
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = filter;
        self
    }

    /// Register a weighted scorer
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>, weight: f64) -> Self {
        self.scorers.add_scorer(scorer, weight);
        self
    }

    /// Replace the picker
    pub fn with_picker(mut self, picker: Arc<dyn Picker>) -> Self {
        self.picker = picker;
        self
    }

    /// Register a post-response hook
    pub fn with_post_response(mut self, plugin: Arc<dyn PostResponse>) -> Self {
        self.post_response.push(plugin);
        self
    }
}

impl std::fmt::Debug for PluginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginConfig")
            .field("filter", &self.filter.name())
            .field("scorers", &self.scorers)
            .field("picker", &self.picker.name())
            .field(
                "post_response",
                &self.post_response.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
