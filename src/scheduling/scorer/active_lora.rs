//! Active-LoRA scorer — prefer pods that already serve the target adapter

use super::Scorer;
use crate::error::Result;
use crate::scheduling::types::{Candidate, ScoredPod, SchedulingContext};
use async_trait::async_trait;

/// Scores 1.0 for pods whose active adapters include the request's target
/// model, 0.0 otherwise; the registered weight scales it
#[derive(Debug, Default, Clone, Copy)]
pub struct ActiveLoraScorer;

impl ActiveLoraScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Scorer for ActiveLoraScorer {
    fn name(&self) -> &str {
        "active-lora"
    }

    async fn score(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<ScoredPod>> {
        let model = ctx.request.target_model();
        Ok(pods
            .iter()
            .map(|pm| {
                let active = pm.metrics.has_active_model(model);
                if active {
                    tracing::trace!(pod = %pm.pod.namespaced_name, model, "Adapter already active");
                }
                ScoredPod::new(pm.clone(), if active { 1.0 } else { 0.0 })
            })
            .collect())
    }
}
