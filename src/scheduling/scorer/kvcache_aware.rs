//! KV-cache-aware scorer — favour pods holding the prompt's prefix in cache

use super::Scorer;
use crate::error::{Result, SchedulerError};
use crate::indexer::KvCacheIndexer;
use crate::scheduling::types::{Candidate, ScoredPod, SchedulingContext};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Scores pods with the external KV-cache index
///
/// Pods are identified to the index by address. Pods the index leaves out
/// get no score from this scorer.
pub struct KvCacheAwareScorer {
    indexer: Arc<dyn KvCacheIndexer>,
}

impl KvCacheAwareScorer {
    pub fn new(indexer: Arc<dyn KvCacheIndexer>) -> Self {
        Self { indexer }
    }
}

#[async_trait]
impl Scorer for KvCacheAwareScorer {
    fn name(&self) -> &str {
        "kvcache-aware"
    }

    async fn score(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<ScoredPod>> {
        let mut by_address: HashMap<&str, &Candidate> = HashMap::with_capacity(pods.len());
        let mut identifiers = Vec::with_capacity(pods.len());
        for pm in pods {
            by_address.insert(pm.pod.address.as_str(), pm);
            identifiers.push(pm.pod.address.clone());
        }

        if identifiers.is_empty() {
            return Ok(Vec::new());
        }

        let request = &ctx.request;
        let scores = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(SchedulerError::Cancelled),
            res = self.indexer.get_pod_scores(&request.prompt, &request.model, &identifiers) => res?,
        };

        let mut scored = Vec::with_capacity(scores.len());
        for (address, score) in scores {
            match by_address.get(address.as_str()) {
                Some(pm) => scored.push(ScoredPod::new((*pm).clone(), score)),
                None => {
                    tracing::debug!(address = %address, "Index returned an unknown pod, ignoring");
                }
            }
        }

        tracing::debug!(
            requested = identifiers.len(),
            scored = scored.len(),
            "KV-cache scores received"
        );
        Ok(scored)
    }
}
