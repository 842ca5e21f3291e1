//! Scorers — per-pod scores aggregated by weight
//!
//! Each registered scorer contributes `weight × score` to a pod's total.
//! A scorer that fails is logged and skipped for that call; the remaining
//! scorers still run. Only cancellation aborts aggregation.

mod active_lora;
mod kvcache_aware;
mod load_aware;
mod session_affinity;

pub use active_lora::ActiveLoraScorer;
pub use kvcache_aware::KvCacheAwareScorer;
pub use load_aware::{LoadAwareScorer, DEFAULT_QUEUE_THRESHOLD};
pub use session_affinity::SessionAffinity;

use super::picker::pick_max_score;
use super::types::{Candidate, ScoredPod, SchedulingContext};
use crate::backend::NamespacedName;
use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Scorer trait — assigns a score to each candidate
///
/// Scores may be negative. Pods missing from the returned list contribute
/// nothing from this scorer.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Stable scorer name, used in configuration and logs
    fn name(&self) -> &str;

    /// Score the candidates
    async fn score(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<ScoredPod>>;
}

/// A scorer registered with a weight
#[derive(Clone)]
pub struct WeightedScorer {
    /// Scorer plugin
    pub scorer: Arc<dyn Scorer>,
    /// Multiplier applied to every score it returns
    pub weight: f64,
}

impl std::fmt::Debug for WeightedScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedScorer")
            .field("scorer", &self.scorer.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Ordered list of weighted scorers
#[derive(Debug, Clone, Default)]
pub struct ScorerManager {
    scorers: Vec<WeightedScorer>,
}

impl ScorerManager {
    /// Create a manager without scorers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scorer
    pub fn add_scorer(&mut self, scorer: Arc<dyn Scorer>, weight: f64) {
        self.scorers.push(WeightedScorer { scorer, weight });
    }

    /// Registered scorers
    pub fn scorers(&self) -> &[WeightedScorer] {
        &self.scorers
    }

    /// Number of registered scorers
    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    /// Whether no scorer is registered
    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    /// Aggregate weighted scores for every structurally valid pod.
    ///
    /// Invalid pods (no name or address) are logged and left out. Fails with
    /// `NoValidPods` when none remain, or `Cancelled` if the call is cancelled.
    pub async fn score(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<ScoredPod>> {
        let mut totals: Vec<ScoredPod> = Vec::with_capacity(pods.len());
        let mut index: HashMap<NamespacedName, usize> = HashMap::with_capacity(pods.len());

        for pm in pods {
            if !pm.pod.has_identity() {
                tracing::debug!(pod = %pm, "Invalid pod skipped in scoring");
                continue;
            }
            index.insert(pm.pod.namespaced_name.clone(), totals.len());
            totals.push(ScoredPod::new(pm.clone(), 0.0));
        }

        if totals.is_empty() {
            return Err(SchedulerError::NoValidPods);
        }

        let valid: Vec<Candidate> = totals.iter().map(|sp| sp.pod.clone()).collect();

        for ws in &self.scorers {
            ctx.check_cancelled()?;
            match ws.scorer.score(ctx, &valid).await {
                Ok(scored) => {
                    for sp in scored {
                        if let Some(&i) = index.get(&sp.pod.pod.namespaced_name) {
                            totals[i].score += ws.weight * sp.score;
                        }
                    }
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        scorer = ws.scorer.name(),
                        error = %e,
                        "Scorer failed, ignoring its contribution"
                    );
                }
            }
        }

        ctx.check_cancelled()?;
        tracing::trace!(
            scores = ?totals
                .iter()
                .map(|sp| (sp.pod.pod.namespaced_name.to_string(), sp.score))
                .collect::<Vec<_>>(),
            "Aggregated pod scores"
        );
        Ok(totals)
    }

    /// Score the pods and choose the one with the highest total, random among ties
    pub async fn score_targets(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Candidate> {
        let totals = self.score(ctx, pods).await?;
        pick_max_score(&totals).ok_or(SchedulerError::NoValidPods)
    }
}
