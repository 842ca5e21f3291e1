//! Load-aware scorer — favour pods with short waiting queues

use super::Scorer;
use crate::error::Result;
use crate::scheduling::types::{Candidate, ScoredPod, SchedulingContext};
use async_trait::async_trait;

/// Default queue length at which a pod is considered saturated
pub const DEFAULT_QUEUE_THRESHOLD: usize = 128;

/// Scores an idle pod 0.5, a saturated one 0.0, and falls off linearly between
#[derive(Debug, Clone, Copy)]
pub struct LoadAwareScorer {
    queue_threshold: usize,
}

impl LoadAwareScorer {
    /// A threshold of zero is treated as one
    pub fn new(queue_threshold: usize) -> Self {
        Self {
            queue_threshold: queue_threshold.max(1),
        }
    }

    fn score_queue(&self, queue: usize) -> f64 {
        if queue == 0 {
            0.5
        } else if queue > self.queue_threshold {
            0.0
        } else {
            0.5 * (1.0 - queue as f64 / self.queue_threshold as f64)
        }
    }
}

impl Default for LoadAwareScorer {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_THRESHOLD)
    }
}

#[async_trait]
impl Scorer for LoadAwareScorer {
    fn name(&self) -> &str {
        "load-aware"
    }

    async fn score(&self, _ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<ScoredPod>> {
        Ok(pods
            .iter()
            .map(|pm| ScoredPod::new(pm.clone(), self.score_queue(pm.metrics.waiting_queue_size)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::filter::test_support::{context, pod};

    #[test]
    fn test_score_curve() {
        let scorer = LoadAwareScorer::new(100);
        assert_eq!(scorer.score_queue(0), 0.5);
        assert_eq!(scorer.score_queue(50), 0.25);
        assert_eq!(scorer.score_queue(100), 0.0);
        assert_eq!(scorer.score_queue(101), 0.0);
    }

    #[test]
    fn test_zero_threshold_clamped() {
        let scorer = LoadAwareScorer::new(0);
        assert_eq!(scorer.score_queue(0), 0.5);
        assert_eq!(scorer.score_queue(1), 0.0);
        assert_eq!(scorer.score_queue(2), 0.0);
    }

    #[tokio::test]
    async fn test_prefers_shorter_queue() {
        let ctx = context();
        let pods = vec![pod("busy", 64, 0.0), pod("idle", 0, 0.0)];
        let scored = LoadAwareScorer::default().score(&ctx, &pods).await.unwrap();
        assert_eq!(scored[0].score, 0.25);
        assert_eq!(scored[1].score, 0.5);
    }
}
