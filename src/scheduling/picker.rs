//! Pickers — select the final target from scored candidates
//!
//! Ties on the maximum score are broken uniformly at random. This spreads
//! load across equally good pods and is relied upon, not incidental.

use super::types::{Candidate, ScoredPod, SchedulingContext};
use crate::error::{Result, SchedulerError};
use rand::Rng;

/// Picker trait — scored candidates in, exactly one target out
pub trait Picker: Send + Sync {
    /// Picker name for logging
    fn name(&self) -> &str;

    /// Choose one pod; fails only when `scored` is empty
    fn pick(&self, ctx: &SchedulingContext, scored: &[ScoredPod]) -> Result<Candidate>;
}

/// All entries sharing the maximum score, in input order.
///
/// Comparison is exact floating-point equality on the aggregated totals.
/// NaN totals never win; if every total is NaN all entries are returned.
pub fn max_score_targets(scored: &[ScoredPod]) -> Vec<&ScoredPod> {
    let max = scored
        .iter()
        .map(|sp| sp.score)
        .filter(|s| !s.is_nan())
        .fold(f64::NEG_INFINITY, f64::max);

    let best: Vec<&ScoredPod> = scored.iter().filter(|sp| sp.score == max).collect();
    if best.is_empty() {
        return scored.iter().collect();
    }
    best
}

/// Maximum score, uniformly random among ties
pub fn pick_max_score(scored: &[ScoredPod]) -> Option<Candidate> {
    let best = max_score_targets(scored);
    match best.len() {
        0 => None,
        1 => Some(best[0].pod.clone()),
        n => Some(best[rand::rng().random_range(0..n)].pod.clone()),
    }
}

/// Default picker: highest aggregate score with random tie-break
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxScorePicker;

impl Picker for MaxScorePicker {
    fn name(&self) -> &str {
        "max-score"
    }

    fn pick(&self, _ctx: &SchedulingContext, scored: &[ScoredPod]) -> Result<Candidate> {
        pick_max_score(scored).ok_or(SchedulerError::NoValidPods)
    }
}

/// Uniformly random picker, ignores scores
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPicker;

impl Picker for RandomPicker {
    fn name(&self) -> &str {
        "random"
    }

    fn pick(&self, _ctx: &SchedulingContext, scored: &[ScoredPod]) -> Result<Candidate> {
        if scored.is_empty() {
            return Err(SchedulerError::NoValidPods);
        }
        let idx = rand::rng().random_range(0..scored.len());
        Ok(scored[idx].pod.clone())
    }
}
