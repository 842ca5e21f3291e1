//! Role filters for prefill/decode disaggregated serving

use super::BasicFilter;
use crate::backend::PodRole;
use crate::scheduling::types::{Candidate, SchedulingContext};
use crate::error::Result;
use rand::Rng;

/// Keep a single prefill pod, chosen uniformly at random; empty if there is none
pub fn prefill_filter() -> BasicFilter {
    BasicFilter::new("prefill", prefill_filter_func)
}

fn prefill_filter_func(_ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<Candidate>> {
    let prefill: Vec<&Candidate> = pods
        .iter()
        .filter(|pm| pm.pod.role == PodRole::Prefill)
        .collect();

    if prefill.is_empty() {
        return Ok(Vec::new());
    }

    let idx = rand::rng().random_range(0..prefill.len());
    Ok(vec![prefill[idx].clone()])
}

/// Keep pods that can run the decode phase (role Decode or Both)
pub fn decode_filter() -> BasicFilter {
    BasicFilter::new("decode", |_, pods| {
        Ok(pods
            .iter()
            .filter(|pm| pm.pod.role.serves_decode())
            .cloned()
            .collect())
    })
}
