//! Per-request scheduling types — request, context and result

use super::DESTINATION_ENDPOINT_HEADER;
use crate::backend::PodMetrics;
use crate::error::{Result, SchedulerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A pod as seen by one scheduling call; shared, never mutated
pub type Candidate = Arc<PodMetrics>;

/// Parsed inference request, as handed over by the protocol adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Model name from the request body
    pub model: String,
    /// Target model after traffic-split resolution
    #[serde(default)]
    pub resolved_target_model: String,
    /// Raw prompt text
    #[serde(default)]
    pub prompt: String,
    /// Request headers, keys as received
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Session identifier, if the adapter extracted one
    #[serde(default)]
    pub session_id: Option<String>,
    /// Critical requests are never shed upstream
    #[serde(default)]
    pub critical: bool,
}

impl LlmRequest {
    /// Create a request whose resolved target model equals its model
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            resolved_target_model: model.clone(),
            model,
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Look up a header, ignoring ASCII case in the name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The model scorers and filters reason about
    pub fn target_model(&self) -> &str {
        if self.resolved_target_model.is_empty() {
            &self.model
        } else {
            &self.resolved_target_model
        }
    }
}

/// State carried through one scheduling call (or one PD call spanning two phases)
///
/// The pod snapshot is taken once when the context is built and never
/// changes afterwards. `mutated_headers` is the side channel plugins use to
/// hand headers back to the caller; later writes to a key overwrite earlier ones.
#[derive(Debug)]
pub struct SchedulingContext {
    /// Cancellation signal of the enclosing operation
    pub cancel: CancellationToken,
    /// Span every log line of this call is recorded under
    pub span: tracing::Span,
    /// The request being scheduled
    pub request: Arc<LlmRequest>,
    /// Point-in-time copy of the pool's pods
    pub pods_snapshot: Vec<Candidate>,
    /// Port model servers listen on
    pub target_port: u16,
    /// Headers to set on the outbound request
    pub mutated_headers: HashMap<String, String>,
}

impl SchedulingContext {
    /// Build a context, deep-copying the given pods into an immutable snapshot
    pub fn new(
        cancel: CancellationToken,
        request: Arc<LlmRequest>,
        pods: Vec<PodMetrics>,
        target_port: u16,
    ) -> Self {
        let span = tracing::debug_span!(
            "schedule",
            model = %request.model,
            target_model = %request.target_model(),
            critical = request.critical,
            prompt_len = request.prompt.len(),
        );
        Self {
            cancel,
            span,
            request,
            pods_snapshot: pods.into_iter().map(Arc::new).collect(),
            target_port,
            mutated_headers: HashMap::new(),
        }
    }

    /// Fail with `Cancelled` if the enclosing operation was cancelled
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(SchedulerError::Cancelled);
        }
        Ok(())
    }

    /// Record a header for the caller
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.mutated_headers.insert(name.into(), value.into());
    }

    /// Find a pod of the snapshot by its `namespace/name` string
    pub fn find_pod(&self, name: &str) -> Option<Candidate> {
        self.pods_snapshot
            .iter()
            .find(|pm| pm.pod.namespaced_name.to_string() == name)
            .cloned()
    }

    /// Snapshot the result: target plus the headers accumulated so far
    pub fn result(&self, target_pod: Option<Candidate>) -> SchedulingResult {
        SchedulingResult {
            target_pod,
            mutated_headers: self.mutated_headers.clone(),
            target_port: self.target_port,
        }
    }
}

/// A candidate with its aggregated score
#[derive(Debug, Clone)]
pub struct ScoredPod {
    /// The scored pod
    pub pod: Candidate,
    /// Weighted score
    pub score: f64,
}

impl ScoredPod {
    /// Pair a pod with a score
    pub fn new(pod: Candidate, score: f64) -> Self {
        Self { pod, score }
    }
}

/// Outcome of a scheduling call
#[derive(Debug, Clone)]
pub struct SchedulingResult {
    /// Chosen pod; `None` means "no target"
    pub target_pod: Option<Candidate>,
    /// Headers the plugins asked to set
    pub mutated_headers: HashMap<String, String>,
    /// Port of the pool the target belongs to
    pub target_port: u16,
}

impl SchedulingResult {
    /// `address:port` of the target pod
    pub fn destination_endpoint(&self) -> Option<String> {
        self.target_pod
            .as_ref()
            .map(|pm| format!("{}:{}", pm.pod.address, self.target_port))
    }

    /// Mutated headers plus the destination endpoint header, for the proxy
    pub fn outbound_headers(&self) -> HashMap<String, String> {
        let mut headers = self.mutated_headers.clone();
        if let Some(endpoint) = self.destination_endpoint() {
            headers.insert(DESTINATION_ENDPOINT_HEADER.to_string(), endpoint);
        }
        headers
    }
}
