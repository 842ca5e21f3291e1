//! Prefill/decode scheduler — two-phase scheduling for long prompts
//!
//! ```text
//! prompt < threshold ──▶ decode (or default) scheduler ──▶ result
//!
//! prompt ≥ threshold ──▶ snapshot once
//!                          │
//!                          ├─ prefill phase ──▶ x-prefiller-url: http://addr:port
//!                          │
//!                          └─ decode phase (same context) ──▶ result
//! ```

use super::plugins::PluginConfig;
use super::scheduler::{new_context, Scheduler, SchedulingEngine};
use super::types::{LlmRequest, SchedulingContext, SchedulingResult};
use super::PREFILL_URL_HEADER;
use crate::datastore::Datastore;
use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Default prompt length (bytes) from which prefill and decode are split
pub const DEFAULT_PROMPT_LENGTH_THRESHOLD: usize = 100;

/// Scheduler that splits long prompts across a prefill pod and a decode pod
#[derive(Clone)]
pub struct PdScheduler {
    datastore: Arc<dyn Datastore>,
    prefill: Scheduler,
    decode: Scheduler,
    default: Option<Scheduler>,
    prompt_length_threshold: usize,
}

impl PdScheduler {
    /// Short prompts go to the decode scheduler unless a default is set with [`with_default`](Self::with_default)
    pub fn new(
        datastore: Arc<dyn Datastore>,
        prefill: PluginConfig,
        decode: PluginConfig,
        prompt_length_threshold: usize,
    ) -> Self {
        Self {
            prefill: Scheduler::new(datastore.clone(), prefill),
            decode: Scheduler::new(datastore.clone(), decode),
            default: None,
            datastore,
            prompt_length_threshold,
        }
    }

    /// Use a dedicated scheduler for prompts below the threshold
    pub fn with_default(mut self, config: PluginConfig) -> Self {
        self.default = Some(Scheduler::new(self.datastore.clone(), config));
        self
    }

    /// Prompt length (bytes) from which requests are split
    pub fn prompt_length_threshold(&self) -> usize {
        self.prompt_length_threshold
    }

    fn short_path(&self) -> &Scheduler {
        self.default.as_ref().unwrap_or(&self.decode)
    }

    async fn schedule_phases(&self, ctx: &mut SchedulingContext) -> Result<SchedulingResult> {
        match self.prefill.schedule_with_context(ctx).await {
            Ok(result) => {
                if let Some(prefill) = result.target_pod {
                    let url = format!("http://{}:{}", prefill.pod.address, ctx.target_port);
                    tracing::debug!(pod = %prefill.pod.namespaced_name, url = %url, "Prefill pod selected");
                    ctx.set_header(PREFILL_URL_HEADER, url);
                }
            }
            Err(SchedulerError::NoEligiblePod) => {
                tracing::debug!("No prefill pod available, decoding without a prefill phase");
            }
            Err(e) => return Err(e),
        }

        self.decode.schedule_with_context(ctx).await
    }
}

#[async_trait]
impl SchedulingEngine for PdScheduler {
    async fn schedule(&self, cancel: CancellationToken, request: LlmRequest) -> Result<SchedulingResult> {
        if request.prompt.len() < self.prompt_length_threshold {
            tracing::trace!(
                prompt_len = request.prompt.len(),
                threshold = self.prompt_length_threshold,
                "Prompt below split threshold"
            );
            return self.short_path().schedule(cancel, request).await;
        }

        let mut ctx = new_context(self.datastore.as_ref(), cancel, request)?;
        let span = ctx.span.clone();
        self.schedule_phases(&mut ctx).instrument(span).await
    }

    async fn run_post_response_plugins(
        &self,
        cancel: CancellationToken,
        request: LlmRequest,
        target_pod_name: &str,
    ) -> Result<SchedulingResult> {
        self.decode
            .run_post_response_plugins(cancel, request, target_pod_name)
            .await
    }
}

impl std::fmt::Debug for PdScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdScheduler")
            .field("prefill", &self.prefill)
            .field("decode", &self.decode)
            .field("default", &self.default)
            .field("prompt_length_threshold", &self.prompt_length_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PodRole;
    use crate::datastore::InMemoryDatastore;
    use crate::scheduling::filter::{decode_filter, prefill_filter};
    use crate::scheduling::scheduler::test_support::*;
    use crate::scheduling::scorer::{LoadAwareScorer, SessionAffinity};
    use crate::scheduling::SESSION_HEADER;

    fn prefill_config() -> PluginConfig {
        PluginConfig::new().with_filter(Arc::new(prefill_filter()))
    }

    fn decode_config() -> PluginConfig {
        let affinity = Arc::new(SessionAffinity::default());
        PluginConfig::new()
            .with_filter(Arc::new(decode_filter()))
            .with_scorer(Arc::new(LoadAwareScorer::default()), 1.0)
            .with_post_response(affinity)
    }

    fn pd_pool() -> Arc<InMemoryDatastore> {
        datastore(vec![
            pod_metrics("prefill-0", "10.0.1.1", PodRole::Prefill, 0),
            pod_metrics("decode-0", "10.0.2.1", PodRole::Decode, 0),
        ])
    }

    fn long_prompt() -> String {
        "x".repeat(DEFAULT_PROMPT_LENGTH_THRESHOLD)
    }

    #[tokio::test]
    async fn test_long_prompt_splits() {
        let pd = PdScheduler::new(pd_pool(), prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);
        let request = LlmRequest::new("llama", long_prompt());

        let result = pd.schedule(CancellationToken::new(), request).await.unwrap();
        assert_eq!(result.mutated_headers[PREFILL_URL_HEADER], "http://10.0.1.1:8000");
        assert_eq!(result.target_pod.unwrap().pod.namespaced_name.name, "decode-0");
    }

    #[tokio::test]
    async fn test_short_prompt_matches_decode_scheduler() {
        let ds = datastore(vec![
            pod_metrics("prefill-0", "10.0.1.1", PodRole::Prefill, 0),
            pod_metrics("decode-0", "10.0.2.1", PodRole::Decode, 40),
            pod_metrics("decode-1", "10.0.2.2", PodRole::Decode, 3),
        ]);
        let pd = PdScheduler::new(ds.clone(), prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);
        let direct = Scheduler::new(ds, decode_config());

        let via_pd = pd
            .schedule(CancellationToken::new(), LlmRequest::new("llama", "short"))
            .await
            .unwrap();
        let via_decode = direct
            .schedule(CancellationToken::new(), LlmRequest::new("llama", "short"))
            .await
            .unwrap();

        assert_eq!(
            via_pd.target_pod.unwrap().pod.namespaced_name,
            via_decode.target_pod.unwrap().pod.namespaced_name
        );
        assert_eq!(via_pd.mutated_headers, via_decode.mutated_headers);
        assert!(!via_pd.mutated_headers.contains_key(PREFILL_URL_HEADER));
    }

    #[tokio::test]
    async fn test_short_prompt_uses_default_when_set() {
        let ds = datastore(vec![pod_metrics("prefill-only", "10.0.1.1", PodRole::Prefill, 0)]);
        let pd = PdScheduler::new(ds, prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);

        // Decode filter rejects the only pod
        let result = pd
            .schedule(CancellationToken::new(), LlmRequest::new("llama", "short"))
            .await;
        assert!(matches!(result, Err(SchedulerError::NoEligiblePod)));

        let pd = pd.with_default(PluginConfig::new());
        let result = pd
            .schedule(CancellationToken::new(), LlmRequest::new("llama", "short"))
            .await
            .unwrap();
        assert_eq!(result.target_pod.unwrap().pod.namespaced_name.name, "prefill-only");
    }

    #[tokio::test]
    async fn test_no_prefill_pod_still_decodes() {
        let ds = datastore(vec![pod_metrics("both-0", "10.0.3.1", PodRole::Both, 0)]);
        let pd = PdScheduler::new(ds, prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);

        let result = pd
            .schedule(CancellationToken::new(), LlmRequest::new("llama", long_prompt()))
            .await
            .unwrap();
        assert!(!result.mutated_headers.contains_key(PREFILL_URL_HEADER));
        assert_eq!(result.target_pod.unwrap().pod.namespaced_name.name, "both-0");
    }

    #[tokio::test]
    async fn test_no_decode_pod_fails() {
        let ds = datastore(vec![pod_metrics("prefill-0", "10.0.1.1", PodRole::Prefill, 0)]);
        let pd = PdScheduler::new(ds, prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);

        let result = pd
            .schedule(CancellationToken::new(), LlmRequest::new("llama", long_prompt()))
            .await;
        assert!(matches!(result, Err(SchedulerError::NoEligiblePod)));
    }

    #[tokio::test]
    async fn test_no_pool_aborts() {
        let ds = Arc::new(InMemoryDatastore::new());
        ds.pod_set(pod_metrics("prefill-0", "10.0.1.1", PodRole::Prefill, 0));
        let pd = PdScheduler::new(ds, prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);

        let result = pd
            .schedule(CancellationToken::new(), LlmRequest::new("llama", long_prompt()))
            .await;
        assert!(matches!(result, Err(SchedulerError::PoolUnavailable(_))));
    }

    #[tokio::test]
    async fn test_cancelled_request() {
        let pd = PdScheduler::new(pd_pool(), prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pd
            .schedule(cancel, LlmRequest::new("llama", long_prompt()))
            .await;
        assert!(matches!(result, Err(SchedulerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_post_response_delegates_to_decode() {
        let pd = PdScheduler::new(pd_pool(), prefill_config(), decode_config(), DEFAULT_PROMPT_LENGTH_THRESHOLD);
        let result = pd
            .run_post_response_plugins(
                CancellationToken::new(),
                LlmRequest::new("llama", long_prompt()),
                "ns/decode-0",
            )
            .await
            .unwrap();
        let token = &result.mutated_headers[SESSION_HEADER];
        assert_eq!(SessionAffinity::decode(token).as_deref(), Some("ns/decode-0"));
    }

    #[test]
    fn test_threshold_accessor() {
        let pd = PdScheduler::new(pd_pool(), prefill_config(), decode_config(), 2048);
        assert_eq!(pd.prompt_length_threshold(), 2048);
    }
}
