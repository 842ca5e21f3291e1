//! Single-phase scheduler — snapshot → filter → score → pick

use super::plugins::PluginConfig;
use super::types::{LlmRequest, SchedulingContext, SchedulingResult};
use crate::datastore::Datastore;
use crate::error::{Result, SchedulerError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Entry points the protocol adapter calls, once per request/response pair
#[async_trait]
pub trait SchedulingEngine: Send + Sync {
    /// Choose the pod that serves `request`
    async fn schedule(&self, cancel: CancellationToken, request: LlmRequest) -> Result<SchedulingResult>;

    /// Run post-response hooks once `target_pod_name` (`namespace/name`) has served `request`
    async fn run_post_response_plugins(
        &self,
        cancel: CancellationToken,
        request: LlmRequest,
        target_pod_name: &str,
    ) -> Result<SchedulingResult>;
}

/// Build a context from a fresh snapshot of `datastore`
///
/// Fails if the call is already cancelled or no pool is registered.
pub(crate) fn new_context(
    datastore: &dyn Datastore,
    cancel: CancellationToken,
    request: LlmRequest,
) -> Result<SchedulingContext> {
    if cancel.is_cancelled() {
        return Err(SchedulerError::Cancelled);
    }
    let pool = datastore.get_pool()?;
    Ok(SchedulingContext::new(
        cancel,
        Arc::new(request),
        datastore.get_all_pods(),
        pool.target_port,
    ))
}

/// Scheduler driven by one plugin configuration
#[derive(Clone)]
pub struct Scheduler {
    datastore: Arc<dyn Datastore>,
    config: Arc<PluginConfig>,
}

impl Scheduler {
    pub fn new(datastore: Arc<dyn Datastore>, config: PluginConfig) -> Self {
        Self {
            datastore,
            config: Arc::new(config),
        }
    }

    /// Plugins this scheduler runs
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Schedule within an existing context
    ///
    /// Reads the context's snapshot and leaves its headers untouched, so
    /// several phases can share one context.
    pub async fn schedule_with_context(&self, ctx: &SchedulingContext) -> Result<SchedulingResult> {
        ctx.check_cancelled()?;

        let filtered = self.config.filter.filter(ctx, &ctx.pods_snapshot)?;
        if filtered.is_empty() {
            tracing::debug!(
                filter = self.config.filter.name(),
                pods = ctx.pods_snapshot.len(),
                "No pod passed the filters"
            );
            return Err(SchedulerError::NoEligiblePod);
        }

        let scored = self.config.scorers.score(ctx, &filtered).await?;
        ctx.check_cancelled()?;
        let target = self.config.picker.pick(ctx, &scored)?;

        tracing::debug!(
            pod = %target.pod.namespaced_name,
            address = %target.pod.address,
            candidates = filtered.len(),
            "Target pod selected"
        );
        Ok(ctx.result(Some(target)))
    }

    /// Run post-response hooks within an existing context
    ///
    /// An unknown pod name yields a result without a target; hooks do not run.
    pub fn post_response_with_context(
        &self,
        ctx: &mut SchedulingContext,
        target_pod_name: &str,
    ) -> SchedulingResult {
        let Some(target) = ctx.find_pod(target_pod_name) else {
            tracing::warn!(pod = target_pod_name, "Serving pod not found, skipping post-response plugins");
            return ctx.result(None);
        };

        for plugin in &self.config.post_response {
            tracing::trace!(plugin = plugin.name(), pod = target_pod_name, "Running post-response plugin");
            plugin.post_response(ctx, &target);
        }
        ctx.result(Some(target))
    }
}

#[async_trait]
impl SchedulingEngine for Scheduler {
    async fn schedule(&self, cancel: CancellationToken, request: LlmRequest) -> Result<SchedulingResult> {
        let ctx = new_context(self.datastore.as_ref(), cancel, request)?;
        let span = ctx.span.clone();
        self.schedule_with_context(&ctx).instrument(span).await
    }

    async fn run_post_response_plugins(
        &self,
        cancel: CancellationToken,
        request: LlmRequest,
        target_pod_name: &str,
    ) -> Result<SchedulingResult> {
        let mut ctx = new_context(self.datastore.as_ref(), cancel, request)?;
        let span = ctx.span.clone();
        Ok(span.in_scope(|| self.post_response_with_context(&mut ctx, target_pod_name)))
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").field("config", &self.config).finish()
    }
}
