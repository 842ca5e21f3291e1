//! Plugin registry — turns scheduler settings into ready-to-run engines

use super::filter::{
    decode_filter, low_latency, prefill_filter, BasicFilter, DecisionTreeFilter, Filter, NoopFilter,
};
use super::pd::PdScheduler;
use super::picker::{MaxScorePicker, Picker, RandomPicker};
use super::plugins::PluginConfig;
use super::scheduler::{Scheduler, SchedulingEngine};
use super::scorer::{ActiveLoraScorer, KvCacheAwareScorer, LoadAwareScorer, SessionAffinity};
use crate::config::{FilterKind, PickerKind, ProfileConfig, SchedulerSettings};
use crate::datastore::Datastore;
use crate::error::{Result, SchedulerError};
use crate::indexer::{HttpKvCacheIndexer, KvCacheIndexer};
use std::sync::Arc;

/// Plugin configurations for every scheduling profile
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Single-phase scheduling
    pub default: PluginConfig,
    /// Prefill phase of split scheduling
    pub prefill: PluginConfig,
    /// Decode phase of split scheduling, also used for short prompts
    pub decode: PluginConfig,
}

impl EngineConfig {
    /// Build plugin configurations from settings.
    ///
    /// Fails only if a profile enables the KV-cache scorer without an indexer.
    pub fn from_settings(
        settings: &SchedulerSettings,
        indexer: Option<Arc<dyn KvCacheIndexer>>,
    ) -> Result<Self> {
        Ok(Self {
            default: profile_plugins("default", &settings.default, None, indexer.as_ref())?,
            prefill: profile_plugins(
                "prefill",
                &settings.prefill,
                Some(prefill_filter()),
                indexer.as_ref(),
            )?,
            decode: profile_plugins(
                "decode",
                &settings.decode,
                Some(decode_filter()),
                indexer.as_ref(),
            )?,
        })
    }
}

fn profile_plugins(
    profile_name: &str,
    profile: &ProfileConfig,
    role_filter: Option<BasicFilter>,
    indexer: Option<&Arc<dyn KvCacheIndexer>>,
) -> Result<PluginConfig> {
    let profile_filter: Arc<dyn Filter> = match profile.filter {
        FilterKind::LowLatency => Arc::new(low_latency(profile.low_latency)),
        FilterKind::None => Arc::new(NoopFilter),
    };
    let filter: Arc<dyn Filter> = match role_filter {
        Some(role) => Arc::new(DecisionTreeFilter::new(role).on_success(profile_filter)),
        None => profile_filter,
    };
    let picker: Arc<dyn Picker> = match profile.picker {
        PickerKind::MaxScore => Arc::new(MaxScorePicker),
        PickerKind::Random => Arc::new(RandomPicker),
    };

    let mut plugins = PluginConfig::new().with_filter(filter).with_picker(picker);
    let scorers = &profile.scorers;

    if scorers.active_lora.enabled {
        plugins = plugins.with_scorer(Arc::new(ActiveLoraScorer::new()), scorers.active_lora.weight);
    }

    if scorers.session_affinity.enabled {
        let affinity = Arc::new(SessionAffinity::default());
        plugins = plugins
            .with_scorer(affinity.clone(), scorers.session_affinity.weight)
            .with_post_response(affinity);
    }

    if scorers.kvcache_aware.enabled {
        let indexer = indexer.ok_or_else(|| {
            SchedulerError::Config(format!(
                "Profile '{}' enables the kvcache_aware scorer but no kvcache_indexer is configured",
                profile_name
            ))
        })?;
        plugins = plugins.with_scorer(
            Arc::new(KvCacheAwareScorer::new(indexer.clone())),
            scorers.kvcache_aware.weight,
        );
    }

    if scorers.load_aware.enabled {
        plugins = plugins.with_scorer(
            Arc::new(LoadAwareScorer::new(scorers.load_aware.queue_threshold)),
            scorers.load_aware.weight,
        );
    }

    for ws in plugins.scorers.scorers() {
        tracing::debug!(profile = profile_name, scorer = ws.scorer.name(), weight = ws.weight, "Scorer registered");
    }
    tracing::debug!(
        profile = profile_name,
        filter = plugins.filter.name(),
        picker = plugins.picker.name(),
        scorers = plugins.scorers.len(),
        "Scheduling profile configured"
    );

    Ok(plugins)
}

/// Validate settings and build the engine the protocol adapter calls.
///
/// `indexer` replaces the HTTP client otherwise built from the
/// `kvcache_indexer` block. Returns a [`PdScheduler`] when split
/// scheduling is enabled, a plain [`Scheduler`] otherwise.
pub fn build_engine(
    settings: &SchedulerSettings,
    datastore: Arc<dyn Datastore>,
    indexer: Option<Arc<dyn KvCacheIndexer>>,
) -> Result<Arc<dyn SchedulingEngine>> {
    settings.validate()?;

    let indexer = indexer.or_else(|| {
        settings
            .kvcache_indexer
            .as_ref()
            .map(|config| Arc::new(HttpKvCacheIndexer::new(config)) as Arc<dyn KvCacheIndexer>)
    });
    let config = EngineConfig::from_settings(settings, indexer)?;

    if settings.pd.enabled {
        tracing::info!(
            prompt_length_threshold = settings.pd.prompt_length_threshold,
            "Prefill/decode scheduling enabled"
        );
        Ok(Arc::new(PdScheduler::new(
            datastore,
            config.prefill,
            config.decode,
            settings.pd.prompt_length_threshold,
        )))
    } else {
        tracing::info!("Single-phase scheduling enabled");
        Ok(Arc::new(Scheduler::new(datastore, config.default)))
    }
}
