//! In-memory datastore — lock-protected pod and pool registry

use super::{Datastore, InferencePool};
use crate::backend::{Metrics, NamespacedName, Pod, PodMetrics};
use crate::error::{Result, SchedulerError};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Pod/pool registry backed by `RwLock`s
///
/// Pods are kept ordered by namespaced name so snapshots are stable.
#[derive(Default)]
pub struct InMemoryDatastore {
    pool: RwLock<Option<InferencePool>>,
    pods: RwLock<BTreeMap<NamespacedName, PodMetrics>>,
}

impl InMemoryDatastore {
    /// Create an empty datastore
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the pool
    pub fn pool_set(&self, pool: InferencePool) {
        let mut guard = self.pool.write().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(pool = pool.name, port = pool.target_port, "Pool registered");
        *guard = Some(pool);
    }

    /// Unregister the pool
    pub fn pool_clear(&self) {
        let mut guard = self.pool.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Add a pod, or update its identity fields if it already exists.
    ///
    /// Returns `true` when the pod was newly added. Existing metrics are kept.
    pub fn pod_update_or_add(&self, pod: Pod) -> bool {
        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        match pods.get_mut(&pod.namespaced_name) {
            Some(existing) => {
                existing.pod = pod;
                false
            }
            None => {
                tracing::debug!(pod = %pod.namespaced_name, role = %pod.role, "Pod added");
                pods.insert(
                    pod.namespaced_name.clone(),
                    PodMetrics::new(pod, Metrics::default()),
                );
                true
            }
        }
    }

    /// Replace the metrics of a known pod. Returns `false` for unknown pods.
    pub fn pod_update_metrics(&self, name: &NamespacedName, metrics: Metrics) -> bool {
        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        match pods.get_mut(name) {
            Some(existing) => {
                existing.metrics = metrics;
                true
            }
            None => false,
        }
    }

    /// Insert or replace a pod together with its metrics
    pub fn pod_set(&self, pm: PodMetrics) {
        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        pods.insert(pm.pod.namespaced_name.clone(), pm);
    }

    /// Remove a pod. Returns `true` if it was present.
    pub fn pod_delete(&self, name: &NamespacedName) -> bool {
        let mut pods = self.pods.write().unwrap_or_else(PoisonError::into_inner);
        pods.remove(name).is_some()
    }

    /// Number of registered pods
    pub fn pod_count(&self) -> usize {
        self.pods.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Datastore for InMemoryDatastore {
    fn get_all_pods(&self) -> Vec<PodMetrics> {
        let pods = self.pods.read().unwrap_or_else(PoisonError::into_inner);
        pods.values().cloned().collect()
    }

    fn get_pool(&self) -> Result<InferencePool> {
        let guard = self.pool.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .clone()
            .ok_or_else(|| SchedulerError::PoolUnavailable("no pool registered".to_string()))
    }
}
