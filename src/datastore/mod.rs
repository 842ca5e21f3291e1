//! Datastore — the pod/pool registry the scheduler reads snapshots from
//!
//! The registry is refreshed concurrently by an out-of-band metrics poller.
//! Schedulers only ever read it, once per scheduling call, and work on a
//! deep copy afterwards.

mod memory;

pub use memory::InMemoryDatastore;

use crate::backend::PodMetrics;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Inference pool configuration relevant to scheduling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferencePool {
    /// Pool name
    pub name: String,
    /// Port every model server in the pool listens on
    pub target_port: u16,
}

impl InferencePool {
    /// Create a pool
    pub fn new(name: impl Into<String>, target_port: u16) -> Self {
        Self {
            name: name.into(),
            target_port,
        }
    }
}

/// Read side of the pod/pool registry
pub trait Datastore: Send + Sync {
    /// All known pods with their latest metrics, as owned copies
    fn get_all_pods(&self) -> Vec<PodMetrics>;

    /// The registered pool; fails when none is registered
    fn get_pool(&self) -> Result<InferencePool>;
}
