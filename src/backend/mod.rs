//! Backend model — inference pods and their load metrics

mod metrics;
mod pod;

pub use metrics::{Metrics, PodMetrics};
pub use pod::{NamespacedName, Pod, PodRole, ROLE_LABEL};
