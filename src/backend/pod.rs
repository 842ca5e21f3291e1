//! Pod identity — namespaced name, address and disaggregated-serving role

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Workload label that carries a pod's prefill/decode role
pub const ROLE_LABEL: &str = "llmd.org/role";

/// Namespace-qualified pod name, rendered as `namespace/name`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    /// Kubernetes namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Pod name
    pub name: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl NamespacedName {
    /// Create a namespaced name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Which phase of disaggregated serving a pod performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum PodRole {
    /// Prompt ingestion only
    Prefill,
    /// Token generation only
    Decode,
    /// Serves both phases (no role label)
    #[default]
    Both,
    /// Role label present but not recognized
    Unknown,
}

impl PodRole {
    /// Derive the role from a workload's labels
    pub fn from_labels(labels: &HashMap<String, String>) -> Self {
        match labels.get(ROLE_LABEL).map(|v| v.trim().to_lowercase()) {
            None => Self::Both,
            Some(v) => match v.as_str() {
                "prefill" => Self::Prefill,
                "decode" => Self::Decode,
                "both" => Self::Both,
                _ => Self::Unknown,
            },
        }
    }

    /// Whether a pod with this role can run the decode phase
    pub fn serves_decode(&self) -> bool {
        matches!(self, Self::Decode | Self::Both)
    }
}

impl std::fmt::Display for PodRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefill => write!(f, "prefill"),
            Self::Decode => write!(f, "decode"),
            Self::Both => write!(f, "both"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A backend inference server instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    /// Stable identity
    pub namespaced_name: NamespacedName,
    /// Network address (IP or hostname, no port)
    pub address: String,
    /// Disaggregated-serving role
    #[serde(default)]
    pub role: PodRole,
}

impl Pod {
    /// Create a pod with an explicit role
    pub fn new(namespaced_name: NamespacedName, address: impl Into<String>, role: PodRole) -> Self {
        Self {
            namespaced_name,
            address: address.into(),
            role,
        }
    }

    /// Create a pod whose role is read from its workload labels
    pub fn from_labels(
        namespaced_name: NamespacedName,
        address: impl Into<String>,
        labels: &HashMap<String, String>,
    ) -> Self {
        Self::new(namespaced_name, address, PodRole::from_labels(labels))
    }

    /// Whether the pod carries enough identity to be routed to
    pub fn has_identity(&self) -> bool {
        !self.namespaced_name.name.is_empty() && !self.address.is_empty()
    }
}
