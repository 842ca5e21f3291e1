//! Centralized error types for the A3S scheduler

use thiserror::Error;

/// Scheduler error types
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid settings or plugin construction failure
    #[error("Configuration error: {0}")]
    Config(String),

    /// No inference pool is currently registered
    #[error("Pool unavailable: {0}")]
    PoolUnavailable(String),

    /// A filter failed; the whole scheduling call is aborted
    #[error("Filter '{filter}' failed: {message}")]
    Filter { filter: String, message: String },

    /// Filtering left no candidate pods
    #[error("No eligible pod for request")]
    NoEligiblePod,

    /// Every candidate handed to the scorers was structurally invalid
    #[error("No valid pods to score")]
    NoValidPods,

    /// A single scorer failed
    #[error("Scorer '{scorer}' failed: {message}")]
    Scorer { scorer: String, message: String },

    /// The external KV-cache index failed or answered with garbage
    #[error("KV-cache indexer error: {0}")]
    Indexer(String),

    /// The enclosing operation was cancelled
    #[error("Scheduling cancelled")]
    Cancelled,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl SchedulerError {
    /// Whether this error stems from cancellation of the enclosing operation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SchedulerError>;
