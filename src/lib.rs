//! # A3S Scheduler
//!
//! The scheduling engine of an LLM inference router: for every request it
//! picks the model-server pod that should serve it, optionally splitting
//! long prompts across a prefill pod and a decode pod.
//!
//! ## Architecture
//!
//! ```text
//! Datastore snapshot → Filter tree → Weighted scorers → Picker → Result
//!                                                          │
//!                      post-response hooks ◀── serving pod ┘
//! ```
//!
//! ## Core Features
//!
//! - **Filter trees**: queue, KV-cache, LoRA and role filters composed into decision trees
//! - **Weighted scoring**: active LoRA, session affinity, KV-cache prefix reuse, load
//! - **Random tie-break**: equally good pods share load uniformly
//! - **Prefill/decode split**: two phases over one consistent pod snapshot
//! - **Session affinity**: self-describing tokens steer repeat requests back
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use a3s_scheduler::{build_engine, config::SchedulerSettings, InMemoryDatastore, LlmRequest};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> a3s_scheduler::Result<()> {
//!     let settings = SchedulerSettings::from_file("scheduler.hcl").await?;
//!     let datastore = Arc::new(InMemoryDatastore::new());
//!     let engine = build_engine(&settings, datastore, None)?;
//!
//!     let result = engine
//!         .schedule(CancellationToken::new(), LlmRequest::new("llama-3", "Hello"))
//!         .await?;
//!     println!("{:?}", result.outbound_headers());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod datastore;
pub mod error;
pub mod indexer;
pub mod scheduling;

// Re-export main types
pub use backend::{Metrics, NamespacedName, Pod, PodMetrics, PodRole};
pub use datastore::{Datastore, InMemoryDatastore, InferencePool};
pub use error::{Result, SchedulerError};
pub use indexer::{HttpKvCacheIndexer, KvCacheIndexer};
pub use scheduling::{
    build_engine, LlmRequest, PdScheduler, Scheduler, SchedulingEngine, SchedulingResult,
    DESTINATION_ENDPOINT_HEADER, PREFILL_URL_HEADER, SESSION_HEADER,
};
