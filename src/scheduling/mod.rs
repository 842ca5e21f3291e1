//! Scheduling engine — picks the model-server pod for each inference request
//!
//! A scheduler narrows the pool's pods with a filter decision tree, scores
//! the survivors with weighted scorers, and picks one with a picker. The
//! prefill/decode scheduler runs two such schedulers over one snapshot.

pub mod filter;
pub mod pd;
pub mod picker;
pub mod plugins;
pub mod registry;
pub mod scheduler;
pub mod scorer;
pub mod types;

pub use pd::{PdScheduler, DEFAULT_PROMPT_LENGTH_THRESHOLD};
pub use picker::{MaxScorePicker, Picker, RandomPicker};
pub use plugins::{PluginConfig, PostResponse};
pub use registry::{build_engine, EngineConfig};
pub use scheduler::{Scheduler, SchedulingEngine};
pub use scorer::{Scorer, ScorerManager};
pub use types::{Candidate, LlmRequest, ScoredPod, SchedulingContext, SchedulingResult};

/// Header carrying the prefill pod's base URL when a request is split
pub const PREFILL_URL_HEADER: &str = "x-prefiller-url";

/// Header carrying the session-affinity token, in both directions
pub const SESSION_HEADER: &str = "Session-ID";

/// Header telling the proxy which `address:port` to forward to
pub const DESTINATION_ENDPOINT_HEADER: &str = "x-gateway-destination-endpoint";
