//! Session affinity — steer repeat requests back to the pod that served the session
//!
//! The token is the base64 encoding of the pod's `namespace/name`, so it
//! decodes without any server-side session table. A missing or garbled
//! token means "no affinity" for that request.

use super::Scorer;
use crate::backend::PodMetrics;
use crate::error::Result;
use crate::scheduling::plugins::PostResponse;
use crate::scheduling::types::{Candidate, ScoredPod, SchedulingContext};
use crate::scheduling::SESSION_HEADER;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Session-affinity scorer and post-response hook
#[derive(Debug, Clone)]
pub struct SessionAffinity {
    header: String,
}

impl Default for SessionAffinity {
    fn default() -> Self {
        Self::new(SESSION_HEADER)
    }
}

impl SessionAffinity {
    /// Use `header` to carry the session token in both directions
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
        }
    }

    /// Header name carrying the token
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Encode a pod identity string into a session token
    pub fn encode(pod_name: &str) -> String {
        STANDARD.encode(pod_name.as_bytes())
    }

    /// Decode a session token; `None` if it is not valid base64 or UTF-8
    pub fn decode(token: &str) -> Option<String> {
        let bytes = STANDARD.decode(token.trim()).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Token from the session header, falling back to the request's session id
    fn session_token<'a>(&self, ctx: &'a SchedulingContext) -> Option<&'a str> {
        ctx.request
            .header(&self.header)
            .or(ctx.request.session_id.as_deref())
            .filter(|token| !token.is_empty())
    }
}

#[async_trait]
impl Scorer for SessionAffinity {
    fn name(&self) -> &str {
        "session-affinity"
    }

    async fn score(&self, ctx: &SchedulingContext, pods: &[Candidate]) -> Result<Vec<ScoredPod>> {
        let target = match self.session_token(ctx) {
            Some(token) => {
                let decoded = Self::decode(token);
                if decoded.is_none() {
                    tracing::warn!(header = %self.header, "Invalid session token, ignoring affinity");
                }
                decoded
            }
            None => None,
        };

        Ok(pods
            .iter()
            .map(|pm| {
                let hit = target
                    .as_deref()
                    .is_some_and(|name| pm.pod.namespaced_name.to_string() == name);
                ScoredPod::new(pm.clone(), if hit { 1.0 } else { 0.0 })
            })
            .collect())
    }
}

impl PostResponse for SessionAffinity {
    fn name(&self) -> &str {
        "session-affinity"
    }

    fn post_response(&self, ctx: &mut SchedulingContext, pod: &PodMetrics) {
        let token = Self::encode(&pod.pod.namespaced_name.to_string());
        tracing::debug!(pod = %pod.pod.namespaced_name, "Session bound to pod");
        ctx.set_header(self.header.clone(), token);
    }
}
