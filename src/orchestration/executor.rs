//! Executor agent seam.
//!
//! Each executor is scoped to one domain and may call remote tools while it
//! works. The supervisor treats a call as opaque: it only sees the result text
//! or an [`ExecutorError`].

use async_trait::async_trait;

use super::types::{AgentId, ContinuityToken, IterationRecord};
use crate::error::ExecutorError;

/// Input for one executor turn.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionRequest<'a> {
    /// The user's original query.
    pub query: &'a str,
    /// Query enriched with earlier agent results (see [`super::context`]).
    pub input: &'a str,
    pub history: &'a [IterationRecord],
    /// Continuity token of this executor's session on the thread.
    pub session: &'a ContinuityToken,
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// The identity this executor is registered under.
    fn id(&self) -> AgentId;

    async fn execute(&self, request: ExecutionRequest<'_>) -> Result<String, ExecutorError>;
}
