//! Progress events emitted by the supervisor while a query runs.
//!
//! Consumed by the chat front end (handoff display) and the JSONL run log.
//! Emission is fire-and-forget: a closed receiver never affects the query.

use serde::Serialize;

use super::machine::QueryState;
use super::types::{AgentId, ThreadId};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SupervisorEvent {
    QueryStarted {
        thread_id: ThreadId,
        query: String,
    },

    /// A decision round produced a valid decision.
    Routed {
        thread_id: ThreadId,
        round: usize,
        next_agent: Option<AgentId>,
        done: bool,
        reason: String,
    },

    /// Control passes to an executor.
    Handoff {
        thread_id: ThreadId,
        iteration: usize,
        from_agent: Option<AgentId>,
        to_agent: AgentId,
        reason: String,
    },

    AgentCompleted {
        thread_id: ThreadId,
        iteration: usize,
        agent: AgentId,
        succeeded: bool,
        preview: String,
    },

    Completed {
        thread_id: ThreadId,
        state: QueryState,
        iterations: usize,
        agents: Vec<AgentId>,
    },

    Aborted {
        thread_id: ThreadId,
        iterations: usize,
        error: String,
    },
}
