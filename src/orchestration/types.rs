//! Type definitions for the supervisor orchestration subsystem.
//!
//! These types form the shared vocabulary between the [`super::supervisor::Supervisor`],
//! the decision function and executor seams, the session registry, and the
//! front end. Wire-facing types derive [`serde::Serialize`] so they can be sent
//! to the router, written to the run log, or printed as JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ProtocolViolation;

/// Identity of an agent taking part in a conversation.
///
/// The set is fixed at compile time. `Router` is the reserved decision-maker
/// identity; the remaining variants are executors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    Router,
    CustomerData,
    Support,
    Sql,
}

impl AgentId {
    /// Every executor identity, in presentation order.
    pub const EXECUTORS: [AgentId; 3] = [AgentId::CustomerData, AgentId::Support, AgentId::Sql];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::Router => "router",
            AgentId::CustomerData => "customer_data",
            AgentId::Support => "support",
            AgentId::Sql => "sql",
        }
    }

    pub fn is_executor(&self) -> bool {
        !matches!(self, AgentId::Router)
    }

    /// Human-facing label, e.g. "Customer Data Agent".
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentId::Router => "Router Agent",
            AgentId::CustomerData => "Customer Data Agent",
            AgentId::Support => "Support Agent",
            AgentId::Sql => "Sql Agent",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name any known agent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent: {0}")]
pub struct UnknownAgentName(pub String);

impl FromStr for AgentId {
    type Err = UnknownAgentName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "router" => Ok(AgentId::Router),
            "customer_data" => Ok(AgentId::CustomerData),
            "support" => Ok(AgentId::Support),
            "sql" => Ok(AgentId::Sql),
            other => Err(UnknownAgentName(other.to_string())),
        }
    }
}

/// Identifier scoping one logical conversation. Orthogonal to [`AgentId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh thread id (`thread-<uuid v4>`).
    pub fn generate() -> Self {
        Self(format!("thread-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque handle that lets an agent recall earlier turns of one thread.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuityToken(String);

impl ContinuityToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of the session registry: one entry per (agent, thread) pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub agent: AgentId,
    pub thread: ThreadId,
}

impl SessionKey {
    pub fn new(agent: AgentId, thread: ThreadId) -> Self {
        Self { agent, thread }
    }
}

/// One supervisor turn: which executor ran, what it was given, and what came back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IterationRecord {
    /// 1-based position of this turn within its query.
    pub iteration: usize,
    pub agent: AgentId,
    /// The context-enriched prompt handed to the executor.
    pub input: String,
    /// Executor result text, or the error text when `succeeded` is false.
    pub output: String,
    pub succeeded: bool,
}

impl IterationRecord {
    /// The view of this record sent across the decision/executor boundary.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            agent: self.agent,
            output: self.output.clone(),
            succeeded: self.succeeded,
        }
    }
}

/// Wire view of an [`IterationRecord`]: `{agent, output, succeeded}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub agent: AgentId,
    pub output: String,
    pub succeeded: bool,
}

/// Routing decision as produced by the decision function.
///
/// `next_agent` is kept as a raw string so that targets outside the known set
/// survive parsing and can be reported as protocol violations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    #[serde(default)]
    pub next_agent: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub reason: String,
}

impl RoutingDecision {
    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            next_agent: None,
            done: true,
            reason: reason.into(),
        }
    }

    pub fn route_to(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            next_agent: Some(agent.into()),
            done: false,
            reason: reason.into(),
        }
    }

    /// Check the shape invariants: `done` implies no target, `!done` implies one.
    pub fn check_well_formed(&self) -> Result<(), String> {
        let has_target = self
            .next_agent
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());
        match (self.done, has_target) {
            (true, true) => Err("done=true must not name a next_agent".to_string()),
            (false, false) => Err("done=false requires a next_agent".to_string()),
            _ => Ok(()),
        }
    }

    /// Validate against the registered executor set and produce a [`Route`].
    pub fn route(&self, registered: &[AgentId]) -> Result<Route, ProtocolViolation> {
        if let Err(reason) = self.check_well_formed() {
            return Err(ProtocolViolation::MalformedDecision {
                raw: serde_json::to_string(self).unwrap_or_default(),
                reason,
            });
        }
        if self.done {
            return Ok(Route::Done);
        }

        let raw = self.next_agent.clone().unwrap_or_default();
        let unknown = || ProtocolViolation::UnknownAgent {
            agent: raw.clone(),
            registered: registered
                .iter()
                .map(AgentId::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        };

        match raw.parse::<AgentId>() {
            Ok(agent) if agent.is_executor() && registered.contains(&agent) => {
                Ok(Route::Execute(agent))
            }
            _ => Err(unknown()),
        }
    }
}

/// A validated routing decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Done,
    Execute(AgentId),
}

/// How a successful query ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The router signalled completion.
    Done,
    /// The iteration bound was hit first; the answer is best-effort.
    Exceeded,
}

/// One labeled block of the aggregated answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub agent: AgentId,
    pub text: String,
}

/// The user-facing result of `process_query`.
#[derive(Clone, Debug, Serialize)]
pub struct FinalResponse {
    pub thread_id: ThreadId,
    /// Aggregated answer (labeled sections joined by blank lines).
    pub text: String,
    pub sections: Vec<Section>,
    pub outcome: Outcome,
    /// Number of executor turns that ran.
    pub iterations: usize,
    /// Every record, failed ones included, for diagnostics.
    pub records: Vec<IterationRecord>,
}

impl FinalResponse {
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_round_trips_through_str() {
        for agent in [AgentId::Router, AgentId::CustomerData, AgentId::Support, AgentId::Sql] {
            assert_eq!(agent.as_str().parse::<AgentId>().unwrap(), agent);
        }
        assert!("billing".parse::<AgentId>().is_err());
    }

    #[test]
    fn router_is_not_an_executor() {
        assert!(!AgentId::Router.is_executor());
        assert!(AgentId::EXECUTORS.iter().all(AgentId::is_executor));
    }

    #[test]
    fn route_accepts_registered_executor() {
        let decision = RoutingDecision::route_to("support", "ticket");
        let route = decision.route(&AgentId::EXECUTORS).unwrap();
        assert_eq!(route, Route::Execute(AgentId::Support));
    }

    #[test]
    fn route_done() {
        let decision = RoutingDecision::finish("answered");
        assert_eq!(decision.route(&AgentId::EXECUTORS).unwrap(), Route::Done);
    }

    #[test]
    fn route_rejects_unknown_name() {
        let decision = RoutingDecision::route_to("billing", "?");
        let err = decision.route(&AgentId::EXECUTORS).unwrap_err();
        assert!(matches!(err, ProtocolViolation::UnknownAgent { ref agent, .. } if agent == "billing"));
    }

    #[test]
    fn route_rejects_known_but_unregistered_agent() {
        let decision = RoutingDecision::route_to("sql", "report");
        let err = decision
            .route(&[AgentId::CustomerData, AgentId::Support])
            .unwrap_err();
        assert!(matches!(err, ProtocolViolation::UnknownAgent { .. }));
    }

    #[test]
    fn route_rejects_router_as_target() {
        let decision = RoutingDecision::route_to("router", "loop");
        assert!(decision.route(&AgentId::EXECUTORS).is_err());
    }

    #[test]
    fn done_with_target_is_malformed() {
        let decision = RoutingDecision {
            next_agent: Some("support".into()),
            done: true,
            reason: String::new(),
        };
        let err = decision.route(&AgentId::EXECUTORS).unwrap_err();
        assert!(matches!(err, ProtocolViolation::MalformedDecision { .. }));
    }

    #[test]
    fn not_done_without_target_is_malformed() {
        let decision = RoutingDecision {
            next_agent: Some("  ".into()),
            done: false,
            reason: String::new(),
        };
        assert!(decision.check_well_formed().is_err());
    }

    #[test]
    fn history_entry_serializes_agent_as_snake_case() {
        let record = IterationRecord {
            iteration: 1,
            agent: AgentId::CustomerData,
            input: "Get customer 5".into(),
            output: "Alice".into(),
            succeeded: true,
        };
        let json = serde_json::to_value(record.to_history_entry()).unwrap();
        assert_eq!(json["agent"], "customer_data");
        assert_eq!(json["succeeded"], true);
        assert!(json.get("input").is_none());
    }

    #[test]
    fn generated_thread_ids_are_distinct() {
        assert_ne!(ThreadId::generate(), ThreadId::generate());
    }
}
