//! Decision function seam.
//!
//! The router is a non-deterministic remote reasoning service, so the
//! supervisor only ever talks to it through [`DecisionFunction`]. Production
//! wiring uses [`crate::agent::router::LlmRouter`]; tests substitute scripted
//! stubs.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;

use super::types::{AgentId, ContinuityToken, HistoryEntry, IterationRecord, RoutingDecision};
use crate::error::DecisionError;

/// Everything the router sees for one decision round.
#[derive(Clone, Copy, Debug)]
pub struct DecisionRequest<'a> {
    pub query: &'a str,
    pub history: &'a [IterationRecord],
    /// Continuity token of the router's own session on this thread.
    pub session: &'a ContinuityToken,
    /// Executors the supervisor will accept as `next_agent`.
    pub agents: &'a [AgentId],
}

/// Wire form of a decision request: `{query, history: [{agent, output, succeeded}]}`.
#[derive(Debug, Serialize)]
pub struct DecisionPayload {
    pub query: String,
    pub history: Vec<HistoryEntry>,
}

impl DecisionRequest<'_> {
    pub fn to_payload(&self) -> DecisionPayload {
        DecisionPayload {
            query: self.query.to_string(),
            history: self
                .history
                .iter()
                .map(IterationRecord::to_history_entry)
                .collect(),
        }
    }
}

/// Produces one [`RoutingDecision`] per supervisor iteration.
#[async_trait]
pub trait DecisionFunction: Send + Sync {
    async fn decide(&self, request: DecisionRequest<'_>) -> Result<RoutingDecision, DecisionError>;
}

/// Flat JSON objects, allowing one level of nesting.
static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").expect("decision pattern compiles")
});

/// Parse raw router output into a well-formed [`RoutingDecision`].
///
/// The router is asked for a bare JSON object but models routinely wrap it in
/// prose or code fences. Every JSON-object-shaped span is tried in order; the
/// first one that deserializes wins. Free text is never interpreted.
pub fn parse_decision(raw: &str) -> Result<RoutingDecision, DecisionError> {
    let malformed = |reason: String| DecisionError::Malformed {
        raw: raw.to_string(),
        reason,
    };

    if raw.trim().is_empty() {
        return Err(malformed("empty response".to_string()));
    }

    let mut last_error = None;
    let mut decision = None;
    for candidate in JSON_OBJECT.find_iter(raw) {
        let value: serde_json::Value = match serde_json::from_str(candidate.as_str()) {
            Ok(v) => v,
            Err(e) => {
                last_error = Some(e.to_string());
                continue;
            }
        };
        let is_decision = value
            .as_object()
            .is_some_and(|o| o.contains_key("done") || o.contains_key("next_agent"));
        if !is_decision {
            continue;
        }
        match serde_json::from_value::<RoutingDecision>(value) {
            Ok(parsed) => {
                decision = Some(parsed);
                break;
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    let mut decision = match decision {
        Some(d) => d,
        None => {
            return Err(malformed(
                last_error.unwrap_or_else(|| "no JSON object found".to_string()),
            ));
        }
    };

    if decision
        .next_agent
        .as_deref()
        .is_some_and(|a| matches!(a.trim().to_ascii_lowercase().as_str(), "" | "null" | "none"))
    {
        decision.next_agent = None;
    }

    decision.check_well_formed().map_err(malformed)?;
    Ok(decision)
}
