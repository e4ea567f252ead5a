use std::path::PathBuf;
use std::time::Duration;

use crate::orchestration::types::IterationRecord;

/// Errors related to configuration loading and parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by a session store backing.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned by a decision function (the router).
///
/// Transport failures and malformed payloads are kept apart: only the former
/// are retried by the supervisor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecisionError {
    #[error("Decision call failed: {0}")]
    Transport(String),

    #[error("Malformed routing decision ({reason}): {raw}")]
    Malformed { raw: String, reason: String },
}

/// Errors returned by an executor agent.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecutorError {
    /// The call could not complete (network, model provider, tool server).
    #[error("Executor call failed: {0}")]
    Transport(String),

    /// The executor ran but the requested operation failed.
    #[error("{0}")]
    Domain(String),
}

/// A chat model call failed before producing a turn.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Model call failed: {0}")]
pub struct ModelError(pub String);

/// The router broke the routing contract.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("Router selected unknown agent `{agent}` (registered: {registered})")]
    UnknownAgent { agent: String, registered: String },

    #[error("Router returned a malformed decision ({reason}): {raw}")]
    MalformedDecision { raw: String, reason: String },
}

/// Unrecoverable failures of one `process_query` invocation.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Routing failed after {attempts} attempt(s): {source}")]
    RoutingFailure {
        attempts: u32,
        #[source]
        source: DecisionError,
    },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),

    #[error("Session lookup failed: {0}")]
    Session(#[from] SessionError),

    #[error("Query timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
}

impl SupervisorError {
    /// Whether this failure is an infrastructure fault ("system error") rather
    /// than the router being unable to complete the request.
    pub fn is_system_error(&self) -> bool {
        !matches!(self, SupervisorError::ProtocolViolation(_))
    }
}

/// A failed query together with the iteration records produced before the
/// failure, kept for diagnostics.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct QueryFailure {
    #[source]
    pub error: SupervisorError,
    pub records: Vec<IterationRecord>,
}

/// Errors from the MCP tool client.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
