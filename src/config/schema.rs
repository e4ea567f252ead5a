use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::orchestration::types::AgentId;

pub const DEFAULT_MCP_HOST: &str = "localhost";
pub const DEFAULT_MCP_PORT: u16 = 8001;
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SQL_MODEL: &str = "gpt-3.5-turbo";

/// The TOML file structure for switchboard.toml.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    pub orchestration: Option<OrchestrationConfig>,
    pub mcp: Option<McpConfig>,
    pub models: Option<ModelsConfig>,
    pub agents: Option<AgentsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize)]
pub struct OrchestrationConfig {
    pub max_iterations: Option<usize>,
    pub decision_retries: Option<u32>,
    pub query_timeout_secs: Option<u64>,
}

/// Either a full `url`, or `host`/`port` to build `http://{host}:{port}/mcp`.
#[derive(Debug, Deserialize)]
pub struct McpConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct ModelsConfig {
    pub router: Option<String>,
    pub customer_data: Option<String>,
    pub support: Option<String>,
    pub sql: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgentsConfig {
    pub memory_turns: Option<usize>,
    pub max_tool_rounds: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub log_dir: Option<String>,
}

/// Model name per agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelConfig {
    pub router: String,
    pub customer_data: String,
    pub support: String,
    pub sql: String,
}

impl ModelConfig {
    pub fn for_agent(&self, agent: AgentId) -> &str {
        match agent {
            AgentId::Router => &self.router,
            AgentId::CustomerData => &self.customer_data,
            AgentId::Support => &self.support,
            AgentId::Sql => &self.sql,
        }
    }
}

/// Fully-resolved runtime configuration. All fields have values.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub max_iterations: usize,
    pub decision_retries: u32,
    pub query_timeout_secs: u64,
    pub mcp_url: String,
    pub models: ModelConfig,
    pub memory_turns: usize,
    pub max_tool_rounds: usize,
    pub log_dir: PathBuf,
}

/// Partial config used during merge. All fields are Option so that
/// missing fields don't override lower-priority values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialConfig {
    pub max_iterations: Option<usize>,
    pub decision_retries: Option<u32>,
    pub query_timeout_secs: Option<u64>,
    pub mcp_url: Option<String>,
    pub router_model: Option<String>,
    pub customer_data_model: Option<String>,
    pub support_model: Option<String>,
    pub sql_model: Option<String>,
    pub memory_turns: Option<usize>,
    pub max_tool_rounds: Option<usize>,
    pub log_dir: Option<PathBuf>,
}

/// Build an MCP endpoint from host/port parts, if either is given.
pub fn mcp_url_from_parts(host: Option<&str>, port: Option<u16>) -> Option<String> {
    if host.is_none() && port.is_none() {
        return None;
    }
    Some(format!(
        "http://{}:{}/mcp",
        host.unwrap_or(DEFAULT_MCP_HOST),
        port.unwrap_or(DEFAULT_MCP_PORT)
    ))
}

impl ConfigFile {
    pub fn to_partial(self) -> PartialConfig {
        let orchestration = self.orchestration;
        let models = self.models;
        let agents = self.agents;

        let mcp_url = self.mcp.and_then(|mcp| {
            mcp.url
                .or_else(|| mcp_url_from_parts(mcp.host.as_deref(), mcp.port))
        });

        PartialConfig {
            max_iterations: orchestration.as_ref().and_then(|o| o.max_iterations),
            decision_retries: orchestration.as_ref().and_then(|o| o.decision_retries),
            query_timeout_secs: orchestration.as_ref().and_then(|o| o.query_timeout_secs),
            mcp_url,
            router_model: models.as_ref().and_then(|m| m.router.clone()),
            customer_data_model: models.as_ref().and_then(|m| m.customer_data.clone()),
            support_model: models.as_ref().and_then(|m| m.support.clone()),
            sql_model: models.as_ref().and_then(|m| m.sql.clone()),
            memory_turns: agents.as_ref().and_then(|a| a.memory_turns),
            max_tool_rounds: agents.as_ref().and_then(|a| a.max_tool_rounds),
            log_dir: self.logging.and_then(|l| l.log_dir).map(PathBuf::from),
        }
    }
}
