use super::schema::{
    AppConfig, DEFAULT_MCP_HOST, DEFAULT_MCP_PORT, DEFAULT_MODEL, DEFAULT_SQL_MODEL, ModelConfig,
    PartialConfig,
};
use crate::agent::executor::DEFAULT_MAX_TOOL_ROUNDS;
use crate::agent::memory::DEFAULT_MEMORY_TURNS;
use crate::error::ConfigError;
use crate::orchestration::supervisor::{
    DEFAULT_DECISION_RETRIES, DEFAULT_MAX_ITERATIONS, MAX_DECISION_RETRIES,
};
use std::path::PathBuf;

pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LOG_DIR: &str = "./.switchboard-logs";

impl PartialConfig {
    /// Merge self with a lower-priority fallback.
    /// Self's non-None values take precedence.
    pub fn with_fallback(self, fallback: PartialConfig) -> PartialConfig {
        PartialConfig {
            max_iterations: self.max_iterations.or(fallback.max_iterations),
            decision_retries: self.decision_retries.or(fallback.decision_retries),
            query_timeout_secs: self.query_timeout_secs.or(fallback.query_timeout_secs),
            mcp_url: self.mcp_url.or(fallback.mcp_url),
            router_model: self.router_model.or(fallback.router_model),
            customer_data_model: self.customer_data_model.or(fallback.customer_data_model),
            support_model: self.support_model.or(fallback.support_model),
            sql_model: self.sql_model.or(fallback.sql_model),
            memory_turns: self.memory_turns.or(fallback.memory_turns),
            max_tool_rounds: self.max_tool_rounds.or(fallback.max_tool_rounds),
            log_dir: self.log_dir.or(fallback.log_dir),
        }
    }

    /// Convert to AppConfig, filling any remaining gaps with defaults.
    pub fn finalize(self) -> Result<AppConfig, ConfigError> {
        let max_iterations = self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        if max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }

        let decision_retries = self.decision_retries.unwrap_or(DEFAULT_DECISION_RETRIES);
        if decision_retries > MAX_DECISION_RETRIES {
            return Err(invalid(
                "decision_retries",
                &format!("at most {MAX_DECISION_RETRIES} retry is allowed, got {decision_retries}"),
            ));
        }

        let query_timeout_secs = self.query_timeout_secs.unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);
        if query_timeout_secs == 0 {
            return Err(invalid("query_timeout_secs", "must be at least 1"));
        }

        let mcp_url = self
            .mcp_url
            .unwrap_or_else(|| format!("http://{DEFAULT_MCP_HOST}:{DEFAULT_MCP_PORT}/mcp"));
        if !(mcp_url.starts_with("http://") || mcp_url.starts_with("https://")) {
            return Err(invalid("mcp_url", &format!("expected an http(s) URL, got '{mcp_url}'")));
        }

        Ok(AppConfig {
            max_iterations,
            decision_retries,
            query_timeout_secs,
            mcp_url,
            models: ModelConfig {
                router: self.router_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                customer_data: self
                    .customer_data_model
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                support: self.support_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                sql: self.sql_model.unwrap_or_else(|| DEFAULT_SQL_MODEL.to_string()),
            },
            memory_turns: self.memory_turns.unwrap_or(DEFAULT_MEMORY_TURNS),
            max_tool_rounds: self.max_tool_rounds.unwrap_or(DEFAULT_MAX_TOOL_ROUNDS),
            log_dir: self.log_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
        })
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
