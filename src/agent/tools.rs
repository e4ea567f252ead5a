//! Per-agent tool selection and conversion of MCP tool definitions to
//! [`genai::chat::Tool`] schemas.
//!
//! Tool servers may suffix their tool names (`get_customer_tool`), so a tool
//! matches an agent when its name equals an allowed base name with or without
//! the `_tool` suffix.

use genai::chat::Tool;

use crate::mcp::{McpToolDefinition, ToolOutcome};
use crate::orchestration::types::AgentId;

/// Base names of the tools each executor may call.
pub fn allowed_tools(agent: AgentId) -> &'static [&'static str] {
    match agent {
        AgentId::CustomerData => &["get_customer", "list_customers", "add_customer", "update_customer"],
        AgentId::Support => &["create_ticket", "get_customer_history"],
        AgentId::Sql => &["fallback_sql"],
        AgentId::Router => &[],
    }
}

/// Whether `name` is one of `agent`'s tools.
pub fn is_allowed(agent: AgentId, name: &str) -> bool {
    let base = name.strip_suffix("_tool").unwrap_or(name);
    allowed_tools(agent).contains(&base)
}

/// The subset of `defs` that `agent` may call, in server order.
pub fn select_tools(agent: AgentId, defs: &[McpToolDefinition]) -> Vec<McpToolDefinition> {
    defs.iter()
        .filter(|d| is_allowed(agent, &d.name))
        .cloned()
        .collect()
}

pub fn to_genai_tool(def: &McpToolDefinition) -> Tool {
    Tool::new(def.name.clone())
        .with_description(def.description.clone())
        .with_schema(def.input_schema.clone())
}

/// Error text if the tool reported failure.
///
/// Covers both the protocol-level `isError` flag and the database tools'
/// `{"success": false, "error": ...}` payloads.
pub fn tool_failure(outcome: &ToolOutcome) -> Option<String> {
    if outcome.is_error {
        return Some(outcome.text.clone());
    }
    let value: serde_json::Value = serde_json::from_str(&outcome.text).ok()?;
    if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
        let message = value
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("tool reported failure");
        return Some(message.to_string());
    }
    None
}
