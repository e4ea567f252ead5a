//! Client side of the Model Context Protocol tool server.
//!
//! Executors reach the customer database only through these tools:
//! `get_customer`, `list_customers`, `add_customer`, `update_customer`,
//! `create_ticket`, `get_customer_history`, and `fallback_sql`.

mod client;
mod protocol;

pub use client::{HttpMcpClient, McpClient};
pub use protocol::{
    JsonRpcRequest, JsonRpcResponse, McpToolDefinition, ToolCallResult, ToolOutcome,
    decode_response,
};
