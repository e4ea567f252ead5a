use serde::{Deserialize, Serialize};

use crate::error::McpError;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request for MCP protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no id, no response expected).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcNotification {
    pub fn new(method: &str) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC 2.0 response from MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Unwrap the result of a response to request `expected_id`.
    pub fn into_result(self, expected_id: u64) -> Result<serde_json::Value, McpError> {
        if let Some(err) = self.error {
            return Err(McpError::Protocol(format!(
                "JSON-RPC error {}: {}",
                err.code, err.message
            )));
        }
        if self.id != Some(expected_id) {
            return Err(McpError::Protocol(format!(
                "response id {:?} does not match request id {expected_id}",
                self.id
            )));
        }
        Ok(self.result.unwrap_or(serde_json::Value::Null))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// MCP tool definition as returned by tools/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_schema")]
    pub input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object"})
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolListResult {
    #[serde(default)]
    pub tools: Vec<McpToolDefinition>,
}

/// MCP initialize request params.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

#[derive(Debug, Serialize)]
pub struct ClientCapabilities {}

#[derive(Debug, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// MCP tools/call request params.
#[derive(Debug, Serialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// MCP tools/call result content.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Concatenate the text parts of the result.
    pub fn into_outcome(self) -> ToolOutcome {
        let text = self
            .content
            .into_iter()
            .filter(|part| part.content_type == "text")
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n");
        ToolOutcome {
            text,
            is_error: self.is_error,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Text a tool produced, and whether the server flagged it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
    pub is_error: bool,
}

/// Decode a streamable-HTTP response body.
///
/// Servers may answer with plain JSON or with a server-sent-event stream whose
/// `data:` lines carry JSON-RPC messages. For SSE, the first message that
/// parses as a response is returned.
pub fn decode_response(content_type: &str, body: &str) -> Result<JsonRpcResponse, McpError> {
    if !content_type.starts_with("text/event-stream") {
        return Ok(serde_json::from_str(body)?);
    }

    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .find_map(|data| serde_json::from_str::<JsonRpcResponse>(data).ok())
        .ok_or_else(|| McpError::Protocol("event stream carried no JSON-RPC response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_definition_reads_camel_case_schema() {
        let def: McpToolDefinition = serde_json::from_str(
            r#"{"name": "get_customer_tool", "description": "Get one", "inputSchema": {"type": "object", "properties": {"customer_id": {"type": "integer"}}}}"#,
        )
        .unwrap();
        assert_eq!(def.name, "get_customer_tool");
        assert_eq!(def.input_schema["properties"]["customer_id"]["type"], "integer");
    }

    #[test]
    fn tool_definition_defaults_schema() {
        let def: McpToolDefinition = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(def.input_schema, serde_json::json!({"type": "object"}));
        assert!(def.description.is_empty());
    }

    #[test]
    fn call_result_joins_text_parts() {
        let result: ToolCallResult = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "a"}, {"type": "image"}, {"type": "text", "text": "b"}], "isError": true}"#,
        )
        .unwrap();
        let outcome = result.into_outcome();
        assert_eq!(outcome.text, "a\nb");
        assert!(outcome.is_error);
    }

    #[test]
    fn mismatched_id_is_a_protocol_error() {
        let resp = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: Some(7),
            result: Some(serde_json::json!({})),
            error: None,
        };
        assert!(matches!(resp.into_result(8), Err(McpError::Protocol(_))));
    }

    #[test]
    fn rpc_error_is_surfaced() {
        let resp: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "Unknown tool"}}"#,
        )
        .unwrap();
        let err = resp.into_result(1).unwrap_err();
        assert!(err.to_string().contains("Unknown tool"));
    }

    #[test]
    fn decodes_plain_json_body() {
        let resp = decode_response(
            "application/json",
            r#"{"jsonrpc": "2.0", "id": 3, "result": {"tools": []}}"#,
        )
        .unwrap();
        assert_eq!(resp.id, Some(3));
    }

    #[test]
    fn decodes_event_stream_body() {
        let body = "event: message\ndata: {\"jsonrpc\": \"2.0\", \"id\": 2, \"result\": {\"ok\": true}}\n\n";
        let resp = decode_response("text/event-stream; charset=utf-8", body).unwrap();
        assert_eq!(resp.into_result(2).unwrap()["ok"], true);
    }

    #[test]
    fn empty_event_stream_is_an_error() {
        assert!(decode_response("text/event-stream", "event: ping\n\n").is_err());
    }
}
