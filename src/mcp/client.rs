use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use super::protocol::*;
use crate::error::McpError;

const SESSION_HEADER: &str = "mcp-session-id";

/// Trait for communicating with an MCP tool server.
#[async_trait]
pub trait McpClient: Send + Sync {
    /// List available tools from this server.
    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError>;

    /// Call a tool on this server.
    ///
    /// A tool that ran and reported failure is `Ok` with
    /// [`ToolOutcome::is_error`] set; `Err` means the call itself failed.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutcome, McpError>;
}

/// MCP client speaking JSON-RPC over streamable HTTP.
///
/// The initialize handshake runs lazily before the first request. Clones share
/// the connection pool, the id counter, and the session.
#[derive(Clone)]
pub struct HttpMcpClient {
    http: reqwest::Client,
    endpoint: String,
    next_id: Arc<AtomicU64>,
    session_id: Arc<Mutex<Option<String>>>,
    initialized: Arc<OnceCell<()>>,
}

impl HttpMcpClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, McpError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            next_id: Arc::new(AtomicU64::new(1)),
            session_id: Arc::new(Mutex::new(None)),
            initialized: Arc::new(OnceCell::new()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn ensure_initialized(&self) -> Result<(), McpError> {
        self.initialized
            .get_or_try_init(|| self.initialize())
            .await
            .map(|_| ())
    }

    /// Perform the MCP initialize handshake.
    async fn initialize(&self) -> Result<(), McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ClientCapabilities {},
            client_info: ClientInfo {
                name: "switchboard".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };

        let response = self
            .send_request("initialize", Some(serde_json::to_value(&params)?))
            .await?;
        debug!(endpoint = %self.endpoint, response = %response, "MCP server initialized");

        self.send_notification("notifications/initialized").await
    }

    /// Send a JSON-RPC request and wait for the matching response.
    async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&request);
        if let Some(session) = self.session_id.lock().await.as_deref() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("{method}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(McpError::Transport(format!("{method}: HTTP {status}")));
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().await = Some(session.to_string());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| McpError::Transport(format!("{method}: failed to read body: {e}")))?;

        decode_response(&content_type, &body)?.into_result(id)
    }

    /// Send a JSON-RPC notification. The server answers 202 with no body.
    async fn send_notification(&self, method: &str) -> Result<(), McpError> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&JsonRpcNotification::new(method));
        if let Some(session) = self.session_id.lock().await.as_deref() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("{method}: {e}")))?;
        if !response.status().is_success() {
            return Err(McpError::Transport(format!(
                "{method}: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl McpClient for HttpMcpClient {
    async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        self.ensure_initialized().await?;
        let result = self.send_request("tools/list", None).await?;
        let list: ToolListResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<ToolOutcome, McpError> {
        self.ensure_initialized().await?;
        let params = ToolCallParams {
            name: name.to_string(),
            arguments,
        };
        let result = self
            .send_request("tools/call", Some(serde_json::to_value(&params)?))
            .await?;
        let result: ToolCallResult = serde_json::from_value(result)?;
        Ok(result.into_outcome())
    }
}
