//! LLM-backed executor with MCP tool calling.
//!
//! Each execution is a bounded tool loop: the model either answers in text or
//! requests tool calls, which are dispatched to the MCP server and fed back as
//! tool responses. Tool failures are observations for the model, not errors;
//! only when every tool call of the execution failed does the final answer
//! become an [`ExecutorError::Domain`].

use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatRequest, ToolCall, ToolResponse};
use serde_json::json;
use tokio::sync::OnceCell;

use super::memory::ConversationMemory;
use super::model::ChatModel;
use super::prompts::executor_prompt;
use super::tools::{is_allowed, select_tools, to_genai_tool, tool_failure};
use crate::error::{ExecutorError, McpError};
use crate::mcp::{McpClient, McpToolDefinition};
use crate::orchestration::context::truncate_chars;
use crate::orchestration::executor::{ExecutionRequest, Executor};
use crate::orchestration::types::AgentId;

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

const NO_RESPONSE: &str = "No response received from agent.";

pub struct LlmExecutor {
    agent: AgentId,
    model: String,
    chat: Arc<dyn ChatModel>,
    mcp: Arc<dyn McpClient>,
    memory: ConversationMemory,
    max_tool_rounds: usize,
    tools: OnceCell<Vec<McpToolDefinition>>,
}

/// Tool call bookkeeping for one execution.
#[derive(Default)]
struct ToolTally {
    calls: usize,
    failures: usize,
    last_failure: Option<String>,
}

impl ToolTally {
    fn all_failed(&self) -> bool {
        self.calls > 0 && self.failures == self.calls
    }
}

impl LlmExecutor {
    pub fn new(
        agent: AgentId,
        model: impl Into<String>,
        chat: Arc<dyn ChatModel>,
        mcp: Arc<dyn McpClient>,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            agent,
            model: model.into(),
            chat,
            mcp,
            memory,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            tools: OnceCell::new(),
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// This agent's tools, discovered from the server on first use.
    async fn tools(&self) -> Result<&[McpToolDefinition], ExecutorError> {
        let tools = self
            .tools
            .get_or_try_init(|| async {
                let all = self.mcp.list_tools().await?;
                let selected = select_tools(self.agent, &all);
                tracing::info!(
                    agent = %self.agent,
                    available = all.len(),
                    selected = selected.len(),
                    "Discovered MCP tools"
                );
                Ok::<_, McpError>(selected)
            })
            .await
            .map_err(|e| ExecutorError::Transport(format!("tool discovery failed: {e}")))?;
        Ok(tools.as_slice())
    }

    /// Dispatch one tool call, returning the text fed back to the model.
    async fn dispatch(&self, call: &ToolCall, tally: &mut ToolTally) -> Result<String, ExecutorError> {
        tally.calls += 1;

        if !is_allowed(self.agent, &call.fn_name) {
            tally.failures += 1;
            let message = format!("Tool not available to {}: {}", self.agent, call.fn_name);
            tally.last_failure = Some(message.clone());
            return Ok(json!({"error": message}).to_string());
        }

        let args_summary = serde_json::to_string(&call.fn_arguments).unwrap_or_else(|_| "{}".to_string());
        tracing::debug!(
            agent = %self.agent,
            tool = %call.fn_name,
            args = %truncate_chars(&args_summary, 100),
            "Calling tool"
        );

        match self.mcp.call_tool(&call.fn_name, call.fn_arguments.clone()).await {
            Ok(outcome) => {
                if let Some(failure) = tool_failure(&outcome) {
                    tracing::debug!(agent = %self.agent, tool = %call.fn_name, error = %failure, "Tool reported failure");
                    tally.failures += 1;
                    tally.last_failure = Some(failure);
                }
                Ok(outcome.text)
            }
            Err(McpError::Transport(e)) => Err(ExecutorError::Transport(format!("{}: {e}", call.fn_name))),
            Err(e) => {
                tally.failures += 1;
                tally.last_failure = Some(e.to_string());
                Ok(json!({"error": e.to_string()}).to_string())
            }
        }
    }
}

#[async_trait]
impl Executor for LlmExecutor {
    fn id(&self) -> AgentId {
        self.agent
    }

    async fn execute(&self, request: ExecutionRequest<'_>) -> Result<String, ExecutorError> {
        let tools = self.tools().await?;

        let mut chat_req = ChatRequest::from_system(executor_prompt(self.agent));
        if !tools.is_empty() {
            chat_req = chat_req.with_tools(tools.iter().map(to_genai_tool).collect::<Vec<_>>());
        }
        for message in self.memory.messages(request.session) {
            chat_req = chat_req.append_message(message);
        }
        chat_req = chat_req.append_message(ChatMessage::user(request.input.to_string()));

        let mut tally = ToolTally::default();

        for round in 0..=self.max_tool_rounds {
            let turn = self
                .chat
                .complete(&self.model, chat_req.clone())
                .await
                .map_err(|e| ExecutorError::Transport(e.to_string()))?;

            if turn.tool_calls.is_empty() {
                let text = turn.text.unwrap_or_default().trim().to_string();

                if tally.all_failed() {
                    let reason = if text.is_empty() {
                        tally.last_failure.unwrap_or_else(|| NO_RESPONSE.to_string())
                    } else {
                        text
                    };
                    return Err(ExecutorError::Domain(reason));
                }

                let text = if text.is_empty() { NO_RESPONSE.to_string() } else { text };
                self.memory.record(request.session, request.input, &text);
                return Ok(text);
            }

            if round == self.max_tool_rounds {
                break;
            }

            chat_req = chat_req.append_message(ChatMessage::from(turn.tool_calls.clone()));
            for call in &turn.tool_calls {
                let content = self.dispatch(call, &mut tally).await?;
                chat_req = chat_req.append_message(ToolResponse::new(call.call_id.clone(), content));
            }
        }

        tracing::warn!(agent = %self.agent, rounds = self.max_tool_rounds, "Tool rounds exhausted");
        Err(ExecutorError::Domain(format!(
            "{} did not finish within {} tool rounds",
            self.agent.display_name(),
            self.max_tool_rounds
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::model::ModelTurn;
    use crate::error::ModelError;
    use crate::mcp::ToolOutcome;
    use crate::orchestration::types::ContinuityToken;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
        serde_json::from_value(json!({"call_id": id, "fn_name": name, "fn_arguments": args})).unwrap()
    }

    /// Plays back a fixed list of model turns.
    struct Script {
        turns: Mutex<VecDeque<Result<ModelTurn, ModelError>>>,
    }

    impl Script {
        fn new(turns: Vec<Result<ModelTurn, ModelError>>) -> Self {
            Self {
                turns: Mutex::new(turns.into()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for Script {
        async fn complete(&self, _model: &str, _request: ChatRequest) -> Result<ModelTurn, ModelError> {
            self.turns
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError("script exhausted".into())))
        }
    }

    fn text(t: &str) -> Result<ModelTurn, ModelError> {
        Ok(ModelTurn {
            text: Some(t.to_string()),
            tool_calls: Vec::new(),
        })
    }

    fn calls(calls: Vec<ToolCall>) -> Result<ModelTurn, ModelError> {
        Ok(ModelTurn {
            text: None,
            tool_calls: calls,
        })
    }

    /// Tool server with fixed results per tool name.
    struct FakeMcp {
        results: Vec<(&'static str, Result<ToolOutcome, &'static str>)>,
        invoked: Mutex<Vec<String>>,
    }

    impl FakeMcp {
        fn new(results: Vec<(&'static str, Result<ToolOutcome, &'static str>)>) -> Self {
            Self {
                results,
                invoked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl McpClient for FakeMcp {
        async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
            Ok(["get_customer_tool", "create_ticket_tool", "fallback_sql_tool"]
                .into_iter()
                .map(|name| McpToolDefinition {
                    name: name.to_string(),
                    description: String::new(),
                    input_schema: json!({"type": "object"}),
                })
                .collect())
        }

        async fn call_tool(&self, name: &str, _arguments: serde_json::Value) -> Result<ToolOutcome, McpError> {
            self.invoked.lock().unwrap().push(name.to_string());
            match self.results.iter().find(|(n, _)| *n == name) {
                Some((_, Ok(outcome))) => Ok(outcome.clone()),
                Some((_, Err(e))) => Err(McpError::Transport(e.to_string())),
                None => Err(McpError::Protocol(format!("Unknown tool: {name}"))),
            }
        }
    }

    fn ok_outcome(text: &str) -> Result<ToolOutcome, &'static str> {
        Ok(ToolOutcome {
            text: text.to_string(),
            is_error: false,
        })
    }

    fn executor(agent: AgentId, script: Script, mcp: Arc<FakeMcp>, memory: ConversationMemory) -> LlmExecutor {
        LlmExecutor::new(agent, "gpt-4o-mini", Arc::new(script), mcp, memory)
    }

    fn request<'a>(input: &'a str, session: &'a ContinuityToken) -> ExecutionRequest<'a> {
        ExecutionRequest {
            query: input,
            input,
            history: &[],
            session,
        }
    }

    #[tokio::test]
    async fn text_answer_without_tools() {
        let mcp = Arc::new(FakeMcp::new(vec![]));
        let memory = ConversationMemory::default();
        let exec = executor(AgentId::CustomerData, Script::new(vec![text("Hello!")]), mcp, memory.clone());
        let session = ContinuityToken::new("s");

        let out = exec.execute(request("hi", &session)).await.unwrap();

        assert_eq!(out, "Hello!");
        assert_eq!(memory.exchanges(&session).len(), 1);
    }

    #[tokio::test]
    async fn tool_result_feeds_final_answer() {
        let mcp = Arc::new(FakeMcp::new(vec![(
            "get_customer_tool",
            ok_outcome(r#"{"success": true, "customer": {"id": 5, "name": "Alice"}}"#),
        )]));
        let script = Script::new(vec![
            calls(vec![tool_call("c1", "get_customer_tool", json!({"customer_id": 5}))]),
            text("Customer 5 is Alice."),
        ]);
        let exec = executor(AgentId::CustomerData, script, mcp.clone(), ConversationMemory::default());
        let session = ContinuityToken::new("s");

        let out = exec.execute(request("Get customer 5", &session)).await.unwrap();

        assert_eq!(out, "Customer 5 is Alice.");
        assert_eq!(*mcp.invoked.lock().unwrap(), vec!["get_customer_tool"]);
    }

    #[tokio::test]
    async fn every_tool_failing_is_a_domain_error() {
        let mcp = Arc::new(FakeMcp::new(vec![(
            "create_ticket_tool",
            ok_outcome(r#"{"success": false, "error": "Customer not found"}"#),
        )]));
        let script = Script::new(vec![
            calls(vec![tool_call("c1", "create_ticket_tool", json!({"customer_id": 99, "issue": "x"}))]),
            text(""),
        ]);
        let exec = executor(AgentId::Support, script, mcp, ConversationMemory::default());
        let session = ContinuityToken::new("s");

        let err = exec.execute(request("Create ticket for 99", &session)).await.unwrap_err();

        assert!(matches!(err, ExecutorError::Domain(ref m) if m == "Customer not found"));
    }

    #[tokio::test]
    async fn disallowed_tool_is_refused_without_dispatch() {
        let mcp = Arc::new(FakeMcp::new(vec![("fallback_sql_tool", ok_outcome("rows"))]));
        let script = Script::new(vec![
            calls(vec![tool_call("c1", "fallback_sql_tool", json!({"sql_query": "SELECT 1"}))]),
            text("I could not run that."),
        ]);
        let exec = executor(AgentId::Support, script, mcp.clone(), ConversationMemory::default());
        let session = ContinuityToken::new("s");

        let err = exec.execute(request("run sql", &session)).await.unwrap_err();

        assert!(matches!(err, ExecutorError::Domain(_)));
        assert!(mcp.invoked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn tool_transport_failure_is_transport() {
        let mcp = Arc::new(FakeMcp::new(vec![("get_customer_tool", Err("connection refused"))]));
        let script = Script::new(vec![calls(vec![tool_call("c1", "get_customer_tool", json!({"customer_id": 1}))])]);
        let exec = executor(AgentId::CustomerData, script, mcp, ConversationMemory::default());
        let session = ContinuityToken::new("s");

        let err = exec.execute(request("Get customer 1", &session)).await.unwrap_err();

        assert!(matches!(err, ExecutorError::Transport(ref m) if m.contains("connection refused")));
    }

    #[tokio::test]
    async fn model_failure_is_transport() {
        let mcp = Arc::new(FakeMcp::new(vec![]));
        let script = Script::new(vec![Err(ModelError("timeout".into()))]);
        let exec = executor(AgentId::Sql, script, mcp, ConversationMemory::default());
        let session = ContinuityToken::new("s");

        let err = exec.execute(request("count", &session)).await.unwrap_err();
        assert!(matches!(err, ExecutorError::Transport(_)));
    }

    #[tokio::test]
    async fn tool_rounds_are_bounded() {
        let mcp = Arc::new(FakeMcp::new(vec![("fallback_sql_tool", ok_outcome("1 row"))]));
        let loop_turn = || calls(vec![tool_call("c", "fallback_sql_tool", json!({"sql_query": "SELECT 1"}))]);
        let script = Script::new((0..5).map(|_| loop_turn()).collect());
        let exec = executor(AgentId::Sql, script, mcp.clone(), ConversationMemory::default()).with_max_tool_rounds(2);
        let session = ContinuityToken::new("s");

        let err = exec.execute(request("loop", &session)).await.unwrap_err();

        assert!(matches!(err, ExecutorError::Domain(ref m) if m.contains("2 tool rounds")));
        assert_eq!(mcp.invoked.lock().unwrap().len(), 2);
    }
}
