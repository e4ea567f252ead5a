//! Wiring: builds the supervisor and its LLM-backed agents from configuration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::agent::{ChatModel, ConversationMemory, LlmExecutor, LlmRouter};
use crate::config::AppConfig;
use crate::error::QueryFailure;
use crate::mcp::McpClient;
use crate::orchestration::{
    AgentId, FinalResponse, InMemorySessionStore, Supervisor, SupervisorEvent, ThreadId,
};

/// A configured supervisor plus the handles the front end needs.
pub struct App {
    pub config: AppConfig,
    pub supervisor: Supervisor,
    pub sessions: InMemorySessionStore,
    pub mcp: Arc<dyn McpClient>,
}

impl App {
    /// Register the router and every executor against one chat backend and
    /// one tool server. All agents share one memory store, keyed by their
    /// continuity tokens.
    pub fn new(
        config: AppConfig,
        chat: Arc<dyn ChatModel>,
        mcp: Arc<dyn McpClient>,
        event_tx: Option<UnboundedSender<SupervisorEvent>>,
    ) -> Self {
        let memory = ConversationMemory::new(config.memory_turns);
        let sessions = InMemorySessionStore::new();

        let router = LlmRouter::new(config.models.router.clone(), chat.clone(), memory.clone());
        let mut supervisor = Supervisor::new(Arc::new(router), Arc::new(sessions.clone()))
            .with_max_iterations(config.max_iterations)
            .with_decision_retries(config.decision_retries);

        for agent in AgentId::EXECUTORS {
            let executor = LlmExecutor::new(
                agent,
                config.models.for_agent(agent),
                chat.clone(),
                mcp.clone(),
                memory.clone(),
            )
            .with_max_tool_rounds(config.max_tool_rounds);
            supervisor = supervisor.with_executor(Arc::new(executor));
        }

        if let Some(tx) = event_tx {
            supervisor = supervisor.with_events(tx);
        }

        tracing::info!(
            router_model = %config.models.router,
            mcp_url = %config.mcp_url,
            max_iterations = config.max_iterations,
            agents = supervisor.registered_agents().len(),
            "Supervisor ready"
        );

        Self {
            config,
            supervisor,
            sessions,
            mcp,
        }
    }

    /// Run one query under the configured timeout.
    pub async fn ask(&self, query: &str, thread: &ThreadId) -> Result<FinalResponse, QueryFailure> {
        self.supervisor
            .process_query_with_timeout(
                query,
                thread,
                Duration::from_secs(self.config.query_timeout_secs),
            )
            .await
    }
}
