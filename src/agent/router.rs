//! LLM-backed decision function.

use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatRequest};

use super::memory::ConversationMemory;
use super::model::ChatModel;
use super::prompts::router_prompt;
use crate::error::DecisionError;
use crate::orchestration::context::render_router_prompt;
use crate::orchestration::decision::{DecisionFunction, DecisionRequest, parse_decision};
use crate::orchestration::types::RoutingDecision;

/// Routes queries by asking a chat model for a JSON decision.
///
/// Model failures are transport errors; replies that do not contain a
/// well-formed decision are malformed. Each accepted decision is remembered
/// under the router's continuity token for the thread.
pub struct LlmRouter {
    model: String,
    chat: Arc<dyn ChatModel>,
    memory: ConversationMemory,
}

impl LlmRouter {
    pub fn new(model: impl Into<String>, chat: Arc<dyn ChatModel>, memory: ConversationMemory) -> Self {
        Self {
            model: model.into(),
            chat,
            memory,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl DecisionFunction for LlmRouter {
    async fn decide(&self, request: DecisionRequest<'_>) -> Result<RoutingDecision, DecisionError> {
        let prompt = render_router_prompt(request.query, request.history);

        let mut chat_req = ChatRequest::from_system(router_prompt(request.agents));
        for message in self.memory.messages(request.session) {
            chat_req = chat_req.append_message(message);
        }
        chat_req = chat_req.append_message(ChatMessage::user(prompt.clone()));

        let turn = self
            .chat
            .complete(&self.model, chat_req)
            .await
            .map_err(|e| DecisionError::Transport(e.to_string()))?;

        let raw = turn.text.unwrap_or_default();
        tracing::debug!(model = %self.model, raw = %raw, "Router replied");

        let decision = parse_decision(&raw)?;
        self.memory.record(request.session, &prompt, &raw);
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::model::ModelTurn;
    use crate::error::ModelError;
    use crate::orchestration::types::{AgentId, ContinuityToken};
    use std::sync::Mutex;

    /// Replies with canned text and counts calls.
    struct Canned {
        reply: Result<String, String>,
        calls: Mutex<usize>,
    }

    impl Canned {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(0),
            }
        }

        fn err(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for Canned {
        async fn complete(&self, _model: &str, _request: ChatRequest) -> Result<ModelTurn, ModelError> {
            *self.calls.lock().unwrap() += 1;
            match &self.reply {
                Ok(text) => Ok(ModelTurn {
                    text: Some(text.clone()),
                    tool_calls: Vec::new(),
                }),
                Err(e) => Err(ModelError(e.clone())),
            }
        }
    }

    fn request<'a>(session: &'a ContinuityToken) -> DecisionRequest<'a> {
        DecisionRequest {
            query: "Get customer 5",
            history: &[],
            session,
            agents: &AgentId::EXECUTORS,
        }
    }

    #[tokio::test]
    async fn valid_reply_is_parsed_and_remembered() {
        let memory = ConversationMemory::default();
        let router = LlmRouter::new(
            "gpt-4o-mini",
            Arc::new(Canned::ok(r#"{"next_agent": "customer_data", "done": false, "reason": "Need customer info"}"#)),
            memory.clone(),
        );
        let session = ContinuityToken::new("t:router:1");

        let decision = router.decide(request(&session)).await.unwrap();

        assert_eq!(decision.next_agent.as_deref(), Some("customer_data"));
        assert_eq!(memory.exchanges(&session).len(), 1);
    }

    #[tokio::test]
    async fn model_failure_is_transport() {
        let router = LlmRouter::new("m", Arc::new(Canned::err("429 Too Many Requests")), ConversationMemory::default());
        let session = ContinuityToken::new("s");
        let err = router.decide(request(&session)).await.unwrap_err();
        assert!(matches!(err, DecisionError::Transport(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn prose_reply_is_malformed_and_not_remembered() {
        let memory = ConversationMemory::default();
        let router = LlmRouter::new("m", Arc::new(Canned::ok("Let the support agent handle it.")), memory.clone());
        let session = ContinuityToken::new("s");

        let err = router.decide(request(&session)).await.unwrap_err();

        assert!(matches!(err, DecisionError::Malformed { .. }));
        assert!(memory.exchanges(&session).is_empty());
    }
}
