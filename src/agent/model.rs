//! Chat model seam.
//!
//! Agents build a [`ChatRequest`] and hand it to a [`ChatModel`]; production
//! uses [`GenaiChat`], tests script the turns.

use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatRequest, ToolCall};

use crate::error::ModelError;

/// One model reply: optional text and any tool calls it requested.
#[derive(Debug, Clone, Default)]
pub struct ModelTurn {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, model: &str, request: ChatRequest) -> Result<ModelTurn, ModelError>;
}

/// [`ChatModel`] backed by the genai multi-provider client.
///
/// The provider is picked from the model name (`gpt-*` goes to OpenAI and
/// reads `OPENAI_API_KEY`).
#[derive(Clone, Default)]
pub struct GenaiChat {
    client: Client,
}

impl GenaiChat {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatModel for GenaiChat {
    async fn complete(&self, model: &str, request: ChatRequest) -> Result<ModelTurn, ModelError> {
        let response = self
            .client
            .exec_chat(model, request, None)
            .await
            .map_err(|e| ModelError(e.to_string()))?;

        Ok(ModelTurn {
            text: response.first_text().map(str::to_string),
            tool_calls: response.tool_calls().into_iter().cloned().collect(),
        })
    }
}
