//! LLM-backed implementations of the orchestration seams, plus the run log.

pub mod executor;
pub mod logging;
pub mod memory;
pub mod model;
pub mod prompts;
pub mod router;
pub mod tools;

pub use executor::LlmExecutor;
pub use memory::ConversationMemory;
pub use model::{ChatModel, GenaiChat, ModelTurn};
pub use router::LlmRouter;
