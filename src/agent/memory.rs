//! Per-session conversation memory.
//!
//! A continuity token names one agent's view of one thread; the exchanges
//! stored under it are replayed ahead of each new prompt so that references
//! like "his tickets" resolve against earlier turns.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use genai::chat::ChatMessage;

use crate::orchestration::types::ContinuityToken;

pub const DEFAULT_MEMORY_TURNS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Bounded, token-keyed store of user/assistant exchanges.
///
/// Clones share the same store.
#[derive(Clone)]
pub struct ConversationMemory {
    exchanges: Arc<Mutex<HashMap<ContinuityToken, VecDeque<Exchange>>>>,
    max_turns: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_TURNS)
    }
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            exchanges: Arc::new(Mutex::new(HashMap::new())),
            max_turns,
        }
    }

    /// Append one exchange, evicting the oldest beyond the window.
    pub fn record(&self, token: &ContinuityToken, user: &str, assistant: &str) {
        if self.max_turns == 0 {
            return;
        }
        let mut table = self.exchanges.lock().unwrap_or_else(|e| e.into_inner());
        let window = table.entry(token.clone()).or_default();
        window.push_back(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        while window.len() > self.max_turns {
            window.pop_front();
        }
    }

    pub fn exchanges(&self, token: &ContinuityToken) -> Vec<Exchange> {
        self.exchanges
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(token)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Stored exchanges as alternating user/assistant chat messages.
    pub fn messages(&self, token: &ContinuityToken) -> Vec<ChatMessage> {
        self.exchanges(token)
            .into_iter()
            .flat_map(|e| [ChatMessage::user(e.user), ChatMessage::assistant(e.assistant)])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_token_has_no_history() {
        let memory = ConversationMemory::default();
        assert!(memory.exchanges(&ContinuityToken::new("none")).is_empty());
        assert!(memory.messages(&ContinuityToken::new("none")).is_empty());
    }

    #[test]
    fn window_keeps_most_recent_exchanges() {
        let memory = ConversationMemory::new(2);
        let token = ContinuityToken::new("t:support:1");
        for i in 0..4 {
            memory.record(&token, &format!("q{i}"), &format!("a{i}"));
        }
        let kept = memory.exchanges(&token);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].user, "q2");
        assert_eq!(kept[1].assistant, "a3");
        assert_eq!(memory.messages(&token).len(), 4);
    }

    #[test]
    fn tokens_are_isolated() {
        let memory = ConversationMemory::default();
        let a = ContinuityToken::new("a");
        let b = ContinuityToken::new("b");
        memory.record(&a, "Get customer 5", "Alice");
        assert_eq!(memory.exchanges(&a).len(), 1);
        assert!(memory.exchanges(&b).is_empty());
    }

    #[test]
    fn zero_window_stores_nothing() {
        let memory = ConversationMemory::new(0);
        let token = ContinuityToken::new("t");
        memory.record(&token, "q", "a");
        assert!(memory.exchanges(&token).is_empty());
    }
}
