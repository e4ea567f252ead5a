//! Session registry: maps (agent, thread) pairs to continuity tokens.
//!
//! [`SessionStore`] is the injectable seam; [`InMemorySessionStore`] is the
//! single-process backing. It wraps a `HashMap` behind `Arc<Mutex<..>>` and
//! performs lookup and insert under a single lock acquisition, so two
//! concurrent first uses of the same key can never mint two tokens.
//!
//! Tokens live for the lifetime of the store. There is no eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use super::types::{AgentId, ContinuityToken, SessionKey, ThreadId};
use crate::error::SessionError;

/// Backing store for continuity tokens.
///
/// `get_or_create` must be idempotent per key and atomic under concurrency.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_or_create(
        &self,
        agent: AgentId,
        thread: &ThreadId,
    ) -> Result<ContinuityToken, SessionError>;

    /// Number of sessions currently tracked.
    async fn len(&self) -> Result<usize, SessionError>;
}

/// In-process session store.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    tokens: Arc<Mutex<HashMap<SessionKey, ContinuityToken>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<SessionKey, ContinuityToken>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.tokens.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a token without creating one.
    pub fn get(&self, agent: AgentId, thread: &ThreadId) -> Option<ContinuityToken> {
        self.table()
            .get(&SessionKey::new(agent, thread.clone()))
            .cloned()
    }

    /// All sessions recorded for one thread, sorted by agent.
    pub fn sessions_for_thread(&self, thread: &ThreadId) -> Vec<(AgentId, ContinuityToken)> {
        let mut sessions: Vec<_> = self
            .table()
            .iter()
            .filter(|(key, _)| &key.thread == thread)
            .map(|(key, token)| (key.agent, token.clone()))
            .collect();
        sessions.sort_by_key(|(agent, _)| *agent);
        sessions
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(
        &self,
        agent: AgentId,
        thread: &ThreadId,
    ) -> Result<ContinuityToken, SessionError> {
        let mut table = self.table();
        let token = table
            .entry(SessionKey::new(agent, thread.clone()))
            .or_insert_with(|| {
                let token = mint_token(agent, thread);
                tracing::debug!(agent = %agent, thread = %thread, token = %token, "Session created");
                token
            })
            .clone();
        Ok(token)
    }

    async fn len(&self) -> Result<usize, SessionError> {
        Ok(self.table().len())
    }
}

/// Build a fresh token: `<thread>:<agent>:<uuid v4>`.
fn mint_token(agent: AgentId, thread: &ThreadId) -> ContinuityToken {
    ContinuityToken::new(format!("{thread}:{agent}:{}", Uuid::new_v4().simple()))
}
