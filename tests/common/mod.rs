#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use switchboard::error::{DecisionError, ExecutorError};
use switchboard::orchestration::{
    AgentId, ContinuityToken, DecisionFunction, DecisionRequest, ExecutionRequest, Executor,
    InMemorySessionStore, RoutingDecision, Supervisor,
};

// ─── Decision stub ────────────────────────────────────────────────────

/// What the scripted router saw on one call.
#[derive(Debug, Clone)]
pub struct DecisionCall {
    pub query: String,
    pub history_len: usize,
    pub session: ContinuityToken,
    pub agents: Vec<AgentId>,
}

/// Replays a fixed list of decisions; the last entry repeats forever.
pub struct ScriptedDecider {
    script: Mutex<VecDeque<Result<RoutingDecision, DecisionError>>>,
    last: Mutex<Option<Result<RoutingDecision, DecisionError>>>,
    pub calls: Mutex<Vec<DecisionCall>>,
}

impl ScriptedDecider {
    pub fn new(script: Vec<Result<RoutingDecision, DecisionError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl DecisionFunction for ScriptedDecider {
    async fn decide(&self, request: DecisionRequest<'_>) -> Result<RoutingDecision, DecisionError> {
        self.calls.lock().unwrap().push(DecisionCall {
            query: request.query.to_string(),
            history_len: request.history.len(),
            session: request.session.clone(),
            agents: request.agents.to_vec(),
        });

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(entry) => {
                *last = Some(entry.clone());
                entry
            }
            None => last
                .clone()
                .unwrap_or_else(|| Ok(RoutingDecision::finish("script empty"))),
        }
    }
}

pub fn route(agent: &str) -> Result<RoutingDecision, DecisionError> {
    Ok(RoutingDecision::route_to(agent, format!("need {agent}")))
}

pub fn done() -> Result<RoutingDecision, DecisionError> {
    Ok(RoutingDecision::finish("Query fully answered"))
}

pub fn transport(message: &str) -> Result<RoutingDecision, DecisionError> {
    Err(DecisionError::Transport(message.to_string()))
}

// ─── Executor stub ────────────────────────────────────────────────────

/// What a stub executor saw on one call.
#[derive(Debug, Clone)]
pub struct ExecutionCall {
    pub input: String,
    pub history_len: usize,
    pub session: ContinuityToken,
}

/// Replays fixed results per call; the last entry repeats forever.
pub struct StubExecutor {
    agent: AgentId,
    results: Mutex<VecDeque<Result<String, ExecutorError>>>,
    last: Mutex<Result<String, ExecutorError>>,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<ExecutionCall>>,
}

impl StubExecutor {
    pub fn new(agent: AgentId, results: Vec<Result<String, ExecutorError>>) -> Arc<Self> {
        Self::build(agent, results, None)
    }

    /// Always answers `text`.
    pub fn answering(agent: AgentId, text: &str) -> Arc<Self> {
        Self::build(agent, vec![Ok(text.to_string())], None)
    }

    /// Answers `text` after sleeping for `delay`.
    pub fn slow(agent: AgentId, text: &str, delay: Duration) -> Arc<Self> {
        Self::build(agent, vec![Ok(text.to_string())], Some(delay))
    }

    fn build(agent: AgentId, results: Vec<Result<String, ExecutorError>>, delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            agent,
            results: Mutex::new(results.into()),
            last: Mutex::new(Ok(String::new())),
            delay,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn sessions(&self) -> Vec<ContinuityToken> {
        self.calls.lock().unwrap().iter().map(|c| c.session.clone()).collect()
    }
}

#[async_trait]
impl Executor for StubExecutor {
    fn id(&self) -> AgentId {
        self.agent
    }

    async fn execute(&self, request: ExecutionRequest<'_>) -> Result<String, ExecutorError> {
        self.calls.lock().unwrap().push(ExecutionCall {
            input: request.input.to_string(),
            history_len: request.history.len(),
            session: request.session.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.results.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(result) => {
                *last = result.clone();
                result
            }
            None => last.clone(),
        }
    }
}

// ─── Supervisor setup ─────────────────────────────────────────────────

pub struct Harness {
    pub supervisor: Supervisor,
    pub decider: Arc<ScriptedDecider>,
    pub sessions: InMemorySessionStore,
}

/// Supervisor over a scripted router and the given executors.
pub fn harness(decider: Arc<ScriptedDecider>, executors: Vec<Arc<StubExecutor>>) -> Harness {
    let sessions = InMemorySessionStore::new();
    let mut supervisor = Supervisor::new(decider.clone(), Arc::new(sessions.clone()));
    for executor in executors {
        supervisor = supervisor.with_executor(executor);
    }
    Harness {
        supervisor,
        decider,
        sessions,
    }
}
