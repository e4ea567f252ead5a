//! The supervisor loop: decide, execute, record, repeat.
//!
//! [`Supervisor::process_query`] re-consults the decision function after every
//! executor turn, so each routing decision sees the full, growing history. The
//! [`QueryMachine`] enforces the iteration bound; this module performs the
//! remote calls the machine asks for and applies the failure policy:
//!
//! - decision transport failures are retried at most once, then
//!   the query aborts with [`SupervisorError::RoutingFailure`];
//! - malformed decisions and targets outside the registered executor set abort
//!   immediately with [`SupervisorError::ProtocolViolation`];
//! - executor failures of any kind are recorded with `succeeded = false` and
//!   the loop continues, leaving recovery to the next decision round;
//! - hitting the bound returns the best-effort aggregation with
//!   [`Outcome::Exceeded`].
//!
//! Every failure carries the records produced before it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use super::aggregate::{collect_sections, render_sections};
use super::context::{render_executor_input, truncate_chars};
use super::decision::{DecisionFunction, DecisionRequest};
use super::events::SupervisorEvent;
use super::executor::{ExecutionRequest, Executor};
use super::machine::{QueryMachine, QueryState, Transition};
use super::registry::SessionStore;
use super::types::{
    AgentId, ContinuityToken, FinalResponse, IterationRecord, Outcome, RoutingDecision, ThreadId,
};
use crate::error::{DecisionError, ProtocolViolation, QueryFailure, SupervisorError};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_DECISION_RETRIES: u32 = 1;
/// Upper bound on decision retries: at most one immediate retry.
pub const MAX_DECISION_RETRIES: u32 = 1;

/// Coordinates one decision function and a fixed set of executors.
///
/// Cheap to clone; clones share the decision function, executors, and
/// session store, so one supervisor can serve concurrent queries.
#[derive(Clone)]
pub struct Supervisor {
    decider: Arc<dyn DecisionFunction>,
    executors: BTreeMap<AgentId, Arc<dyn Executor>>,
    sessions: Arc<dyn SessionStore>,
    max_iterations: usize,
    decision_retries: u32,
    event_tx: Option<UnboundedSender<SupervisorEvent>>,
}

/// Records of one in-flight query.
///
/// Kept outside the loop future so a caller-level timeout can still recover
/// them after the future is dropped.
#[derive(Default)]
struct Transcript {
    records: Mutex<Vec<IterationRecord>>,
}

impl Transcript {
    fn push(&self, record: IterationRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    fn snapshot(&self) -> Vec<IterationRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Per-query state threaded through the decision and execution rounds.
struct QueryRun<'a> {
    query: &'a str,
    thread: &'a ThreadId,
    router_session: ContinuityToken,
    registered: Vec<AgentId>,
    transcript: &'a Transcript,
    rounds: usize,
    last_reason: String,
}

impl Supervisor {
    pub fn new(decider: Arc<dyn DecisionFunction>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            decider,
            executors: BTreeMap::new(),
            sessions,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            decision_retries: DEFAULT_DECISION_RETRIES,
            event_tx: None,
        }
    }

    /// Register an executor under its own [`Executor::id`].
    ///
    /// Registering the same identity twice replaces the earlier executor. The
    /// reserved router identity cannot be registered as an executor.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        let agent = executor.id();
        if !agent.is_executor() {
            tracing::warn!(agent = %agent, "Refusing to register the router as an executor");
            return self;
        }
        self.executors.insert(agent, executor);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the decision retry count, clamped to [`MAX_DECISION_RETRIES`].
    pub fn with_decision_retries(mut self, retries: u32) -> Self {
        if retries > MAX_DECISION_RETRIES {
            tracing::warn!(retries, max = MAX_DECISION_RETRIES, "Clamping decision retries");
        }
        self.decision_retries = retries.min(MAX_DECISION_RETRIES);
        self
    }

    pub fn with_events(mut self, event_tx: UnboundedSender<SupervisorEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn registered_agents(&self) -> Vec<AgentId> {
        self.executors.keys().copied().collect()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Answer one user turn on `thread`.
    pub async fn process_query(
        &self,
        query: &str,
        thread: &ThreadId,
    ) -> Result<FinalResponse, QueryFailure> {
        let transcript = Transcript::default();
        self.run(query, thread, &transcript)
            .await
            .map_err(|error| self.fail(thread, error, &transcript))
    }

    /// [`Self::process_query`] bounded by a wall-clock timeout.
    ///
    /// On expiry the in-flight remote call is abandoned and the records
    /// completed so far are returned on the failure.
    pub async fn process_query_with_timeout(
        &self,
        query: &str,
        thread: &ThreadId,
        timeout: Duration,
    ) -> Result<FinalResponse, QueryFailure> {
        let transcript = Transcript::default();
        let outcome = tokio::time::timeout(timeout, self.run(query, thread, &transcript)).await;
        match outcome {
            Ok(result) => result.map_err(|error| self.fail(thread, error, &transcript)),
            Err(_) => {
                let error = SupervisorError::TimedOut { timeout };
                Err(self.fail(thread, error, &transcript))
            }
        }
    }

    async fn run(
        &self,
        query: &str,
        thread: &ThreadId,
        transcript: &Transcript,
    ) -> Result<FinalResponse, SupervisorError> {
        tracing::info!(thread = %thread, max_iterations = self.max_iterations, "Processing query");
        self.emit(SupervisorEvent::QueryStarted {
            thread_id: thread.clone(),
            query: query.to_string(),
        });

        let router_session = self.sessions.get_or_create(AgentId::Router, thread).await?;
        let mut run = QueryRun {
            query,
            thread,
            router_session,
            registered: self.registered_agents(),
            transcript,
            rounds: 0,
            last_reason: String::new(),
        };

        let mut machine = QueryMachine::new(self.max_iterations);
        machine.advance(Transition::Begin);

        loop {
            let step = match machine.state() {
                QueryState::Deciding => self.decision_round(&mut run).await,
                QueryState::Executing(agent) => self.execution_round(agent, &machine, &mut run).await,
                _ => break,
            };
            match step {
                Ok(transition) => {
                    machine.advance(transition);
                }
                Err(error) => {
                    machine.advance(Transition::Failed);
                    return Err(error);
                }
            }
        }

        let records = transcript.snapshot();
        let outcome = match machine.state() {
            QueryState::Exceeded => {
                tracing::warn!(
                    thread = %thread,
                    max_iterations = self.max_iterations,
                    "Max iterations reached before the router signalled completion"
                );
                Outcome::Exceeded
            }
            _ => Outcome::Done,
        };

        self.emit(SupervisorEvent::Completed {
            thread_id: thread.clone(),
            state: machine.state(),
            iterations: machine.iterations(),
            agents: records.iter().map(|r| r.agent).collect(),
        });

        let sections = collect_sections(&records);
        Ok(FinalResponse {
            thread_id: thread.clone(),
            text: render_sections(&sections),
            sections,
            outcome,
            iterations: machine.iterations(),
            records,
        })
    }

    /// Ask the decision function for the next move and validate it.
    async fn decision_round(&self, run: &mut QueryRun<'_>) -> Result<Transition, SupervisorError> {
        run.rounds += 1;
        let history = run.transcript.snapshot();
        let request = DecisionRequest {
            query: run.query,
            history: &history,
            session: &run.router_session,
            agents: &run.registered,
        };

        let decision = self.decide_with_retry(request).await?;
        let route = decision.route(&run.registered)?;
        tracing::debug!(
            round = run.rounds,
            next_agent = ?decision.next_agent,
            done = decision.done,
            reason = %decision.reason,
            "Routing decision"
        );

        self.emit(SupervisorEvent::Routed {
            thread_id: run.thread.clone(),
            round: run.rounds,
            next_agent: decision.next_agent.as_deref().and_then(|a| a.parse().ok()),
            done: decision.done,
            reason: decision.reason.clone(),
        });
        run.last_reason = decision.reason;

        Ok(Transition::Routed(route))
    }

    /// Call the decision function, retrying transport failures only.
    async fn decide_with_retry(
        &self,
        request: DecisionRequest<'_>,
    ) -> Result<RoutingDecision, SupervisorError> {
        let allowed = self.decision_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.decider.decide(request).await {
                Ok(decision) => return Ok(decision),
                Err(DecisionError::Malformed { raw, reason }) => {
                    return Err(ProtocolViolation::MalformedDecision { raw, reason }.into());
                }
                Err(e) if attempt < allowed => {
                    tracing::warn!(attempt, error = %e, "Decision call failed, retrying");
                }
                Err(e) => {
                    return Err(SupervisorError::RoutingFailure {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }

    /// Run one executor turn and record its outcome.
    async fn execution_round(
        &self,
        agent: AgentId,
        machine: &QueryMachine,
        run: &mut QueryRun<'_>,
    ) -> Result<Transition, SupervisorError> {
        let executor = self.executors.get(&agent).ok_or_else(|| {
            SupervisorError::from(ProtocolViolation::UnknownAgent {
                agent: agent.to_string(),
                registered: run
                    .registered
                    .iter()
                    .map(AgentId::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        })?;

        let session = self.sessions.get_or_create(agent, run.thread).await?;
        let history = run.transcript.snapshot();
        let iteration = machine.iterations() + 1;

        self.emit(SupervisorEvent::Handoff {
            thread_id: run.thread.clone(),
            iteration,
            from_agent: history.last().map(|r| r.agent),
            to_agent: agent,
            reason: run.last_reason.clone(),
        });

        let input = render_executor_input(run.query, &history);
        let request = ExecutionRequest {
            query: run.query,
            input: &input,
            history: &history,
            session: &session,
        };

        let (output, succeeded) = match executor.execute(request).await {
            Ok(text) => (text, true),
            Err(e) => {
                tracing::warn!(agent = %agent, iteration, error = %e, "Executor failed");
                (e.to_string(), false)
            }
        };

        self.emit(SupervisorEvent::AgentCompleted {
            thread_id: run.thread.clone(),
            iteration,
            agent,
            succeeded,
            preview: truncate_chars(&output, 100),
        });

        run.transcript.push(IterationRecord {
            iteration,
            agent,
            input,
            output,
            succeeded,
        });

        Ok(Transition::ExecutionFinished)
    }

    fn fail(&self, thread: &ThreadId, error: SupervisorError, transcript: &Transcript) -> QueryFailure {
        let records = transcript.snapshot();
        tracing::error!(thread = %thread, iterations = records.len(), error = %error, "Query aborted");
        self.emit(SupervisorEvent::Aborted {
            thread_id: thread.clone(),
            iterations: records.len(),
            error: error.to_string(),
        });
        QueryFailure { error, records }
    }

    fn emit(&self, event: SupervisorEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}
