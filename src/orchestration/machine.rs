//! Per-query state machine.
//!
//! ```text
//! START -> DECIDING -> {EXECUTING -> DECIDING}* -> DONE | ABORTED | EXCEEDED
//! ```
//!
//! The machine owns the iteration counter and the bound check, and contains
//! no I/O. [`super::supervisor::Supervisor`] feeds it the outcome of each
//! remote call and performs whatever the new state asks for.

use serde::Serialize;

use super::types::{AgentId, Route};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Start,
    Deciding,
    Executing(AgentId),
    Done,
    Aborted,
    Exceeded,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueryState::Done | QueryState::Aborted | QueryState::Exceeded)
    }
}

/// Inputs that drive the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Begin,
    Routed(Route),
    /// The executor returned, successfully or not.
    ExecutionFinished,
    /// Unrecoverable decision or protocol failure.
    Failed,
}

#[derive(Clone, Debug)]
pub struct QueryMachine {
    state: QueryState,
    iterations: usize,
    max_iterations: usize,
}

impl QueryMachine {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            state: QueryState::Start,
            iterations: 0,
            max_iterations,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Completed executor turns.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Apply one transition and return the new state.
    ///
    /// Terminal states absorb every input. Inputs that do not apply to the
    /// current state leave it unchanged.
    pub fn advance(&mut self, input: Transition) -> QueryState {
        let next = match (self.state, input) {
            (state, _) if state.is_terminal() => state,
            (_, Transition::Failed) => QueryState::Aborted,
            (QueryState::Start, Transition::Begin) => self.deciding_or_exceeded(),
            (QueryState::Deciding, Transition::Routed(Route::Done)) => QueryState::Done,
            (QueryState::Deciding, Transition::Routed(Route::Execute(agent))) => {
                QueryState::Executing(agent)
            }
            (QueryState::Executing(_), Transition::ExecutionFinished) => {
                self.iterations += 1;
                self.deciding_or_exceeded()
            }
            (state, input) => {
                tracing::warn!(?state, ?input, "Ignoring transition that does not apply");
                state
            }
        };
        self.state = next;
        next
    }

    fn deciding_or_exceeded(&self) -> QueryState {
        if self.iterations >= self.max_iterations {
            QueryState::Exceeded
        } else {
            QueryState::Deciding
        }
    }
}
