//! Supervisor orchestration subsystem.
//!
//! A [`supervisor::Supervisor`] answers one user query by repeatedly asking a
//! [`decision::DecisionFunction`] which executor should act next, invoking that
//! [`executor::Executor`], and recording the result, until the router signals
//! completion or the iteration bound is reached. Per-(agent, thread) continuity
//! tokens come from a [`registry::SessionStore`].

pub mod aggregate;
pub mod context;
pub mod decision;
pub mod events;
pub mod executor;
pub mod machine;
pub mod registry;
pub mod supervisor;
pub mod types;

pub use decision::{DecisionFunction, DecisionRequest, parse_decision};
pub use events::SupervisorEvent;
pub use executor::{ExecutionRequest, Executor};
pub use registry::{InMemorySessionStore, SessionStore};
pub use supervisor::Supervisor;
pub use types::{AgentId, ContinuityToken, FinalResponse, IterationRecord, Outcome, RoutingDecision, ThreadId};
