//! Resumable execution engine.
//!
//! Operation sequences run through a [`TaskRunner`] that executes
//! non-gated work immediately and suspends, as a batch, on everything
//! the approval gate holds back. A suspended run is a plain value: its
//! [`ExecutionState`] serializes, crosses process boundaries, and picks
//! up exactly where it left off when decisions arrive. The
//! [`Orchestrator`] in front maps classified request profiles onto
//! operation plans.

#![deny(unsafe_code)]

mod error;
pub mod executor;
pub mod history;
pub mod orchestrator;
pub mod runner;
pub mod state;

pub use error::{EngineError, EngineResult, ExecutorError};
pub use executor::{MergeReport, OperationExecutor, OperationOutput};
pub use history::{RunEntry, RunHistory, DEFAULT_RUN_CAPACITY};
pub use orchestrator::{
    Complexity, ExecutionPattern, Intent, Orchestrator, RequestProfile, Route, RoutePlan,
};
pub use runner::TaskRunner;
pub use state::{
    CompletedOperation, ExecutionState, FailedOperation, RunEvent, SkippedOperation,
};
