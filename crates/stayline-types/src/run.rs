//! Run lifecycle states and the summary returned to callers.

use crate::approval::ApprovalRequest;
use crate::id::{OperationId, RunId};
use crate::operation::OperationKind;
use serde::{Deserialize, Serialize};

// ── Run State ────────────────────────────────────────────────────────

/// Lifecycle of one task-runner execution.
///
/// `Running -> Suspended -> Resuming -> Running` may cycle any number
/// of times; `Completed` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Running,
    /// Halted before side effects, awaiting decisions on the pending
    /// approval batch.
    Suspended,
    /// Rehydrated with a decision batch, about to apply it.
    Resuming,
    Completed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running => write!(f, "running"),
            RunState::Suspended => write!(f, "suspended"),
            RunState::Resuming => write!(f, "resuming"),
            RunState::Completed => write!(f, "completed"),
        }
    }
}

// ── Run Summary ──────────────────────────────────────────────────────

/// One line of a run summary: an operation and what became of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationSummary {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Snapshot handed back after every submit, resume, or cancel call.
///
/// A suspended run communicates exactly which operations are pending
/// and why; a completed run with failures lists them explicitly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub state: RunState,
    /// Set on completion when any operation was skipped or failed.
    pub partial_result: bool,
    pub completed_operations: Vec<OperationSummary>,
    pub skipped_operations: Vec<OperationSummary>,
    pub failed_operations: Vec<OperationSummary>,
    pub pending_approval_requests: Vec<ApprovalRequest>,
}

impl RunSummary {
    pub fn is_suspended(&self) -> bool {
        self.state == RunState::Suspended
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_is_terminal() {
        assert!(RunState::Completed.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(!RunState::Suspended.is_terminal());
        assert!(!RunState::Resuming.is_terminal());
    }

    #[test]
    fn default_state_is_running() {
        assert_eq!(RunState::default(), RunState::Running);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let summary = RunSummary {
            run_id: RunId::new("run-1"),
            state: RunState::Suspended,
            partial_result: false,
            completed_operations: vec![OperationSummary {
                operation_id: OperationId::new("op-1"),
                kind: OperationKind::DetectDuplicates,
                detail: Some("2 duplicate groups".to_string()),
            }],
            skipped_operations: Vec::new(),
            failed_operations: Vec::new(),
            pending_approval_requests: Vec::new(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
        assert!(back.is_suspended());
    }
}
