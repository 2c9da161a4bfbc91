//! Serializable execution state: the continuation of a suspended run.
//!
//! Everything a run needs to resume after a process restart lives in
//! [`ExecutionState`]: what completed, what was skipped or failed, which
//! approval requests are still open, and which operations remain. The
//! task runner owns these snapshots; nothing else mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stayline_types::{
    ApprovalRequest, OperationId, OperationKind, OperationSummary, QueuedOperation, RequestId,
    RunId, RunState, RunSummary,
};

// ── Operation Outcomes ───────────────────────────────────────────────

/// An operation that ran to completion, with a one-line result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletedOperation {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// An operation that was never executed because its request was rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedOperation {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub reason: String,
    pub skipped_at: DateTime<Utc>,
}

/// An approved operation that errored while being applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailedOperation {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// One recorded state transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub sequence: u64,
    pub from: RunState,
    pub to: RunState,
    pub description: String,
    pub at: DateTime<Utc>,
}

// ── Execution State ──────────────────────────────────────────────────

/// Serializable snapshot of one run.
///
/// Outcome lists are append-only: a completed operation is never re-run,
/// a skipped operation is never revisited. `remaining_operations` holds
/// exactly the gated operations whose requests are still pending once a
/// drive pass has finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub run_id: RunId,
    pub state: RunState,
    /// Set when any operation was skipped or failed.
    pub partial_result: bool,
    pub completed_operations: Vec<CompletedOperation>,
    pub skipped_operations: Vec<SkippedOperation>,
    pub failed_operations: Vec<FailedOperation>,
    pub pending_approval_requests: Vec<ApprovalRequest>,
    pub remaining_operations: Vec<QueuedOperation>,
    pub history: Vec<RunEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionState {
    pub fn new(operations: Vec<QueuedOperation>) -> Self {
        let now = Utc::now();
        Self {
            run_id: RunId::generate(),
            state: RunState::default(),
            partial_result: false,
            completed_operations: Vec::new(),
            skipped_operations: Vec::new(),
            failed_operations: Vec::new(),
            pending_approval_requests: Vec::new(),
            remaining_operations: operations,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Change state, recording the transition. No-op when unchanged.
    pub fn transition(&mut self, to: RunState, description: impl Into<String>) {
        if self.state == to {
            return;
        }
        let now = Utc::now();
        self.history.push(RunEvent {
            sequence: self.history.len() as u64 + 1,
            from: self.state,
            to,
            description: description.into(),
            at: now,
        });
        self.state = to;
        self.updated_at = now;
    }

    pub fn record_completed(&mut self, operation: &QueuedOperation, detail: Option<String>) {
        let now = Utc::now();
        self.completed_operations.push(CompletedOperation {
            operation_id: operation.id.clone(),
            kind: operation.kind(),
            detail,
            completed_at: now,
        });
        self.updated_at = now;
    }

    pub fn record_skipped(&mut self, operation: &QueuedOperation, reason: impl Into<String>) {
        let now = Utc::now();
        self.skipped_operations.push(SkippedOperation {
            operation_id: operation.id.clone(),
            kind: operation.kind(),
            reason: reason.into(),
            skipped_at: now,
        });
        self.partial_result = true;
        self.updated_at = now;
    }

    pub fn record_failed(&mut self, operation: &QueuedOperation, error: impl Into<String>) {
        let now = Utc::now();
        self.failed_operations.push(FailedOperation {
            operation_id: operation.id.clone(),
            kind: operation.kind(),
            error: error.into(),
            failed_at: now,
        });
        self.partial_result = true;
        self.updated_at = now;
    }

    /// Look up a still-pending approval request.
    pub fn pending_request(&self, request_id: &RequestId) -> Option<&ApprovalRequest> {
        self.pending_approval_requests
            .iter()
            .find(|request| &request.id == request_id)
    }

    pub fn has_pending_request_for(&self, operation_id: &OperationId) -> bool {
        self.pending_approval_requests
            .iter()
            .any(|request| &request.operation_id == operation_id)
    }

    /// Drop a request from the pending set once decided.
    pub fn clear_request(&mut self, request_id: &RequestId) {
        self.pending_approval_requests
            .retain(|request| &request.id != request_id);
        self.updated_at = Utc::now();
    }

    /// Remove and return an operation from the remaining queue.
    pub fn take_operation(&mut self, operation_id: &OperationId) -> Option<QueuedOperation> {
        let index = self
            .remaining_operations
            .iter()
            .position(|operation| &operation.id == operation_id)?;
        self.updated_at = Utc::now();
        Some(self.remaining_operations.remove(index))
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            run_id: self.run_id.clone(),
            state: self.state,
            partial_result: self.partial_result,
            completed_operations: self
                .completed_operations
                .iter()
                .map(|op| OperationSummary {
                    operation_id: op.operation_id.clone(),
                    kind: op.kind,
                    detail: op.detail.clone(),
                })
                .collect(),
            skipped_operations: self
                .skipped_operations
                .iter()
                .map(|op| OperationSummary {
                    operation_id: op.operation_id.clone(),
                    kind: op.kind,
                    detail: Some(op.reason.clone()),
                })
                .collect(),
            failed_operations: self
                .failed_operations
                .iter()
                .map(|op| OperationSummary {
                    operation_id: op.operation_id.clone(),
                    kind: op.kind,
                    detail: Some(op.error.clone()),
                })
                .collect(),
            pending_approval_requests: self.pending_approval_requests.clone(),
        }
    }
}
