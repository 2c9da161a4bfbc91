//! Drives operation sequences through the approval gate.
//!
//! One runner tracks many runs; each run executes its operations in
//! order, suspending as a batch whenever gated operations are reached.
//! Suspension is not a blocking wait: the run's state is retained (and
//! exportable) and the call returns. Decisions arrive later through
//! [`TaskRunner::resume`], which applies the approved subset and never
//! re-executes completed work.

use crate::error::{EngineError, EngineResult};
use crate::executor::OperationExecutor;
use crate::history::{RunEntry, RunHistory};
use crate::state::ExecutionState;
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use stayline_gate::{ApprovalGate, ApprovalPolicy};
use stayline_store::ApprovalRegistry;
use stayline_types::{
    ApprovalDecision, DecisionOrigin, DecisionOutcome, GuestRecord, Operation, QueuedOperation,
    RunId, RunState, RunSummary,
};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Resumable task runner.
///
/// Configured without an auto policy, gated operations leave the run
/// suspended until an external decision batch arrives. With one, the
/// policy resolves each batch in place of a missing reviewer and the
/// substitution is logged and recorded with its origin.
pub struct TaskRunner {
    gate: ApprovalGate,
    executor: OperationExecutor,
    registry: Arc<dyn ApprovalRegistry>,
    auto_policy: Option<Arc<dyn ApprovalPolicy>>,
    runs: RwLock<RunHistory>,
}

impl TaskRunner {
    pub fn new(
        gate: ApprovalGate,
        executor: OperationExecutor,
        registry: Arc<dyn ApprovalRegistry>,
    ) -> Self {
        Self {
            gate,
            executor,
            registry,
            auto_policy: None,
            runs: RwLock::new(RunHistory::default()),
        }
    }

    /// Resolve suspension batches with this policy instead of waiting
    /// for external decisions.
    pub fn with_auto_policy(mut self, policy: Arc<dyn ApprovalPolicy>) -> Self {
        self.auto_policy = Some(policy);
        self
    }

    pub fn with_run_capacity(mut self, capacity: usize) -> Self {
        self.runs = RwLock::new(RunHistory::new(capacity));
        self
    }

    /// Start a new run over `records`. Returns a Completed summary when
    /// nothing was gated (or the auto policy resolved everything) and a
    /// Suspended one otherwise.
    pub async fn submit(
        &self,
        operations: Vec<QueuedOperation>,
        records: Vec<GuestRecord>,
    ) -> EngineResult<RunSummary> {
        let state = ExecutionState::new(operations);
        let run_id = state.run_id.clone();
        info!(
            run_id = %run_id,
            operations = state.remaining_operations.len(),
            records = records.len(),
            "Submitted run"
        );
        {
            let mut runs = self.runs.write().await;
            runs.push(RunEntry { state, records });
        }
        self.drive(&run_id).await
    }

    /// Apply a decision batch to a run and continue it. Partial batches
    /// are allowed; undecided requests keep the run suspended.
    pub async fn resume(
        &self,
        run_id: &RunId,
        decisions: &[ApprovalDecision],
    ) -> EngineResult<RunSummary> {
        {
            let mut runs = self.runs.write().await;
            let entry = runs
                .get_mut(run_id)
                .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
            if !entry.state.state.is_terminal() {
                entry.state.transition(
                    RunState::Resuming,
                    format!("{} decisions received", decisions.len()),
                );
            }
            self.apply_decisions_locked(entry, decisions, DecisionOrigin::External)
                .await?;
        }
        self.drive(run_id).await
    }

    /// Cancel a run by rejecting every pending request. The run reaches
    /// Completed with the partial-result flag set.
    pub async fn cancel(&self, run_id: &RunId) -> EngineResult<RunSummary> {
        let rejections: Vec<ApprovalDecision> = {
            let runs = self.runs.read().await;
            let entry = runs
                .get(run_id)
                .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
            entry
                .state
                .pending_approval_requests
                .iter()
                .map(|request| ApprovalDecision::reject(request.id.clone()))
                .collect()
        };
        info!(
            run_id = %run_id,
            rejected = rejections.len(),
            "Cancelling run; rejecting all pending requests"
        );
        self.resume(run_id, &rejections).await
    }

    pub async fn summary(&self, run_id: &RunId) -> EngineResult<RunSummary> {
        let runs = self.runs.read().await;
        let entry = runs
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
        Ok(entry.state.summary())
    }

    /// Current record batch for a run, reflecting every applied operation.
    pub async fn records(&self, run_id: &RunId) -> EngineResult<Vec<GuestRecord>> {
        let runs = self.runs.read().await;
        let entry = runs
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
        Ok(entry.records.clone())
    }

    /// Serialize a run's execution state so it can cross a process
    /// boundary.
    pub async fn export_state(&self, run_id: &RunId) -> EngineResult<String> {
        let runs = self.runs.read().await;
        let entry = runs
            .get(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;
        serde_json::to_string(&entry.state).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    /// Rehydrate a previously exported run. The caller supplies the
    /// record batch; decisions then flow through [`TaskRunner::resume`].
    pub async fn import_run(
        &self,
        state_json: &str,
        records: Vec<GuestRecord>,
    ) -> EngineResult<RunSummary> {
        let state: ExecutionState = serde_json::from_str(state_json)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;
        let run_id = state.run_id.clone();
        info!(run_id = %run_id, state = %state.state, "Imported run state");

        let summary = state.summary();
        let mut runs = self.runs.write().await;
        match runs.get_mut(&run_id) {
            Some(entry) => {
                entry.state = state;
                entry.records = records;
            }
            None => runs.push(RunEntry { state, records }),
        }
        Ok(summary)
    }

    /// Execute non-gated operations in order, emit one request per newly
    /// reached gated operation, then settle the run state.
    async fn drive(&self, run_id: &RunId) -> EngineResult<RunSummary> {
        let mut runs = self.runs.write().await;
        let entry = runs
            .get_mut(run_id)
            .ok_or_else(|| EngineError::RunNotFound(run_id.clone()))?;

        if entry.state.state.is_terminal() {
            return Ok(entry.state.summary());
        }

        entry
            .state
            .transition(RunState::Running, "driving remaining operations");

        let owned_run_id = entry.state.run_id.clone();
        let operations = std::mem::take(&mut entry.state.remaining_operations);
        let mut still_remaining = Vec::with_capacity(operations.len());
        let mut new_requests = Vec::new();

        for operation in operations {
            if operation.requires_approval {
                if entry.state.has_pending_request_for(&operation.id) {
                    still_remaining.push(operation);
                    continue;
                }
                let affected = affected_count(&operation, &entry.records);
                let request = self.gate.request_for(&operation, affected);
                entry.state.pending_approval_requests.push(request.clone());
                new_requests.push(request);
                still_remaining.push(operation);
            } else {
                match self
                    .executor
                    .execute(&operation, &mut entry.records, &owned_run_id)
                    .await
                {
                    Ok(output) => entry
                        .state
                        .record_completed(&operation, Some(output.summary_line())),
                    Err(err) => {
                        warn!(
                            run_id = %owned_run_id,
                            operation_id = %operation.id,
                            error = %err,
                            "Operation failed; run continues"
                        );
                        entry.state.record_failed(&operation, err.to_string());
                    }
                }
            }
        }
        entry.state.remaining_operations = still_remaining;

        if !new_requests.is_empty() {
            let published_at = Utc::now();
            try_join_all(
                new_requests
                    .iter()
                    .map(|request| self.registry.publish(request.clone(), published_at)),
            )
            .await?;
            info!(
                run_id = %owned_run_id,
                requests = new_requests.len(),
                "Published approval request batch"
            );
        }

        if !entry.state.pending_approval_requests.is_empty() {
            if let Some(policy) = self.auto_policy.as_ref() {
                let decisions: Vec<ApprovalDecision> = entry
                    .state
                    .pending_approval_requests
                    .iter()
                    .map(|request| ApprovalDecision {
                        request_id: request.id.clone(),
                        outcome: policy.decide(request),
                    })
                    .collect();
                info!(
                    run_id = %owned_run_id,
                    policy = policy.name(),
                    decisions = decisions.len(),
                    "No external handler configured; auto policy resolving batch"
                );
                self.apply_decisions_locked(entry, &decisions, DecisionOrigin::AutoPolicy)
                    .await?;
            }
        }

        let pending = entry.state.pending_approval_requests.len();
        if pending == 0 && entry.state.remaining_operations.is_empty() {
            entry
                .state
                .transition(RunState::Completed, "all operations resolved");
            info!(
                run_id = %owned_run_id,
                completed = entry.state.completed_operations.len(),
                skipped = entry.state.skipped_operations.len(),
                failed = entry.state.failed_operations.len(),
                partial = entry.state.partial_result,
                "Run completed"
            );
        } else {
            entry.state.transition(
                RunState::Suspended,
                format!("{pending} approval requests pending"),
            );
            info!(
                run_id = %owned_run_id,
                pending,
                "Run suspended awaiting decisions"
            );
        }

        Ok(entry.state.summary())
    }

    /// Apply one decision batch to a locked run entry. Unknown request
    /// ids are logged and ignored; the rest of the batch still applies.
    async fn apply_decisions_locked(
        &self,
        entry: &mut RunEntry,
        decisions: &[ApprovalDecision],
        origin: DecisionOrigin,
    ) -> EngineResult<()> {
        let run_id = entry.state.run_id.clone();
        for decision in decisions {
            let request = match entry.state.pending_request(&decision.request_id) {
                Some(request) => request.clone(),
                None => {
                    warn!(
                        run_id = %run_id,
                        request_id = %decision.request_id,
                        "Decision references no pending request; ignoring"
                    );
                    continue;
                }
            };

            self.registry
                .record_decision(decision, origin, Utc::now())
                .await?;
            entry.state.clear_request(&decision.request_id);

            let operation = match entry.state.take_operation(&request.operation_id) {
                Some(operation) => operation,
                None => {
                    warn!(
                        run_id = %run_id,
                        operation_id = %request.operation_id,
                        "Decided request has no queued operation; ignoring"
                    );
                    continue;
                }
            };

            match decision.outcome {
                DecisionOutcome::Approved => {
                    info!(
                        run_id = %run_id,
                        request_id = %decision.request_id,
                        operation_id = %operation.id,
                        origin = %origin,
                        "Request approved; executing operation"
                    );
                    match self
                        .executor
                        .execute(&operation, &mut entry.records, &run_id)
                        .await
                    {
                        Ok(output) => entry
                            .state
                            .record_completed(&operation, Some(output.summary_line())),
                        Err(err) => {
                            warn!(
                                run_id = %run_id,
                                operation_id = %operation.id,
                                error = %err,
                                "Approved operation failed; run continues"
                            );
                            entry.state.record_failed(&operation, err.to_string());
                        }
                    }
                }
                DecisionOutcome::Rejected => {
                    info!(
                        run_id = %run_id,
                        request_id = %decision.request_id,
                        operation_id = %operation.id,
                        origin = %origin,
                        "Request rejected; skipping operation"
                    );
                    let reason = match origin {
                        DecisionOrigin::External => "rejected by external decision",
                        DecisionOrigin::AutoPolicy => "rejected by auto policy",
                    };
                    entry.state.record_skipped(&operation, reason);
                }
            }
        }
        Ok(())
    }
}

fn affected_count(operation: &QueuedOperation, records: &[GuestRecord]) -> usize {
    match &operation.operation {
        Operation::MergeProfiles { duplicate_ids, .. } => duplicate_ids.len() + 1,
        _ => records.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_store::memory::InMemoryStaylineStore;
    use stayline_types::{MergeRules, RecordId};

    fn make_runner() -> TaskRunner {
        let store = Arc::new(InMemoryStaylineStore::new());
        TaskRunner::new(
            ApprovalGate::new(),
            OperationExecutor::new(store.clone()),
            store,
        )
    }

    #[test]
    fn merge_affects_primary_plus_duplicates() {
        let operation = QueuedOperation::new(
            Operation::MergeProfiles {
                primary_id: RecordId::new("g-001"),
                duplicate_ids: vec![RecordId::new("g-002"), RecordId::new("g-003")],
                rules: MergeRules::default(),
            },
            true,
        );
        let detect = QueuedOperation::new(Operation::DetectDuplicates { threshold: 0.85 }, false);
        let records = vec![GuestRecord::new("g-001", "John Smith")];

        assert_eq!(affected_count(&operation, &records), 3);
        assert_eq!(affected_count(&detect, &records), 1);
    }

    #[tokio::test]
    async fn unknown_run_ids_error() {
        let runner = make_runner();
        let missing = RunId::generate();

        assert!(matches!(
            runner.summary(&missing).await,
            Err(EngineError::RunNotFound(_))
        ));
        assert!(matches!(
            runner.resume(&missing, &[]).await,
            Err(EngineError::RunNotFound(_))
        ));
    }
}
