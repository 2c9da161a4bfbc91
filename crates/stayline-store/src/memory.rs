//! In-memory reference implementation for Stayline storage traits.
//!
//! This adapter is deterministic and test-friendly. Deployments that need
//! durable history across restarts should use the SQLite adapter instead.

use crate::model::{AuditEntry, NewAuditEntry, RegistryEntry};
use crate::traits::{ApprovalRegistry, AuditStore, QueryWindow};
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use stayline_types::{
    ApprovalDecision, ApprovalRequest, AuditEntryId, DecisionOrigin, RequestId, RunId,
};

/// In-memory Stayline storage adapter.
#[derive(Default)]
pub struct InMemoryStaylineStore {
    entries: RwLock<Vec<AuditEntry>>,
    requests: RwLock<HashMap<RequestId, RegistryEntry>>,
}

impl InMemoryStaylineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryStaylineStore {
    async fn append(&self, entry: NewAuditEntry) -> StoreResult<AuditEntry> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| StoreError::Backend("audit lock poisoned".to_string()))?;

        let previous_hash = guard.last().map(|e| e.hash.clone());
        let sequence = guard.len() as u64 + 1;
        let hash = entry.chain_hash(previous_hash.as_deref(), sequence)?;

        let record = AuditEntry {
            entry_id: AuditEntryId::generate(),
            sequence,
            occurred_at: entry.occurred_at,
            actor: entry.actor,
            operation_kind: entry.operation_kind,
            operation_id: entry.operation_id,
            run_id: entry.run_id,
            affected_record_ids: entry.affected_record_ids,
            summary: entry.summary,
            before_summary: entry.before_summary,
            after_summary: entry.after_summary,
            previous_hash,
            hash,
        };

        guard.push(record.clone());
        Ok(record)
    }

    async fn entries(&self, window: QueryWindow) -> StoreResult<Vec<AuditEntry>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("audit lock poisoned".to_string()))?;
        let mut values = guard.clone();
        values.sort_by(|a, b| b.sequence.cmp(&a.sequence));
        Ok(apply_window(values, window))
    }

    async fn entries_for_run(&self, run_id: &RunId) -> StoreResult<Vec<AuditEntry>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("audit lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .filter(|entry| entry.run_id.as_ref() == Some(run_id))
            .cloned()
            .collect())
    }

    async fn latest_hash(&self) -> StoreResult<Option<String>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| StoreError::Backend("audit lock poisoned".to_string()))?;
        Ok(guard.last().map(|e| e.hash.clone()))
    }
}

#[async_trait]
impl ApprovalRegistry for InMemoryStaylineStore {
    async fn publish(
        &self,
        request: ApprovalRequest,
        published_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut guard = self
            .requests
            .write()
            .map_err(|_| StoreError::Backend("registry lock poisoned".to_string()))?;

        if guard.contains_key(&request.id) {
            return Err(StoreError::Conflict(format!(
                "approval request {} already published",
                request.id
            )));
        }

        let request_id = request.id.clone();
        let entry = RegistryEntry {
            request,
            published_at,
            outcome: None,
            origin: None,
            decided_at: None,
        };
        guard.insert(request_id, entry);
        Ok(())
    }

    async fn record_decision(
        &self,
        decision: &ApprovalDecision,
        origin: DecisionOrigin,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<RegistryEntry> {
        let mut guard = self
            .requests
            .write()
            .map_err(|_| StoreError::Backend("registry lock poisoned".to_string()))?;
        let entry = guard.get_mut(&decision.request_id).ok_or_else(|| {
            StoreError::NotFound(format!(
                "approval request {} not found",
                decision.request_id
            ))
        })?;

        if entry.outcome.is_some() {
            return Err(StoreError::Conflict(format!(
                "approval request {} already decided",
                decision.request_id
            )));
        }

        entry.outcome = Some(decision.outcome);
        entry.origin = Some(origin);
        entry.decided_at = Some(decided_at);
        Ok(entry.clone())
    }

    async fn pending(&self, window: QueryWindow) -> StoreResult<Vec<RegistryEntry>> {
        let guard = self
            .requests
            .read()
            .map_err(|_| StoreError::Backend("registry lock poisoned".to_string()))?;
        let mut values = guard
            .values()
            .filter(|entry| entry.is_pending())
            .cloned()
            .collect::<Vec<_>>();
        values.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(apply_window(values, window))
    }

    async fn entry(&self, request_id: &RequestId) -> StoreResult<Option<RegistryEntry>> {
        let guard = self
            .requests
            .read()
            .map_err(|_| StoreError::Backend("registry lock poisoned".to_string()))?;
        Ok(guard.get(request_id).cloned())
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use stayline_types::{
        MergeRules, Operation, OperationId, OperationKind, QueuedOperation, RecordId,
        RiskAssessment, RiskTier,
    };

    fn sample_entry(run_id: Option<RunId>) -> NewAuditEntry {
        NewAuditEntry {
            occurred_at: Utc::now(),
            actor: "engine".to_string(),
            operation_kind: OperationKind::MergeProfiles,
            operation_id: OperationId::generate(),
            run_id,
            affected_record_ids: vec![RecordId::new("g-001"), RecordId::new("g-002")],
            summary: "merged 1 duplicate into g-001".to_string(),
            before_summary: serde_json::json!({"records": 2}),
            after_summary: serde_json::json!({"records": 1}),
        }
    }

    fn sample_request() -> ApprovalRequest {
        let operation = QueuedOperation::new(
            Operation::MergeProfiles {
                primary_id: RecordId::new("g-001"),
                duplicate_ids: vec![RecordId::new("g-002")],
                rules: MergeRules::default(),
            },
            true,
        );
        let assessment = RiskAssessment {
            tier: RiskTier::High,
            justification: "permanently modifies consolidated identity".to_string(),
            reversible: false,
        };
        ApprovalRequest::for_operation(&operation, &assessment, 2)
    }

    #[tokio::test]
    async fn audit_entries_are_hash_linked() {
        let store = InMemoryStaylineStore::new();
        let first = store.append(sample_entry(None)).await.unwrap();
        let second = store.append(sample_entry(None)).await.unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(first.previous_hash, None);
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_hash, Some(first.hash));
        assert_eq!(store.latest_hash().await.unwrap(), Some(second.hash));
    }

    #[tokio::test]
    async fn entries_are_listed_newest_first() {
        let store = InMemoryStaylineStore::new();
        for _ in 0..3 {
            store.append(sample_entry(None)).await.unwrap();
        }

        let page = store
            .entries(QueryWindow {
                limit: 2,
                offset: 0,
            })
            .await
            .unwrap();
        let sequences: Vec<u64> = page.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![3, 2]);
    }

    #[tokio::test]
    async fn run_entries_come_back_oldest_first() {
        let store = InMemoryStaylineStore::new();
        let run = RunId::generate();
        store.append(sample_entry(Some(run.clone()))).await.unwrap();
        store
            .append(sample_entry(Some(RunId::generate())))
            .await
            .unwrap();
        store.append(sample_entry(Some(run.clone()))).await.unwrap();

        let trace = store.entries_for_run(&run).await.unwrap();
        let sequences: Vec<u64> = trace.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 3]);
    }

    #[tokio::test]
    async fn duplicate_publish_is_a_conflict() {
        let store = InMemoryStaylineStore::new();
        let request = sample_request();
        store.publish(request.clone(), Utc::now()).await.unwrap();

        let result = store.publish(request, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn decision_requires_a_published_request() {
        let store = InMemoryStaylineStore::new();
        let decision = ApprovalDecision::approve(RequestId::generate());

        let result = store
            .record_decision(&decision, DecisionOrigin::External, Utc::now())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn each_request_accepts_exactly_one_decision() {
        let store = InMemoryStaylineStore::new();
        let request = sample_request();
        let request_id = request.id.clone();
        store.publish(request, Utc::now()).await.unwrap();

        let decided = store
            .record_decision(
                &ApprovalDecision::approve(request_id.clone()),
                DecisionOrigin::External,
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(decided.outcome, Some(stayline_types::DecisionOutcome::Approved));
        assert_eq!(decided.origin, Some(DecisionOrigin::External));

        let again = store
            .record_decision(
                &ApprovalDecision::reject(request_id),
                DecisionOrigin::External,
                Utc::now(),
            )
            .await;
        assert!(matches!(again, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn pending_excludes_decided_requests() {
        let store = InMemoryStaylineStore::new();
        let first = sample_request();
        let second = sample_request();
        let kept_id = second.id.clone();
        store.publish(first.clone(), Utc::now()).await.unwrap();
        store
            .publish(second, Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        store
            .record_decision(
                &ApprovalDecision::approve(first.id),
                DecisionOrigin::AutoPolicy,
                Utc::now(),
            )
            .await
            .unwrap();

        let open = store.pending(QueryWindow::default()).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].request.id, kept_id);
        assert!(open[0].is_pending());
    }
}
