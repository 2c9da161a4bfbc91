use crate::model::{AuditEntry, NewAuditEntry, RegistryEntry};
use crate::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stayline_types::{ApprovalDecision, ApprovalRequest, DecisionOrigin, RequestId, RunId};

/// Generic query window for paged reads. A zero limit means unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Storage interface for the append-only audit history.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append an entry and return the canonical, hash-linked stored record.
    async fn append(&self, entry: NewAuditEntry) -> StoreResult<AuditEntry>;

    /// Read entries newest-first.
    async fn entries(&self, window: QueryWindow) -> StoreResult<Vec<AuditEntry>>;

    /// Read the entries written during one run, oldest-first.
    async fn entries_for_run(&self, run_id: &RunId) -> StoreResult<Vec<AuditEntry>>;

    /// Get the latest audit hash anchor.
    async fn latest_hash(&self) -> StoreResult<Option<String>>;
}

/// Storage interface for published approval requests and their decisions.
#[async_trait]
pub trait ApprovalRegistry: Send + Sync {
    /// Publish a new request for review. Fails on duplicate request ids.
    async fn publish(&self, request: ApprovalRequest, published_at: DateTime<Utc>)
        -> StoreResult<()>;

    /// Record a decision against a published request. Each request accepts
    /// exactly one decision.
    async fn record_decision(
        &self,
        decision: &ApprovalDecision,
        origin: DecisionOrigin,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<RegistryEntry>;

    /// List requests still awaiting a decision, newest-first.
    async fn pending(&self, window: QueryWindow) -> StoreResult<Vec<RegistryEntry>>;

    /// Get one request by id.
    async fn entry(&self, request_id: &RequestId) -> StoreResult<Option<RegistryEntry>>;
}

/// Unified store bundle used by engine and demo surfaces.
pub trait StaylineStore: AuditStore + ApprovalRegistry + Send + Sync {}

impl<T> StaylineStore for T where T: AuditStore + ApprovalRegistry + Send + Sync {}
