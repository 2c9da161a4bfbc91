use crate::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stayline_types::{
    ApprovalRequest, AuditEntryId, DecisionOrigin, DecisionOutcome, OperationId, OperationKind,
    RecordId, RunId,
};

/// Audit append payload. Identifiers, sequencing, and hashes are assigned by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditEntry {
    pub occurred_at: DateTime<Utc>,
    pub actor: String,
    pub operation_kind: OperationKind,
    pub operation_id: OperationId,
    pub run_id: Option<RunId>,
    pub affected_record_ids: Vec<RecordId>,
    pub summary: String,
    /// Snapshot of the touched records before the operation was applied.
    #[serde(default)]
    pub before_summary: Value,
    /// Snapshot of the resulting records after the operation was applied.
    #[serde(default)]
    pub after_summary: Value,
}

impl NewAuditEntry {
    /// Chain hash over the entry content, its position, and the previous
    /// hash. Every backend assigns hashes through this one function so
    /// histories verify identically regardless of where they were written.
    pub(crate) fn chain_hash(
        &self,
        previous_hash: Option<&str>,
        sequence: u64,
    ) -> StoreResult<String> {
        let serializable = serde_json::json!({
            "previous_hash": previous_hash,
            "sequence": sequence,
            "occurred_at": self.occurred_at,
            "actor": self.actor,
            "operation_kind": self.operation_kind,
            "operation_id": self.operation_id.0,
            "run_id": self.run_id.as_ref().map(|id| id.0.clone()),
            "affected_record_ids": self.affected_record_ids,
            "summary": self.summary,
            "before_summary": self.before_summary,
            "after_summary": self.after_summary,
        });
        let serialized = serde_json::to_vec(&serializable)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(blake3::hash(&serialized).to_hex().to_string())
    }
}

/// Persistent tamper-evident audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: AuditEntryId,
    pub sequence: u64,
    pub occurred_at: DateTime<Utc>,
    pub actor: String,
    pub operation_kind: OperationKind,
    pub operation_id: OperationId,
    pub run_id: Option<RunId>,
    pub affected_record_ids: Vec<RecordId>,
    pub summary: String,
    pub before_summary: Value,
    pub after_summary: Value,
    pub previous_hash: Option<String>,
    pub hash: String,
}

/// Published approval request plus any decision recorded against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub request: ApprovalRequest,
    pub published_at: DateTime<Utc>,
    pub outcome: Option<DecisionOutcome>,
    pub origin: Option<DecisionOrigin>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl RegistryEntry {
    /// A request stays pending until a decision is recorded for it.
    pub fn is_pending(&self) -> bool {
        self.outcome.is_none()
    }
}
