//! Shared domain types for the Stayline identity and approval core.
//!
//! Everything here is plain data: guest-stay records, the operation
//! union driven by the task runner, approval requests and decisions,
//! and run summaries. Behavior lives in the sibling crates
//! (`stayline-identity`, `stayline-gate`, `stayline-engine`).

#![deny(unsafe_code)]

pub mod approval;
pub mod id;
pub mod operation;
pub mod record;
pub mod run;

pub use approval::{
    ApprovalDecision, ApprovalRequest, DecisionOrigin, DecisionOutcome, RiskAssessment, RiskTier,
};
pub use id::{AuditEntryId, GroupId, OperationId, RecordId, RequestId, RunId};
pub use operation::{
    MergeRules, Operation, OperationKind, ParseOperationKindError, QueuedOperation, StandardField,
};
pub use record::{GuestRecord, NormalizedIdentity, StaySnapshot};
pub use run::{OperationSummary, RunState, RunSummary};
