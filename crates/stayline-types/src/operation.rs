//! The closed operation union the task runner executes.
//!
//! Dispatch is by exhaustive match, never by string lookup; adding an
//! operation means adding a variant and fixing every match site.

use crate::id::{OperationId, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Operation Union ──────────────────────────────────────────────────

/// One unit of work in a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// Read-only duplicate analysis over the record batch.
    DetectDuplicates { threshold: f64 },
    /// Standardize one identity field across the batch.
    StandardizeField {
        field: StandardField,
        auto_fix: bool,
    },
    /// Stage a consolidation of duplicate records into a primary.
    MergeProfiles {
        primary_id: RecordId,
        duplicate_ids: Vec<RecordId>,
        #[serde(default)]
        rules: MergeRules,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::DetectDuplicates { .. } => OperationKind::DetectDuplicates,
            Operation::StandardizeField { .. } => OperationKind::StandardizeField,
            Operation::MergeProfiles { .. } => OperationKind::MergeProfiles,
        }
    }
}

/// Discriminant of [`Operation`], used in approval requests, audit
/// rows, and run summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    DetectDuplicates,
    StandardizeField,
    MergeProfiles,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::DetectDuplicates => "detect_duplicates",
            OperationKind::StandardizeField => "standardize_field",
            OperationKind::MergeProfiles => "merge_profiles",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unknown operation kind: {0}")]
pub struct ParseOperationKindError(pub String);

impl std::str::FromStr for OperationKind {
    type Err = ParseOperationKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "detect_duplicates" => Ok(OperationKind::DetectDuplicates),
            "standardize_field" => Ok(OperationKind::StandardizeField),
            "merge_profiles" => Ok(OperationKind::MergeProfiles),
            other => Err(ParseOperationKindError(other.to_string())),
        }
    }
}

// ── Operation Parameters ─────────────────────────────────────────────

/// Identity field a StandardizeField operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardField {
    Name,
    Phone,
}

impl std::fmt::Display for StandardField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StandardField::Name => write!(f, "name"),
            StandardField::Phone => write!(f, "phone"),
        }
    }
}

/// Consolidation rules applied when a merge is staged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeRules {
    /// Contact fields come from the most recently seen record.
    pub keep_latest_contact: bool,
    /// Booking counts and revenue are summed across all members.
    pub sum_financial_data: bool,
    /// The consolidated stay reflects the most recent visit.
    pub preserve_visit_history: bool,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            keep_latest_contact: true,
            sum_financial_data: true,
            preserve_visit_history: true,
        }
    }
}

// ── Queued Operation ─────────────────────────────────────────────────

/// An operation admitted to a run, with its gating flag fixed at
/// submission time. Immutable once queued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: OperationId,
    pub operation: Operation,
    /// Derived from the risk tier at submission: tiers above low gate.
    pub requires_approval: bool,
}

impl QueuedOperation {
    pub fn new(operation: Operation, requires_approval: bool) -> Self {
        Self {
            id: OperationId::generate(),
            operation,
            requires_approval,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}
