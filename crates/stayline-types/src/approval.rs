//! Approval and risk types.
//!
//! An ApprovalRequest is the frozen form of a gated operation: enough
//! context for a reviewer to decide without seeing the run itself. A
//! request is terminal once decided; a decision is consumed exactly
//! once.

use crate::id::{OperationId, RequestId};
use crate::operation::{Operation, OperationKind, QueuedOperation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Risk Tier ────────────────────────────────────────────────────────

/// Coarse classification of how consequential an operation is.
///
/// Ordered so that comparisons read naturally: `Low < Medium < High`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tiers above low gate execution behind an explicit decision.
    pub fn requires_approval(&self) -> bool {
        *self > RiskTier::Low
    }

    /// Reviewer-facing guidance attached to every emitted request.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskTier::High => "Review carefully: permanent modification",
            RiskTier::Medium => "Consider impact on analytics accuracy",
            RiskTier::Low => "Safe to approve: minimal impact",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Low => write!(f, "low"),
            RiskTier::Medium => write!(f, "medium"),
            RiskTier::High => write!(f, "high"),
        }
    }
}

/// Outcome of classifying one operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub justification: String,
    /// Whether the operation can be undone automatically.
    pub reversible: bool,
}

impl RiskAssessment {
    pub fn recommendation(&self) -> &'static str {
        self.tier.recommendation()
    }
}

// ── Approval Request ─────────────────────────────────────────────────

/// Emitted in a batch when a run suspends on gated operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    /// The queued operation this request gates.
    pub operation_id: OperationId,
    pub operation_kind: OperationKind,
    pub risk_tier: RiskTier,
    pub justification: String,
    /// Tier-appropriate reviewer guidance.
    pub recommendation: String,
    pub affected_record_count: usize,
    pub reversible: bool,
    /// Full operation parameters, serialized with the request.
    pub parameters: Operation,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// Freeze a queued operation into a reviewable request.
    pub fn for_operation(
        operation: &QueuedOperation,
        assessment: &RiskAssessment,
        affected_record_count: usize,
    ) -> Self {
        Self {
            id: RequestId::generate(),
            operation_id: operation.id.clone(),
            operation_kind: operation.kind(),
            risk_tier: assessment.tier,
            justification: assessment.justification.clone(),
            recommendation: assessment.recommendation().to_string(),
            affected_record_count,
            reversible: assessment.reversible,
            parameters: operation.operation.clone(),
            created_at: Utc::now(),
        }
    }
}

// ── Approval Decision ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approved,
    Rejected,
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionOutcome::Approved => write!(f, "approved"),
            DecisionOutcome::Rejected => write!(f, "rejected"),
        }
    }
}

/// Who produced a decision: an external reviewer or the configured
/// fallback policy. Logged and recorded so the two are never confused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOrigin {
    External,
    AutoPolicy,
}

impl std::fmt::Display for DecisionOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionOrigin::External => write!(f, "external"),
            DecisionOrigin::AutoPolicy => write!(f, "auto_policy"),
        }
    }
}

/// One reviewer verdict, keyed by request id. Batches may be partial;
/// undecided requests simply stay pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    pub request_id: RequestId,
    pub outcome: DecisionOutcome,
}

impl ApprovalDecision {
    pub fn approve(request_id: RequestId) -> Self {
        Self {
            request_id,
            outcome: DecisionOutcome::Approved,
        }
    }

    pub fn reject(request_id: RequestId) -> Self {
        Self {
            request_id,
            outcome: DecisionOutcome::Rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_assessment(tier: RiskTier) -> RiskAssessment {
        RiskAssessment {
            tier,
            justification: "test justification".to_string(),
            reversible: tier != RiskTier::High,
        }
    }

    #[test]
    fn tier_ordering_drives_gating() {
        assert!(!RiskTier::Low.requires_approval());
        assert!(RiskTier::Medium.requires_approval());
        assert!(RiskTier::High.requires_approval());
        assert!(RiskTier::Low < RiskTier::High);
    }

    #[test]
    fn request_carries_operation_context() {
        let queued = QueuedOperation::new(Operation::DetectDuplicates { threshold: 0.6 }, true);
        let request = ApprovalRequest::for_operation(&queued, &make_assessment(RiskTier::Medium), 12);

        assert_eq!(request.operation_id, queued.id);
        assert_eq!(request.operation_kind, OperationKind::DetectDuplicates);
        assert_eq!(request.affected_record_count, 12);
        assert_eq!(request.recommendation, RiskTier::Medium.recommendation());
        assert_eq!(request.parameters, queued.operation);
    }

    #[test]
    fn decision_serializes_with_snake_case_outcome() {
        let decision = ApprovalDecision::reject(RequestId::new("req-1"));
        let json = serde_json::to_string(&decision).unwrap();
        assert!(json.contains("\"outcome\":\"rejected\""));
    }

    #[test]
    fn origins_render_distinctly() {
        assert_eq!(DecisionOrigin::External.to_string(), "external");
        assert_eq!(DecisionOrigin::AutoPolicy.to_string(), "auto_policy");
    }
}
