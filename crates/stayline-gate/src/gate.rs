//! Request construction for gated operations.

use crate::risk::RiskClassifier;
use stayline_types::{ApprovalRequest, Operation, QueuedOperation, RiskAssessment};
use tracing::debug;

/// Decides which operations gate and freezes them into approval
/// requests. Stateless apart from the classifier it wraps.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApprovalGate {
    classifier: RiskClassifier,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self {
            classifier: RiskClassifier::new(),
        }
    }

    pub fn assess(&self, operation: &Operation) -> RiskAssessment {
        self.classifier.classify(operation)
    }

    /// Tiers above low gate execution behind an explicit decision.
    pub fn requires_approval(&self, operation: &Operation) -> bool {
        self.assess(operation).tier.requires_approval()
    }

    /// Freeze a queued operation into a reviewable request.
    pub fn request_for(
        &self,
        operation: &QueuedOperation,
        affected_record_count: usize,
    ) -> ApprovalRequest {
        let assessment = self.assess(&operation.operation);
        let request = ApprovalRequest::for_operation(operation, &assessment, affected_record_count);
        debug!(
            request_id = %request.id,
            operation_id = %operation.id,
            kind = %operation.kind(),
            risk_tier = %request.risk_tier,
            affected = affected_record_count,
            "Approval request created"
        );
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_types::{MergeRules, OperationKind, RecordId, RiskTier, StandardField};

    fn make_gate() -> ApprovalGate {
        ApprovalGate::new()
    }

    #[test]
    fn gating_follows_the_tier() {
        let gate = make_gate();
        assert!(gate.requires_approval(&Operation::MergeProfiles {
            primary_id: RecordId::new("p"),
            duplicate_ids: vec![],
            rules: MergeRules::default(),
        }));
        assert!(gate.requires_approval(&Operation::StandardizeField {
            field: StandardField::Name,
            auto_fix: false,
        }));
        assert!(!gate.requires_approval(&Operation::StandardizeField {
            field: StandardField::Name,
            auto_fix: true,
        }));
        assert!(!gate.requires_approval(&Operation::DetectDuplicates { threshold: 0.85 }));
        assert!(gate.requires_approval(&Operation::DetectDuplicates { threshold: 0.6 }));
    }

    #[test]
    fn request_reflects_the_assessment() {
        let gate = make_gate();
        let queued = QueuedOperation::new(
            Operation::MergeProfiles {
                primary_id: RecordId::new("p"),
                duplicate_ids: vec![RecordId::new("d1"), RecordId::new("d2")],
                rules: MergeRules::default(),
            },
            true,
        );
        let request = gate.request_for(&queued, 3);

        assert_eq!(request.operation_kind, OperationKind::MergeProfiles);
        assert_eq!(request.risk_tier, RiskTier::High);
        assert_eq!(request.affected_record_count, 3);
        assert!(!request.reversible);
        assert_eq!(request.recommendation, RiskTier::High.recommendation());
        assert_eq!(request.operation_id, queued.id);
    }

    #[test]
    fn two_requests_for_one_operation_get_distinct_ids() {
        let gate = make_gate();
        let queued = QueuedOperation::new(Operation::DetectDuplicates { threshold: 0.5 }, true);
        let first = gate.request_for(&queued, 10);
        let second = gate.request_for(&queued, 10);
        assert_ne!(first.id, second.id);
        assert_eq!(first.operation_id, second.operation_id);
    }
}
