//! Deterministic risk classification of operations.

use stayline_types::{Operation, RiskAssessment, RiskTier};
use tracing::warn;

/// Maps an operation to a risk tier with a reviewer-facing
/// justification. Pure and total: classification never fails, never
/// panics, and identical input always yields an identical assessment.
#[derive(Clone, Copy, Debug, Default)]
pub struct RiskClassifier;

impl RiskClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, operation: &Operation) -> RiskAssessment {
        match operation {
            Operation::MergeProfiles { .. } => RiskAssessment {
                tier: RiskTier::High,
                justification:
                    "permanently modifies consolidated identity; not automatically reversible \
                     unless staged"
                        .to_string(),
                reversible: false,
            },
            Operation::StandardizeField { auto_fix: true, field } => RiskAssessment {
                tier: RiskTier::Low,
                justification: format!(
                    "rule-based {field} normalization; original values preserved in the audit \
                     trail"
                ),
                reversible: true,
            },
            Operation::StandardizeField { auto_fix: false, field } => RiskAssessment {
                tier: RiskTier::Medium,
                justification: format!(
                    "{field} rewrite held for review; affects analytics groupings"
                ),
                reversible: true,
            },
            Operation::DetectDuplicates { threshold }
                if !threshold.is_finite() || !(0.0..=1.0).contains(threshold) =>
            {
                warn!(threshold = *threshold, "Operation parameters fall outside any risk rule");
                RiskAssessment {
                    tier: RiskTier::Low,
                    justification: "unclassified operation; manual review recommended".to_string(),
                    reversible: true,
                }
            }
            Operation::DetectDuplicates { threshold } if *threshold < 0.7 => RiskAssessment {
                tier: RiskTier::Medium,
                justification:
                    "low similarity threshold raises the false-positive rate of duplicate \
                     detection"
                        .to_string(),
                reversible: true,
            },
            Operation::DetectDuplicates { .. } => RiskAssessment {
                tier: RiskTier::Low,
                justification: "read-only duplicate analysis".to_string(),
                reversible: true,
            },
        }
    }
}
