//! Approval policies: programmatic stand-ins for a human reviewer.
//!
//! A policy is only consulted when the runner is explicitly configured
//! with one; the default runner suspends and waits for external
//! decisions. Policy decisions are recorded with their origin so they
//! are never mistaken for a human verdict.

use stayline_types::{ApprovalRequest, DecisionOutcome, RiskTier};
use tracing::info;

/// Resolves an approval request without an external reviewer.
pub trait ApprovalPolicy: Send + Sync {
    fn decide(&self, request: &ApprovalRequest) -> DecisionOutcome;

    /// Stable name used in logs and decision records.
    fn name(&self) -> &'static str;
}

/// Default fallback: approve low-risk requests, reject everything
/// above.
#[derive(Clone, Copy, Debug, Default)]
pub struct RiskBasedPolicy;

impl ApprovalPolicy for RiskBasedPolicy {
    fn decide(&self, request: &ApprovalRequest) -> DecisionOutcome {
        let outcome = if request.risk_tier == RiskTier::Low {
            DecisionOutcome::Approved
        } else {
            DecisionOutcome::Rejected
        };
        info!(
            request_id = %request.id,
            risk_tier = %request.risk_tier,
            outcome = %outcome,
            policy = self.name(),
            "Policy resolved approval request"
        );
        outcome
    }

    fn name(&self) -> &'static str {
        "risk_based"
    }
}
