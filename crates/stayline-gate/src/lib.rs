//! Approval gating for sensitive operations.
//!
//! The gate sits between planning and execution. Every operation is
//! risk-classified; tiers above low require an explicit decision
//! before any side effect. The gate itself never executes anything:
//! it freezes a queued operation into an [`ApprovalRequest`] and
//! leaves suspension and resumption to the task runner.
//!
//! [`ApprovalRequest`]: stayline_types::ApprovalRequest

pub mod gate;
pub mod policy;
pub mod risk;

pub use gate::ApprovalGate;
pub use policy::{ApprovalPolicy, RiskBasedPolicy};
pub use risk::RiskClassifier;
