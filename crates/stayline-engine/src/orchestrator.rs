//! Request routing.
//!
//! Maps a structured [`RequestProfile`] onto a route and an operation
//! sequence for the runner. Turning natural language into a profile is
//! the caller's job; everything from profile to plan is deterministic.

use crate::error::EngineResult;
use crate::runner::TaskRunner;
use serde::{Deserialize, Serialize};
use stayline_gate::RiskClassifier;
use stayline_identity::DEFAULT_DETECTION_THRESHOLD;
use stayline_types::{GuestRecord, Operation, QueuedOperation, RunSummary, StandardField};
use tracing::debug;

/// Broad goal of an incoming request.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Analytics,
    DataQuality,
    Mixed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Structured profile of a request, as classified upstream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestProfile {
    pub primary_intent: Intent,
    pub complexity: Complexity,
    /// Cleaning operations run before anything that reads the batch.
    pub requires_clean_data: bool,
    /// Hold rule-based fixes for review instead of applying them.
    pub needs_approval: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    AnalyticsAgent,
    DataQualityAgent,
    MultiAgentWorkflow,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPattern {
    Direct,
    Sequential,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    pub route: Route,
    pub pattern: ExecutionPattern,
    pub operations: Vec<QueuedOperation>,
}

/// Deterministic router from request profile to operation plan.
#[derive(Clone, Copy, Debug, Default)]
pub struct Orchestrator {
    classifier: RiskClassifier,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            classifier: RiskClassifier::new(),
        }
    }

    /// Map a profile to its route, pattern and operation sequence.
    ///
    /// Mixed intent and complex requests route to the multi-agent
    /// workflow; sequential plans place cleaning before detection;
    /// every planned operation carries its gating flag derived from
    /// risk classification.
    pub fn plan(&self, profile: &RequestProfile) -> RoutePlan {
        let route = match (profile.primary_intent, profile.complexity) {
            (Intent::Mixed, _) | (_, Complexity::Complex) => Route::MultiAgentWorkflow,
            (Intent::Analytics, _) => Route::AnalyticsAgent,
            (Intent::DataQuality, _) => Route::DataQualityAgent,
        };
        let pattern = if profile.requires_clean_data {
            ExecutionPattern::Sequential
        } else {
            ExecutionPattern::Direct
        };

        let auto_fix = !profile.needs_approval;
        let mut operations = Vec::new();
        if pattern == ExecutionPattern::Sequential {
            operations.push(Operation::StandardizeField {
                field: StandardField::Name,
                auto_fix,
            });
            operations.push(Operation::StandardizeField {
                field: StandardField::Phone,
                auto_fix,
            });
        }
        if route != Route::AnalyticsAgent {
            operations.push(Operation::DetectDuplicates {
                threshold: DEFAULT_DETECTION_THRESHOLD,
            });
        }

        let operations: Vec<QueuedOperation> = operations
            .into_iter()
            .map(|operation| {
                let gated = self.classifier.classify(&operation).tier.requires_approval();
                QueuedOperation::new(operation, gated)
            })
            .collect();

        debug!(
            route = ?route,
            pattern = ?pattern,
            operations = operations.len(),
            "Planned request"
        );
        RoutePlan {
            route,
            pattern,
            operations,
        }
    }

    /// Plan and submit in one step. Plans carrying no local operations
    /// (pure analytics handoffs) return `None` without touching the
    /// runner.
    pub async fn dispatch(
        &self,
        profile: &RequestProfile,
        records: Vec<GuestRecord>,
        runner: &TaskRunner,
    ) -> EngineResult<Option<RunSummary>> {
        let plan = self.plan(profile);
        if plan.operations.is_empty() {
            debug!(route = ?plan.route, "Plan carries no local operations");
            return Ok(None);
        }
        let summary = runner.submit(plan.operations, records).await?;
        Ok(Some(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_types::OperationKind;

    fn profile(intent: Intent, complexity: Complexity) -> RequestProfile {
        RequestProfile {
            primary_intent: intent,
            complexity,
            requires_clean_data: false,
            needs_approval: false,
        }
    }

    #[test]
    fn mixed_and_complex_requests_route_to_the_workflow() {
        let orchestrator = Orchestrator::new();

        let mixed = orchestrator.plan(&profile(Intent::Mixed, Complexity::Simple));
        assert_eq!(mixed.route, Route::MultiAgentWorkflow);

        let complex = orchestrator.plan(&profile(Intent::Analytics, Complexity::Complex));
        assert_eq!(complex.route, Route::MultiAgentWorkflow);
    }

    #[test]
    fn pure_analytics_requests_plan_no_local_operations() {
        let plan = Orchestrator::new().plan(&profile(Intent::Analytics, Complexity::Simple));

        assert_eq!(plan.route, Route::AnalyticsAgent);
        assert_eq!(plan.pattern, ExecutionPattern::Direct);
        assert!(plan.operations.is_empty());
    }

    #[test]
    fn clean_data_requests_standardize_before_detection() {
        let mut profile = profile(Intent::DataQuality, Complexity::Moderate);
        profile.requires_clean_data = true;

        let plan = Orchestrator::new().plan(&profile);
        assert_eq!(plan.pattern, ExecutionPattern::Sequential);

        let kinds: Vec<OperationKind> = plan.operations.iter().map(|op| op.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::StandardizeField,
                OperationKind::StandardizeField,
                OperationKind::DetectDuplicates,
            ]
        );
        // Auto-fix standardization and strict detection both sit in the
        // low tier.
        assert!(plan.operations.iter().all(|op| !op.requires_approval));
    }

    #[test]
    fn approval_requests_hold_fixes_for_review() {
        let mut profile = profile(Intent::DataQuality, Complexity::Simple);
        profile.requires_clean_data = true;
        profile.needs_approval = true;

        let plan = Orchestrator::new().plan(&profile);
        let standardize: Vec<_> = plan
            .operations
            .iter()
            .filter(|op| op.kind() == OperationKind::StandardizeField)
            .collect();

        assert_eq!(standardize.len(), 2);
        assert!(standardize.iter().all(|op| op.requires_approval));
        for op in standardize {
            match &op.operation {
                Operation::StandardizeField { auto_fix, .. } => assert!(!*auto_fix),
                other => panic!("unexpected operation: {other:?}"),
            }
        }
    }

    #[test]
    fn default_detection_threshold_stays_ungated() {
        let plan = Orchestrator::new().plan(&profile(Intent::DataQuality, Complexity::Simple));

        assert_eq!(plan.operations.len(), 1);
        let op = &plan.operations[0];
        assert_eq!(op.kind(), OperationKind::DetectDuplicates);
        assert!(!op.requires_approval);
        match &op.operation {
            Operation::DetectDuplicates { threshold } => {
                assert!((threshold - DEFAULT_DETECTION_THRESHOLD).abs() < f64::EPSILON);
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }
}
