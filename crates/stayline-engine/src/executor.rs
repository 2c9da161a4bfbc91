//! Applies operations to a record batch and stages audit evidence.
//!
//! Detection is read-only. Standardization and merge mutate the batch,
//! and every applied mutation first stages its before/after snapshots to
//! the audit store. For merges the staged raw records are what make the
//! operation reversible.

use crate::error::ExecutorError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use stayline_identity::{consolidate, standardize_records, ClusterBuilder, ClusterMode};
use stayline_identity::{DedupReport, StandardizationReport};
use stayline_store::{AuditStore, NewAuditEntry};
use stayline_types::{
    AuditEntryId, GuestRecord, MergeRules, Operation, OperationKind, QueuedOperation, RecordId,
    RunId, StandardField,
};
use tracing::{debug, info};

const ACTOR: &str = "engine";

// ── Operation Output ─────────────────────────────────────────────────

/// What one applied operation produced.
#[derive(Clone, Debug)]
pub enum OperationOutput {
    Duplicates(DedupReport),
    Standardization(StandardizationReport),
    Merge(MergeReport),
}

/// Result of one applied profile merge.
#[derive(Clone, Debug)]
pub struct MergeReport {
    pub primary_id: RecordId,
    pub merged_ids: Vec<RecordId>,
    pub consolidated: GuestRecord,
    /// Audit row holding the raw pre-merge records.
    pub audit_entry: AuditEntryId,
}

impl OperationOutput {
    /// One-line description for run summaries.
    pub fn summary_line(&self) -> String {
        match self {
            OperationOutput::Duplicates(report) => format!(
                "{} duplicate groups across {} records",
                report.groups.len(),
                report.scanned_records
            ),
            OperationOutput::Standardization(report) => format!(
                "{} {} suggestions across {} records",
                report.suggestions.len(),
                report.field,
                report.scanned
            ),
            OperationOutput::Merge(report) => format!(
                "merged {} records into {}",
                report.merged_ids.len(),
                report.primary_id
            ),
        }
    }
}

// ── Executor ─────────────────────────────────────────────────────────

/// Applies one operation at a time to a record batch.
pub struct OperationExecutor {
    cluster_mode: ClusterMode,
    audit: Arc<dyn AuditStore>,
}

impl OperationExecutor {
    pub fn new(audit: Arc<dyn AuditStore>) -> Self {
        Self {
            cluster_mode: ClusterMode::default(),
            audit,
        }
    }

    pub fn with_cluster_mode(mut self, mode: ClusterMode) -> Self {
        self.cluster_mode = mode;
        self
    }

    /// Apply one operation to the batch. Standardization and merge mutate
    /// `records` in place; detection leaves them untouched.
    pub async fn execute(
        &self,
        operation: &QueuedOperation,
        records: &mut Vec<GuestRecord>,
        run_id: &RunId,
    ) -> Result<OperationOutput, ExecutorError> {
        match &operation.operation {
            Operation::DetectDuplicates { threshold } => {
                let builder = ClusterBuilder::new(*threshold).with_mode(self.cluster_mode);
                let report = builder.report(records);
                debug!(
                    run_id = %run_id,
                    operation_id = %operation.id,
                    groups = report.groups.len(),
                    scanned = report.scanned_records,
                    "Duplicate detection finished"
                );
                Ok(OperationOutput::Duplicates(report))
            }
            Operation::StandardizeField { field, auto_fix } => {
                self.execute_standardize(operation, records, run_id, *field, *auto_fix)
                    .await
            }
            Operation::MergeProfiles {
                primary_id,
                duplicate_ids,
                rules,
            } => {
                self.execute_merge(operation, records, run_id, primary_id, duplicate_ids, rules)
                    .await
            }
        }
    }

    async fn execute_standardize(
        &self,
        operation: &QueuedOperation,
        records: &mut [GuestRecord],
        run_id: &RunId,
        field: StandardField,
        auto_fix: bool,
    ) -> Result<OperationOutput, ExecutorError> {
        let mut report = standardize_records(records, field);

        if auto_fix && report.changed() > 0 {
            let mut affected = Vec::with_capacity(report.suggestions.len());
            let mut before = serde_json::Map::new();
            let mut after = serde_json::Map::new();
            for suggestion in &report.suggestions {
                affected.push(suggestion.record_id.clone());
                before.insert(
                    suggestion.record_id.to_string(),
                    Value::String(suggestion.before.clone()),
                );
                after.insert(
                    suggestion.record_id.to_string(),
                    Value::String(suggestion.after.clone()),
                );
            }

            let entry = self
                .audit
                .append(NewAuditEntry {
                    occurred_at: Utc::now(),
                    actor: ACTOR.to_string(),
                    operation_kind: OperationKind::StandardizeField,
                    operation_id: operation.id.clone(),
                    run_id: Some(run_id.clone()),
                    affected_record_ids: affected,
                    summary: format!(
                        "standardized {} on {} records",
                        field,
                        report.suggestions.len()
                    ),
                    before_summary: Value::Object(before),
                    after_summary: Value::Object(after),
                })
                .await?;

            apply_suggestions(records, &report, field);
            report.audit_entry = Some(entry.entry_id);
            info!(
                run_id = %run_id,
                operation_id = %operation.id,
                field = %field,
                applied = report.suggestions.len(),
                "Applied standardization"
            );
        }

        Ok(OperationOutput::Standardization(report))
    }

    async fn execute_merge(
        &self,
        operation: &QueuedOperation,
        records: &mut Vec<GuestRecord>,
        run_id: &RunId,
        primary_id: &RecordId,
        duplicate_ids: &[RecordId],
        rules: &MergeRules,
    ) -> Result<OperationOutput, ExecutorError> {
        let primary = records
            .iter()
            .find(|record| &record.id == primary_id)
            .cloned()
            .ok_or_else(|| ExecutorError::RecordNotFound(primary_id.clone()))?;

        let mut duplicates = Vec::with_capacity(duplicate_ids.len());
        for id in duplicate_ids {
            let record = records
                .iter()
                .find(|record| &record.id == id)
                .cloned()
                .ok_or_else(|| ExecutorError::RecordNotFound(id.clone()))?;
            duplicates.push(record);
        }

        let duplicate_refs: Vec<&GuestRecord> = duplicates.iter().collect();
        let consolidated = consolidate(&primary, &duplicate_refs, rules);

        // Stage the raw records before touching the batch; the staged
        // snapshot is what makes this merge reversible.
        let before = serde_json::json!({
            "primary": primary,
            "duplicates": duplicates,
        });
        let after = serde_json::to_value(&consolidated)
            .map_err(|e| ExecutorError::Serialization(e.to_string()))?;

        let mut affected = vec![primary_id.clone()];
        affected.extend(duplicate_ids.iter().cloned());

        let entry = self
            .audit
            .append(NewAuditEntry {
                occurred_at: Utc::now(),
                actor: ACTOR.to_string(),
                operation_kind: OperationKind::MergeProfiles,
                operation_id: operation.id.clone(),
                run_id: Some(run_id.clone()),
                affected_record_ids: affected,
                summary: format!(
                    "merged {} duplicates into {}",
                    duplicate_ids.len(),
                    primary_id
                ),
                before_summary: before,
                after_summary: after,
            })
            .await?;

        records.retain(|record| !duplicate_ids.contains(&record.id));
        if let Some(slot) = records.iter_mut().find(|record| &record.id == primary_id) {
            *slot = consolidated.clone();
        }

        info!(
            run_id = %run_id,
            operation_id = %operation.id,
            primary = %primary_id,
            merged = duplicate_ids.len(),
            "Applied profile merge"
        );

        Ok(OperationOutput::Merge(MergeReport {
            primary_id: primary_id.clone(),
            merged_ids: duplicate_ids.to_vec(),
            consolidated,
            audit_entry: entry.entry_id,
        }))
    }
}

fn apply_suggestions(
    records: &mut [GuestRecord],
    report: &StandardizationReport,
    field: StandardField,
) {
    for suggestion in &report.suggestions {
        if let Some(record) = records
            .iter_mut()
            .find(|record| record.id == suggestion.record_id)
        {
            match field {
                StandardField::Name => record.full_name = suggestion.after.clone(),
                StandardField::Phone => record.phone = suggestion.after.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_store::{memory::InMemoryStaylineStore, QueryWindow};

    fn make_record(id: &str, name: &str, phone: &str, email: &str) -> GuestRecord {
        GuestRecord::new(id, name).with_phone(phone).with_email(email)
    }

    fn make_batch() -> Vec<GuestRecord> {
        vec![
            make_record("g-001", "John Smith", "+62 812 3456 789", "john@example.com")
                .with_booking_stats(3, 2000.0),
            make_record(
                "g-002",
                "Pak John Smith",
                "+62 812-3456-789",
                "john@example.com",
            )
            .with_booking_stats(2, 1500.0),
            make_record("g-003", "Jane Doe", "+62 811 9999 111", "jane@example.com")
                .with_booking_stats(1, 800.0),
        ]
    }

    fn make_executor() -> (OperationExecutor, Arc<InMemoryStaylineStore>) {
        let store = Arc::new(InMemoryStaylineStore::new());
        (OperationExecutor::new(store.clone()), store)
    }

    #[tokio::test]
    async fn detection_is_read_only() {
        let (executor, store) = make_executor();
        let mut records = make_batch();
        let operation =
            QueuedOperation::new(Operation::DetectDuplicates { threshold: 0.85 }, false);

        let output = executor
            .execute(&operation, &mut records, &RunId::generate())
            .await
            .unwrap();

        match output {
            OperationOutput::Duplicates(report) => {
                assert_eq!(report.groups.len(), 1);
                assert_eq!(report.groups[0].size(), 2);
            }
            other => panic!("expected duplicates output, got {other:?}"),
        }
        assert_eq!(records, make_batch());
        assert!(store.entries(QueryWindow::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn auto_fix_standardization_rewrites_and_audits() {
        let (executor, store) = make_executor();
        let mut records = vec![make_record(
            "g-010",
            "john smith",
            "+62 812 0000 111",
            "j@example.com",
        )];
        let operation = QueuedOperation::new(
            Operation::StandardizeField {
                field: StandardField::Name,
                auto_fix: true,
            },
            false,
        );

        let output = executor
            .execute(&operation, &mut records, &RunId::generate())
            .await
            .unwrap();

        assert_eq!(records[0].full_name, "John Smith");
        match output {
            OperationOutput::Standardization(report) => {
                assert_eq!(report.changed(), 1);
                assert!(report.audit_entry.is_some());
                assert!(report.suggestions[0]
                    .applied_rules
                    .contains(&"case_correction".to_string()));
            }
            other => panic!("expected standardization output, got {other:?}"),
        }

        let entries = store.entries(QueryWindow::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation_kind, OperationKind::StandardizeField);
        assert_eq!(entries[0].before_summary["g-010"], "john smith");
        assert_eq!(entries[0].after_summary["g-010"], "John Smith");
    }

    #[tokio::test]
    async fn suggest_only_standardization_writes_nothing() {
        let (executor, store) = make_executor();
        let mut records = vec![make_record(
            "g-010",
            "john smith",
            "+62 812 0000 111",
            "j@example.com",
        )];
        let operation = QueuedOperation::new(
            Operation::StandardizeField {
                field: StandardField::Name,
                auto_fix: false,
            },
            true,
        );

        let output = executor
            .execute(&operation, &mut records, &RunId::generate())
            .await
            .unwrap();

        assert_eq!(records[0].full_name, "john smith");
        match output {
            OperationOutput::Standardization(report) => {
                assert_eq!(report.changed(), 1);
                assert!(report.audit_entry.is_none());
            }
            other => panic!("expected standardization output, got {other:?}"),
        }
        assert!(store.entries(QueryWindow::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn merge_consolidates_and_stages_raw_records() {
        let (executor, store) = make_executor();
        let mut records = make_batch();
        let run_id = RunId::generate();
        let operation = QueuedOperation::new(
            Operation::MergeProfiles {
                primary_id: RecordId::new("g-001"),
                duplicate_ids: vec![RecordId::new("g-002")],
                rules: MergeRules::default(),
            },
            true,
        );

        let output = executor
            .execute(&operation, &mut records, &run_id)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        let primary = records
            .iter()
            .find(|r| r.id == RecordId::new("g-001"))
            .unwrap();
        assert_eq!(primary.booking_count, 5);
        assert!((primary.revenue_sum - 3500.0).abs() < 1e-9);

        match output {
            OperationOutput::Merge(report) => {
                assert_eq!(report.merged_ids, vec![RecordId::new("g-002")]);
            }
            other => panic!("expected merge output, got {other:?}"),
        }

        let trace = store.entries_for_run(&run_id).await.unwrap();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].operation_kind, OperationKind::MergeProfiles);
        assert!(trace[0].before_summary["primary"].is_object());
        assert_eq!(trace[0].before_summary["duplicates"].as_array().unwrap().len(), 1);
        assert_eq!(
            trace[0].affected_record_ids,
            vec![RecordId::new("g-001"), RecordId::new("g-002")]
        );
    }

    #[tokio::test]
    async fn merge_with_unknown_record_leaves_batch_untouched() {
        let (executor, store) = make_executor();
        let mut records = make_batch();
        let operation = QueuedOperation::new(
            Operation::MergeProfiles {
                primary_id: RecordId::new("g-001"),
                duplicate_ids: vec![RecordId::new("ghost")],
                rules: MergeRules::default(),
            },
            true,
        );

        let result = executor
            .execute(&operation, &mut records, &RunId::generate())
            .await;

        assert!(matches!(result, Err(ExecutorError::RecordNotFound(_))));
        assert_eq!(records, make_batch());
        assert!(store.entries(QueryWindow::default()).await.unwrap().is_empty());
    }
}
