#![deny(unsafe_code)]
//! Stayline quality pass demo.
//!
//! Walks one messy hotel guest batch through the full pipeline:
//! 1. Baseline quality measurement (read-only)
//! 2. Orchestrated cleaning run (auto-fix standardization + detection)
//! 3. Gated merges resolved by an external reviewer
//! 4. A held-for-review fix resolved by the fallback policy
//! 5. Hash-linked audit trail review
//!
//! Everything runs in-process against the in-memory store.

use std::sync::Arc;

use anyhow::anyhow;
use stayline_engine::{
    Complexity, Intent, OperationExecutor, Orchestrator, RequestProfile, TaskRunner,
};
use stayline_gate::{ApprovalGate, RiskBasedPolicy, RiskClassifier};
use stayline_identity::{
    quality_score, standardize_records, ClusterBuilder, DEFAULT_DETECTION_THRESHOLD,
};
use stayline_store::memory::InMemoryStaylineStore;
use stayline_store::{QueryWindow, StaylineStore};
use stayline_types::{
    ApprovalDecision, GuestRecord, MergeRules, Operation, QueuedOperation, RunSummary,
    StandardField,
};

// ── Formatting Helpers ──────────────────────────────────────────────────

const BANNER: &str = r#"
 ╔══════════════════════════════════════════════════════════╗
 ║                Stayline  --  Quality Pass                ║
 ║                                                          ║
 ║   Duplicate detection, gated merges, and a hash-linked   ║
 ║   audit trail over one messy guest batch.                ║
 ╚══════════════════════════════════════════════════════════╝
"#;

fn section(title: &str) {
    let width: usize = 58;
    let pad = width.saturating_sub(title.len() + 4);
    let left = pad / 2;
    let right = pad - left;
    println!();
    println!(" ┌{}┐", "─".repeat(width));
    println!(" │{}  {}  {}│", " ".repeat(left), title, " ".repeat(right));
    println!(" └{}┘", "─".repeat(width));
}

fn ok(msg: &str) {
    println!("   [OK]  {}", msg);
}

fn info(msg: &str) {
    println!("   [--]  {}", msg);
}

// ── Main ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    println!("{}", BANNER);

    if let Err(e) = run_demo().await {
        eprintln!();
        eprintln!("   [FATAL]  Demo failed: {}", e);
        std::process::exit(1);
    }

    println!();
    println!(" ══════════════════════════════════════════════════════════");
    println!("  Quality pass complete.");
    println!(" ══════════════════════════════════════════════════════════");
    println!();
}

async fn run_demo() -> anyhow::Result<()> {
    // ── Phase A: Baseline ───────────────────────────────────────────
    section("Phase A: Baseline Quality");

    let records = sample_batch();
    info(&format!("{} guest records as captured at the front desk", records.len()));
    for record in &records {
        info(&format!(
            "  {}  {:<20}  {:<17}  {}",
            record.id, record.full_name, record.phone, record.email
        ));
    }

    let baseline = ClusterBuilder::new(DEFAULT_DETECTION_THRESHOLD).report(&records);
    let name_scan = standardize_records(&records, StandardField::Name);
    let phone_scan = standardize_records(&records, StandardField::Phone);
    let before_score = quality_score(
        Some(baseline.groups.len()),
        Some(name_scan.changed() + phone_scan.changed()),
    );

    ok(&format!(
        "Duplicate groups   : {}  ({:.0}% of records are duplicates)",
        baseline.groups.len(),
        baseline.duplicate_rate * 100.0
    ));
    ok(&format!(
        "Revenue spread over duplicates: {:.0}",
        baseline.potential_revenue_consolidation
    ));
    ok(&format!(
        "Field suggestions  : {} name, {} phone",
        name_scan.changed(),
        phone_scan.changed()
    ));
    ok(&format!("Quality score      : {}", before_score));
    info("Mismatched phone formats drag some pair scores below the");
    info("detection threshold; cleaning first will surface the rest.");

    // ── Phase B: Orchestrated Cleaning ──────────────────────────────
    section("Phase B: Orchestrated Cleaning Run");

    let store = Arc::new(InMemoryStaylineStore::new());
    let runner = TaskRunner::new(
        ApprovalGate::new(),
        OperationExecutor::new(store.clone()),
        store.clone(),
    );
    let orchestrator = Orchestrator::new();
    let profile = RequestProfile {
        primary_intent: Intent::DataQuality,
        complexity: Complexity::Moderate,
        requires_clean_data: true,
        needs_approval: false,
    };

    let plan = orchestrator.plan(&profile);
    info(&format!(
        "Route {:?}, pattern {:?}, {} operations",
        plan.route,
        plan.pattern,
        plan.operations.len()
    ));

    let cleaning = orchestrator
        .dispatch(&profile, records, &runner)
        .await?
        .ok_or_else(|| anyhow!("cleaning plan should carry operations"))?;
    print_summary("Cleaning run", &cleaning);

    let cleaned = runner.records(&cleaning.run_id).await?;
    for record in &cleaned {
        info(&format!(
            "  {}  {:<20}  {}",
            record.id, record.full_name, record.phone
        ));
    }

    // ── Phase C: Duplicate Review ───────────────────────────────────
    section("Phase C: Duplicate Review");

    let report = ClusterBuilder::new(DEFAULT_DETECTION_THRESHOLD).report(&cleaned);
    for group in &report.groups {
        info(&format!(
            "group {}  size={}  confidence={:.2}  bookings={}  revenue={:.0}",
            group.group_id,
            group.size(),
            group.confidence,
            group.aggregate_impact.booking_count,
            group.aggregate_impact.revenue_sum
        ));
        info(&format!("  primary {} ({})", group.primary.id, group.primary.full_name));
        for member in &group.members {
            info(&format!(
                "  member  {} ({})  score {:.2}",
                member.record.id, member.record.full_name, member.similarity.score
            ));
        }
    }

    // ── Phase D: Gated Merges, External Decision ────────────────────
    section("Phase D: Gated Merges");

    let classifier = RiskClassifier::new();
    let operations: Vec<QueuedOperation> = report
        .groups
        .iter()
        .map(|group| {
            let merge = Operation::MergeProfiles {
                primary_id: group.primary.id.clone(),
                duplicate_ids: group.members.iter().map(|m| m.record.id.clone()).collect(),
                rules: MergeRules::default(),
            };
            let tier = classifier.classify(&merge).tier;
            QueuedOperation::new(merge, tier.requires_approval())
        })
        .collect();

    let suspended = runner.submit(operations, cleaned).await?;
    print_summary("Merge run", &suspended);
    for request in &suspended.pending_approval_requests {
        info(&format!(
            "request {}  tier={}  affects {} records",
            request.id.short(),
            request.risk_tier,
            request.affected_record_count
        ));
        info(&format!("  justification : {}", request.justification));
        info(&format!("  recommendation: {}", request.recommendation));
    }

    // The external reviewer signs off on every staged merge.
    let decisions: Vec<ApprovalDecision> = suspended
        .pending_approval_requests
        .iter()
        .map(|request| ApprovalDecision::approve(request.id.clone()))
        .collect();
    let resumed = runner.resume(&suspended.run_id, &decisions).await?;
    print_summary("After external approval", &resumed);

    let merged = runner.records(&suspended.run_id).await?;
    ok(&format!("{} records remain after consolidation", merged.len()));

    // ── Phase E: Fallback Policy ────────────────────────────────────
    section("Phase E: Fallback Policy");

    let auto_runner = TaskRunner::new(
        ApprovalGate::new(),
        OperationExecutor::new(store.clone()),
        store.clone(),
    )
    .with_auto_policy(Arc::new(RiskBasedPolicy));

    let held = Operation::StandardizeField {
        field: StandardField::Phone,
        auto_fix: false,
    };
    let tier = classifier.classify(&held).tier;
    let auto_summary = auto_runner
        .submit(vec![QueuedOperation::new(held, tier.requires_approval())], merged.clone())
        .await?;
    print_summary("Auto-policy run", &auto_summary);
    info("The fallback policy rejects anything above low risk, so the");
    info("held-for-review fix was skipped and the run never suspended.");

    // ── Phase F: Audit Trail + Final Score ──────────────────────────
    section("Phase F: Audit Trail");

    print_audit_trail(store.as_ref()).await?;

    let final_report = ClusterBuilder::new(DEFAULT_DETECTION_THRESHOLD).report(&merged);
    let final_names = standardize_records(&merged, StandardField::Name);
    let final_phones = standardize_records(&merged, StandardField::Phone);
    let after_score = quality_score(
        Some(final_report.groups.len()),
        Some(final_names.changed() + final_phones.changed()),
    );
    ok(&format!("Quality score: {} -> {}", before_score, after_score));

    Ok(())
}

// ── Printing ────────────────────────────────────────────────────────────

fn print_summary(label: &str, summary: &RunSummary) {
    ok(&format!(
        "{}: run {} is {}",
        label,
        summary.run_id.short(),
        summary.state
    ));
    info(&format!(
        "  completed={} skipped={} failed={} pending={} partial={}",
        summary.completed_operations.len(),
        summary.skipped_operations.len(),
        summary.failed_operations.len(),
        summary.pending_approval_requests.len(),
        summary.partial_result
    ));
    for op in &summary.completed_operations {
        if let Some(detail) = &op.detail {
            info(&format!("  {}  {}", op.kind, detail));
        }
    }
}

async fn print_audit_trail<S: StaylineStore>(store: &S) -> anyhow::Result<()> {
    let entries = store.entries(QueryWindow::default()).await?;
    ok(&format!("{} audit entries, newest first", entries.len()));
    for entry in &entries {
        info(&format!(
            "#{}  {}  by {}  {}",
            entry.sequence, entry.operation_kind, entry.actor, entry.summary
        ));
        info(&format!(
            "    hash {}  prev {}",
            &entry.hash[..12],
            entry
                .previous_hash
                .as_deref()
                .map(|h| &h[..12])
                .unwrap_or("genesis")
        ));
    }
    Ok(())
}

// ── Sample Data ─────────────────────────────────────────────────────────

/// One night's worth of front-desk chaos: three spellings of the same
/// frequent guest, a title-cased regular, and a few clean one-timers.
fn sample_batch() -> Vec<GuestRecord> {
    vec![
        GuestRecord::new("g-001", "Budi Santoso")
            .with_phone("+62 812 3456 7890")
            .with_email("budi@gmail.com")
            .with_booking_stats(3, 2700.0),
        GuestRecord::new("g-002", "pak budi santoso")
            .with_phone("0812-3456-7890")
            .with_email("budi@gmail.com")
            .with_booking_stats(2, 1800.0),
        GuestRecord::new("g-003", "BUDI SANTOSO")
            .with_email("budi@gmail.com")
            .with_booking_stats(1, 950.0),
        GuestRecord::new("g-004", "Ibu Siti Rahayu")
            .with_phone("0813 9876 5432")
            .with_email("siti.r@yahoo.com")
            .with_booking_stats(5, 5400.0),
        GuestRecord::new("g-005", "siti rahayu")
            .with_phone("+62 813 9876 5432")
            .with_email("siti.r@yahoo.com")
            .with_booking_stats(1, 950.0),
        GuestRecord::new("g-006", "Agus Wijaya")
            .with_phone("0815 1111 2222")
            .with_email("agus.w@gmail.com")
            .with_booking_stats(2, 1600.0),
        GuestRecord::new("g-007", "Dewi Lestari")
            .with_email("dewi@outlook.com")
            .with_booking_stats(4, 3800.0),
        GuestRecord::new("g-008", "Rian Hidayat")
            .with_phone("0817 3333 4444")
            .with_booking_stats(1, 700.0),
    ]
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_surfaces_the_duplicates_raw_phones_hide() {
        use stayline_identity::{standardize_name, standardize_phone};

        let raw = sample_batch();
        let before = ClusterBuilder::new(DEFAULT_DETECTION_THRESHOLD).report(&raw);
        // Conflicting phone formats pull the scored pairs under the
        // threshold; only the phoneless third Budi spelling matches.
        assert_eq!(before.groups.len(), 1);
        assert_eq!(before.groups[0].size(), 2);

        let mut cleaned = raw;
        for record in &mut cleaned {
            record.full_name = standardize_name(&record.full_name).value;
            record.phone = standardize_phone(&record.phone);
        }
        let after = ClusterBuilder::new(DEFAULT_DETECTION_THRESHOLD).report(&cleaned);
        assert_eq!(after.groups.len(), 2, "Budi and Siti should each form a group");

        let sizes: Vec<usize> = after.groups.iter().map(|g| g.size()).collect();
        assert!(sizes.contains(&3), "three spellings of Budi Santoso");
        assert!(sizes.contains(&2), "two spellings of Siti Rahayu");
    }

    #[test]
    fn demo_profile_plans_a_sequential_quality_pass() {
        let profile = RequestProfile {
            primary_intent: Intent::DataQuality,
            complexity: Complexity::Moderate,
            requires_clean_data: true,
            needs_approval: false,
        };
        let plan = Orchestrator::new().plan(&profile);

        assert_eq!(plan.pattern, stayline_engine::ExecutionPattern::Sequential);
        assert_eq!(plan.operations.len(), 3);
        assert!(plan.operations.iter().all(|op| !op.requires_approval));
    }

    #[test]
    fn baseline_score_reflects_the_mess() {
        let records = sample_batch();
        let report = ClusterBuilder::new(DEFAULT_DETECTION_THRESHOLD).report(&records);
        let names = standardize_records(&records, StandardField::Name);
        let phones = standardize_records(&records, StandardField::Phone);

        let score = quality_score(
            Some(report.groups.len()),
            Some(names.changed() + phones.changed()),
        );
        assert!(score < 100, "a messy batch must not score clean");
        assert!(score >= 60, "the floor holds");
    }
}
