//! Merge consolidation: fold duplicate records into their primary.
//!
//! Consolidation is a pure computation. The caller stages the result
//! to the audit log together with the raw inputs; nothing here touches
//! primary storage.

use stayline_types::{GuestRecord, MergeRules};
use tracing::debug;

/// Consolidate duplicates into the primary under the given rules.
///
/// With `keep_latest_contact`, contact fields come from the most
/// recently seen record carrying a value. With `sum_financial_data`,
/// booking counts and revenue are summed over every record. With
/// `preserve_visit_history`, the consolidated stay reflects the most
/// recent visit.
pub fn consolidate(
    primary: &GuestRecord,
    duplicates: &[&GuestRecord],
    rules: &MergeRules,
) -> GuestRecord {
    let mut merged = primary.clone();

    // Primary first, then duplicates, ordered most recent stay first.
    let mut by_recency: Vec<&GuestRecord> = Vec::with_capacity(1 + duplicates.len());
    by_recency.push(primary);
    by_recency.extend(duplicates.iter().copied());
    by_recency.sort_by(|a, b| b.stay.arrival.cmp(&a.stay.arrival));

    if rules.keep_latest_contact {
        merged.phone = first_non_empty(&by_recency, |r| &r.phone);
        merged.email = first_non_empty(&by_recency, |r| &r.email);
        merged.id_number = first_non_empty(&by_recency, |r| &r.id_number);
        merged.nationality = first_non_empty(&by_recency, |r| &r.nationality);
    }

    if rules.sum_financial_data {
        merged.booking_count =
            primary.booking_count + duplicates.iter().map(|r| r.booking_count).sum::<u64>();
        merged.revenue_sum =
            primary.revenue_sum + duplicates.iter().map(|r| r.revenue_sum).sum::<f64>();
    }

    if rules.preserve_visit_history {
        if let Some(most_recent) = by_recency.first() {
            merged.stay = most_recent.stay.clone();
        }
    }

    debug!(
        primary = %primary.id,
        duplicates = duplicates.len(),
        "Consolidated duplicate records"
    );

    merged
}

fn first_non_empty<'a>(
    records: &[&'a GuestRecord],
    field: impl Fn(&'a GuestRecord) -> &'a String,
) -> String {
    records
        .iter()
        .copied()
        .map(field)
        .find(|value| !value.is_empty())
        .cloned()
        .unwrap_or_default()
}
