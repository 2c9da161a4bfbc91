//! Field standardization: suggested rewrites of noisy identity fields.
//!
//! A scan produces one suggestion per record whose value would change;
//! unchanged values are never suggested, which keeps the audit trail
//! limited to real rewrites.

use crate::normalizer::{digits_only, TITLE_PREFIXES, TITLE_SUFFIXES};
use serde::{Deserialize, Serialize};
use stayline_types::{AuditEntryId, GuestRecord, RecordId, StandardField};
use tracing::debug;

// ── Name Standardization ─────────────────────────────────────────────

/// Result of standardizing a single name value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameStandardization {
    pub value: String,
    /// `title_removal` and/or `case_correction`.
    pub applied_rules: Vec<String>,
}

/// Strip title words, collapse whitespace, and proper-case each word.
pub fn standardize_name(raw: &str) -> NameStandardization {
    let words: Vec<&str> = raw.split_whitespace().collect();
    let kept: Vec<&str> = words
        .iter()
        .copied()
        .filter(|word| !is_title_word(word))
        .collect();
    let cased: Vec<String> = kept.iter().map(|word| proper_case(word)).collect();
    let value = cased.join(" ");

    let mut applied_rules = Vec::new();
    if kept.len() != words.len() {
        applied_rules.push("title_removal".to_string());
    }
    if kept.join(" ") != value {
        applied_rules.push("case_correction".to_string());
    }

    NameStandardization {
        value,
        applied_rules,
    }
}

fn is_title_word(word: &str) -> bool {
    let key: String = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    TITLE_PREFIXES.contains(&key.as_str()) || TITLE_SUFFIXES.contains(&key.as_str())
}

fn proper_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

// ── Phone Standardization ────────────────────────────────────────────

/// Reformat a phone number into `+62` grouped form.
///
/// Digits starting with the country code or a domestic leading zero
/// are regrouped; anything else is returned untouched.
pub fn standardize_phone(raw: &str) -> String {
    let digits = digits_only(raw);
    if digits.starts_with("62") && digits.len() >= 10 {
        format!("+62 {} {} {}", &digits[2..5], &digits[5..9], &digits[9..])
    } else if digits.starts_with('0') && digits.len() >= 9 {
        format!("+62 {} {} {}", &digits[1..4], &digits[4..8], &digits[8..])
    } else {
        raw.trim().to_string()
    }
}

/// Label what is wrong with a raw phone value.
pub fn detect_phone_issues(raw: &str) -> Vec<String> {
    let mut issues = Vec::new();
    let doubled_whitespace = raw
        .chars()
        .zip(raw.chars().skip(1))
        .any(|(a, b)| a.is_whitespace() && b.is_whitespace());
    if doubled_whitespace {
        issues.push("spacing".to_string());
    }
    if !raw.trim_start().starts_with('+') && digits_only(raw).len() > 8 {
        issues.push("missing_country_code".to_string());
    }
    issues
}

// ── Batch Scan ───────────────────────────────────────────────────────

/// One proposed rewrite for one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSuggestion {
    pub record_id: RecordId,
    pub before: String,
    pub after: String,
    pub applied_rules: Vec<String>,
}

/// Result of one standardization scan over a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardizationReport {
    pub field: StandardField,
    pub scanned: usize,
    /// Only records whose value actually changes appear here.
    pub suggestions: Vec<FieldSuggestion>,
    /// Audit row staged for this scan, if any change was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_entry: Option<AuditEntryId>,
}

impl StandardizationReport {
    pub fn changed(&self) -> usize {
        self.suggestions.len()
    }
}

/// Scan a batch and collect suggestions for the given field.
pub fn standardize_records(records: &[GuestRecord], field: StandardField) -> StandardizationReport {
    let mut suggestions = Vec::new();
    for record in records {
        match field {
            StandardField::Name => {
                if record.full_name.is_empty() {
                    continue;
                }
                let outcome = standardize_name(&record.full_name);
                // Never suggest wiping a name that was all titles.
                if outcome.value.is_empty() || outcome.value == record.full_name {
                    continue;
                }
                suggestions.push(FieldSuggestion {
                    record_id: record.id.clone(),
                    before: record.full_name.clone(),
                    after: outcome.value,
                    applied_rules: outcome.applied_rules,
                });
            }
            StandardField::Phone => {
                if record.phone.is_empty() {
                    continue;
                }
                let after = standardize_phone(&record.phone);
                if after == record.phone {
                    continue;
                }
                suggestions.push(FieldSuggestion {
                    record_id: record.id.clone(),
                    before: record.phone.clone(),
                    after,
                    applied_rules: detect_phone_issues(&record.phone),
                });
            }
        }
    }

    debug!(
        field = %field,
        scanned = records.len(),
        changed = suggestions.len(),
        "Standardization scan"
    );

    StandardizationReport {
        field,
        scanned: records.len(),
        suggestions,
        audit_entry: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_standardization_strips_titles_and_cases() {
        let outcome = standardize_name("pak BUDI santoso");
        assert_eq!(outcome.value, "Budi Santoso");
        assert_eq!(outcome.applied_rules, vec!["title_removal", "case_correction"]);
    }

    #[test]
    fn name_with_clean_value_applies_no_rules() {
        let outcome = standardize_name("Budi Santoso");
        assert_eq!(outcome.value, "Budi Santoso");
        assert!(outcome.applied_rules.is_empty());
    }

    #[test]
    fn dotted_titles_are_recognized() {
        let outcome = standardize_name("Dr. Ahmad Wijaya, S.E.");
        // "Wijaya," keeps its comma; only casing and titles change.
        assert_eq!(outcome.value, "Ahmad Wijaya,");
        assert!(outcome.applied_rules.contains(&"title_removal".to_string()));
    }

    #[test]
    fn case_only_change_reports_case_correction() {
        let outcome = standardize_name("JOHN SMITH");
        assert_eq!(outcome.value, "John Smith");
        assert_eq!(outcome.applied_rules, vec!["case_correction"]);
    }

    #[test]
    fn country_code_numbers_are_regrouped() {
        assert_eq!(standardize_phone("628123456789"), "+62 812 3456 789");
        assert_eq!(standardize_phone("62 812-3456-789"), "+62 812 3456 789");
    }

    #[test]
    fn domestic_numbers_gain_the_country_code() {
        assert_eq!(standardize_phone("08123456789"), "+62 812 3456 789");
    }

    #[test]
    fn foreign_or_short_numbers_pass_through() {
        assert_eq!(standardize_phone("+1 415 555 0100"), "+1 415 555 0100");
        assert_eq!(standardize_phone("  62123  "), "62123");
    }

    #[test]
    fn phone_issues_are_labeled() {
        assert_eq!(
            detect_phone_issues("0812  345 6789"),
            vec!["spacing", "missing_country_code"]
        );
        assert_eq!(detect_phone_issues("+62 812 3456 789"), Vec::<String>::new());
        assert_eq!(detect_phone_issues("0812345"), Vec::<String>::new());
    }

    #[test]
    fn scan_suggests_only_changed_records() {
        let records = vec![
            GuestRecord::new("g1", "pak budi santoso"),
            GuestRecord::new("g2", "Jane Doe"),
            GuestRecord::new("g3", ""),
            GuestRecord::new("g4", "Hj"),
        ];
        let report = standardize_records(&records, StandardField::Name);
        assert_eq!(report.scanned, 4);
        assert_eq!(report.changed(), 1);
        assert_eq!(report.suggestions[0].record_id, RecordId::new("g1"));
        assert_eq!(report.suggestions[0].after, "Budi Santoso");
    }

    #[test]
    fn phone_scan_carries_issue_labels() {
        let records = vec![
            GuestRecord::new("g1", "Guest One").with_phone("0812  3456  789"),
            GuestRecord::new("g2", "Guest Two").with_phone("+62 812 3456 789"),
        ];
        let report = standardize_records(&records, StandardField::Phone);
        assert_eq!(report.changed(), 1);
        let suggestion = &report.suggestions[0];
        assert_eq!(suggestion.after, "+62 812 3456 789");
        assert!(suggestion.applied_rules.contains(&"spacing".to_string()));
    }
}
