//! Multi-factor similarity between two guest records.
//!
//! Four factors contribute: name (0.4), phone (0.3), email (0.2), and
//! id-document number (0.1). A factor only participates when both
//! records carry a value for it, and the weighted sum is divided by
//! the participating weight. A pair that agrees on every field it has
//! scores 1.0 even when most fields are missing; a pair sharing no
//! field scores 0.

use crate::normalizer::{normalize_record, NormalizedName};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stayline_types::{GuestRecord, RecordId};

pub const NAME_WEIGHT: f64 = 0.4;
pub const PHONE_WEIGHT: f64 = 0.3;
pub const EMAIL_WEIGHT: f64 = 0.2;
pub const ID_NUMBER_WEIGHT: f64 = 0.1;

/// Phones with 8 or fewer digits are too short to identify a guest.
const MIN_PHONE_DIGITS: usize = 9;

// ── Similarity Result ────────────────────────────────────────────────

/// Score and audit trail for one record pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Renormalized weighted score in `[0, 1]`.
    pub score: f64,
    /// Ordered factor labels, written for review surfaces.
    pub matched_factors: Vec<String>,
    pub source_record_id: RecordId,
    pub target_record_id: RecordId,
}

impl SimilarityResult {
    pub fn tier(&self) -> ConfidenceTier {
        ConfidenceTier::from_score(self.score)
    }
}

/// Coarse confidence bands used by review surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceTier::High
        } else if score >= 0.5 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceTier::High => write!(f, "high"),
            ConfidenceTier::Medium => write!(f, "medium"),
            ConfidenceTier::Low => write!(f, "low"),
        }
    }
}

// ── Scorer ───────────────────────────────────────────────────────────

/// Stateless pairwise scorer. Symmetric: `score(a, b) == score(b, a)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, a: &GuestRecord, b: &GuestRecord) -> SimilarityResult {
        let left = normalize_record(a);
        let right = normalize_record(b);

        let mut weighted = 0.0;
        let mut participating = 0.0;
        let mut matched_factors = Vec::new();

        if left.has_name() && right.has_name() {
            participating += NAME_WEIGHT;
            let name_score = name_similarity(
                &NormalizedName::from_tokens(left.name_tokens.clone()),
                &NormalizedName::from_tokens(right.name_tokens.clone()),
            );
            weighted += name_score * NAME_WEIGHT;
            if name_score > 0.8 {
                matched_factors.push(format!("Strong name match ({:.1}%)", name_score * 100.0));
            }
        }

        if !left.phone_digits.is_empty() && !right.phone_digits.is_empty() {
            participating += PHONE_WEIGHT;
            if left.phone_digits == right.phone_digits
                && left.phone_digits.len() >= MIN_PHONE_DIGITS
            {
                weighted += PHONE_WEIGHT;
                matched_factors.push("Exact phone match".to_string());
            }
        }

        if !left.email.is_empty() && !right.email.is_empty() {
            participating += EMAIL_WEIGHT;
            if left.email == right.email {
                weighted += EMAIL_WEIGHT;
                matched_factors.push("Exact email match".to_string());
            }
        }

        if !left.id_number.is_empty() && !right.id_number.is_empty() {
            participating += ID_NUMBER_WEIGHT;
            if left.id_number == right.id_number {
                weighted += ID_NUMBER_WEIGHT;
                matched_factors.push("ID number match".to_string());
            }
        }

        let score = if participating > 0.0 {
            weighted / participating
        } else {
            0.0
        };

        SimilarityResult {
            score,
            matched_factors,
            source_record_id: a.id.clone(),
            target_record_id: b.id.clone(),
        }
    }
}

/// Name sub-score ladder. Only the highest qualifying rule applies:
/// exact full match, then first+last component match, then a single
/// matching component (length over 2), and finally a character-set
/// Jaccard fallback for heavy spelling noise.
pub fn name_similarity(a: &NormalizedName, b: &NormalizedName) -> f64 {
    let full_a = a.full();
    let full_b = b.full();
    if full_a == full_b {
        return 1.0;
    }

    let first_match = matches!(
        (a.first_component(), b.first_component()),
        (Some(x), Some(y)) if x == y
    );
    let last_match = matches!(
        (a.last_component(), b.last_component()),
        (Some(x), Some(y)) if x == y
    );

    if first_match && last_match {
        return 0.9;
    }
    if first_match && a.first_component().is_some_and(|t| t.chars().count() > 2) {
        return 0.7;
    }
    if last_match && a.last_component().is_some_and(|t| t.chars().count() > 2) {
        return 0.6;
    }

    let jaccard = char_jaccard(&full_a, &full_b);
    if jaccard > 0.8 {
        jaccard * 0.8
    } else {
        0.0
    }
}

fn char_jaccard(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    intersection / union
}
