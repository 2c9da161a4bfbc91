//! Name canonicalization.
//!
//! Guest names arrive with honorifics, degrees, inconsistent casing,
//! and stray punctuation. Normalization folds all of that away so the
//! scorer compares what is left: the actual name tokens.

use stayline_types::{GuestRecord, NormalizedIdentity};

/// Honorific prefixes removed during normalization.
pub const TITLE_PREFIXES: [&str; 10] = [
    "pak", "bu", "bapak", "ibu", "dr", "prof", "h", "hj", "drs", "ir",
];

/// Degree and generational suffixes removed during normalization.
pub const TITLE_SUFFIXES: [&str; 10] = [
    "se", "st", "mt", "msc", "phd", "md", "jr", "sr", "ii", "iii",
];

// ── Normalized Name ──────────────────────────────────────────────────

/// Canonical token sequence produced by [`normalize`].
///
/// Tokens are lower-cased, punctuation-free, and stripped of titles.
/// Component accessors skip single-character tokens, which are initials
/// or punctuation residue rather than name parts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizedName {
    tokens: Vec<String>,
}

impl NormalizedName {
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Full canonical name, tokens joined by single spaces.
    pub fn full(&self) -> String {
        self.tokens.join(" ")
    }

    /// First name component, ignoring single-character tokens.
    pub fn first_component(&self) -> Option<&str> {
        self.components().next()
    }

    /// Last name component, ignoring single-character tokens.
    pub fn last_component(&self) -> Option<&str> {
        self.components().last()
    }

    fn components(&self) -> impl Iterator<Item = &str> {
        self.tokens
            .iter()
            .map(String::as_str)
            .filter(|token| token.chars().count() > 1)
    }
}

// ── Normalization ────────────────────────────────────────────────────

/// Canonicalize a raw guest name.
///
/// Lower-cases, replaces every non-alphanumeric non-space character
/// with a space, collapses whitespace, then drops tokens found in the
/// title lists. Empty input yields an empty result; never fails.
pub fn normalize(name: &str) -> NormalizedName {
    let lowered = name.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    let tokens = cleaned
        .split_whitespace()
        .filter(|token| !TITLE_PREFIXES.contains(token) && !TITLE_SUFFIXES.contains(token))
        .map(str::to_string)
        .collect();

    NormalizedName::from_tokens(tokens)
}

/// Keep only the ASCII digits of a value.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Project a record's identity fields into comparable form.
pub fn normalize_record(record: &GuestRecord) -> NormalizedIdentity {
    NormalizedIdentity {
        name_tokens: normalize(&record.full_name).into_tokens(),
        phone_digits: digits_only(&record.phone),
        email: record.email.trim().to_lowercase(),
        id_number: record.id_number.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_title_prefixes() {
        assert_eq!(normalize("Pak John Smith").full(), "john smith");
        assert_eq!(normalize("Ibu Siti Rahayu").full(), "siti rahayu");
        assert_eq!(normalize("Bapak Budi Santoso").full(), "budi santoso");
    }

    #[test]
    fn strips_title_suffixes() {
        assert_eq!(normalize("Ahmad Wijaya SE").full(), "ahmad wijaya");
        assert_eq!(normalize("Rina Kusuma MSc").full(), "rina kusuma");
    }

    #[test]
    fn punctuation_becomes_spaces_not_joins() {
        // "S.E." survives as single-character residue, which the
        // component accessors then skip.
        let name = normalize("Dr. Ahmad Wijaya, S.E.");
        assert_eq!(name.full(), "ahmad wijaya s e");
        assert_eq!(name.first_component(), Some("ahmad"));
        assert_eq!(name.last_component(), Some("wijaya"));
    }

    #[test]
    fn collapses_whitespace_and_case() {
        assert_eq!(normalize("  JOHN    smith ").full(), "john smith");
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let name = normalize("");
        assert!(name.is_empty());
        assert_eq!(name.full(), "");
        assert_eq!(name.first_component(), None);
        assert_eq!(name.last_component(), None);
    }

    #[test]
    fn all_title_input_yields_empty_result() {
        assert!(normalize("Pak Dr").is_empty());
    }

    #[test]
    fn single_name_has_equal_first_and_last() {
        let name = normalize("Sukarno");
        assert_eq!(name.first_component(), Some("sukarno"));
        assert_eq!(name.last_component(), Some("sukarno"));
    }

    #[test]
    fn digits_only_drops_formatting() {
        assert_eq!(digits_only("+62 812-3456-7890"), "6281234567890");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn record_projection_normalizes_all_fields() {
        let record = GuestRecord::new("g1", "Pak Budi Santoso")
            .with_phone("+62 812 3456 789")
            .with_email("  Budi@Example.COM ")
            .with_id_number(" KTP-332211 ");
        let identity = normalize_record(&record);
        assert_eq!(identity.name(), "budi santoso");
        assert_eq!(identity.phone_digits, "628123456789");
        assert_eq!(identity.email, "budi@example.com");
        assert_eq!(identity.id_number, "KTP-332211");
    }
}
