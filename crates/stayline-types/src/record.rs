//! Guest-stay records as supplied by the storage collaborator.
//!
//! A GuestRecord is a read-only snapshot: identity fields plus the
//! booking details of the stay and the per-guest rollups used for
//! impact aggregation. Missing fields default to empty, never to an
//! error, so a partially filled row still clusters.

use crate::id::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Guest Record ─────────────────────────────────────────────────────

/// Immutable snapshot of one guest stay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuestRecord {
    /// Identifier owned by the ingestion side.
    pub id: RecordId,
    /// Raw guest name as captured at the front desk.
    pub full_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phone: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    /// Identity-document number (passport or national id).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nationality: String,
    /// Booking details of this stay.
    #[serde(default)]
    pub stay: StaySnapshot,
    /// Bookings attributed to this guest row by ingestion.
    #[serde(default)]
    pub booking_count: u64,
    /// Revenue attributed to this guest row by ingestion.
    #[serde(default)]
    pub revenue_sum: f64,
}

impl GuestRecord {
    /// Create a record with the given id and raw name; every other
    /// field starts empty.
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(id),
            full_name: full_name.into(),
            ..Self::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_id_number(mut self, id_number: impl Into<String>) -> Self {
        self.id_number = id_number.into();
        self
    }

    pub fn with_nationality(mut self, nationality: impl Into<String>) -> Self {
        self.nationality = nationality.into();
        self
    }

    pub fn with_stay(mut self, stay: StaySnapshot) -> Self {
        self.stay = stay;
        self
    }

    pub fn with_booking_stats(mut self, booking_count: u64, revenue_sum: f64) -> Self {
        self.booking_count = booking_count;
        self.revenue_sum = revenue_sum;
        self
    }
}

// ── Stay Snapshot ────────────────────────────────────────────────────

/// Booking details of a single stay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StaySnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure: Option<DateTime<Utc>>,
    #[serde(default)]
    pub nights: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room_type: String,
    #[serde(default)]
    pub rate: f64,
    /// Distribution channel the booking came through.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    /// Market segment label from the property-management system.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub segment: String,
}

// ── Normalized Identity ──────────────────────────────────────────────

/// Comparable projection of a record's identity fields.
///
/// Derived on demand by `stayline-identity`; never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedIdentity {
    /// Canonical name tokens, lower-cased with titles removed.
    pub name_tokens: Vec<String>,
    /// Digits-only rendering of the phone field.
    pub phone_digits: String,
    /// Lower-cased, trimmed email.
    pub email: String,
    /// Trimmed identity-document number.
    pub id_number: String,
}

impl NormalizedIdentity {
    /// Canonical name, tokens joined by single spaces.
    pub fn name(&self) -> String {
        self.name_tokens.join(" ")
    }

    pub fn has_name(&self) -> bool {
        !self.name_tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_defaults_are_empty() {
        let record = GuestRecord::new("g1", "John Smith");
        assert_eq!(record.phone, "");
        assert_eq!(record.email, "");
        assert_eq!(record.booking_count, 0);
        assert_eq!(record.stay.nights, 0);
    }

    #[test]
    fn builders_fill_identity_fields() {
        let record = GuestRecord::new("g2", "Ibu Siti Rahayu")
            .with_phone("+62 812 3456 7890")
            .with_email("SITI@example.com")
            .with_booking_stats(4, 1250.0);
        assert_eq!(record.phone, "+62 812 3456 7890");
        assert_eq!(record.booking_count, 4);
        assert!((record.revenue_sum - 1250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_fields_are_skipped_in_json() {
        let record = GuestRecord::new("g3", "Jane Doe");
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("\"phone\""));
        assert!(!json.contains("\"email\""));
    }

    #[test]
    fn normalized_identity_joins_tokens() {
        let identity = NormalizedIdentity {
            name_tokens: vec!["john".to_string(), "smith".to_string()],
            ..NormalizedIdentity::default()
        };
        assert_eq!(identity.name(), "john smith");
        assert!(identity.has_name());
    }
}
