//! Guest identity resolution for hotel-stay records.
//!
//! The pipeline is three pure, synchronous layers:
//!
//! 1. **Normalization**: canonicalize a raw guest name into comparable
//!    tokens (case folding, punctuation removal, title stripping).
//! 2. **Similarity**: a weighted multi-factor score between two records
//!    over name, phone, email, and id-document number.
//! 3. **Clustering**: partition a record batch into duplicate groups,
//!    greedy single-pass by default, transitive closure on request.
//!
//! Field standardization, merge consolidation, and the data-quality
//! score live here too; they share the normalization rules.

#![deny(unsafe_code)]

pub mod cluster;
pub mod merge;
pub mod normalizer;
pub mod quality;
pub mod similarity;
pub mod standardize;

pub use cluster::{
    AggregateImpact, ClusterBuilder, ClusterMode, DedupReport, DuplicateGroup, GroupMember,
    DEFAULT_DETECTION_THRESHOLD,
};
pub use merge::consolidate;
pub use normalizer::{
    digits_only, normalize, normalize_record, NormalizedName, TITLE_PREFIXES, TITLE_SUFFIXES,
};
pub use quality::quality_score;
pub use similarity::{name_similarity, ConfidenceTier, SimilarityResult, SimilarityScorer};
pub use standardize::{
    detect_phone_issues, standardize_name, standardize_phone, standardize_records, FieldSuggestion,
    NameStandardization, StandardizationReport,
};
