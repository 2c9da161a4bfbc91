//! Duplicate-group construction over a record batch.
//!
//! The default mode is a greedy single pass: records are visited in
//! input order, and each unprocessed record absorbs every later
//! unprocessed record scoring at or above the threshold. A single pass
//! can miss transitive matches (A~B and B~C without A~C); that is a
//! known, accepted approximation. Callers who want the full closure
//! over the similarity graph opt into [`ClusterMode::TransitiveClosure`].
//!
//! Comparison count grows quadratically with batch size. Batches of
//! hundreds to low thousands of records are fine; beyond that, shard
//! the batch before clustering.

use crate::similarity::{SimilarityResult, SimilarityScorer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stayline_types::{GroupId, GuestRecord, RecordId};
use tracing::debug;

/// Detection threshold used when a caller does not pick one.
pub const DEFAULT_DETECTION_THRESHOLD: f64 = 0.85;

// ── Duplicate Group ──────────────────────────────────────────────────

/// A non-primary record and how it matched into the group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub record: GuestRecord,
    /// Similarity against the group's primary record.
    pub similarity: SimilarityResult,
}

/// Booking volume and revenue carried by a whole group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateImpact {
    pub booking_count: u64,
    pub revenue_sum: f64,
}

/// A cluster of records believed to be the same guest.
///
/// Always has at least two records: the primary plus one member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub group_id: GroupId,
    /// Representative record; callers pre-sort the batch by a
    /// deterministic key (for example descending booking value) so
    /// primary selection is deterministic.
    pub primary: GuestRecord,
    pub members: Vec<GroupMember>,
    /// Highest member similarity against the primary.
    pub confidence: f64,
    /// Sums over the primary and every member.
    pub aggregate_impact: AggregateImpact,
}

impl DuplicateGroup {
    pub fn new(primary: GuestRecord, members: Vec<GroupMember>) -> Self {
        let confidence = members
            .iter()
            .map(|m| m.similarity.score)
            .fold(0.0, f64::max);
        let booking_count =
            primary.booking_count + members.iter().map(|m| m.record.booking_count).sum::<u64>();
        let revenue_sum =
            primary.revenue_sum + members.iter().map(|m| m.record.revenue_sum).sum::<f64>();
        Self {
            group_id: GroupId::generate(),
            primary,
            members,
            confidence,
            aggregate_impact: AggregateImpact {
                booking_count,
                revenue_sum,
            },
        }
    }

    /// Total records in the group, primary included.
    pub fn size(&self) -> usize {
        1 + self.members.len()
    }

    /// Ids of the non-primary members, in match order.
    pub fn member_ids(&self) -> Vec<RecordId> {
        self.members.iter().map(|m| m.record.id.clone()).collect()
    }
}

// ── Cluster Builder ──────────────────────────────────────────────────

/// How groups are formed from pairwise scores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    /// Single greedy pass in input order. Reference behavior.
    #[default]
    Greedy,
    /// Union-find over every pair at or above the threshold.
    TransitiveClosure,
}

/// Partitions a batch into duplicate groups.
#[derive(Clone, Debug)]
pub struct ClusterBuilder {
    scorer: SimilarityScorer,
    threshold: f64,
    mode: ClusterMode,
}

impl ClusterBuilder {
    pub fn new(threshold: f64) -> Self {
        Self {
            scorer: SimilarityScorer::new(),
            threshold,
            mode: ClusterMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ClusterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Group the batch. Singletons are dropped: a group exists only
    /// when at least one pair reached the threshold.
    pub fn cluster(&self, records: &[GuestRecord]) -> Vec<DuplicateGroup> {
        let groups = match self.mode {
            ClusterMode::Greedy => self.cluster_greedy(records),
            ClusterMode::TransitiveClosure => self.cluster_transitive(records),
        };
        debug!(
            records = records.len(),
            groups = groups.len(),
            threshold = self.threshold,
            mode = ?self.mode,
            "Clustered record batch"
        );
        groups
    }

    /// Cluster and fold the result into a report with batch statistics.
    pub fn report(&self, records: &[GuestRecord]) -> DedupReport {
        DedupReport::from_groups(self.cluster(records), records.len())
    }

    fn cluster_greedy(&self, records: &[GuestRecord]) -> Vec<DuplicateGroup> {
        let mut processed = vec![false; records.len()];
        let mut groups = Vec::new();

        for i in 0..records.len() {
            if processed[i] {
                continue;
            }
            let mut members = Vec::new();
            for j in (i + 1)..records.len() {
                if processed[j] {
                    continue;
                }
                let similarity = self.scorer.score(&records[i], &records[j]);
                if similarity.score >= self.threshold {
                    processed[j] = true;
                    members.push(GroupMember {
                        record: records[j].clone(),
                        similarity,
                    });
                }
            }
            if !members.is_empty() {
                processed[i] = true;
                groups.push(DuplicateGroup::new(records[i].clone(), members));
            }
        }

        groups
    }

    fn cluster_transitive(&self, records: &[GuestRecord]) -> Vec<DuplicateGroup> {
        let mut parent: Vec<usize> = (0..records.len()).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                let similarity = self.scorer.score(&records[i], &records[j]);
                if similarity.score >= self.threshold {
                    let root_i = find(&mut parent, i);
                    let root_j = find(&mut parent, j);
                    if root_i != root_j {
                        parent[root_j] = root_i;
                    }
                }
            }
        }

        // Collect components in first-seen input order.
        let mut order = Vec::new();
        let mut buckets: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..records.len() {
            let root = find(&mut parent, i);
            buckets
                .entry(root)
                .or_insert_with(|| {
                    order.push(root);
                    Vec::new()
                })
                .push(i);
        }

        let mut groups = Vec::new();
        for root in order {
            let indices = &buckets[&root];
            if indices.len() < 2 {
                continue;
            }
            let primary = records[indices[0]].clone();
            // Member similarity is reported against the primary; a
            // transitively reached member may score below the
            // threshold here.
            let members = indices[1..]
                .iter()
                .map(|&idx| GroupMember {
                    similarity: self.scorer.score(&primary, &records[idx]),
                    record: records[idx].clone(),
                })
                .collect();
            groups.push(DuplicateGroup::new(primary, members));
        }

        groups
    }
}

// ── Deduplication Report ─────────────────────────────────────────────

/// Clustering output plus the batch statistics review surfaces show.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DedupReport {
    pub groups: Vec<DuplicateGroup>,
    pub scanned_records: usize,
    /// Fraction of scanned records that are non-primary members.
    pub duplicate_rate: f64,
    /// Revenue currently attributed to non-primary members.
    pub potential_revenue_consolidation: f64,
    pub average_group_size: f64,
}

impl DedupReport {
    pub fn from_groups(groups: Vec<DuplicateGroup>, scanned_records: usize) -> Self {
        let duplicate_members: usize = groups.iter().map(|g| g.members.len()).sum();
        let duplicate_rate = if scanned_records == 0 {
            0.0
        } else {
            duplicate_members as f64 / scanned_records as f64
        };
        let potential_revenue_consolidation = groups
            .iter()
            .flat_map(|g| g.members.iter())
            .map(|m| m.record.revenue_sum)
            .sum();
        let grouped: usize = groups.iter().map(DuplicateGroup::size).sum();
        let average_group_size = if groups.is_empty() {
            0.0
        } else {
            grouped as f64 / groups.len() as f64
        };
        Self {
            groups,
            scanned_records,
            duplicate_rate,
            potential_revenue_consolidation,
            average_group_size,
        }
    }
}
