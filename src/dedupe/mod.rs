//! Fuzzy duplicate-group suggestions for one page of search results.
//!
//! Clustering is a single greedy pass in input order: the first unassigned
//! entry anchors a group, every later unassigned entry close enough to the
//! anchor joins it and is consumed. Membership is single-link through the
//! anchor only — two members of a group need not be similar to each other.
//! Complexity is O(n²) string comparisons, bounded by the page size.

pub mod similarity;

use crate::models::{DedupeGroup, ItemSummary};
use similarity::similarity;

/// Threshold policy for admitting an entry into an anchor's group.
///
/// An entry joins when subject and sender are both close, or when the
/// subject alone is a near-exact match (senders often differ across
/// newsletter relays even for identical mails).
#[derive(Debug, Clone, Copy)]
pub struct DedupePolicy {
    /// Subject score floor for the paired rule.
    pub subject_pair: f64,
    /// Sender score floor for the paired rule.
    pub sender_pair: f64,
    /// Subject score floor for the subject-only rule.
    pub subject_only: f64,
    /// Emit at most this many groups per page.
    pub max_groups: usize,
}

impl Default for DedupePolicy {
    fn default() -> Self {
        Self {
            subject_pair: 0.75,
            sender_pair: 0.60,
            subject_only: 0.85,
            max_groups: 50,
        }
    }
}

/// Cluster one page of summaries under the default policy.
pub fn cluster(entries: &[ItemSummary]) -> Vec<DedupeGroup> {
    cluster_with(entries, &DedupePolicy::default())
}

/// Cluster one page of summaries under an explicit policy.
///
/// Guarantees: every id appears in at most one group, groups always have
/// more than one member, and the emitted subject/sender come from the
/// group's anchor entry.
pub fn cluster_with(entries: &[ItemSummary], policy: &DedupePolicy) -> Vec<DedupeGroup> {
    let mut groups = Vec::new();
    let mut used = vec![false; entries.len()];

    for i in 0..entries.len() {
        if used[i] {
            continue;
        }
        if groups.len() >= policy.max_groups {
            break;
        }

        let anchor = &entries[i];
        let mut ids = vec![anchor.id.clone()];

        for j in (i + 1)..entries.len() {
            if used[j] {
                continue;
            }
            let candidate = &entries[j];
            let subject_score = similarity(&anchor.subject, &candidate.subject);
            let sender_score = similarity(&anchor.sender, &candidate.sender);

            let admitted = (subject_score > policy.subject_pair
                && sender_score > policy.sender_pair)
                || subject_score > policy.subject_only;

            if admitted {
                used[j] = true;
                ids.push(candidate.id.clone());
            }
        }

        if ids.len() > 1 {
            used[i] = true;
            log::debug!(
                "dedupe group of {} anchored on '{}'",
                ids.len(),
                anchor.subject
            );
            groups.push(DedupeGroup {
                subject: anchor.subject.clone(),
                sender: anchor.sender.clone(),
                count: ids.len(),
                ids,
            });
        }
    }

    groups
}
