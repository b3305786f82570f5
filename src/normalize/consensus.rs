// src/normalize/consensus.rs

use ahash::AHashMap;

use crate::annotation::AnnotationVoteSet;

/// Majority label of a vote set.
#[derive(Debug, Clone, PartialEq)]
pub struct Consensus {
    pub label: String,
    /// Occurrences of `label` in the pooled list.
    pub votes: usize,
    /// Size of the pooled list, every label from every genome.
    pub total: usize,
}

impl Consensus {
    /// `votes / total`, always within [0, 1].
    pub fn confidence(&self) -> f64 {
        self.votes as f64 / self.total as f64
    }
}

/// Most frequent label of `votes`, or `None` when no genome voted.
///
/// Ties go to the label that appears first in the pooled list.
pub fn majority_label(votes: &AnnotationVoteSet) -> Option<Consensus> {
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut slot: AHashMap<&str, usize> = AHashMap::new();

    for label in &votes.labels {
        match slot.get(label.as_str()) {
            Some(&i) => order[i].1 += 1,
            None => {
                slot.insert(label.as_str(), order.len());
                order.push((label.as_str(), 1));
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for &(label, count) in &order {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }

    best.map(|(label, count)| Consensus {
        label: label.to_string(),
        votes: count,
        total: votes.labels.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote_set(labels: &[&str]) -> AnnotationVoteSet {
        AnnotationVoteSet {
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn pooled_labels_count_every_occurrence() {
        let c = majority_label(&vote_set(&["kinase", "kinase", "transferase", "kinase"])).unwrap();
        assert_eq!(c.label, "kinase");
        assert_eq!((c.votes, c.total), (3, 4));
        assert_eq!(c.confidence(), 0.75);
    }

    #[test]
    fn unanimous_and_all_distinct() {
        let c = majority_label(&vote_set(&["permease", "permease"])).unwrap();
        assert_eq!(c.confidence(), 1.0);

        let c = majority_label(&vote_set(&["b", "a", "c"])).unwrap();
        assert_eq!(c.confidence(), 1.0 / 3.0);
        // first seen wins the tie
        assert_eq!(c.label, "b");
    }

    #[test]
    fn later_label_wins_only_with_more_votes() {
        let c = majority_label(&vote_set(&["x", "y", "y", "x", "y"])).unwrap();
        assert_eq!(c.label, "y");
        let c = majority_label(&vote_set(&["x", "y", "y", "x"])).unwrap();
        assert_eq!(c.label, "x");
    }

    #[test]
    fn no_votes_no_consensus() {
        assert!(majority_label(&AnnotationVoteSet::default()).is_none());
    }
}
