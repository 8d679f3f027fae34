//! Classification metrics for held-out evaluation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub roc_auc: f64,
    pub samples: usize,
}

impl EvaluationReport {
    pub fn from_scores(scores: &[f64], labels: &[bool]) -> Self {
        Self {
            accuracy: accuracy(scores, labels),
            roc_auc: roc_auc(scores, labels),
            samples: scores.len().min(labels.len()),
        }
    }
}

/// Share of rows where `score >= 0.5` agrees with the label. 0 when empty.
pub fn accuracy(scores: &[f64], labels: &[bool]) -> f64 {
    let total = scores.len().min(labels.len());
    if total == 0 {
        return 0.0;
    }
    let correct = scores
        .iter()
        .zip(labels)
        .filter(|(score, label)| (**score >= 0.5) == **label)
        .count();
    correct as f64 / total as f64
}

/// Area under the ROC curve via the rank-sum formulation, averaging ranks
/// over tied scores. With only one class present the curve is undefined and
/// 0.5 is reported.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> f64 {
    let n = scores.len().min(labels.len());
    let positives = labels[..n].iter().filter(|l| **l).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| scores[*a].total_cmp(&scores[*b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block i..=j shares the mean rank.
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for idx in &order[i..=j] {
            if labels[*idx] {
                positive_rank_sum += mean_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let scores = [0.9, 0.2, 0.6, 0.4];
        let labels = [true, false, false, false];
        assert_eq!(accuracy(&scores, &labels), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let labels = [false, false, true, true];
        assert_eq!(roc_auc(&[0.1, 0.2, 0.8, 0.9], &labels), 1.0);
        assert_eq!(roc_auc(&[0.9, 0.8, 0.2, 0.1], &labels), 0.0);
    }

    #[test]
    fn test_roc_auc_known_value() {
        // sklearn.metrics.roc_auc_score([0, 0, 1, 1], [0.1, 0.4, 0.35, 0.8]) == 0.75
        let auc = roc_auc(&[0.1, 0.4, 0.35, 0.8], &[false, false, true, true]);
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_ties_and_single_class() {
        assert_eq!(roc_auc(&[0.5, 0.5, 0.5, 0.5], &[true, false, true, false]), 0.5);
        assert_eq!(roc_auc(&[0.1, 0.9], &[true, true]), 0.5);
    }

    #[test]
    fn test_report() {
        let report = EvaluationReport::from_scores(&[0.8, 0.3], &[true, false]);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(report.roc_auc, 1.0);
        assert_eq!(report.samples, 2);
    }
}
