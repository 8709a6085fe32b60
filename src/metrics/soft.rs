//! Score-dependent metrics: average precision, ROC-AUC,
//! recall-at-precision and the Matthews correlation coefficient.
//!
//! The per-label functions take one boolean relevance and one score per
//! example. Sorting is stable and descending by score, so among tied
//! scores the earlier example keeps its place.

use crate::core::types::Score;
use crate::metrics::utils::safe_division;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Best recall reachable while keeping precision above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecallAtPrecision {
    /// Minimum precision required
    pub precision_threshold: f64,
    /// Maximum recall achieved at or above the threshold, 0 when unreachable
    pub recall: f64,
    /// Lowest score cut-off achieving that recall, 0 when unreachable
    pub decision_threshold: f64,
}

/// Soft-score metrics of a single label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftClassificationMetrics {
    /// Area under the precision/recall curve (step interpolation)
    pub average_precision: f64,
    /// One entry per configured precision threshold, in configured order
    pub recall_at_precision: Vec<RecallAtPrecision>,
    /// One-vs-rest ROC-AUC; absent when the label has no positive or no negative
    pub roc_auc: Option<f64>,
}

impl SoftClassificationMetrics {
    /// Compute every soft metric for one label.
    pub fn compute(y_true: &[bool], y_score: &[Score], thresholds: &[f64]) -> Self {
        let (true_sorted, score_sorted) = sort_by_score_desc(y_true, y_score);
        Self {
            average_precision: average_precision(&true_sorted, &score_sorted),
            recall_at_precision: recall_at_precision(&true_sorted, &score_sorted, thresholds),
            roc_auc: roc_auc(y_true, y_score),
        }
    }

    /// Recall recorded for `precision_threshold`, if it was configured.
    pub fn recall_at(&self, precision_threshold: f64) -> Option<f64> {
        self.recall_at_precision
            .iter()
            .find(|entry| entry.precision_threshold == precision_threshold)
            .map(|entry| entry.recall)
    }
}

fn descending(a: &Score, b: &Score) -> Ordering {
    b.total_cmp(a)
}

/// Reorder relevance and score by descending score.
pub fn sort_by_score_desc(y_true: &[bool], y_score: &[Score]) -> (Vec<bool>, Vec<Score>) {
    let mut order: Vec<usize> = (0..y_score.len().min(y_true.len())).collect();
    order.sort_by(|&a, &b| descending(&y_score[a], &y_score[b]));
    let true_sorted = order.iter().map(|&i| y_true[i]).collect();
    let score_sorted = order.iter().map(|&i| y_score[i]).collect();
    (true_sorted, score_sorted)
}

/// Indices closing each run of equal scores in a descending score list.
fn threshold_indices(score_sorted: &[Score]) -> impl Iterator<Item = usize> + '_ {
    (0..score_sorted.len())
        .filter(move |&i| i + 1 == score_sorted.len() || score_sorted[i] != score_sorted[i + 1])
}

/// Average precision over distinct score thresholds, 0 without positives.
pub fn average_precision(true_sorted: &[bool], score_sorted: &[Score]) -> f64 {
    let total_positive = true_sorted.iter().filter(|&&t| t).count();
    if total_positive == 0 {
        return 0.0;
    }

    let cumulative = cumulative_positives(true_sorted);
    let mut previous_recall = 0.0;
    let mut ap = 0.0;
    for i in threshold_indices(score_sorted) {
        let tp = cumulative[i];
        let precision = safe_division(tp, i + 1);
        let recall = safe_division(tp, total_positive);
        ap += (recall - previous_recall) * precision;
        previous_recall = recall;
    }
    ap
}

fn cumulative_positives(true_sorted: &[bool]) -> Vec<usize> {
    true_sorted
        .iter()
        .scan(0usize, |acc, &t| {
            *acc += usize::from(t);
            Some(*acc)
        })
        .collect()
}

/// Maximum recall and matching score cut-off for each precision threshold.
///
/// Only cut-offs at the end of a run of equal scores are considered, since
/// a decision threshold cannot separate tied examples.
pub fn recall_at_precision(
    true_sorted: &[bool],
    score_sorted: &[Score],
    thresholds: &[f64],
) -> Vec<RecallAtPrecision> {
    let mut table: Vec<RecallAtPrecision> = thresholds
        .iter()
        .map(|&precision_threshold| RecallAtPrecision {
            precision_threshold,
            recall: 0.0,
            decision_threshold: 0.0,
        })
        .collect();

    let total_positive = true_sorted.iter().filter(|&&t| t).count();
    if total_positive == 0 {
        return table;
    }

    let cumulative = cumulative_positives(true_sorted);
    let cut_offs: Vec<(f64, f64, Score)> = threshold_indices(score_sorted)
        .map(|i| {
            let precision = safe_division(cumulative[i], i + 1);
            let recall = safe_division(cumulative[i], total_positive);
            (precision, recall, score_sorted[i])
        })
        .collect();

    for entry in &mut table {
        let mut best: Option<(f64, Score)> = None;
        for &(precision, recall, score) in &cut_offs {
            if precision < entry.precision_threshold {
                continue;
            }
            best = Some(match best {
                None => (recall, score),
                Some((best_recall, best_score)) => {
                    (best_recall.max(recall), best_score.min(score))
                }
            });
        }
        if let Some((recall, score)) = best {
            entry.recall = recall;
            entry.decision_threshold = f64::from(score);
        }
    }
    table
}

/// Area under the ROC curve via the rank statistic, ties counted as half.
///
/// `None` when every example is positive or every example is negative.
pub fn roc_auc(y_true: &[bool], y_score: &[Score]) -> Option<f64> {
    let n = y_true.len().min(y_score.len());
    let positives = y_true[..n].iter().filter(|&&t| t).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    // average 1-based ranks over runs of tied scores
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let tied_positives = order[start..end].iter().filter(|&&i| y_true[i]).count();
        positive_rank_sum += average_rank * tied_positives as f64;
        start = end;
    }

    let p = positives as f64;
    let u = positive_rank_sum - p * (p + 1.0) / 2.0;
    Some(u / (p * negatives as f64))
}

/// Matthews correlation coefficient from binary confusion counts.
pub fn matthews_correlation(tp: usize, fp: usize, fn_: usize, tn: usize) -> f64 {
    let (tp, fp, fn_, tn) = (tp as f64, fp as f64, fn_ as f64, tn as f64);
    let numerator = tp * tn - fp * fn_;
    let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    safe_division(numerator, denominator)
}
