//! Per-label confusion bookkeeping.
//!
//! Counts are keyed by label name and grow as the calculator walks the
//! predictions of a pass. Labels that are never touched do not appear in
//! the tracker and therefore do not take part in macro averaging.

use crate::core::types::Outcome;
use crate::metrics::utils::{f1_score, safe_division};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TP/FP/FN/TN counts for a single label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusions {
    /// True positives
    pub tp: usize,
    /// False positives
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
    /// True negatives
    pub tn: usize,
}

impl Confusions {
    /// Add `count` occurrences of `outcome`.
    pub fn record(&mut self, outcome: Outcome, count: usize) {
        match outcome {
            Outcome::TP => self.tp += count,
            Outcome::FP => self.fp += count,
            Outcome::FN => self.fn_ += count,
            Outcome::TN => self.tn += count,
        }
    }

    /// Precision, recall and F1 for these counts.
    pub fn compute_metrics(&self) -> PRF1Scores {
        let precision = safe_division(self.tp, self.tp + self.fp);
        let recall = safe_division(self.tp, self.tp + self.fn_);
        PRF1Scores {
            true_positives: self.tp,
            false_positives: self.fp,
            false_negatives: self.fn_,
            precision,
            recall,
            f1: f1_score(precision, recall),
        }
    }
}

/// Precision/recall/F1 of one label together with the counts behind them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PRF1Scores {
    /// True positives
    pub true_positives: usize,
    /// False positives
    pub false_positives: usize,
    /// False negatives
    pub false_negatives: usize,
    /// TP / (TP + FP)
    pub precision: f64,
    /// TP / (TP + FN)
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
}

/// Unweighted mean of per-label scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroPRF1Scores {
    /// Number of labels averaged
    pub num_labels: usize,
    /// Mean precision
    pub precision: f64,
    /// Mean recall
    pub recall: f64,
    /// Mean F1
    pub f1: f64,
}

/// Per-label and macro precision/recall/F1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroPRF1Metrics {
    /// Scores keyed by label name; empty when per-label logging is off
    pub per_label_scores: BTreeMap<String, PRF1Scores>,
    /// Macro aggregate over every label seen in the pass
    pub macro_scores: MacroPRF1Scores,
}

/// Incremental confusion counts keyed by label name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerLabelConfusions {
    label_confusions: BTreeMap<String, Confusions>,
}

impl PerLabelConfusions {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `outcome` for `label`.
    pub fn update(&mut self, label: &str, outcome: Outcome, count: usize) {
        self.label_confusions
            .entry(label.to_string())
            .or_default()
            .record(outcome, count);
    }

    /// Counts recorded for `label`, if it was ever touched.
    pub fn get(&self, label: &str) -> Option<&Confusions> {
        self.label_confusions.get(label)
    }

    /// Counts for `label`, zero when it was never touched.
    pub fn get_or_default(&self, label: &str) -> Confusions {
        self.get(label).copied().unwrap_or_default()
    }

    /// Number of labels touched so far.
    pub fn len(&self) -> usize {
        self.label_confusions.len()
    }

    /// Whether no label has been touched.
    pub fn is_empty(&self) -> bool {
        self.label_confusions.is_empty()
    }

    /// Per-label and macro scores. Reading does not change any counter.
    pub fn compute_metrics(&self, log_per_label_metrics: bool) -> MacroPRF1Metrics {
        let mut per_label_scores = BTreeMap::new();
        let (mut precision_sum, mut recall_sum, mut f1_sum) = (0.0, 0.0, 0.0);

        for (label, confusions) in &self.label_confusions {
            let scores = confusions.compute_metrics();
            precision_sum += scores.precision;
            recall_sum += scores.recall;
            f1_sum += scores.f1;
            if log_per_label_metrics {
                per_label_scores.insert(label.clone(), scores);
            }
        }

        let num_labels = self.label_confusions.len();
        MacroPRF1Metrics {
            per_label_scores,
            macro_scores: MacroPRF1Scores {
                num_labels,
                precision: safe_division(precision_sum, num_labels),
                recall: safe_division(recall_sum, num_labels),
                f1: safe_division(f1_sum, num_labels),
            },
        }
    }
}
