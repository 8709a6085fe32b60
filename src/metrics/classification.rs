//! Classification metric calculator.
//!
//! One report-assembly routine serves the single-label, multi-label and
//! top-k reporters. The prediction types differ only in what counts as a
//! hit, which confusion entries an example produces and whether
//! score-dependent metrics apply; those three questions are answered by
//! [`LabeledPrediction`].

use crate::core::{
    constants::{NO_LABEL, RECALL_AT_PRECISION_THRESHOLDS},
    error::{ReporterError, Result},
    types::*,
};
use crate::metrics::confusion::{MacroPRF1Metrics, PerLabelConfusions};
use crate::metrics::soft::{self, SoftClassificationMetrics};
use crate::metrics::utils::safe_division;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Capability interface shared by the three prediction shapes.
pub trait LabeledPrediction {
    /// Whether per-label soft scores apply.
    const SUPPORTS_SOFT_SCORES: bool;

    /// Whether overall ROC-AUC and MCC apply to a two-label catalogue.
    /// Only meaningful when each example has exactly one expected label.
    const SUPPORTS_BINARY_METRICS: bool = false;

    /// Scores of this example.
    fn scores(&self) -> &ScoreVector;

    /// `(hits, opportunities)` this example adds to accuracy.
    fn accuracy_tally(&self) -> (usize, usize);

    /// Confusion entries this example adds, one count each.
    fn confusion_updates(&self) -> Vec<(LabelIndex, Outcome)>;

    /// Whether `label` is one of the expected labels.
    fn is_expected(&self, label: LabelIndex) -> bool;

    /// Every catalogue offset the example refers to.
    fn referenced_labels(&self) -> Vec<LabelIndex>;
}

/// Single-label multi-class prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrediction {
    /// Scores of every label, or withheld
    pub scores: ScoreVector,
    /// Predicted label
    pub predicted: LabelIndex,
    /// Expected label
    pub expected: LabelIndex,
}

impl LabelPrediction {
    /// Create a new prediction.
    pub fn new(scores: ScoreVector, predicted: LabelIndex, expected: LabelIndex) -> Self {
        Self { scores, predicted, expected }
    }
}

impl LabeledPrediction for LabelPrediction {
    const SUPPORTS_SOFT_SCORES: bool = true;
    const SUPPORTS_BINARY_METRICS: bool = true;

    fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    fn accuracy_tally(&self) -> (usize, usize) {
        (usize::from(self.predicted == self.expected), 1)
    }

    fn confusion_updates(&self) -> Vec<(LabelIndex, Outcome)> {
        if self.predicted == self.expected {
            vec![(self.expected, Outcome::TP)]
        } else {
            vec![(self.expected, Outcome::FN), (self.predicted, Outcome::FP)]
        }
    }

    fn is_expected(&self, label: LabelIndex) -> bool {
        self.expected == label
    }

    fn referenced_labels(&self) -> Vec<LabelIndex> {
        vec![self.predicted, self.expected]
    }
}

/// Multi-label prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelListPrediction {
    /// Scores of every label, or withheld
    pub scores: ScoreVector,
    /// Labels with a positive indicator, ascending
    pub predicted: Vec<LabelIndex>,
    /// Expected labels with padding removed
    pub expected: Vec<LabelIndex>,
}

impl LabelListPrediction {
    /// Create a new prediction from already-resolved label sets.
    pub fn new(scores: ScoreVector, predicted: Vec<LabelIndex>, expected: Vec<LabelIndex>) -> Self {
        Self { scores, predicted, expected }
    }

    /// Build from an indicator row and a padded target row.
    ///
    /// Every indicator position greater than zero is a predicted label.
    /// Target entries equal to [`NO_LABEL`] are padding and skipped; any
    /// other negative entry is out of range.
    pub fn from_raw(scores: ScoreVector, indicator: &[RawLabel], padded_expected: &[RawLabel]) -> Result<Self> {
        let predicted = Self::labels_from_indicator(indicator);
        let expected = Self::labels_from_padded(padded_expected, indicator.len())?;
        Ok(Self::new(scores, predicted, expected))
    }

    /// Positions of an indicator row holding a positive value.
    pub fn labels_from_indicator(indicator: &[RawLabel]) -> Vec<LabelIndex> {
        indicator
            .iter()
            .enumerate()
            .filter(|(_, &flag)| flag > 0)
            .map(|(index, _)| index)
            .collect()
    }

    /// Label offsets of a padded target row, padding removed.
    pub fn labels_from_padded(padded: &[RawLabel], num_labels: usize) -> Result<Vec<LabelIndex>> {
        let mut labels = Vec::with_capacity(padded.len());
        for &raw in padded {
            if raw == NO_LABEL {
                continue;
            }
            let index =
                LabelIndex::try_from(raw).map_err(|_| ReporterError::index_out_of_bounds(raw, num_labels))?;
            labels.push(index);
        }
        Ok(labels)
    }

    fn predicts(&self, label: LabelIndex) -> bool {
        self.predicted.contains(&label)
    }
}

impl LabeledPrediction for LabelListPrediction {
    const SUPPORTS_SOFT_SCORES: bool = true;

    fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    fn accuracy_tally(&self) -> (usize, usize) {
        let hits = self.expected.iter().filter(|&&label| self.predicts(label)).count();
        (hits, self.expected.len())
    }

    fn confusion_updates(&self) -> Vec<(LabelIndex, Outcome)> {
        let mut updates: Vec<(LabelIndex, Outcome)> = self
            .expected
            .iter()
            .map(|&label| {
                let outcome = if self.predicts(label) { Outcome::TP } else { Outcome::FN };
                (label, outcome)
            })
            .collect();
        updates.extend(
            self.predicted
                .iter()
                .filter(|label| !self.expected.contains(label))
                .map(|&label| (label, Outcome::FP)),
        );
        updates
    }

    fn is_expected(&self, label: LabelIndex) -> bool {
        self.expected.contains(&label)
    }

    fn referenced_labels(&self) -> Vec<LabelIndex> {
        self.predicted.iter().chain(&self.expected).copied().collect()
    }
}

/// Top-k multi-class prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelTopKPrediction {
    /// Scores of every label, or withheld
    pub scores: ScoreVector,
    /// Top-k labels, highest score first
    pub predicted: Vec<LabelIndex>,
    /// Expected label
    pub expected: LabelIndex,
}

impl LabelTopKPrediction {
    /// Create a new prediction.
    pub fn new(scores: ScoreVector, predicted: Vec<LabelIndex>, expected: LabelIndex) -> Self {
        Self { scores, predicted, expected }
    }
}

impl LabeledPrediction for LabelTopKPrediction {
    const SUPPORTS_SOFT_SCORES: bool = false;

    fn scores(&self) -> &ScoreVector {
        &self.scores
    }

    fn accuracy_tally(&self) -> (usize, usize) {
        (usize::from(self.predicted.contains(&self.expected)), 1)
    }

    /// A miss charges one FN to the expected label and one FP to the
    /// top-1 candidate only; the remaining k-1 candidates stay uncounted.
    fn confusion_updates(&self) -> Vec<(LabelIndex, Outcome)> {
        if self.predicted.contains(&self.expected) {
            return vec![(self.expected, Outcome::TP)];
        }
        let mut updates = vec![(self.expected, Outcome::FN)];
        if let Some(&top) = self.predicted.first() {
            updates.push((top, Outcome::FP));
        }
        updates
    }

    fn is_expected(&self, label: LabelIndex) -> bool {
        self.expected == label
    }

    fn referenced_labels(&self) -> Vec<LabelIndex> {
        let mut labels = self.predicted.clone();
        labels.push(self.expected);
        labels
    }
}

/// Knobs of a metric computation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricOptions {
    /// Compute score-dependent metrics when the prediction shape allows it
    pub soft_scores: bool,
    /// Precision thresholds for the recall-at-precision table
    pub recall_at_precision_thresholds: Vec<f64>,
    /// Keep per-label PRF1 scores in the report
    pub log_per_label_metrics: bool,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            soft_scores: true,
            recall_at_precision_thresholds: RECALL_AT_PRECISION_THRESHOLDS.to_vec(),
            log_per_label_metrics: true,
        }
    }
}

/// Classification quality report of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    /// Fraction of hits over opportunities, in [0, 1]
    pub accuracy: f64,
    /// Per-label and macro precision/recall/F1
    pub macro_prf1_metrics: MacroPRF1Metrics,
    /// Per-label soft scores keyed by label name
    pub per_label_soft_scores: Option<BTreeMap<String, SoftClassificationMetrics>>,
    /// Matthews correlation, two-label catalogues only
    pub mcc: Option<f64>,
    /// ROC-AUC of the first label, two-label catalogues only
    pub roc_auc: Option<f64>,
    /// Mean of per-batch losses
    pub loss: Option<f64>,
}

impl ClassificationMetrics {
    /// Serialize the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn validate_labels<P: LabeledPrediction>(predictions: &[P], num_labels: usize) -> Result<()> {
    for prediction in predictions {
        for label in prediction.referenced_labels() {
            if label >= num_labels {
                return Err(ReporterError::index_out_of_bounds(label as RawLabel, num_labels));
            }
        }
    }
    Ok(())
}

/// Score rows when every example retained one of the catalogue's width.
fn present_score_rows<P: LabeledPrediction>(predictions: &[P], num_labels: usize) -> Result<Option<Vec<&[Score]>>> {
    let mut rows = Vec::with_capacity(predictions.len());
    for prediction in predictions {
        match prediction.scores().as_slice() {
            Some(row) if row.len() == num_labels => rows.push(row),
            Some(row) => {
                return Err(ReporterError::dimension_mismatch(
                    format!("{} scores per example", num_labels),
                    format!("{} scores", row.len()),
                ))
            }
            None => return Ok(None),
        }
    }
    Ok(Some(rows))
}

fn compute_soft_metrics<P: LabeledPrediction + Sync>(
    predictions: &[P],
    score_rows: &[&[Score]],
    label_names: &[String],
    thresholds: &[f64],
) -> BTreeMap<String, SoftClassificationMetrics> {
    label_names
        .par_iter()
        .enumerate()
        .map(|(label, name)| {
            let y_true: Vec<bool> = predictions.iter().map(|p| p.is_expected(label)).collect();
            let y_score: Vec<Score> = score_rows.iter().map(|row| row[label]).collect();
            (name.clone(), SoftClassificationMetrics::compute(&y_true, &y_score, thresholds))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Compute the full report for a pass.
///
/// Fails when a prediction refers to a label outside the catalogue or
/// carries a score row whose width differs from the catalogue size.
pub fn compute_classification_metrics<P>(
    predictions: &[P],
    label_names: &[String],
    loss: Option<f64>,
    options: &MetricOptions,
) -> Result<ClassificationMetrics>
where
    P: LabeledPrediction + Sync,
{
    validate_labels(predictions, label_names.len())?;

    let mut hits = 0usize;
    let mut opportunities = 0usize;
    let mut confusions = PerLabelConfusions::new();
    for prediction in predictions {
        let (hit, total) = prediction.accuracy_tally();
        hits += hit;
        opportunities += total;
        for (label, outcome) in prediction.confusion_updates() {
            confusions.update(&label_names[label], outcome, 1);
        }
    }

    let mut report = ClassificationMetrics {
        accuracy: safe_division(hits, opportunities),
        macro_prf1_metrics: confusions.compute_metrics(options.log_per_label_metrics),
        per_label_soft_scores: None,
        mcc: None,
        roc_auc: None,
        loss,
    };

    if !(P::SUPPORTS_SOFT_SCORES && options.soft_scores) {
        return Ok(report);
    }

    let score_rows = match present_score_rows(predictions, label_names.len())? {
        Some(rows) => rows,
        None => {
            log::warn!("soft scores requested but score vectors were withheld; skipping");
            return Ok(report);
        }
    };

    report.per_label_soft_scores = Some(compute_soft_metrics(
        predictions,
        &score_rows,
        label_names,
        &options.recall_at_precision_thresholds,
    ));

    if P::SUPPORTS_BINARY_METRICS && label_names.len() == 2 {
        // MCC is symmetric, so the first label plays the positive class
        let positive = confusions.get_or_default(&label_names[0]);
        let negative = confusions.get_or_default(&label_names[1]);
        report.mcc = Some(soft::matthews_correlation(positive.tp, positive.fp, positive.fn_, negative.tp));

        let y_true: Vec<bool> = predictions.iter().map(|p| p.is_expected(0)).collect();
        let y_score: Vec<Score> = score_rows.iter().map(|row| row[0]).collect();
        report.roc_auc = soft::roc_auc(&y_true, &y_score);
    }

    Ok(report)
}
