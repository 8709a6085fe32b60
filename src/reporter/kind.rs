//! Reporter variants.
//!
//! A [`ReporterKind`] decides how the tensors of one batch become
//! per-example rows, how an accumulated row becomes a structured prediction
//! for the calculator and how rows are projected back onto label names.

use crate::core::error::{ReporterError, Result};
use crate::core::types::*;
use crate::metrics::{LabelListPrediction, LabelPrediction, LabelTopKPrediction, LabeledPrediction};
use ndarray::{ArrayView1, ArrayView2, ArrayViewD, Ix1, Ix2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape-specific behavior of a reporter.
pub trait ReporterKind: fmt::Debug + Send + Sync {
    /// Accumulated prediction of one example
    type Predicted: Clone + fmt::Debug + Send + Sync;
    /// Accumulated target of one example
    type Expected: Clone + fmt::Debug + Send + Sync;
    /// Structured prediction handed to the calculator
    type Prediction: LabeledPrediction + Sync;

    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// Whether every batch must carry a score matrix, even in
    /// memory-efficient mode.
    fn requires_scores(&self) -> bool {
        false
    }

    /// Split a batch's prediction tensor into per-example rows.
    fn predicted_rows(
        &self,
        predictions: ArrayViewD<'_, RawLabel>,
        scores: Option<ArrayView2<'_, Score>>,
        num_labels: usize,
    ) -> Result<Vec<Self::Predicted>>;

    /// Split a batch's target tensor into per-example rows.
    fn expected_rows(&self, targets: ArrayViewD<'_, RawLabel>, num_labels: usize) -> Result<Vec<Self::Expected>>;

    /// Build the calculator input for one example.
    fn assemble(&self, predicted: &Self::Predicted, expected: &Self::Expected, scores: ScoreVector) -> Self::Prediction;

    /// Label name(s) of a prediction.
    fn report_predicted(&self, predicted: &Self::Predicted, label_names: &[String]) -> Result<ReportedLabel>;

    /// Label name(s) of a target.
    fn report_expected(&self, expected: &Self::Expected, label_names: &[String]) -> Result<ReportedLabel>;
}

fn as_vector<'a>(view: ArrayViewD<'a, RawLabel>, what: &str) -> Result<ArrayView1<'a, RawLabel>> {
    let ndim = view.ndim();
    view.into_dimensionality::<Ix1>()
        .map_err(|_| ReporterError::dimension_mismatch(format!("rank-1 {}", what), format!("rank-{}", ndim)))
}

fn as_matrix<'a>(view: ArrayViewD<'a, RawLabel>, what: &str) -> Result<ndarray::ArrayView2<'a, RawLabel>> {
    let ndim = view.ndim();
    view.into_dimensionality::<Ix2>()
        .map_err(|_| ReporterError::dimension_mismatch(format!("rank-2 {}", what), format!("rank-{}", ndim)))
}

fn label_index(raw: RawLabel, num_labels: usize) -> Result<LabelIndex> {
    match LabelIndex::try_from(raw) {
        Ok(index) if index < num_labels => Ok(index),
        _ => Err(ReporterError::index_out_of_bounds(raw, num_labels)),
    }
}

fn label_name(label: LabelIndex, label_names: &[String]) -> Result<String> {
    label_names
        .get(label)
        .cloned()
        .ok_or_else(|| ReporterError::index_out_of_bounds(label as RawLabel, label_names.len()))
}

fn label_set(labels: &[LabelIndex], label_names: &[String]) -> Result<ReportedLabel> {
    labels
        .iter()
        .map(|&label| label_name(label, label_names))
        .collect::<Result<Vec<_>>>()
        .map(ReportedLabel::Set)
}

/// Single-label multi-class reporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleLabel;

impl ReporterKind for SingleLabel {
    type Predicted = LabelIndex;
    type Expected = LabelIndex;
    type Prediction = LabelPrediction;

    fn name(&self) -> &'static str {
        "single_label"
    }

    fn predicted_rows(
        &self,
        predictions: ArrayViewD<'_, RawLabel>,
        _scores: Option<ArrayView2<'_, Score>>,
        num_labels: usize,
    ) -> Result<Vec<LabelIndex>> {
        as_vector(predictions, "predictions")?
            .iter()
            .map(|&raw| label_index(raw, num_labels))
            .collect()
    }

    fn expected_rows(&self, targets: ArrayViewD<'_, RawLabel>, num_labels: usize) -> Result<Vec<LabelIndex>> {
        as_vector(targets, "targets")?
            .iter()
            .map(|&raw| label_index(raw, num_labels))
            .collect()
    }

    fn assemble(&self, predicted: &LabelIndex, expected: &LabelIndex, scores: ScoreVector) -> LabelPrediction {
        LabelPrediction::new(scores, *predicted, *expected)
    }

    fn report_predicted(&self, predicted: &LabelIndex, label_names: &[String]) -> Result<ReportedLabel> {
        label_name(*predicted, label_names).map(ReportedLabel::Single)
    }

    fn report_expected(&self, expected: &LabelIndex, label_names: &[String]) -> Result<ReportedLabel> {
        label_name(*expected, label_names).map(ReportedLabel::Single)
    }
}

/// Multi-label reporter.
///
/// Predictions arrive as an n-hot indicator matrix with one column per
/// label; targets as label offsets padded with [`crate::NO_LABEL`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiLabel;

impl ReporterKind for MultiLabel {
    type Predicted = Vec<LabelIndex>;
    type Expected = Vec<LabelIndex>;
    type Prediction = LabelListPrediction;

    fn name(&self) -> &'static str {
        "multi_label"
    }

    fn predicted_rows(
        &self,
        predictions: ArrayViewD<'_, RawLabel>,
        _scores: Option<ArrayView2<'_, Score>>,
        num_labels: usize,
    ) -> Result<Vec<Vec<LabelIndex>>> {
        let indicator = as_matrix(predictions, "predictions")?;
        if indicator.ncols() != num_labels {
            return Err(ReporterError::dimension_mismatch(
                format!("{} indicator columns", num_labels),
                format!("{} columns", indicator.ncols()),
            ));
        }
        Ok(indicator
            .rows()
            .into_iter()
            .map(|row| LabelListPrediction::labels_from_indicator(&row.to_vec()))
            .collect())
    }

    fn expected_rows(&self, targets: ArrayViewD<'_, RawLabel>, num_labels: usize) -> Result<Vec<Vec<LabelIndex>>> {
        let padded = as_matrix(targets, "targets")?;
        padded
            .rows()
            .into_iter()
            .map(|row| {
                let labels = LabelListPrediction::labels_from_padded(&row.to_vec(), num_labels)?;
                match labels.iter().find(|&&label| label >= num_labels) {
                    Some(&label) => Err(ReporterError::index_out_of_bounds(label as RawLabel, num_labels)),
                    None => Ok(labels),
                }
            })
            .collect()
    }

    fn assemble(
        &self,
        predicted: &Vec<LabelIndex>,
        expected: &Vec<LabelIndex>,
        scores: ScoreVector,
    ) -> LabelListPrediction {
        LabelListPrediction::new(scores, predicted.clone(), expected.clone())
    }

    fn report_predicted(&self, predicted: &Vec<LabelIndex>, label_names: &[String]) -> Result<ReportedLabel> {
        label_set(predicted, label_names)
    }

    fn report_expected(&self, expected: &Vec<LabelIndex>, label_names: &[String]) -> Result<ReportedLabel> {
        label_set(expected, label_names)
    }
}

/// Accumulated top-k prediction of one example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopKRow {
    /// The model's own prediction, used for projections
    pub argmax: LabelIndex,
    /// The k highest-scoring labels, best first
    pub candidates: Vec<LabelIndex>,
}

/// Top-k multi-class reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopK {
    /// Number of candidates kept per example
    pub k: usize,
}

impl TopK {
    /// Create a top-k reporter kind.
    pub fn new(k: usize) -> Self {
        TopK { k }
    }
}

impl Default for TopK {
    fn default() -> Self {
        TopK::new(crate::core::constants::DEFAULT_TOPK)
    }
}

/// The `k` highest-scoring labels of one score row, best first.
///
/// The sort is stable, so among tied scores the lower label wins.
pub fn top_k(scores: ArrayView1<'_, Score>, k: usize) -> Vec<LabelIndex> {
    let mut order: Vec<LabelIndex> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);
    order
}

impl ReporterKind for TopK {
    type Predicted = TopKRow;
    type Expected = LabelIndex;
    type Prediction = LabelTopKPrediction;

    fn name(&self) -> &'static str {
        "topk"
    }

    fn requires_scores(&self) -> bool {
        true
    }

    fn predicted_rows(
        &self,
        predictions: ArrayViewD<'_, RawLabel>,
        scores: Option<ArrayView2<'_, Score>>,
        num_labels: usize,
    ) -> Result<Vec<TopKRow>> {
        let scores =
            scores.ok_or_else(|| ReporterError::data_contract("top-k reporting needs the batch score matrix"))?;
        let argmax = as_vector(predictions, "predictions")?;
        if scores.nrows() != argmax.len() {
            return Err(ReporterError::dimension_mismatch(
                format!("{} score rows", argmax.len()),
                format!("{} rows", scores.nrows()),
            ));
        }
        if scores.ncols() != num_labels {
            return Err(ReporterError::dimension_mismatch(
                format!("{} scores per example", num_labels),
                format!("{} scores", scores.ncols()),
            ));
        }

        argmax
            .iter()
            .zip(scores.rows())
            .map(|(&raw, row)| {
                Ok(TopKRow {
                    argmax: label_index(raw, num_labels)?,
                    candidates: top_k(row, self.k),
                })
            })
            .collect()
    }

    fn expected_rows(&self, targets: ArrayViewD<'_, RawLabel>, num_labels: usize) -> Result<Vec<LabelIndex>> {
        SingleLabel.expected_rows(targets, num_labels)
    }

    fn assemble(&self, predicted: &TopKRow, expected: &LabelIndex, scores: ScoreVector) -> LabelTopKPrediction {
        LabelTopKPrediction::new(scores, predicted.candidates.clone(), *expected)
    }

    fn report_predicted(&self, predicted: &TopKRow, label_names: &[String]) -> Result<ReportedLabel> {
        label_name(predicted.argmax, label_names).map(ReportedLabel::Single)
    }

    fn report_expected(&self, expected: &LabelIndex, label_names: &[String]) -> Result<ReportedLabel> {
        label_name(*expected, label_names).map(ReportedLabel::Single)
    }
}
