//! Per-pass accumulation of batch outputs.
//!
//! The aggregator is append-only between resets. Every batch is checked in
//! full before anything is appended, so a rejected batch leaves the state
//! exactly as it was. Alignment of auxiliary context with the examples is
//! a caller contract and is checked when the pass is finalized.

use crate::core::error::{ReporterError, Result};
use crate::core::types::*;
use crate::metrics::utils::mean;
use crate::reporter::kind::ReporterKind;
use ndarray::{ArrayBase, ArrayD, ArrayView, ArrayView2, ArrayViewD, Data, Dimension};
use num_traits::ToPrimitive;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;

/// Model outputs of one batch.
#[derive(Debug, Clone)]
pub struct BatchOutput<'a> {
    /// Predicted labels; rank and meaning depend on the reporter kind
    pub predictions: ArrayViewD<'a, RawLabel>,
    /// Target labels; rank and meaning depend on the reporter kind
    pub targets: ArrayViewD<'a, RawLabel>,
    /// Score matrix, one row per example and one column per label
    pub scores: Option<ArrayView2<'a, Score>>,
    /// Batch loss
    pub loss: Option<f64>,
}

impl<'a> BatchOutput<'a> {
    /// Outputs without scores or loss.
    pub fn new<D1, D2>(predictions: ArrayView<'a, RawLabel, D1>, targets: ArrayView<'a, RawLabel, D2>) -> Self
    where
        D1: Dimension,
        D2: Dimension,
    {
        BatchOutput {
            predictions: predictions.into_dyn(),
            targets: targets.into_dyn(),
            scores: None,
            loss: None,
        }
    }

    /// Attach the score matrix.
    pub fn with_scores(mut self, scores: ArrayView2<'a, Score>) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Attach the loss; values that do not convert to `f64` are dropped.
    pub fn with_loss<L: ToPrimitive>(mut self, loss: L) -> Self {
        self.loss = loss.to_f64();
        self
    }
}

/// Auxiliary value passed alongside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// Numeric tensor whose first axis runs over examples
    Tensor(ArrayD<f64>),
    /// One value per example
    Sequence(Vec<Value>),
    /// Per-batch value, never accumulated
    Scalar(Value),
}

impl ContextValue {
    /// Per-example values, `None` for scalars and rank-0 tensors.
    pub fn per_example(&self) -> Option<Vec<Value>> {
        match self {
            ContextValue::Tensor(tensor) if tensor.ndim() > 0 => {
                Some(tensor.outer_iter().map(tensor_to_value).collect())
            }
            ContextValue::Tensor(_) | ContextValue::Scalar(_) => None,
            ContextValue::Sequence(values) => Some(values.clone()),
        }
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(values: Vec<String>) -> Self {
        ContextValue::Sequence(values.into_iter().map(Value::String).collect())
    }
}

impl From<Vec<Value>> for ContextValue {
    fn from(values: Vec<Value>) -> Self {
        ContextValue::Sequence(values)
    }
}

fn tensor_to_value(view: ArrayViewD<'_, f64>) -> Value {
    if view.ndim() == 0 {
        return view.iter().next().map_or(Value::Null, |&v| Value::from(v));
    }
    Value::Array(view.outer_iter().map(tensor_to_value).collect())
}

/// Source of the batch size of a model input.
pub trait ModelInput {
    /// Size of the first axis of the first positional input.
    fn batch_size(&mut self) -> Option<usize>;
}

impl<S, D> ModelInput for [ArrayBase<S, D>]
where
    S: Data,
    D: Dimension,
{
    fn batch_size(&mut self) -> Option<usize> {
        self.first().and_then(|input| input.shape().first().copied())
    }
}

impl<S, D> ModelInput for Vec<ArrayBase<S, D>>
where
    S: Data,
    D: Dimension,
{
    fn batch_size(&mut self) -> Option<usize> {
        self.as_mut_slice().batch_size()
    }
}

/// Lazily produced model input.
///
/// The batch size is read by peeking, so the first element is still
/// yielded to whoever iterates the input afterwards.
pub struct LazyModelInput<I: Iterator> {
    inner: Peekable<I>,
}

impl<I: Iterator> LazyModelInput<I> {
    /// Wrap an iterator of positional inputs.
    pub fn new(inner: I) -> Self {
        LazyModelInput { inner: inner.peekable() }
    }
}

impl<I: Iterator> fmt::Debug for LazyModelInput<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyModelInput").finish_non_exhaustive()
    }
}

impl<I, S, D> ModelInput for LazyModelInput<I>
where
    I: Iterator<Item = ArrayBase<S, D>>,
    S: Data,
    D: Dimension,
{
    fn batch_size(&mut self) -> Option<usize> {
        self.inner.peek().and_then(|input| input.shape().first().copied())
    }
}

impl<I: Iterator> Iterator for LazyModelInput<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Accumulation state of one evaluation pass.
#[derive(Debug)]
pub struct BatchAggregator<K: ReporterKind> {
    kind: K,
    num_labels: usize,
    is_memory_efficient: bool,
    predicted: Vec<K::Predicted>,
    expected: Vec<K::Expected>,
    scores: Vec<Vec<Score>>,
    losses: Vec<f64>,
    batch_sizes: Vec<usize>,
    context: BTreeMap<String, Vec<Value>>,
    n_batches: usize,
}

impl<K: ReporterKind> BatchAggregator<K> {
    /// Create an empty aggregator for a catalogue of `num_labels` labels.
    pub fn new(kind: K, num_labels: usize, is_memory_efficient: bool) -> Self {
        BatchAggregator {
            kind,
            num_labels,
            is_memory_efficient,
            predicted: Vec::new(),
            expected: Vec::new(),
            scores: Vec::new(),
            losses: Vec::new(),
            batch_sizes: Vec::new(),
            context: BTreeMap::new(),
            n_batches: 0,
        }
    }

    /// Reporter kind driving this aggregator.
    pub fn kind(&self) -> &K {
        &self.kind
    }

    /// Whether score rows are withheld.
    pub fn is_memory_efficient(&self) -> bool {
        self.is_memory_efficient
    }

    /// Ingest one batch.
    pub fn add_batch_stats<I>(
        &mut self,
        batch_index: usize,
        output: BatchOutput<'_>,
        model_input: &mut I,
        context: &BTreeMap<String, ContextValue>,
    ) -> Result<()>
    where
        I: ModelInput + ?Sized,
    {
        let predicted = self.kind.predicted_rows(output.predictions, output.scores, self.num_labels)?;
        let expected = self.kind.expected_rows(output.targets, self.num_labels)?;
        let n = predicted.len();
        if expected.len() != n {
            return Err(ReporterError::data_contract(format!(
                "batch {}: {} predictions but {} targets",
                batch_index,
                n,
                expected.len()
            )));
        }

        let retained_scores = match output.scores {
            Some(scores) => {
                if scores.nrows() != n {
                    return Err(ReporterError::dimension_mismatch(
                        format!("{} score rows", n),
                        format!("{} rows", scores.nrows()),
                    ));
                }
                if self.is_memory_efficient {
                    None
                } else {
                    if scores.ncols() != self.num_labels {
                        return Err(ReporterError::dimension_mismatch(
                            format!("{} scores per example", self.num_labels),
                            format!("{} scores", scores.ncols()),
                        ));
                    }
                    Some(scores.rows().into_iter().map(|row| row.to_vec()).collect::<Vec<_>>())
                }
            }
            None if self.is_memory_efficient => None,
            None => {
                return Err(ReporterError::data_contract(format!(
                    "batch {}: scores are required unless memory-efficient mode is on",
                    batch_index
                )))
            }
        };

        let batch_size = model_input.batch_size().unwrap_or(n);
        if batch_size != n {
            log::debug!("batch {}: model input holds {} rows for {} predictions", batch_index, batch_size, n);
        }

        self.predicted.extend(predicted);
        self.expected.extend(expected);
        if let Some(rows) = retained_scores {
            self.scores.extend(rows);
        }
        for (key, value) in context {
            if let Some(values) = value.per_example() {
                self.context.entry(key.clone()).or_default().extend(values);
            }
        }
        if let Some(loss) = output.loss {
            self.losses.push(loss);
        }
        self.batch_sizes.push(batch_size);
        self.n_batches += 1;

        log::debug!(
            "{} reporter: batch {} added {} examples ({} total)",
            self.kind.name(),
            batch_index,
            n,
            self.predicted.len()
        );
        Ok(())
    }

    /// Check alignment and build the calculator input.
    pub fn finalize(&self) -> Result<Vec<K::Prediction>> {
        let n = self.predicted.len();
        if self.expected.len() != n {
            return Err(ReporterError::internal(format!(
                "{} predictions accumulated against {} targets",
                n,
                self.expected.len()
            )));
        }
        if !self.is_memory_efficient && self.scores.len() != n {
            return Err(ReporterError::dimension_mismatch(
                format!("{} score rows", n),
                format!("{} rows", self.scores.len()),
            ));
        }
        for (key, values) in &self.context {
            if values.len() != n {
                return Err(ReporterError::dimension_mismatch(
                    format!("{} values for context {:?}", n, key),
                    format!("{} values", values.len()),
                ));
            }
        }

        Ok(self
            .predicted
            .iter()
            .zip(&self.expected)
            .enumerate()
            .map(|(i, (predicted, expected))| {
                let scores = match self.scores.get(i) {
                    Some(row) if !self.is_memory_efficient => ScoreVector::Present(row.clone()),
                    _ => ScoreVector::Withheld,
                };
                self.kind.assemble(predicted, expected, scores)
            })
            .collect())
    }

    /// Label names of every accumulated prediction, in ingestion order.
    pub fn predictions_to_report(&self, label_names: &[String]) -> Result<Vec<ReportedLabel>> {
        self.predicted
            .iter()
            .map(|row| self.kind.report_predicted(row, label_names))
            .collect()
    }

    /// Label names of every accumulated target, in ingestion order.
    pub fn targets_to_report(&self, label_names: &[String]) -> Result<Vec<ReportedLabel>> {
        self.expected
            .iter()
            .map(|row| self.kind.report_expected(row, label_names))
            .collect()
    }

    /// Unweighted mean of the recorded batch losses.
    pub fn calculate_loss(&self) -> Option<f64> {
        mean(&self.losses)
    }

    /// Number of accumulated examples.
    pub fn num_examples(&self) -> usize {
        self.predicted.len()
    }

    /// Number of ingested batches.
    pub fn n_batches(&self) -> usize {
        self.n_batches
    }

    /// Batch sizes in ingestion order.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    /// Recorded batch losses.
    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    /// Retained score rows; empty in memory-efficient mode.
    pub fn scores(&self) -> &[Vec<Score>] {
        &self.scores
    }

    /// Accumulated per-example context.
    pub fn context(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.context
    }

    /// Discard everything accumulated so far.
    pub fn reset(&mut self) {
        self.predicted.clear();
        self.expected.clear();
        self.scores.clear();
        self.losses.clear();
        self.batch_sizes.clear();
        self.context.clear();
        self.n_batches = 0;
    }
}
