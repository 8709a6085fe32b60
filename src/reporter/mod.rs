//! Reporting facade.
//!
//! A [`MetricReporter`] owns one pass of accumulation state, computes the
//! classification report when the pass ends and dispatches it to the
//! registered output channels. Independent passes (train and eval running
//! interleaved, for instance) need independent reporters.
//!
//! # Examples
//!
//! ```rust
//! use classification_reporter::reporter::{BatchOutput, ClassificationMetricReporter};
//! use classification_reporter::{ReporterConfig, Stage};
//! use ndarray::{arr1, arr2, Array2};
//! use std::collections::BTreeMap;
//!
//! # fn example() -> classification_reporter::Result<()> {
//! let labels = vec!["neg".to_string(), "pos".to_string()];
//! let mut reporter = ClassificationMetricReporter::from_config(labels, ReporterConfig::default())?;
//!
//! let predictions = arr1(&[0i64, 1, 1]);
//! let targets = arr1(&[0i64, 1, 0]);
//! let scores = arr2(&[[0.8f32, 0.2], [0.3, 0.7], [0.4, 0.6]]);
//! let mut model_input = vec![Array2::<f32>::zeros((3, 8))];
//!
//! let output = BatchOutput::new(predictions.view(), targets.view())
//!     .with_scores(scores.view())
//!     .with_loss(0.35);
//! reporter.add_batch_stats(0, output, &mut model_input, &BTreeMap::new())?;
//!
//! let metrics = reporter.report_metric(Stage::Eval, 0, true)?;
//! assert!((metrics.accuracy - 2.0 / 3.0).abs() < 1e-12);
//! assert!(metrics.roc_auc.is_some());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod aggregator;
pub mod channel;
pub mod kind;
pub mod selection;

pub use aggregator::{BatchAggregator, BatchOutput, ContextValue, LazyModelInput, ModelInput};
pub use channel::{Channel, FileChannel, StageReport};
pub use kind::{MultiLabel, ReporterKind, SingleLabel, TopK, TopKRow};
pub use selection::{compare_metric, ComparableClassificationMetric, ModelSelectMetric, Precondition};

use crate::config::ReporterConfig;
use crate::core::constants::{META_LABEL_NAMES, TEXT_COLUMN_SEPARATOR, TEXT_CONTEXT_KEY};
use crate::core::error::{ReporterError, Result};
use crate::core::types::{ReportedLabel, Stage};
use crate::metrics::{compute_classification_metrics, ClassificationMetrics, MetricOptions};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Reporter for single-label multi-class classification.
pub type ClassificationMetricReporter = MetricReporter<SingleLabel>;

/// Reporter for multi-label classification.
pub type MultiLabelClassificationMetricReporter = MetricReporter<MultiLabel>;

/// Reporter for top-k multi-class classification.
pub type TopKClassificationMetricReporter = MetricReporter<TopK>;

/// Classification metric reporter, generic over the prediction shape.
#[derive(Debug)]
pub struct MetricReporter<K: ReporterKind> {
    config: ReporterConfig,
    label_names: Vec<String>,
    model_select_metric: ModelSelectMetric,
    aggregator: BatchAggregator<K>,
    channels: Vec<Box<dyn Channel>>,
}

impl<K: ReporterKind> MetricReporter<K> {
    /// Create a reporter.
    ///
    /// Fails with a configuration error when the catalogue is empty or has
    /// duplicates, or when the model-selection metric is illegal for it.
    pub fn new(kind: K, label_names: Vec<String>, config: ReporterConfig) -> Result<Self> {
        config.validate()?;
        if label_names.is_empty() {
            return Err(crate::config_error!("label catalogue is empty"));
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = label_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(crate::config_error!("duplicate label name {:?}", duplicate));
        }

        let model_select_metric = config
            .model_select_metric
            .resolve(config.target_label.as_deref(), &label_names)?;

        let aggregator = BatchAggregator::new(kind, label_names.len(), config.is_memory_efficient);
        let mut channels: Vec<Box<dyn Channel>> = Vec::new();
        if let Some(path) = &config.output_path {
            channels.push(Box::new(FileChannel::new(
                path.clone(),
                config.file_channel_stages.clone(),
                config.context_column_names(),
            )));
        }

        log::debug!(
            "{} reporter over {} labels, selecting on {}",
            aggregator.kind().name(),
            label_names.len(),
            model_select_metric
        );

        Ok(MetricReporter {
            config,
            label_names,
            model_select_metric,
            aggregator,
            channels,
        })
    }

    /// Register an additional output channel.
    pub fn with_channel(mut self, channel: Box<dyn Channel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Label catalogue.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Configuration the reporter was built from.
    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Current accumulation state.
    pub fn aggregator(&self) -> &BatchAggregator<K> {
        &self.aggregator
    }

    /// Build the context of a batch from its raw input rows.
    ///
    /// The text columns of each row are joined with `" | "` under `"text"`;
    /// additional columns are copied through unchanged. A missing column is
    /// a data-contract violation.
    pub fn batch_context(&self, raw_rows: &[Map<String, Value>]) -> Result<BTreeMap<String, ContextValue>> {
        let mut context = BTreeMap::new();

        let text = raw_rows
            .iter()
            .map(|row| {
                self.config
                    .text_column_names
                    .iter()
                    .map(|column| column_value(row, column).map(text_of))
                    .collect::<Result<Vec<_>>>()
                    .map(|parts| Value::String(parts.join(TEXT_COLUMN_SEPARATOR)))
            })
            .collect::<Result<Vec<_>>>()?;
        context.insert(TEXT_CONTEXT_KEY.to_string(), ContextValue::Sequence(text));

        for column in &self.config.additional_column_names {
            let values = raw_rows
                .iter()
                .map(|row| column_value(row, column).cloned())
                .collect::<Result<Vec<_>>>()?;
            context.insert(column.clone(), ContextValue::Sequence(values));
        }

        Ok(context)
    }

    /// Ingest one batch; see [`BatchAggregator::add_batch_stats`].
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
        self.aggregator.add_batch_stats(batch_index, output, model_input, context)
    }

    /// Unweighted mean of the per-batch losses, `None` if none was recorded.
    pub fn calculate_loss(&self) -> Option<f64> {
        self.aggregator.calculate_loss()
    }

    /// Compute the report for everything accumulated so far.
    ///
    /// Read-only; calling it twice before a reset yields the same report.
    pub fn calculate_metric(&self) -> Result<ClassificationMetrics> {
        let predictions = self.aggregator.finalize()?;
        let options = MetricOptions {
            soft_scores: !self.config.is_memory_efficient,
            recall_at_precision_thresholds: self.config.recall_at_precision_thresholds.clone(),
            log_per_label_metrics: true,
        };
        compute_classification_metrics(&predictions, &self.label_names, self.calculate_loss(), &options)
    }

    /// Predicted label names per example, in ingestion order.
    pub fn predictions_to_report(&self) -> Result<Vec<ReportedLabel>> {
        self.aggregator.predictions_to_report(&self.label_names)
    }

    /// Target label names per example, in ingestion order.
    pub fn targets_to_report(&self) -> Result<Vec<ReportedLabel>> {
        self.aggregator.targets_to_report(&self.label_names)
    }

    /// Metadata exported alongside the report.
    pub fn get_meta(&self) -> BTreeMap<String, Vec<String>> {
        let mut meta = BTreeMap::new();
        meta.insert(META_LABEL_NAMES.to_string(), self.label_names.clone());
        meta
    }

    /// Resolved model-selection metric.
    pub fn model_select_metric(&self) -> &ModelSelectMetric {
        &self.model_select_metric
    }

    /// Model-selection scalar of a report.
    pub fn get_model_select_metric(&self, metrics: &ClassificationMetrics) -> Result<f64> {
        self.model_select_metric.extract(metrics)
    }

    /// Whether `new` beats `old`; a missing `old` always loses.
    pub fn compare_metric(new: f64, old: Option<f64>) -> bool {
        compare_metric(new, old)
    }

    /// Finish a pass: compute, dispatch to channels and optionally reset.
    pub fn report_metric(&mut self, stage: Stage, epoch: usize, reset: bool) -> Result<ClassificationMetrics> {
        let metrics = self.calculate_metric()?;
        let model_select_metric = self.get_model_select_metric(&metrics)?;

        log::info!(
            "{} epoch {}: {} = {:.4}, accuracy = {:.4}, macro f1 = {:.4}, loss = {}",
            stage,
            epoch,
            self.model_select_metric,
            model_select_metric,
            metrics.accuracy,
            metrics.macro_prf1_metrics.macro_scores.f1,
            metrics.loss.map_or_else(|| "n/a".to_string(), |loss| format!("{:.4}", loss))
        );

        if self.channels.iter().any(|channel| channel.accepts(stage)) {
            let predictions = self.predictions_to_report()?;
            let targets = self.targets_to_report()?;
            let meta = self.get_meta();
            let report = StageReport {
                stage,
                epoch,
                metrics: &metrics,
                model_select_metric,
                predictions: &predictions,
                targets: &targets,
                scores: self.aggregator.scores(),
                context: self.aggregator.context(),
                meta: &meta,
            };
            for channel in self.channels.iter_mut().filter(|channel| channel.accepts(stage)) {
                channel.report(&report)?;
            }
        }

        if reset {
            self.reset();
        }
        Ok(metrics)
    }

    /// Discard the accumulation state of the current pass.
    pub fn reset(&mut self) {
        self.aggregator.reset();
    }
}

fn column_value<'a>(row: &'a Map<String, Value>, column: &str) -> Result<&'a Value> {
    row.get(column)
        .ok_or_else(|| ReporterError::data_contract(format!("raw input row has no column {:?}", column)))
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl ClassificationMetricReporter {
    /// Single-label reporter from a configuration.
    pub fn from_config(label_names: Vec<String>, config: ReporterConfig) -> Result<Self> {
        Self::new(SingleLabel, label_names, config)
    }
}

impl MultiLabelClassificationMetricReporter {
    /// Multi-label reporter from a configuration.
    pub fn from_config(label_names: Vec<String>, config: ReporterConfig) -> Result<Self> {
        Self::new(MultiLabel, label_names, config)
    }
}

impl TopKClassificationMetricReporter {
    /// Top-k reporter from a configuration, keeping `config.topk` candidates.
    pub fn from_config(label_names: Vec<String>, config: ReporterConfig) -> Result<Self> {
        let k = config.topk;
        Self::new(TopK::new(k), label_names, config)
    }
}
