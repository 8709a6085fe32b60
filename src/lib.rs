//! # Classification Reporter
//!
//! Streaming classification-metric aggregation for model evaluation loops.
//!
//! During an evaluation pass the reporter consumes one batch of predictions,
//! targets and scores at a time. When the pass ends it produces a single
//! [`ClassificationMetrics`] report: accuracy, per-label and macro
//! precision/recall/F1, per-label average precision and ROC-AUC,
//! recall-at-precision, Matthews correlation and loss.
//!
//! ## Features
//!
//! - **Three prediction shapes**: single-label multi-class, multi-label
//!   (n-hot indicators against padded targets) and top-k multi-class.
//! - **Memory-efficient mode**: score vectors are withheld during
//!   accumulation, trading soft-score metrics for a bounded footprint on
//!   very large label spaces.
//! - **Model selection**: a configured metric identifier resolves to one
//!   scalar per report, validated against the label catalogue up front.
//! - **Output channels**: per-example predictions can be written as a
//!   tab-separated file for chosen stages.
//!
//! ## Quick Start
//!
//! ```rust
//! use classification_reporter::{
//!     BatchOutput, ComparableClassificationMetric, ReporterConfigBuilder, Stage,
//!     TopKClassificationMetricReporter,
//! };
//! use ndarray::{arr1, arr2, Array2};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> classification_reporter::Result<()> {
//! classification_reporter::init()?;
//!
//! let config = ReporterConfigBuilder::new()
//!     .model_select_metric(ComparableClassificationMetric::NegativeLoss)
//!     .topk(2)
//!     .build()?;
//! let labels = vec!["cat".to_string(), "dog".to_string(), "eel".to_string()];
//! let mut reporter = TopKClassificationMetricReporter::from_config(labels, config)?;
//!
//! let scores = arr2(&[[0.6f32, 0.3, 0.1], [0.2, 0.3, 0.5]]);
//! let predictions = arr1(&[0i64, 2]);
//! let targets = arr1(&[1i64, 0]);
//! let mut model_input = vec![Array2::<f32>::zeros((2, 16))];
//!
//! let output = BatchOutput::new(predictions.view(), targets.view())
//!     .with_scores(scores.view())
//!     .with_loss(0.9);
//! reporter.add_batch_stats(0, output, &mut model_input, &BTreeMap::new())?;
//!
//! let metrics = reporter.report_metric(Stage::Eval, 0, false)?;
//! assert_eq!(metrics.accuracy, 0.5);
//! assert_eq!(reporter.get_model_select_metric(&metrics)?, -0.9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: types, constants and error handling
//! - [`config`]: reporter configuration and its persistence
//! - [`metrics`]: confusion bookkeeping and the metric calculator
//! - [`reporter`]: batch aggregation, model selection, output channels and
//!   the reporting facade

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Metric computation module
pub mod metrics;

// Batch aggregation and reporting module
pub mod reporter;

// Re-export core functionality for convenience
pub use self::core::{
    constants::*,
    error::{ReporterError, Result},
    types::*,
};

// Re-export configuration functionality
pub use config::{ReporterConfig, ReporterConfigBuilder};

// Re-export metrics functionality
pub use metrics::{
    compute_classification_metrics, ClassificationMetrics, LabelListPrediction, LabelPrediction,
    LabelTopKPrediction, LabeledPrediction, MacroPRF1Metrics, MacroPRF1Scores, MetricOptions, PRF1Scores,
    PerLabelConfusions, RecallAtPrecision, SoftClassificationMetrics,
};

// Re-export reporter functionality
pub use reporter::{
    BatchOutput, Channel, ClassificationMetricReporter, ComparableClassificationMetric, ContextValue,
    FileChannel, LazyModelInput, MetricReporter, ModelInput, ModelSelectMetric,
    MultiLabelClassificationMetricReporter, StageReport, TopKClassificationMetricReporter,
};

// Version information
pub use self::core::constants::CLASSIFICATION_REPORTER_VERSION as VERSION;

/// Initialize the library.
///
/// Installs `env_logger` with a default filter of `info`, overridable
/// through `RUST_LOG`. Safe to call more than once.
///
/// # Examples
///
/// ```rust
/// fn main() -> classification_reporter::Result<()> {
///     classification_reporter::init()?;
///     assert!(classification_reporter::is_initialized());
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    core::is_core_initialized()
}

mod compile_time_assertions {
    use super::*;
    use static_assertions::*;

    // Reporters move between threads with their evaluation loop
    assert_impl_all!(ClassificationMetricReporter: Send);
    assert_impl_all!(ClassificationMetrics: Send, Sync, Clone);
    assert_impl_all!(ReporterError: Send, Sync);
    assert_impl_all!(ReporterConfig: Send, Sync, Clone);
}
