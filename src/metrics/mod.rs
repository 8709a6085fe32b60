//! Classification metrics computed at the end of an evaluation pass.
//!
//! The calculator is a pure reduction: it takes the structured predictions
//! assembled by the reporter, the label catalogue and the pass loss, and
//! returns one [`ClassificationMetrics`] report.
//!
//! # Examples
//!
//! ```rust
//! use classification_reporter::metrics::{
//!     compute_classification_metrics, LabelPrediction, MetricOptions,
//! };
//! use classification_reporter::ScoreVector;
//!
//! # fn example() -> classification_reporter::Result<()> {
//! let label_names = vec!["neg".to_string(), "pos".to_string()];
//! let predictions = vec![
//!     LabelPrediction::new(ScoreVector::from(vec![0.9, 0.1]), 0, 0),
//!     LabelPrediction::new(ScoreVector::from(vec![0.3, 0.7]), 1, 1),
//!     LabelPrediction::new(ScoreVector::from(vec![0.6, 0.4]), 0, 1),
//! ];
//!
//! let report = compute_classification_metrics(
//!     &predictions,
//!     &label_names,
//!     Some(0.42),
//!     &MetricOptions::default(),
//! )?;
//! assert!((report.accuracy - 2.0 / 3.0).abs() < 1e-12);
//! assert!(report.mcc.is_some());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod classification;
pub mod confusion;
pub mod soft;

pub use classification::{
    compute_classification_metrics, ClassificationMetrics, LabelListPrediction, LabelPrediction,
    LabelTopKPrediction, LabeledPrediction, MetricOptions,
};

pub use confusion::{Confusions, MacroPRF1Metrics, MacroPRF1Scores, PRF1Scores, PerLabelConfusions};

pub use soft::{RecallAtPrecision, SoftClassificationMetrics};

/// Utility functions for metric calculations.
pub mod utils {
    use num_traits::ToPrimitive;

    /// Divide, returning 0 when the denominator is zero.
    pub fn safe_division<N, D>(numerator: N, denominator: D) -> f64
    where
        N: ToPrimitive,
        D: ToPrimitive,
    {
        let denominator = denominator.to_f64().unwrap_or(0.0);
        if denominator == 0.0 {
            0.0
        } else {
            numerator.to_f64().unwrap_or(0.0) / denominator
        }
    }

    /// Harmonic mean of precision and recall, 0 when both are 0.
    pub fn f1_score(precision: f64, recall: f64) -> f64 {
        safe_division(2.0 * precision * recall, precision + recall)
    }

    /// Unweighted arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}
