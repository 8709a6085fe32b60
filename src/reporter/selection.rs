//! Model-selection metric: the one scalar used to rank checkpoints.
//!
//! [`ComparableClassificationMetric`] is the configured identifier. It is
//! resolved against the label catalogue once, when a reporter is built,
//! into a [`ModelSelectMetric`] that carries everything extraction needs.
//! Each identifier declares its own [`Precondition`], so an illegal
//! combination fails at construction and never at extraction time.

use crate::core::error::{ReporterError, Result};
use crate::metrics::ClassificationMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configurable model-selection metric identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparableClassificationMetric {
    /// Overall accuracy
    #[default]
    Accuracy,
    /// ROC-AUC of the first label, binary catalogues only
    RocAuc,
    /// Matthews correlation, binary catalogues only
    Mcc,
    /// Macro-averaged F1
    MacroF1,
    /// F1 of the target label
    LabelF1,
    /// Average precision of the target label
    LabelAvgPrecision,
    /// ROC-AUC of the target label
    LabelRocAuc,
    /// Negated mean loss
    NegativeLoss,
}

/// Condition the label configuration must meet for a metric to be legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Always legal
    None,
    /// A target label from the catalogue must be configured
    TargetLabel,
    /// The catalogue must hold exactly two labels
    BinaryLabels,
}

impl ComparableClassificationMetric {
    /// Every identifier, in declaration order.
    pub const ALL: [ComparableClassificationMetric; 8] = [
        ComparableClassificationMetric::Accuracy,
        ComparableClassificationMetric::RocAuc,
        ComparableClassificationMetric::Mcc,
        ComparableClassificationMetric::MacroF1,
        ComparableClassificationMetric::LabelF1,
        ComparableClassificationMetric::LabelAvgPrecision,
        ComparableClassificationMetric::LabelRocAuc,
        ComparableClassificationMetric::NegativeLoss,
    ];

    /// Configuration name of the identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparableClassificationMetric::Accuracy => "accuracy",
            ComparableClassificationMetric::RocAuc => "roc_auc",
            ComparableClassificationMetric::Mcc => "mcc",
            ComparableClassificationMetric::MacroF1 => "macro_f1",
            ComparableClassificationMetric::LabelF1 => "label_f1",
            ComparableClassificationMetric::LabelAvgPrecision => "label_avg_precision",
            ComparableClassificationMetric::LabelRocAuc => "label_roc_auc",
            ComparableClassificationMetric::NegativeLoss => "negative_loss",
        }
    }

    /// Label configuration this identifier requires.
    pub fn precondition(&self) -> Precondition {
        match self {
            ComparableClassificationMetric::LabelF1
            | ComparableClassificationMetric::LabelAvgPrecision
            | ComparableClassificationMetric::LabelRocAuc => Precondition::TargetLabel,
            ComparableClassificationMetric::RocAuc | ComparableClassificationMetric::Mcc => {
                Precondition::BinaryLabels
            }
            ComparableClassificationMetric::Accuracy
            | ComparableClassificationMetric::MacroF1
            | ComparableClassificationMetric::NegativeLoss => Precondition::None,
        }
    }

    /// Check the precondition and bind the target label.
    pub fn resolve(self, target_label: Option<&str>, label_names: &[String]) -> Result<ModelSelectMetric> {
        let label = match self.precondition() {
            Precondition::None => None,
            Precondition::BinaryLabels => {
                if label_names.len() != 2 {
                    return Err(crate::config_error!(
                        "{} is only valid for binary classification, got {} labels",
                        self,
                        label_names.len()
                    ));
                }
                None
            }
            Precondition::TargetLabel => {
                let target = target_label
                    .ok_or_else(|| crate::config_error!("target_label must be set to use {}", self))?;
                if !label_names.iter().any(|name| name == target) {
                    return Err(crate::config_error!(
                        "target_label {:?} is not in the label catalogue",
                        target
                    ));
                }
                Some(target.to_string())
            }
        };

        Ok(match (self, label) {
            (ComparableClassificationMetric::LabelF1, Some(label)) => ModelSelectMetric::LabelF1 { label },
            (ComparableClassificationMetric::LabelAvgPrecision, Some(label)) => {
                ModelSelectMetric::LabelAvgPrecision { label }
            }
            (ComparableClassificationMetric::LabelRocAuc, Some(label)) => ModelSelectMetric::LabelRocAuc { label },
            (ComparableClassificationMetric::Accuracy, _) => ModelSelectMetric::Accuracy,
            (ComparableClassificationMetric::RocAuc, _) => ModelSelectMetric::RocAuc,
            (ComparableClassificationMetric::Mcc, _) => ModelSelectMetric::Mcc,
            (ComparableClassificationMetric::MacroF1, _) => ModelSelectMetric::MacroF1,
            (ComparableClassificationMetric::NegativeLoss, _) => ModelSelectMetric::NegativeLoss,
            (metric, None) => {
                return Err(ReporterError::internal(format!("{} resolved without a target label", metric)))
            }
        })
    }
}

impl fmt::Display for ComparableClassificationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparableClassificationMetric {
    type Err = ReporterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| crate::config_error!("unknown model select metric: {}", s))
    }
}

/// Model-selection metric bound to a label catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelectMetric {
    /// Overall accuracy
    Accuracy,
    /// Overall ROC-AUC
    RocAuc,
    /// Matthews correlation
    Mcc,
    /// Macro F1
    MacroF1,
    /// F1 of `label`
    LabelF1 {
        /// Target label name
        label: String,
    },
    /// Average precision of `label`
    LabelAvgPrecision {
        /// Target label name
        label: String,
    },
    /// ROC-AUC of `label`
    LabelRocAuc {
        /// Target label name
        label: String,
    },
    /// Negated loss
    NegativeLoss,
}

impl ModelSelectMetric {
    /// Identifier this metric was resolved from.
    pub fn id(&self) -> ComparableClassificationMetric {
        match self {
            ModelSelectMetric::Accuracy => ComparableClassificationMetric::Accuracy,
            ModelSelectMetric::RocAuc => ComparableClassificationMetric::RocAuc,
            ModelSelectMetric::Mcc => ComparableClassificationMetric::Mcc,
            ModelSelectMetric::MacroF1 => ComparableClassificationMetric::MacroF1,
            ModelSelectMetric::LabelF1 { .. } => ComparableClassificationMetric::LabelF1,
            ModelSelectMetric::LabelAvgPrecision { .. } => ComparableClassificationMetric::LabelAvgPrecision,
            ModelSelectMetric::LabelRocAuc { .. } => ComparableClassificationMetric::LabelRocAuc,
            ModelSelectMetric::NegativeLoss => ComparableClassificationMetric::NegativeLoss,
        }
    }

    /// Pull the selection scalar out of a report.
    ///
    /// Larger is always better. Fails with
    /// [`ReporterError::MetricUnavailable`] when the report never computed
    /// the requested value.
    pub fn extract(&self, metrics: &ClassificationMetrics) -> Result<f64> {
        let value = match self {
            ModelSelectMetric::Accuracy => Some(metrics.accuracy),
            ModelSelectMetric::RocAuc => metrics.roc_auc,
            ModelSelectMetric::Mcc => metrics.mcc,
            ModelSelectMetric::MacroF1 => Some(metrics.macro_prf1_metrics.macro_scores.f1),
            ModelSelectMetric::LabelF1 { label } => metrics
                .macro_prf1_metrics
                .per_label_scores
                .get(label)
                .map(|scores| scores.f1),
            ModelSelectMetric::LabelAvgPrecision { label } => metrics
                .per_label_soft_scores
                .as_ref()
                .and_then(|soft| soft.get(label))
                .map(|soft| soft.average_precision),
            ModelSelectMetric::LabelRocAuc { label } => metrics
                .per_label_soft_scores
                .as_ref()
                .and_then(|soft| soft.get(label))
                .and_then(|soft| soft.roc_auc),
            ModelSelectMetric::NegativeLoss => metrics.loss.map(|loss| -loss),
        };

        value.ok_or_else(|| ReporterError::metric_unavailable(self.to_string(), "not present in the report"))
    }
}

impl fmt::Display for ModelSelectMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSelectMetric::LabelF1 { label }
            | ModelSelectMetric::LabelAvgPrecision { label }
            | ModelSelectMetric::LabelRocAuc { label } => write!(f, "{}[{}]", self.id(), label),
            _ => write!(f, "{}", self.id()),
        }
    }
}

/// Whether `new` beats `old`; a missing `old` always loses.
pub fn compare_metric(new: f64, old: Option<f64>) -> bool {
    match old {
        None => true,
        Some(old) => new > old,
    }
}
