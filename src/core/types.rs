//! Core data types shared by the reporter, the metric calculator and the
//! model-selection extractor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score type produced by the model for one label of one example.
pub type Score = f32;

/// Raw label index as it arrives in prediction/target tensors.
///
/// Signed so the multi-label "no label" padding sentinel can be carried.
pub type RawLabel = i64;

/// Offset into the label catalogue.
pub type LabelIndex = usize;

/// Evaluation stage a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Training pass
    Train,
    /// Validation pass
    Eval,
    /// Held-out test pass
    Test,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Train => write!(f, "train"),
            Stage::Eval => write!(f, "eval"),
            Stage::Test => write!(f, "test"),
        }
    }
}

/// Confusion outcome recorded against a single label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// True positive
    TP,
    /// False positive
    FP,
    /// False negative
    FN,
    /// True negative
    TN,
}

/// Per-example score vector.
///
/// Memory-efficient passes never retain scores; those examples carry
/// `Withheld` instead of an empty vector so the calculator never has to
/// guess what an empty score list means.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ScoreVector {
    /// One score per label in catalogue order
    Present(Vec<Score>),
    /// Scores were not retained for this example
    #[default]
    Withheld,
}

impl ScoreVector {
    /// Scores if they were retained.
    pub fn as_slice(&self) -> Option<&[Score]> {
        match self {
            ScoreVector::Present(scores) => Some(scores),
            ScoreVector::Withheld => None,
        }
    }

    /// Whether scores were retained.
    pub fn is_present(&self) -> bool {
        matches!(self, ScoreVector::Present(_))
    }
}

impl From<Vec<Score>> for ScoreVector {
    fn from(scores: Vec<Score>) -> Self {
        ScoreVector::Present(scores)
    }
}

/// Human-readable projection of one example's prediction or target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportedLabel {
    /// Single label name (single-label and top-k reporters)
    Single(String),
    /// Ordered label names (multi-label reporter)
    Set(Vec<String>),
}

impl fmt::Display for ReportedLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportedLabel::Single(name) => write!(f, "{}", name),
            ReportedLabel::Set(names) => write!(f, "{}", names.join(",")),
        }
    }
}
