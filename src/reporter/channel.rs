//! Output channels receiving the report of a finished pass.

use crate::core::error::Result;
use crate::core::types::{ReportedLabel, Score, Stage};
use crate::metrics::ClassificationMetrics;
use csv::WriterBuilder;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Everything a channel gets to see about one finished pass.
#[derive(Debug, Clone, Copy)]
pub struct StageReport<'a> {
    /// Stage of the pass
    pub stage: Stage,
    /// Epoch of the pass
    pub epoch: usize,
    /// Computed metrics, including the loss
    pub metrics: &'a ClassificationMetrics,
    /// Model-selection scalar extracted from `metrics`
    pub model_select_metric: f64,
    /// Predicted label names per example
    pub predictions: &'a [ReportedLabel],
    /// Target label names per example
    pub targets: &'a [ReportedLabel],
    /// Retained score rows; empty in memory-efficient mode
    pub scores: &'a [Vec<Score>],
    /// Per-example context values keyed by column
    pub context: &'a BTreeMap<String, Vec<Value>>,
    /// Reporter metadata
    pub meta: &'a BTreeMap<String, Vec<String>>,
}

/// Destination of stage reports.
pub trait Channel: fmt::Debug + Send {
    /// Stages this channel fires for.
    fn stages(&self) -> &[Stage];

    /// Consume one report.
    fn report(&mut self, report: &StageReport<'_>) -> Result<()>;

    /// Whether the channel fires for `stage`.
    fn accepts(&self, stage: Stage) -> bool {
        self.stages().contains(&stage)
    }
}

/// Writes one tab-separated row per example.
///
/// Columns are `prediction`, `target`, `scores` followed by the configured
/// context columns. Each report overwrites the file.
#[derive(Debug, Clone)]
pub struct FileChannel {
    path: PathBuf,
    stages: Vec<Stage>,
    context_columns: Vec<String>,
}

impl FileChannel {
    /// Create a channel writing to `path` for `stages`.
    pub fn new<P: Into<PathBuf>>(path: P, stages: Vec<Stage>, context_columns: Vec<String>) -> Self {
        FileChannel {
            path: path.into(),
            stages,
            context_columns,
        }
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header(&self) -> Vec<String> {
        ["prediction", "target", "scores"]
            .iter()
            .map(|s| s.to_string())
            .chain(self.context_columns.iter().cloned())
            .collect()
    }
}

fn context_cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Channel for FileChannel {
    fn stages(&self) -> &[Stage] {
        &self.stages
    }

    fn report(&mut self, report: &StageReport<'_>) -> Result<()> {
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(&self.path)?;
        writer.write_record(self.header())?;

        for (i, (prediction, target)) in report.predictions.iter().zip(report.targets).enumerate() {
            let scores = match report.scores.get(i) {
                Some(row) => serde_json::to_string(row)?,
                None => String::new(),
            };
            let mut record = vec![prediction.to_string(), target.to_string(), scores];
            record.extend(self.context_columns.iter().map(|column| {
                report
                    .context
                    .get(column)
                    .and_then(|values| values.get(i))
                    .map(context_cell)
                    .unwrap_or_default()
            }));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        log::info!(
            "{} epoch {}: wrote {} predictions to {}",
            report.stage,
            report.epoch,
            report.predictions.len(),
            self.path.display()
        );
        Ok(())
    }
}
