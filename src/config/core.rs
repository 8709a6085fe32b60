//! Reporter configuration structure, builder and file persistence.

use crate::core::constants::*;
use crate::core::error::{ReporterError, Result};
use crate::core::types::Stage;
use crate::reporter::selection::ComparableClassificationMetric;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration shared by every reporter variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Metric used to rank checkpoints
    pub model_select_metric: ComparableClassificationMetric,
    /// Label targeted by the per-label selection metrics
    pub target_label: Option<String>,
    /// Raw-input columns concatenated into the text context
    pub text_column_names: Vec<String>,
    /// Raw-input columns copied through to the context verbatim
    pub additional_column_names: Vec<String>,
    /// Precision thresholds of the recall-at-precision table
    pub recall_at_precision_thresholds: Vec<f64>,
    /// Withhold score vectors and skip score-dependent metrics
    pub is_memory_efficient: bool,
    /// Candidates kept per example by the top-k reporter
    pub topk: usize,
    /// Destination of the per-example prediction file, if any
    pub output_path: Option<PathBuf>,
    /// Stages for which the prediction file is written
    pub file_channel_stages: Vec<Stage>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig {
            model_select_metric: ComparableClassificationMetric::Accuracy,
            target_label: None,
            text_column_names: vec![DEFAULT_TEXT_COLUMN.to_string()],
            additional_column_names: Vec::new(),
            recall_at_precision_thresholds: RECALL_AT_PRECISION_THRESHOLDS.to_vec(),
            is_memory_efficient: false,
            topk: DEFAULT_TOPK,
            output_path: None,
            file_channel_stages: vec![Stage::Test],
        }
    }
}

impl ReporterConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters.
    ///
    /// Checks that do not depend on the label catalogue; the selection
    /// metric is validated when a reporter is constructed.
    pub fn validate(&self) -> Result<()> {
        for &threshold in &self.recall_at_precision_thresholds {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ReporterError::invalid_parameter(
                    "recall_at_precision_thresholds",
                    threshold.to_string(),
                    "must be in range [0.0, 1.0]",
                ));
            }
        }

        if self.topk == 0 {
            return Err(ReporterError::invalid_parameter(
                "topk",
                self.topk.to_string(),
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReporterError::config(format!("Failed to read config file: {}", e)))?;

        let config: ReporterConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ReporterError::config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ReporterError::config(format!("Failed to parse TOML config: {}", e)))?,
            _ => {
                return Err(ReporterError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)
                .map_err(|e| ReporterError::serialization(format!("Failed to serialize to JSON: {}", e)))?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| ReporterError::serialization(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(ReporterError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Columns carried in the context, text first.
    pub fn context_column_names(&self) -> Vec<String> {
        std::iter::once(TEXT_CONTEXT_KEY.to_string())
            .chain(self.additional_column_names.iter().cloned())
            .collect()
    }
}

/// Builder for [`ReporterConfig`]
#[derive(Debug)]
pub struct ReporterConfigBuilder {
    config: ReporterConfig,
    validation_errors: Vec<String>,
}

impl ReporterConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        ReporterConfigBuilder {
            config: ReporterConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the model-selection metric
    pub fn model_select_metric(mut self, metric: ComparableClassificationMetric) -> Self {
        self.config.model_select_metric = metric;
        self
    }

    /// Set the target label of per-label selection metrics
    pub fn target_label<S: Into<String>>(mut self, label: S) -> Self {
        self.config.target_label = Some(label.into());
        self
    }

    /// Set the text columns
    pub fn text_column_names<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.text_column_names = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the passthrough columns
    pub fn additional_column_names<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.additional_column_names = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the recall-at-precision thresholds
    pub fn recall_at_precision_thresholds(mut self, thresholds: Vec<f64>) -> Self {
        if thresholds.iter().any(|t| !(0.0..=1.0).contains(t)) {
            self.validation_errors
                .push("recall_at_precision_thresholds must be in range [0.0, 1.0]".to_string());
        }
        self.config.recall_at_precision_thresholds = thresholds;
        self
    }

    /// Enable or disable memory-efficient mode
    pub fn memory_efficient(mut self, enabled: bool) -> Self {
        self.config.is_memory_efficient = enabled;
        self
    }

    /// Set the number of top-k candidates
    pub fn topk(mut self, k: usize) -> Self {
        if k == 0 {
            self.validation_errors.push("topk must be at least 1".to_string());
        }
        self.config.topk = k;
        self
    }

    /// Write per-example predictions to `path`
    pub fn output_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    /// Set the stages the prediction file is written for
    pub fn file_channel_stages(mut self, stages: Vec<Stage>) -> Self {
        self.config.file_channel_stages = stages;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ReporterConfig> {
        if !self.validation_errors.is_empty() {
            return Err(ReporterError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ReporterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
