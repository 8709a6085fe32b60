//! Error handling and error types for the classification reporter.
//!
//! Configuration problems are surfaced when a reporter is constructed,
//! data-contract violations when a batch is ingested or a pass is
//! finalized, and absent-value faults when a model-selection metric is
//! extracted from a report that never computed it.

use std::io;
use thiserror::Error;

/// Main error type for the classification reporter.
#[derive(Error, Debug)]
pub enum ReporterError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Dimension mismatch errors
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Out of bounds label access
    #[error("Index out of bounds: index {index}, length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    /// Batch payloads that break the ingestion contract
    #[error("Data contract violation: {message}")]
    DataContract { message: String },

    /// A metric requested for model selection was never computed
    #[error("Metric unavailable: {metric} ({reason})")]
    MetricUnavailable { metric: String, reason: String },

    /// Report serialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// Delimited output errors
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using ReporterError
pub type Result<T> = std::result::Result<T, ReporterError>;

impl ReporterError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ReporterError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        ReporterError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch<E, A>(expected: E, actual: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        ReporterError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an index out of bounds error
    pub fn index_out_of_bounds(index: i64, length: usize) -> Self {
        ReporterError::IndexOutOfBounds { index, length }
    }

    /// Create a data contract error
    pub fn data_contract<S: Into<String>>(message: S) -> Self {
        ReporterError::DataContract {
            message: message.into(),
        }
    }

    /// Create a metric unavailable error
    pub fn metric_unavailable<M, R>(metric: M, reason: R) -> Self
    where
        M: Into<String>,
        R: Into<String>,
    {
        ReporterError::MetricUnavailable {
            metric: metric.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        ReporterError::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        ReporterError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// Nothing the reporter raises can be retried with the same inputs:
    /// configuration and data-contract faults point at an upstream defect.
    /// Only I/O from output channels may succeed on a later attempt.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ReporterError::Config { .. } => false,
            ReporterError::InvalidParameter { .. } => false,
            ReporterError::DimensionMismatch { .. } => false,
            ReporterError::IndexOutOfBounds { .. } => false,
            ReporterError::DataContract { .. } => false,
            ReporterError::MetricUnavailable { .. } => false,
            ReporterError::Serialization { .. } => false,
            ReporterError::IO { .. } => true,
            ReporterError::Csv { .. } => true,
            ReporterError::Json { .. } => false,
            ReporterError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ReporterError::Config { .. } => "config",
            ReporterError::InvalidParameter { .. } => "invalid_parameter",
            ReporterError::DimensionMismatch { .. } => "dimension_mismatch",
            ReporterError::IndexOutOfBounds { .. } => "index_out_of_bounds",
            ReporterError::DataContract { .. } => "data_contract",
            ReporterError::MetricUnavailable { .. } => "metric_unavailable",
            ReporterError::Serialization { .. } => "serialization",
            ReporterError::IO { .. } => "io",
            ReporterError::Csv { .. } => "csv",
            ReporterError::Json { .. } => "json",
            ReporterError::Internal { .. } => "internal",
        }
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::ReporterError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ReporterError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}
