//! Configuration management for the classification reporter.
//!
//! A [`ReporterConfig`] covers everything that is independent of the label
//! catalogue. Checks that need the catalogue, such as the model-selection
//! metric precondition, run when a reporter is built from the config.

pub mod core;

pub use self::core::{ReporterConfig, ReporterConfigBuilder};
