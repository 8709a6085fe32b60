//! Core infrastructure shared by every part of the reporter.
//!
//! # Organization
//!
//! - [`types`]: fundamental data types and enumerations
//! - [`constants`]: defaults and sentinel values
//! - [`error`]: error handling and error types
//!
//! ```rust
//! use classification_reporter::core::{
//!     types::{ScoreVector, Stage},
//!     constants::RECALL_AT_PRECISION_THRESHOLDS,
//!     error::{Result, ReporterError},
//! };
//!
//! let scores = ScoreVector::from(vec![0.25, 0.75]);
//! assert!(scores.is_present());
//! assert_eq!(Stage::Test.to_string(), "test");
//! assert_eq!(RECALL_AT_PRECISION_THRESHOLDS.len(), 5);
//! ```

pub mod constants;
pub mod error;
pub mod types;

pub use constants::*;
pub use error::{ReporterError, Result};
pub use types::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

static CORE_INIT: Once = Once::new();
static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the logging subsystem.
///
/// Installs `env_logger` once per process. A logger that was already
/// installed by the host application is left in place.
pub fn initialize_core() -> Result<()> {
    CORE_INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        let _ = env_logger::Builder::from_env(env).try_init();
        CORE_INITIALIZED.store(true, Ordering::SeqCst);
        log::debug!("classification reporter {} initialized", CLASSIFICATION_REPORTER_VERSION);
    });
    Ok(())
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::SeqCst)
}
