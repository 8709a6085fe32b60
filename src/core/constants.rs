//! Constants and configuration defaults for the classification reporter.

use crate::core::types::RawLabel;

/// Precision thresholds at which recall is reported by default.
pub const RECALL_AT_PRECISION_THRESHOLDS: [f64; 5] = [0.2, 0.4, 0.6, 0.8, 0.9];

/// Padding value marking "no label" in multi-label target rows.
pub const NO_LABEL: RawLabel = -1;

/// Key under which label names are exported by `get_meta`.
pub const META_LABEL_NAMES: &str = "label_names";

/// Context key holding the concatenated raw text of each example.
pub const TEXT_CONTEXT_KEY: &str = "text";

/// Separator placed between text columns in the text context.
pub const TEXT_COLUMN_SEPARATOR: &str = " | ";

/// Default raw-input text column.
pub const DEFAULT_TEXT_COLUMN: &str = "text";

/// Default number of candidates kept per example by the top-k reporter.
pub const DEFAULT_TOPK: usize = 3;

/// Version of this crate.
pub const CLASSIFICATION_REPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compile-time assertions on the defaults.
mod compile_time_assertions {
    use super::*;
    use static_assertions::*;

    // The sentinel must never collide with a catalogue offset
    const_assert!(NO_LABEL < 0);
    const_assert!(DEFAULT_TOPK >= 1);
}
