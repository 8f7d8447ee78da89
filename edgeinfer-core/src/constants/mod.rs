//! Constants for EdgeInfer Core
//!
//! Centralised limits used across the pipeline. Values mirror what the
//! framework targets in practice: a few hundred KB of RAM, a flat file system
//! with short names, and millisecond timers.
//!
//! ## Organization
//!
//! - **Buffers**: Row buffer, path and registry limits
//! - **Time**: Timer interval limits

/// Buffer sizes and memory limits for model state.
pub mod buffers;

/// Timer interval limits.
pub mod time;

pub use buffers::{
    MAX_FILEPATH_LEN, MAX_CSV_LINE_LEN, DEFAULT_MAX_MODEL_SETS,
    MAX_ROWS_DATA_BUFFER, MAX_FEATURES,
};

pub use time::MAX_TIMER_INTERVAL_MS;
