//! Result Taxonomy for the Inference Pipeline
//!
//! ## Design Philosophy
//!
//! EdgeInfer reports every outcome by value. There are no panics on recoverable
//! conditions and no heap data inside errors:
//!
//! 1. **Small Size**: Errors are `Copy` and carry only `&'static str` context or
//!    a few scalars, so they can be returned from the hot push path and handed
//!    to a result listener without allocation.
//!
//! 2. **Flat Taxonomy**: Every error maps onto one stable numeric code. A C
//!    bridge or a log line can carry the code and the meaning survives.
//!
//! 3. **Progress Is Not an Error**: A push that buffered a row, finished a
//!    model-set cycle, or needs another invoke is a success. Those states live
//!    in [`CycleStatus`], not in [`AiError`].
//!
//! ## Codes
//!
//! ```text
//!  0  Accepted              -7  InvalidArgument
//!  1  Finished              -8  ServiceNotRunning
//!  2  Proceeding            -9  InferenceFailed
//! -1  OperationFailed      -10  InvalidRawData
//! -2  NoMemory             -11  InvokeOutOfBounds
//! -3  FileAccess           -12  InvalidAttribute
//! -4  BufferEmpty          -13  MalformedRow
//! -5  ReadAlready          -14  SourceEof
//! -6  NotEnoughSpace
//! ```
//!
//! ## Scope of Failures
//!
//! Load-time failures (`NoMemory`, `FileAccess`, `InvalidAttribute`) abort the
//! activation of a whole model set. Push-time failures (`InvalidRawData`,
//! `InvokeOutOfBounds`, `InferenceFailed`) only skip the current cycle; the next
//! timer expiry starts a fresh one.
//!
//! ```rust
//! use edgeinfer_core::{AiError, CycleStatus};
//!
//! fn on_push(result: Result<CycleStatus, AiError>) {
//!     match result {
//!         Ok(CycleStatus::Finished) => { /* model set produced a result */ }
//!         Ok(_) => { /* buffered, waiting for a full window */ }
//!         Err(AiError::InvalidRawData) => { /* drop this sample */ }
//!         Err(e) => { let _code = e.code(); }
//!     }
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for framework operations
pub type AiResult<T> = Result<T, AiError>;

/// Successful outcome of pushing one sample through a model or a model set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Data accepted; nothing completed yet (e.g. window not full)
    Accepted,
    /// Inference finished for this model (or the whole model set)
    Finished,
    /// Engine ran but the logical inference needs more invokes
    Proceeding,
}

impl CycleStatus {
    /// Stable numeric code
    pub const fn code(self) -> i32 {
        match self {
            Self::Accepted => 0,
            Self::Finished => 1,
            Self::Proceeding => 2,
        }
    }
}

/// Framework errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum AiError {
    /// Any failure not covered by a more specific kind, including OS timer failures
    #[error("Operation failed: {0}")]
    OperationFailed(&'static str),

    /// Allocation of a buffer failed
    #[error("Out of memory")]
    NoMemory,

    /// A model or data file could not be opened or read
    #[error("File access error")]
    FileAccess,

    /// Nothing has been produced yet
    #[error("Buffer empty")]
    BufferEmpty,

    /// All available data has already been consumed
    #[error("Data already read")]
    ReadAlready,

    /// Destination has less room than the data to copy
    #[error("Not enough space: need {required}, have {available}")]
    NotEnoughSpace {
        /// Elements required
        required: usize,
        /// Elements available in the destination
        available: usize,
    },

    /// Caller passed an argument outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Data was pushed to a service that is not running
    #[error("Service not running")]
    ServiceNotRunning,

    /// The engine or a processing step failed during inference
    #[error("Inference error: {0}")]
    InferenceFailed(&'static str),

    /// The process handler rejected the raw payload
    #[error("Invalid raw data")]
    InvalidRawData,

    /// A post-processed value left its expected range
    #[error("Invoke result {value} outside [{min}, {max}]")]
    InvokeOutOfBounds {
        /// The offending value
        value: f32,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },

    /// Model metadata is inconsistent
    #[error("Invalid model attribute: {0}")]
    InvalidAttribute(&'static str),

    /// A data row is empty or has an empty/unparsable field
    #[error("Malformed data row at line {line}")]
    MalformedRow {
        /// 1-based line number in the source
        line: usize,
    },

    /// The data source is exhausted
    #[error("End of source")]
    SourceEof,
}

impl AiError {
    /// Stable numeric code (always negative)
    pub const fn code(&self) -> i32 {
        match self {
            Self::OperationFailed(_) => -1,
            Self::NoMemory => -2,
            Self::FileAccess => -3,
            Self::BufferEmpty => -4,
            Self::ReadAlready => -5,
            Self::NotEnoughSpace { .. } => -6,
            Self::InvalidArgument(_) => -7,
            Self::ServiceNotRunning => -8,
            Self::InferenceFailed(_) => -9,
            Self::InvalidRawData => -10,
            Self::InvokeOutOfBounds { .. } => -11,
            Self::InvalidAttribute(_) => -12,
            Self::MalformedRow { .. } => -13,
            Self::SourceEof => -14,
        }
    }

    /// Rebuilds an error from its code.
    ///
    /// Context that is not part of the code (messages, sizes, line numbers)
    /// comes back empty or zeroed. Returns `None` for non-negative or unknown codes.
    pub const fn from_code(code: i32) -> Option<Self> {
        let err = match code {
            -1 => Self::OperationFailed(""),
            -2 => Self::NoMemory,
            -3 => Self::FileAccess,
            -4 => Self::BufferEmpty,
            -5 => Self::ReadAlready,
            -6 => Self::NotEnoughSpace { required: 0, available: 0 },
            -7 => Self::InvalidArgument(""),
            -8 => Self::ServiceNotRunning,
            -9 => Self::InferenceFailed(""),
            -10 => Self::InvalidRawData,
            -11 => Self::InvokeOutOfBounds { value: 0.0, min: 0.0, max: 0.0 },
            -12 => Self::InvalidAttribute(""),
            -13 => Self::MalformedRow { line: 0 },
            -14 => Self::SourceEof,
            _ => return None,
        };
        Some(err)
    }

    /// True for failures that only affect the current push cycle
    pub const fn is_per_push(&self) -> bool {
        matches!(
            self,
            Self::InvalidRawData | Self::InvokeOutOfBounds { .. } | Self::InferenceFailed(_)
        )
    }
}

/// Flattens a push outcome into its numeric code
pub fn result_code(result: &AiResult<CycleStatus>) -> i32 {
    match result {
        Ok(status) => status.code(),
        Err(e) => e.code(),
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for AiError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::OperationFailed(reason) => defmt::write!(fmt, "Operation failed: {}", reason),
            Self::NotEnoughSpace { required, available } =>
                defmt::write!(fmt, "Need {} slots, have {}", required, available),
            Self::InvalidArgument(reason) => defmt::write!(fmt, "Invalid argument: {}", reason),
            Self::InferenceFailed(reason) => defmt::write!(fmt, "Inference error: {}", reason),
            Self::InvokeOutOfBounds { value, min, max } =>
                defmt::write!(fmt, "Invoke result {} outside [{}, {}]", value, min, max),
            Self::InvalidAttribute(reason) => defmt::write!(fmt, "Invalid attribute: {}", reason),
            Self::MalformedRow { line } => defmt::write!(fmt, "Malformed row at line {}", line),
            other => defmt::write!(fmt, "AI error {}", other.code()),
        }
    }
}
