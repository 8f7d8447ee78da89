//! Raw-Data Sources
//!
//! A [`DataSource`] produces raw sample rows for a collect function to push.
//! Real deployments read sensors; tests and demos replay recorded rows:
//!
//! - [`MemorySource`] - rows from a slice, optionally looping
//! - [`CsvSource`] - comma-separated `f32` rows from a file (`std` only)
//!
//! ```rust
//! use edgeinfer_core::source::{DataSource, MemorySource};
//! use edgeinfer_core::AiError;
//!
//! let rows = [[1.0, 2.0], [3.0, 4.0]];
//! let mut source = MemorySource::new(&rows);
//! let mut out = [0.0; 2];
//!
//! assert_eq!(source.read_row(&mut out), Ok(2));
//! assert_eq!(source.read_row(&mut out), Ok(2));
//! assert_eq!(out, [3.0, 4.0]);
//! assert_eq!(source.read_row(&mut out), Err(AiError::SourceEof));
//! ```

use crate::errors::AiResult;

#[cfg(feature = "std")]
pub mod csv;
pub mod memory;

#[cfg(feature = "std")]
pub use csv::{CsvSource, CsvStats};
pub use memory::MemorySource;

/// Producer of raw sample rows
pub trait DataSource {
    /// Writes the next row into `out`, returning its element count
    ///
    /// Returns `SourceEof` once exhausted and `NotEnoughSpace` if `out` is
    /// shorter than a row.
    fn read_row(&mut self, out: &mut [f32]) -> AiResult<usize>;

    /// Elements per row
    fn column_count(&self) -> usize;
}
