//! Row-Oriented Ring Buffer for Parsed Feature Rows
//!
//! ## Overview
//!
//! Every model keeps the most recent parsed rows in a [`DataBuffer`]. A row is
//! `featuresCount` floats produced by the process handler from one raw push.
//! The buffer holds at most `maxRowsDataBuffer` rows; once full, each new row
//! overwrites the oldest one.
//!
//! ## Design Rationale
//!
//! ### Why a Ring?
//!
//! Inference runs on a sliding window of the newest `windowSize` rows. A ring
//! gives that window with constant-time writes and no shifting:
//! - O(1) row write (overwrites oldest when full)
//! - O(1) access to the newest row
//! - O(window × features) copy of the invoke window
//!
//! ### Memory Layout
//!
//! Storage is one flat allocation made once at model load time:
//!
//! ```text
//! DataBuffer (4 rows × 3 features), after 5 writes (A..E):
//! ┌───────────┬───────────┬───────────┬───────────┐
//! │  E0 E1 E2 │  B0 B1 B2 │  C0 C1 C2 │  D0 D1 D2 │
//! └───────────┴───────────┴───────────┴───────────┘
//!       ↑            ↑
//!   newest row   write_pos (= oldest row when full)
//! ```
//!
//! The allocation uses `try_reserve_exact`, so an oversized manifest surfaces
//! as `NoMemory` instead of aborting.
//!
//! ## Usage Example
//!
//! ```rust
//! use edgeinfer_core::buffer::DataBuffer;
//!
//! let mut buffer = DataBuffer::new(3, 2).unwrap();
//! for i in 0..4 {
//!     buffer.write_row(&[i as f32, i as f32 * 10.0]).unwrap();
//! }
//!
//! // Row 0 was evicted
//! assert_eq!(buffer.raw_data_count(), 3);
//! assert_eq!(buffer.row(0), Some(&[1.0, 10.0][..]));
//! assert_eq!(buffer.last_row(), Some(&[3.0, 30.0][..]));
//! ```

use alloc::vec::Vec;

use crate::errors::{AiError, AiResult};

/// Fixed-capacity ring of parsed feature rows
///
/// ## Internal Invariants
///
/// - `write_pos < max_rows` (next write position is always valid)
/// - `len <= max_rows` (never claim more rows than capacity)
/// - Logical row 0 is the oldest, `len - 1` the newest
///
/// ## Thread Safety
///
/// Not synchronised. The pipeline that owns it runs on one logical thread per
/// model set.
#[derive(Debug, Clone)]
pub struct DataBuffer {
    /// Flat row storage, `max_rows * features` elements
    data: Vec<f32>,
    /// Row capacity
    max_rows: usize,
    /// Elements per row
    features: usize,
    /// Row index where the next write lands
    write_pos: usize,
    /// Rows currently valid
    len: usize,
}

/// Allocates a zeroed `Vec<f32>` of `len` elements, reporting failure as `NoMemory`
pub(crate) fn try_alloc(len: usize) -> AiResult<Vec<f32>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| AiError::NoMemory)?;
    v.resize(len, 0.0);
    Ok(v)
}

impl DataBuffer {
    /// Creates an empty buffer of `max_rows` rows of `features` elements
    pub fn new(max_rows: usize, features: usize) -> AiResult<Self> {
        if max_rows == 0 || features == 0 {
            return Err(AiError::InvalidArgument("buffer dimensions must be non-zero"));
        }
        let total = max_rows.checked_mul(features).ok_or(AiError::NoMemory)?;
        Ok(Self {
            data: try_alloc(total)?,
            max_rows,
            features,
            write_pos: 0,
            len: 0,
        })
    }

    /// Appends one row, evicting the oldest when full
    pub fn write_row(&mut self, row: &[f32]) -> AiResult<()> {
        if row.len() != self.features {
            return Err(AiError::InvalidArgument("row width does not match featuresCount"));
        }
        let start = self.write_pos * self.features;
        self.data[start..start + self.features].copy_from_slice(row);
        self.write_pos = (self.write_pos + 1) % self.max_rows;

        if self.len < self.max_rows {
            self.len += 1;
        }
        Ok(())
    }

    /// Rows currently held
    pub fn raw_data_count(&self) -> usize {
        self.len
    }

    /// Row capacity
    pub fn capacity(&self) -> usize {
        self.max_rows
    }

    /// Elements per row
    pub fn features_count(&self) -> usize {
        self.features
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == self.max_rows
    }

    /// Gets a row by logical index (0 = oldest, len-1 = newest)
    ///
    /// ```text
    /// Physical rows:  [D, E, A, B, C]  (write_pos = 2, full)
    /// Logical view:   [A, B, C, D, E]
    /// logical[i] = physical[(write_pos + i) % max_rows]
    /// ```
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.len {
            return None;
        }
        let physical = if self.len < self.max_rows {
            index
        } else {
            (self.write_pos + index) % self.max_rows
        };
        let start = physical * self.features;
        Some(&self.data[start..start + self.features])
    }

    /// The most recently written row
    pub fn last_row(&self) -> Option<&[f32]> {
        if self.is_empty() {
            return None;
        }
        self.row(self.len - 1)
    }

    /// Iterates rows from oldest to newest
    pub fn rows(&self) -> Rows<'_> {
        Rows { buffer: self, index: 0 }
    }

    /// Copies the newest `window` rows, oldest first, into `out`
    ///
    /// Returns the number of elements written.
    pub fn read_window(&self, window: usize, out: &mut [f32]) -> AiResult<usize> {
        if self.is_empty() {
            return Err(AiError::BufferEmpty);
        }
        if window > self.len {
            return Err(AiError::NotEnoughSpace { required: window, available: self.len });
        }
        let needed = window * self.features;
        if out.len() < needed {
            return Err(AiError::NotEnoughSpace { required: needed, available: out.len() });
        }
        let first = self.len - window;
        for (i, chunk) in out[..needed].chunks_exact_mut(self.features).enumerate() {
            if let Some(row) = self.row(first + i) {
                chunk.copy_from_slice(row);
            }
        }
        Ok(needed)
    }

    /// Drops all rows
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.len = 0;
    }
}

/// Iterator over buffered rows, oldest first
pub struct Rows<'a> {
    buffer: &'a DataBuffer,
    index: usize,
}

impl<'a> Iterator for Rows<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.buffer.row(self.index)?;
        self.index += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len - self.index.min(self.buffer.len);
        (remaining, Some(remaining))
    }
}
