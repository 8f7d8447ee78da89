//! In-memory replay of recorded rows

use super::DataSource;
use crate::errors::{AiError, AiResult};

/// Replays fixed-width rows from a slice
///
/// Useful for tests and for demos without sensors. With looping enabled the
/// source never reports `SourceEof` (unless it is empty).
pub struct MemorySource<'a, const N: usize> {
    rows: &'a [[f32; N]],
    position: usize,
    looping: bool,
}

impl<'a, const N: usize> MemorySource<'a, N> {
    /// Create new source over `rows`
    pub fn new(rows: &'a [[f32; N]]) -> Self {
        Self { rows, position: 0, looping: false }
    }

    /// Restart from the first row after the last one
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    /// Reset to beginning
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Rows handed out so far (wraps when looping)
    pub fn position(&self) -> usize {
        self.position
    }

    /// Check if source is exhausted
    pub fn is_exhausted(&self) -> bool {
        if self.looping {
            self.rows.is_empty()
        } else {
            self.position >= self.rows.len()
        }
    }
}

impl<const N: usize> DataSource for MemorySource<'_, N> {
    fn read_row(&mut self, out: &mut [f32]) -> AiResult<usize> {
        if out.len() < N {
            return Err(AiError::NotEnoughSpace { required: N, available: out.len() });
        }
        if self.looping && self.position >= self.rows.len() {
            self.position = 0;
        }
        let row = self.rows.get(self.position).ok_or(AiError::SourceEof)?;
        out[..N].copy_from_slice(row);
        self.position += 1;
        Ok(N)
    }

    fn column_count(&self) -> usize {
        N
    }
}
