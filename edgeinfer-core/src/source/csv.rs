//! CSV file replay
//!
//! Reads comma-separated `f32` rows with a small fixed read buffer and a
//! bounded line buffer, so memory stays flat regardless of file size.
//!
//! ```csv
//! accel_x,accel_y,accel_z
//! 0.12,-0.98,0.03
//! 0.15,-0.97,0.04
//! ```
//!
//! The column count comes from the first line (header or data). Every later
//! row must have exactly that many fields.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::DataSource;
use crate::constants::MAX_CSV_LINE_LEN;
use crate::errors::{AiError, AiResult};

/// Counters for a CSV source
#[derive(Debug, Default, Clone)]
pub struct CsvStats {
    /// Rows parsed successfully
    pub rows_read: usize,
    /// Lines consumed, header included
    pub lines_processed: usize,
    /// Rows rejected as malformed
    pub parse_errors: usize,
    /// Bytes read from the file
    pub bytes_read: usize,
}

/// Comma-separated `f32` rows from a file
pub struct CsvSource {
    file: File,
    buffer: [u8; 512],
    buffer_pos: usize,
    buffer_len: usize,
    line: heapless::String<MAX_CSV_LINE_LEN>,
    /// First data line already sits in `line`
    pending: bool,
    eof: bool,
    columns: usize,
    stats: CsvStats,
}

impl CsvSource {
    /// Opens `path`, skipping a header line when `has_header` is set
    ///
    /// # Errors
    ///
    /// `FileAccess` if the file cannot be opened or read, `SourceEof` if it is
    /// empty, `MalformedRow` if the first line has an empty field.
    pub fn open<P: AsRef<Path>>(path: P, has_header: bool) -> AiResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_e| {
            log_error!("csv {} open failed: {}", path.display(), _e);
            AiError::FileAccess
        })?;

        let mut source = Self {
            file,
            buffer: [0; 512],
            buffer_pos: 0,
            buffer_len: 0,
            line: heapless::String::new(),
            pending: false,
            eof: false,
            columns: 0,
            stats: CsvStats::default(),
        };

        if !source.next_line()? {
            return Err(AiError::SourceEof);
        }
        let fields = source.line.split(',').map(str::trim);
        let mut columns = 0;
        for field in fields {
            if field.is_empty() {
                return Err(AiError::MalformedRow { line: 1 });
            }
            columns += 1;
        }
        source.columns = columns;
        source.pending = !has_header;
        log_debug!("csv {} opened with {} columns", path.display(), columns);
        Ok(source)
    }

    /// Read counters
    pub fn stats(&self) -> &CsvStats {
        &self.stats
    }

    fn refill_buffer(&mut self) -> AiResult<bool> {
        if self.eof {
            return Ok(false);
        }
        self.buffer_pos = 0;
        self.buffer_len = self.file.read(&mut self.buffer).map_err(|_e| {
            log_error!("csv read failed: {}", _e);
            AiError::FileAccess
        })?;
        if self.buffer_len == 0 {
            self.eof = true;
            return Ok(false);
        }
        self.stats.bytes_read += self.buffer_len;
        Ok(true)
    }

    /// Loads the next line into `self.line`; false at end of file
    fn next_line(&mut self) -> AiResult<bool> {
        self.line.clear();
        let mut overflow = false;
        loop {
            while self.buffer_pos < self.buffer_len {
                let byte = self.buffer[self.buffer_pos];
                self.buffer_pos += 1;
                match byte {
                    b'\n' => return self.finish_line(overflow).map(|_| true),
                    b'\r' => {}
                    _ => {
                        if self.line.push(byte as char).is_err() {
                            overflow = true;
                        }
                    }
                }
            }
            if !self.refill_buffer()? {
                if self.line.is_empty() && !overflow {
                    return Ok(false);
                }
                return self.finish_line(overflow).map(|_| true);
            }
        }
    }

    fn finish_line(&mut self, overflow: bool) -> AiResult<()> {
        self.stats.lines_processed += 1;
        if overflow {
            self.stats.parse_errors += 1;
            return Err(AiError::MalformedRow { line: self.stats.lines_processed });
        }
        Ok(())
    }

    fn parse_line(&mut self, out: &mut [f32]) -> AiResult<usize> {
        let line_no = self.stats.lines_processed;
        let mut count = 0;
        for field in self.line.split(',').map(str::trim) {
            let value = match field.parse::<f32>() {
                Ok(v) if count < self.columns => v,
                _ => {
                    self.stats.parse_errors += 1;
                    return Err(AiError::MalformedRow { line: line_no });
                }
            };
            out[count] = value;
            count += 1;
        }
        if count != self.columns {
            self.stats.parse_errors += 1;
            return Err(AiError::MalformedRow { line: line_no });
        }
        self.stats.rows_read += 1;
        Ok(count)
    }
}

impl DataSource for CsvSource {
    fn read_row(&mut self, out: &mut [f32]) -> AiResult<usize> {
        if out.len() < self.columns {
            return Err(AiError::NotEnoughSpace { required: self.columns, available: out.len() });
        }
        if self.pending {
            self.pending = false;
        } else if !self.next_line()? {
            return Err(AiError::SourceEof);
        }
        self.parse_line(out)
    }

    fn column_count(&self) -> usize {
        self.columns
    }
}
