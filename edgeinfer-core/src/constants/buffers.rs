//! Buffer Sizes and Memory Constraints
//!
//! Limits applied when a model is loaded. They bound the allocation a single
//! manifest can request so a typo in metadata fails fast with
//! `InvalidAttribute` instead of exhausting RAM on a microcontroller.

/// Maximum model file path length (characters).
///
/// Matches the flat file system on the reference boards:
/// - 32 chars, e.g. `/mnt/AI/REF_TempPred.tflite`
/// - Longer paths are rejected at attribute validation
pub const MAX_FILEPATH_LEN: usize = 32;

/// Maximum rows one data buffer may hold.
///
/// - 1024 rows × 16 features × 4 bytes = 64KB worst case
/// - Typical windows are 5-60 rows
pub const MAX_ROWS_DATA_BUFFER: u16 = 1024;

/// Maximum features per parsed row.
pub const MAX_FEATURES: u16 = 64;

/// Maximum characters in one CSV line read by `CsvSource`.
///
/// Sensor rows are short; 256 bytes fits ~30 float columns.
pub const MAX_CSV_LINE_LEN: usize = 256;

/// Default number of model sets a registry tracks.
pub const DEFAULT_MAX_MODEL_SETS: usize = 4;
