//! Model Metadata
//!
//! [`ModelAttribute`] is the value-type description of one model: where its
//! graph comes from, which raw columns it consumes, how many rows it buffers,
//! how many it needs per invoke, and the tensor sizes on both sides of the
//! engine. Everything the pipeline allocates is sized from it.
//!
//! ## Sources
//!
//! A model graph is either embedded in firmware (a `&'static [u8]`, for targets
//! without a file system) or read from a file named by `modelPath`:
//!
//! ```rust
//! use edgeinfer_core::attribute::{ModelAttribute, ModelSource};
//!
//! static GRAPH: [u8; 4] = *b"EIDN";
//!
//! let attr = ModelAttribute::default().with_model_bytes(&GRAPH);
//! assert!(matches!(attr.source(), Ok(ModelSource::Bytes(_))));
//! ```
//!
//! ## Manifests
//!
//! With the `std` feature the same structure is read from a JSON manifest:
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "modelPath": "/mnt/AI/sine.eidn",
//!   "features": [0, 1],
//!   "featuresCount": 2,
//!   "inferenceInterval": 1000,
//!   "maxRowsDataBuffer": 10,
//!   "windowSize": 5,
//!   "invokeInputCount": 10,
//!   "invokeOutputCount": 1,
//!   "postProcessResultCount": 1,
//!   "inferenceResultCount": 1
//! }
//! ```

use alloc::{borrow::Cow, string::String, vec::Vec};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_FEATURES, MAX_FILEPATH_LEN, MAX_ROWS_DATA_BUFFER};
use crate::errors::{AiError, AiResult};

/// Where a model graph is loaded from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelSource<'a> {
    /// In-memory serialized graph
    Bytes(&'a [u8]),
    /// Path to a serialized graph file
    File(&'a str),
}

/// Properties of one AI model
///
/// Field names serialize in camelCase to match manifest files.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelAttribute {
    /// CRC-32 of the model graph; 0 disables the integrity check
    pub crc32: u32,
    /// Model version string
    pub version: String,
    /// Path of a file based model (empty when `model` is set)
    pub model_path: String,
    /// Array based model
    #[serde(skip)]
    pub model: Option<Cow<'static, [u8]>>,
    /// Column indices selected from the raw payload
    pub features: Vec<u16>,
    /// Number of entries in `features`
    pub features_count: u16,
    /// Interval at which data is collected for inference (ms)
    pub inference_interval: u32,
    /// Opaque model-set identifier
    pub model_code: u32,
    /// Row capacity of the data buffer
    pub max_rows_data_buffer: u16,
    /// Rows currently held in the data buffer, maintained by the model
    #[serde(skip)]
    pub raw_data_count: u16,
    /// Rows required for one invoke
    pub window_size: u16,
    /// Engine input element count
    pub invoke_input_count: u16,
    /// Engine output element count
    pub invoke_output_count: u16,
    /// Element count after post-processing
    pub post_process_result_count: u16,
    /// Element count of the model set's final result
    pub inference_result_count: u16,
    /// Per-element normalisation means (empty = none)
    pub mean_vals: Vec<f32>,
    /// Per-element normalisation standard deviations (empty = none)
    pub std_vals: Vec<f32>,
    /// Accepted range for post-processed values
    pub result_bounds: Option<(f32, f32)>,
}

impl ModelAttribute {
    /// Parses a JSON manifest
    pub fn from_manifest_str(manifest: &str) -> AiResult<Self> {
        serde_json::from_str(manifest).map_err(|_e| {
            log_error!("manifest parse failed: {}", _e);
            AiError::InvalidAttribute("malformed manifest")
        })
    }

    /// Reads and parses a JSON manifest file
    #[cfg(feature = "std")]
    pub fn from_manifest_file<P: AsRef<std::path::Path>>(path: P) -> AiResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|_e| {
            log_error!("manifest {} open failed: {}", path.display(), _e);
            AiError::FileAccess
        })?;
        Self::from_manifest_str(&text)
    }

    /// Attaches an embedded model graph
    pub fn with_model_bytes(mut self, model: &'static [u8]) -> Self {
        self.model = Some(Cow::Borrowed(model));
        self
    }

    /// Attaches an owned model graph
    pub fn with_owned_model(mut self, model: Vec<u8>) -> Self {
        self.model = Some(Cow::Owned(model));
        self
    }

    /// Resolves the model source. Embedded bytes win over a path.
    pub fn source(&self) -> AiResult<ModelSource<'_>> {
        match &self.model {
            Some(bytes) => Ok(ModelSource::Bytes(bytes)),
            None if !self.model_path.is_empty() => Ok(ModelSource::File(&self.model_path)),
            None => Err(AiError::InvalidAttribute("no model source")),
        }
    }

    /// Number of elements in one invoke window of parsed rows
    pub fn window_len(&self) -> usize {
        self.window_size as usize * self.features_count as usize
    }

    /// Whether normalisation vectors are present
    pub fn has_normalization(&self) -> bool {
        !self.mean_vals.is_empty()
    }

    /// Checks the metadata for internal consistency
    pub fn validate(&self) -> AiResult<()> {
        if self.features_count == 0 {
            return Err(AiError::InvalidAttribute("featuresCount is zero"));
        }
        if self.features.len() != self.features_count as usize {
            return Err(AiError::InvalidAttribute("featuresCount does not match features"));
        }
        if self.features_count > MAX_FEATURES {
            return Err(AiError::InvalidAttribute("too many features"));
        }
        if self.max_rows_data_buffer == 0 || self.max_rows_data_buffer > MAX_ROWS_DATA_BUFFER {
            return Err(AiError::InvalidAttribute("maxRowsDataBuffer out of range"));
        }
        if self.window_size == 0 {
            return Err(AiError::InvalidAttribute("windowSize is zero"));
        }
        if self.window_size > self.max_rows_data_buffer {
            return Err(AiError::InvalidAttribute("windowSize exceeds maxRowsDataBuffer"));
        }
        if self.invoke_input_count == 0 || self.invoke_output_count == 0 {
            return Err(AiError::InvalidAttribute("invoke tensor size is zero"));
        }
        if self.post_process_result_count == 0 {
            return Err(AiError::InvalidAttribute("postProcessResultCount is zero"));
        }
        if self.mean_vals.len() != self.std_vals.len() {
            return Err(AiError::InvalidAttribute("mean and std vectors differ in length"));
        }
        if self.has_normalization() {
            if self.mean_vals.len() != self.invoke_input_count as usize {
                return Err(AiError::InvalidAttribute("normalisation length mismatch"));
            }
            if self.std_vals.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(AiError::InvalidAttribute("std value must be finite and non-zero"));
            }
        }
        if let Some((min, max)) = self.result_bounds {
            if !(min <= max) {
                return Err(AiError::InvalidAttribute("resultBounds min exceeds max"));
            }
        }
        if self.model_path.len() > MAX_FILEPATH_LEN {
            return Err(AiError::InvalidAttribute("modelPath too long"));
        }
        self.source().map(|_| ())
    }

    /// Verifies the graph bytes against `crc32` (skipped when `crc32` is 0)
    pub fn verify_checksum(&self, graph: &[u8]) -> AiResult<()> {
        if self.crc32 == 0 {
            return Ok(());
        }
        let actual = crc32fast::hash(graph);
        if actual != self.crc32 {
            log_error!("model checksum mismatch: expected {:#010x}, got {:#010x}", self.crc32, actual);
            return Err(AiError::InvalidAttribute("checksum mismatch"));
        }
        Ok(())
    }
}
