//! Errors raised while decoding or running a dense graph

use edgeinfer_core::AiError;
use thiserror_no_std::Error;

/// Graph decoding and execution errors
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MlError {
    /// Graph does not start with the `EIDN` magic
    #[error("Bad graph magic")]
    BadMagic,

    /// Graph format version not supported by this engine
    #[error("Unsupported graph version {0}")]
    UnsupportedVersion(u16),

    /// Graph ended before a field was complete
    #[error("Graph truncated: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to continue
        needed: usize,
        /// Bytes remaining
        available: usize,
    },

    /// Graph declares no layers, or a layer with zero width
    #[error("Graph has an empty layer")]
    EmptyLayer,

    /// A layer's input width differs from the previous layer's output width
    #[error("Layer {layer} expects {expected} inputs, previous layer gives {found}")]
    LayerMismatch {
        /// Index of the offending layer
        layer: usize,
        /// Inputs the layer declares
        expected: usize,
        /// Outputs of the previous layer
        found: usize,
    },

    /// Activation code outside 0..=3
    #[error("Unknown activation code {0}")]
    UnknownActivation(u8),

    /// Bytes left over after the last layer
    #[error("{0} trailing bytes after graph")]
    TrailingBytes(usize),

    /// Weight or bias slice has the wrong length for the layer
    #[error("Layer parameters have the wrong length")]
    ParameterCount,

    /// Invoke before a graph was loaded
    #[error("No graph loaded")]
    NotLoaded,

    /// Input slice length differs from the graph's input width
    #[error("Input length {found}, graph expects {expected}")]
    InputSize {
        /// Graph input width
        expected: usize,
        /// Provided length
        found: usize,
    },

    /// Allocation failed
    #[error("Out of memory")]
    NoMemory,
}

/// Result type for engine operations
pub type MlResult<T> = Result<T, MlError>;

impl From<MlError> for AiError {
    fn from(err: MlError) -> Self {
        match err {
            MlError::NotLoaded => AiError::InferenceFailed("graph not loaded"),
            MlError::InputSize { .. } => AiError::InvalidArgument("input length does not match graph"),
            MlError::NoMemory => AiError::NoMemory,
            MlError::BadMagic => AiError::InvalidAttribute("graph magic mismatch"),
            MlError::UnsupportedVersion(_) => AiError::InvalidAttribute("unsupported graph version"),
            MlError::Truncated { .. } | MlError::TrailingBytes(_) => {
                AiError::InvalidAttribute("graph length mismatch")
            }
            MlError::EmptyLayer
            | MlError::LayerMismatch { .. }
            | MlError::UnknownActivation(_)
            | MlError::ParameterCount => AiError::InvalidAttribute("malformed graph layers"),
        }
    }
}
