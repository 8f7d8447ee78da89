//! Inference Backend Abstraction
//!
//! An [`AiEngine`] is anything that can load a serialized graph and evaluate it
//! on a flat `f32` input tensor. Tensor shapes beyond element counts are the
//! engine's business; the pipeline only checks that the counts match the
//! model's attribute after loading.

use crate::errors::AiResult;

/// Inference backend owned by one model
///
/// ## Implementation Notes
///
/// - `load_from_bytes` may be called again to replace the graph
/// - `invoke` must not be called before a successful load; implementations
///   return `InferenceFailed` in that case
/// - The slice returned by `invoke` borrows engine-owned storage and is valid
///   until the next call
pub trait AiEngine: Send {
    /// Builds the interpreter from an in-memory graph
    fn load_from_bytes(&mut self, graph: &[u8]) -> AiResult<()>;

    /// Reads a graph file and builds the interpreter from it
    #[cfg(feature = "std")]
    fn load_from_path(&mut self, path: &std::path::Path) -> AiResult<()> {
        let graph = std::fs::read(path).map_err(|_e| {
            log_error!("model {} read failed: {}", path.display(), _e);
            crate::errors::AiError::FileAccess
        })?;
        self.load_from_bytes(&graph)
    }

    /// Elements the loaded graph expects as input
    fn input_size(&self) -> usize;

    /// Elements the loaded graph produces
    fn output_size(&self) -> usize;

    /// Runs the graph once
    fn invoke(&mut self, input: &[f32]) -> AiResult<&[f32]>;
}

