//! Single-Model Inference Pipeline
//!
//! A [`Model`] binds one engine, one process handler, and one attribute, and
//! owns every buffer the pipeline touches:
//!
//! ```text
//! push_data(raw)
//!   │ parse_data                     ┌──────────── window gate ───────────┐
//!   ▼                                │ raw_data_count >= window_size ?    │
//! parsed row ──▶ DataBuffer ─────────┤  no  → Ok(Accepted)                │
//!                                    │  yes → invoke()                    │
//!                                    └────────────────────────────────────┘
//! invoke()
//!   pre_process_data ──▶ invoke input ──▶ engine ──▶ invoke output
//!   post_process_data ──▶ staged ──bounds check──▶ result
//! ```
//!
//! All buffers are sized from the attribute and allocated once by
//! [`Model::load_model`]. A load that fails before the engine accepts the new
//! graph leaves the model as it was; an engine whose tensor sizes disagree with
//! the attribute leaves it unloaded.
//!
//! ## Lifecycle
//!
//! `Unloaded → Loaded → buffering → invoke → buffering → …`
//!
//! Loading again replaces the graph and discards buffered rows.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::attribute::{ModelAttribute, ModelSource};
use crate::buffer::{try_alloc, DataBuffer};
use crate::errors::{AiError, AiResult, CycleStatus};
use crate::traits::{AiEngine, DefaultProcessHandler, ProcessHandler};

/// Buffers that exist only while a model is loaded
struct Scratch {
    buffer: DataBuffer,
    parsed: Vec<f32>,
    invoke_input: Vec<f32>,
    invoke_output: Vec<f32>,
    staged: Vec<f32>,
    result: Vec<f32>,
}

impl Scratch {
    fn allocate(attr: &ModelAttribute) -> AiResult<Self> {
        let post = attr.post_process_result_count as usize;
        Ok(Self {
            buffer: DataBuffer::new(attr.max_rows_data_buffer as usize, attr.features_count as usize)?,
            parsed: try_alloc(attr.features_count as usize)?,
            invoke_input: try_alloc(attr.invoke_input_count as usize)?,
            invoke_output: try_alloc(attr.invoke_output_count as usize)?,
            staged: try_alloc(post)?,
            result: try_alloc(post)?,
        })
    }
}

/// One AI model and its inference pipeline
pub struct Model {
    attribute: ModelAttribute,
    engine: Box<dyn AiEngine>,
    handler: Box<dyn ProcessHandler>,
    scratch: Option<Scratch>,
    has_result: bool,
    invoke_count: u64,
}

impl Model {
    /// Creates an unloaded model. Without a handler, [`DefaultProcessHandler`] is used.
    pub fn new(engine: Box<dyn AiEngine>, handler: Option<Box<dyn ProcessHandler>>) -> Self {
        Self {
            attribute: ModelAttribute::default(),
            engine,
            handler: handler.unwrap_or_else(|| Box::new(DefaultProcessHandler::new())),
            scratch: None,
            has_result: false,
            invoke_count: 0,
        }
    }

    /// Validates `attr`, allocates the pipeline buffers, and loads the graph
    ///
    /// # Errors
    ///
    /// - `InvalidAttribute` for inconsistent metadata, a checksum mismatch, or an
    ///   engine whose tensor sizes disagree with the attribute
    /// - `NoMemory` if any buffer cannot be allocated
    /// - `FileAccess` if a file based graph cannot be read
    pub fn load_model(&mut self, mut attr: ModelAttribute) -> AiResult<()> {
        attr.validate()?;
        self.handler.check_attribute(&attr)?;

        let scratch = Scratch::allocate(&attr)?;

        match attr.source()? {
            ModelSource::Bytes(graph) => {
                attr.verify_checksum(graph)?;
                self.engine.load_from_bytes(graph)?;
            }
            ModelSource::File(path) => self.load_file(path, &attr)?,
        }

        // The engine now holds the new graph, so a size mismatch unloads the model
        if self.engine.input_size() != attr.invoke_input_count as usize {
            self.unload();
            log_error!(
                "engine expects {} inputs, attribute declares {}",
                self.engine.input_size(),
                attr.invoke_input_count
            );
            return Err(AiError::InvalidAttribute("engine input size mismatch"));
        }
        if self.engine.output_size() != attr.invoke_output_count as usize {
            self.unload();
            log_error!(
                "engine produces {} outputs, attribute declares {}",
                self.engine.output_size(),
                attr.invoke_output_count
            );
            return Err(AiError::InvalidAttribute("engine output size mismatch"));
        }

        attr.raw_data_count = 0;
        log_info!(
            "model loaded: version {:?}, window {}x{}, buffer {} rows",
            attr.version,
            attr.window_size,
            attr.features_count,
            attr.max_rows_data_buffer
        );
        self.attribute = attr;
        self.scratch = Some(scratch);
        self.has_result = false;
        self.invoke_count = 0;
        Ok(())
    }

    fn unload(&mut self) {
        self.scratch = None;
        self.has_result = false;
        self.attribute.raw_data_count = 0;
    }

    /// Reads a JSON manifest and loads the model it describes
    #[cfg(feature = "std")]
    pub fn load_model_from_manifest<P: AsRef<std::path::Path>>(&mut self, manifest: P) -> AiResult<()> {
        let attr = ModelAttribute::from_manifest_file(manifest)?;
        self.load_model(attr)
    }

    #[cfg(feature = "std")]
    fn load_file(&mut self, path: &str, attr: &ModelAttribute) -> AiResult<()> {
        if attr.crc32 == 0 {
            return self.engine.load_from_path(std::path::Path::new(path));
        }
        let graph = std::fs::read(path).map_err(|_e| {
            log_error!("model {} read failed: {}", path, _e);
            AiError::FileAccess
        })?;
        attr.verify_checksum(&graph)?;
        self.engine.load_from_bytes(&graph)
    }

    #[cfg(not(feature = "std"))]
    fn load_file(&mut self, _path: &str, _attr: &ModelAttribute) -> AiResult<()> {
        Err(AiError::FileAccess)
    }

    /// Parses one raw payload into the data buffer and invokes once the window is full
    pub fn push_data(&mut self, data: &[f32]) -> AiResult<CycleStatus> {
        let scratch = self.scratch.as_mut().ok_or(AiError::OperationFailed("model not loaded"))?;

        self.handler.parse_data(data, &mut scratch.parsed, &self.attribute)?;
        scratch.buffer.write_row(&scratch.parsed)?;
        self.attribute.raw_data_count = scratch.buffer.raw_data_count() as u16;

        if self.attribute.raw_data_count < self.attribute.window_size {
            log_trace!(
                "buffered row {}/{}",
                self.attribute.raw_data_count,
                self.attribute.window_size
            );
            return Ok(CycleStatus::Accepted);
        }
        self.invoke()
    }

    /// Runs pre-process, engine, and post-process on the newest window
    pub fn invoke(&mut self) -> AiResult<CycleStatus> {
        let scratch = self.scratch.as_mut().ok_or(AiError::OperationFailed("model not loaded"))?;
        let attr = &self.attribute;

        if attr.raw_data_count < attr.window_size {
            return Err(AiError::NotEnoughSpace {
                required: attr.window_size as usize,
                available: attr.raw_data_count as usize,
            });
        }

        self.handler.pre_process_data(&scratch.buffer, &mut scratch.invoke_input, attr)?;

        let output = self.engine.invoke(&scratch.invoke_input)?;
        if output.len() < scratch.invoke_output.len() {
            return Err(AiError::InferenceFailed("engine output shorter than declared"));
        }
        let n = scratch.invoke_output.len();
        scratch.invoke_output.copy_from_slice(&output[..n]);
        self.invoke_count += 1;

        let status = self.handler.post_process_data(&scratch.invoke_output, &mut scratch.staged, attr)?;
        check_bounds(&scratch.staged, attr.result_bounds)?;

        scratch.result.copy_from_slice(&scratch.staged);
        self.has_result = true;
        Ok(status)
    }

    /// Last accepted post-processed output
    pub fn result_data(&self) -> AiResult<&[f32]> {
        match &self.scratch {
            Some(s) if self.has_result => Ok(&s.result),
            _ => Err(AiError::BufferEmpty),
        }
    }

    /// Last parsed row
    pub fn raw_data(&self) -> AiResult<&[f32]> {
        self.scratch
            .as_ref()
            .and_then(|s| s.buffer.last_row())
            .ok_or(AiError::BufferEmpty)
    }

    /// Copies the last result into `out`, returning the element count
    pub fn copy_result_data(&self, out: &mut [f32]) -> AiResult<usize> {
        copy_into(self.result_data()?, out)
    }

    /// Copies the last parsed row into `out`, returning the element count
    pub fn copy_raw_data(&self, out: &mut [f32]) -> AiResult<usize> {
        copy_into(self.raw_data()?, out)
    }

    /// Drops buffered rows and the last result, keeping the loaded graph
    pub fn reset(&mut self) {
        if let Some(scratch) = self.scratch.as_mut() {
            scratch.buffer.clear();
        }
        self.attribute.raw_data_count = 0;
        self.has_result = false;
    }

    /// Metadata of the loaded model
    pub fn attribute(&self) -> &ModelAttribute {
        &self.attribute
    }

    /// Buffered feature rows, if loaded
    pub fn data_buffer(&self) -> Option<&DataBuffer> {
        self.scratch.as_ref().map(|s| &s.buffer)
    }

    /// Whether `load_model` has succeeded
    pub fn is_loaded(&self) -> bool {
        self.scratch.is_some()
    }

    /// Engine invocations since load
    pub fn invoke_count(&self) -> u64 {
        self.invoke_count
    }
}

fn check_bounds(values: &[f32], bounds: Option<(f32, f32)>) -> AiResult<()> {
    let (min, max) = bounds.unwrap_or((f32::MIN, f32::MAX));
    for &value in values {
        if !value.is_finite() || value < min || value > max {
            log_warn!("invoke result {} outside [{}, {}]", value, min, max);
            return Err(AiError::InvokeOutOfBounds { value, min, max });
        }
    }
    Ok(())
}

fn copy_into(src: &[f32], out: &mut [f32]) -> AiResult<usize> {
    if out.len() < src.len() {
        return Err(AiError::NotEnoughSpace { required: src.len(), available: out.len() });
    }
    out[..src.len()].copy_from_slice(src);
    Ok(src.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// Sums its input into one output
    struct SumEngine {
        inputs: usize,
        loaded: bool,
        out: [f32; 1],
    }

    impl AiEngine for SumEngine {
        fn load_from_bytes(&mut self, graph: &[u8]) -> AiResult<()> {
            if graph.is_empty() {
                return Err(AiError::InvalidAttribute("empty graph"));
            }
            self.loaded = true;
            Ok(())
        }
        fn input_size(&self) -> usize {
            self.inputs
        }
        fn output_size(&self) -> usize {
            1
        }
        fn invoke(&mut self, input: &[f32]) -> AiResult<&[f32]> {
            if !self.loaded {
                return Err(AiError::InferenceFailed("not loaded"));
            }
            self.out[0] = input.iter().sum();
            Ok(&self.out)
        }
    }

    static GRAPH: [u8; 4] = *b"EIDN";

    fn sum_model(inputs: usize) -> Model {
        Model::new(Box::new(SumEngine { inputs, loaded: false, out: [0.0] }), None)
    }

    fn attr() -> ModelAttribute {
        ModelAttribute {
            features: vec![0],
            features_count: 1,
            inference_interval: 100,
            max_rows_data_buffer: 5,
            window_size: 3,
            invoke_input_count: 3,
            invoke_output_count: 1,
            post_process_result_count: 1,
            inference_result_count: 1,
            ..Default::default()
        }
        .with_model_bytes(&GRAPH)
    }

    #[test]
    fn window_gates_invoke() {
        let mut model = sum_model(3);
        model.load_model(attr()).unwrap();

        assert_eq!(model.push_data(&[1.0]), Ok(CycleStatus::Accepted));
        assert_eq!(model.push_data(&[2.0]), Ok(CycleStatus::Accepted));
        assert_eq!(model.invoke_count(), 0);
        assert_eq!(model.result_data(), Err(AiError::BufferEmpty));

        assert_eq!(model.push_data(&[3.0]), Ok(CycleStatus::Finished));
        assert_eq!(model.invoke_count(), 1);
        assert_eq!(model.result_data().unwrap(), &[6.0]);

        // Sliding window: 2 + 3 + 4
        assert_eq!(model.push_data(&[4.0]), Ok(CycleStatus::Finished));
        assert_eq!(model.result_data().unwrap(), &[9.0]);
    }

    #[test]
    fn raw_count_tracks_buffer_capacity() {
        let mut model = sum_model(3);
        model.load_model(attr()).unwrap();
        for i in 0..8 {
            model.push_data(&[i as f32]).unwrap();
        }
        assert_eq!(model.attribute().raw_data_count, 5);
        assert_eq!(model.raw_data().unwrap(), &[7.0]);
    }

    #[test]
    fn push_before_load_fails() {
        let mut model = sum_model(3);
        assert!(matches!(model.push_data(&[1.0]), Err(AiError::OperationFailed(_))));
        assert!(!model.is_loaded());
    }

    #[test]
    fn invalid_raw_data_leaves_buffer_untouched() {
        let mut model = sum_model(3);
        model.load_model(attr()).unwrap();
        model.push_data(&[1.0]).unwrap();
        assert_eq!(model.push_data(&[]), Err(AiError::InvalidRawData));
        assert_eq!(model.attribute().raw_data_count, 1);
    }

    #[test]
    fn engine_size_mismatch_rejected() {
        let mut model = sum_model(4);
        assert_eq!(
            model.load_model(attr()),
            Err(AiError::InvalidAttribute("engine input size mismatch"))
        );
        assert!(!model.is_loaded());
    }

    #[test]
    fn failed_reload_keeps_previous_state() {
        let mut model = sum_model(3);
        model.load_model(attr()).unwrap();
        model.push_data(&[1.0]).unwrap();

        let mut bad = attr();
        bad.crc32 = 0xDEAD_BEEF;
        assert!(model.load_model(bad).is_err());
        assert!(model.is_loaded());
        assert_eq!(model.attribute().raw_data_count, 1);
    }

    #[test]
    fn out_of_bounds_result_is_not_published() {
        let mut a = attr();
        a.result_bounds = Some((0.0, 10.0));
        let mut model = sum_model(3);
        model.load_model(a).unwrap();

        for v in [1.0, 2.0, 3.0] {
            model.push_data(&[v]).unwrap();
        }
        assert_eq!(model.result_data().unwrap(), &[6.0]);

        let err = model.push_data(&[9.0]).unwrap_err();
        assert_eq!(err, AiError::InvokeOutOfBounds { value: 14.0, min: 0.0, max: 10.0 });
        assert_eq!(model.result_data().unwrap(), &[6.0]);
    }

    #[test]
    fn copy_accessors_check_space() {
        let mut model = sum_model(3);
        model.load_model(attr()).unwrap();
        let mut out = [0.0; 1];
        assert_eq!(model.copy_raw_data(&mut out), Err(AiError::BufferEmpty));

        model.push_data(&[5.0]).unwrap();
        assert_eq!(model.copy_raw_data(&mut out), Ok(1));
        assert_eq!(out, [5.0]);

        let mut none: [f32; 0] = [];
        assert_eq!(
            model.copy_raw_data(&mut none),
            Err(AiError::NotEnoughSpace { required: 1, available: 0 })
        );
    }

    #[test]
    fn reset_clears_window() {
        let mut model = sum_model(3);
        model.load_model(attr()).unwrap();
        for v in [1.0, 2.0, 3.0] {
            model.push_data(&[v]).unwrap();
        }
        model.reset();
        assert_eq!(model.push_data(&[1.0]), Ok(CycleStatus::Accepted));
        assert_eq!(model.result_data(), Err(AiError::BufferEmpty));
    }
}
