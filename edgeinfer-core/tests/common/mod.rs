//! Shared fixtures for integration tests
//!
//! Provides:
//! - Deterministic mock engines that count and record invokes
//! - Process handlers that trace call order or need several invokes
//! - A configurable model set and a recording result listener

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use edgeinfer_core::{
    AiEngine, AiError, AiResult, CycleStatus, DataBuffer, DefaultProcessHandler,
    InferenceResultListener, Model, ModelAttribute, ModelList, ModelSet, ProcessHandler,
};

pub static GRAPH: [u8; 8] = *b"EIDNmock";

/// Attribute for a model reading `features` columns with a window of `window` rows
pub fn attribute(features: &[u16], window: u16, buffer_rows: u16, interval_ms: u32) -> ModelAttribute {
    let features_count = features.len() as u16;
    ModelAttribute {
        version: "test".into(),
        features: features.to_vec(),
        features_count,
        inference_interval: interval_ms,
        model_code: 0x7E57,
        max_rows_data_buffer: buffer_rows,
        window_size: window,
        invoke_input_count: window * features_count,
        invoke_output_count: 1,
        post_process_result_count: 1,
        inference_result_count: 1,
        ..Default::default()
    }
    .with_model_bytes(&GRAPH)
}

/// Scaled sum of the whole input window; counts invokes
pub struct SumEngine {
    inputs: usize,
    scale: f32,
    out: [f32; 1],
    loaded: bool,
    pub invokes: Arc<AtomicUsize>,
}

impl SumEngine {
    pub fn new(inputs: usize, scale: f32) -> Self {
        Self { inputs, scale, out: [0.0], loaded: false, invokes: Arc::new(AtomicUsize::new(0)) }
    }
}

impl AiEngine for SumEngine {
    fn load_from_bytes(&mut self, graph: &[u8]) -> AiResult<()> {
        if !graph.starts_with(b"EIDN") {
            return Err(AiError::InvalidAttribute("bad magic"));
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
        self.invokes.fetch_add(1, Ordering::SeqCst);
        self.out[0] = self.scale * input.iter().sum::<f32>();
        Ok(&self.out)
    }
}

/// Records every input window it sees and outputs the window's last element
pub struct RecordingEngine {
    inputs: usize,
    out: [f32; 1],
    pub windows: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl RecordingEngine {
    pub fn new(inputs: usize) -> Self {
        Self { inputs, out: [0.0], windows: Arc::new(Mutex::new(Vec::new())) }
    }
}

impl AiEngine for RecordingEngine {
    fn load_from_bytes(&mut self, _graph: &[u8]) -> AiResult<()> {
        Ok(())
    }

    fn input_size(&self) -> usize {
        self.inputs
    }

    fn output_size(&self) -> usize {
        1
    }

    fn invoke(&mut self, input: &[f32]) -> AiResult<&[f32]> {
        self.windows.lock().unwrap().push(input.to_vec());
        self.out[0] = input.last().copied().unwrap_or_default();
        Ok(&self.out)
    }
}

/// Default handler that appends its id to a shared log on every parse
pub struct TracingHandler {
    id: usize,
    log: Arc<Mutex<Vec<usize>>>,
}

impl TracingHandler {
    pub fn new(id: usize, log: Arc<Mutex<Vec<usize>>>) -> Self {
        Self { id, log }
    }
}

impl ProcessHandler for TracingHandler {
    fn parse_data(&mut self, data: &[f32], parsed: &mut [f32], attr: &ModelAttribute) -> AiResult<()> {
        self.log.lock().unwrap().push(self.id);
        DefaultProcessHandler.parse_data(data, parsed, attr)
    }

    fn pre_process_data(&mut self, buffer: &DataBuffer, input: &mut [f32], attr: &ModelAttribute) -> AiResult<()> {
        DefaultProcessHandler.pre_process_data(buffer, input, attr)
    }

    fn post_process_data(&mut self, output: &[f32], result: &mut [f32], attr: &ModelAttribute) -> AiResult<CycleStatus> {
        DefaultProcessHandler.post_process_data(output, result, attr)
    }
}

/// Needs `steps` invokes per logical inference
pub struct MultiStepHandler {
    steps: usize,
    seen: usize,
}

impl MultiStepHandler {
    pub fn new(steps: usize) -> Self {
        Self { steps, seen: 0 }
    }
}

impl ProcessHandler for MultiStepHandler {
    fn parse_data(&mut self, data: &[f32], parsed: &mut [f32], attr: &ModelAttribute) -> AiResult<()> {
        DefaultProcessHandler.parse_data(data, parsed, attr)
    }

    fn pre_process_data(&mut self, buffer: &DataBuffer, input: &mut [f32], attr: &ModelAttribute) -> AiResult<()> {
        DefaultProcessHandler.pre_process_data(buffer, input, attr)
    }

    fn post_process_data(&mut self, output: &[f32], result: &mut [f32], attr: &ModelAttribute) -> AiResult<CycleStatus> {
        DefaultProcessHandler.post_process_data(output, result, attr)?;
        self.seen += 1;
        if self.seen % self.steps == 0 {
            Ok(CycleStatus::Finished)
        } else {
            Ok(CycleStatus::Proceeding)
        }
    }
}

pub type ModelBuilder = Box<dyn Fn() -> AiResult<Model> + Send>;

/// How a [`TestSet`] folds results
#[derive(Clone, Copy)]
pub enum Ensemble {
    Last,
    Mean,
}

/// Model set assembled from builder closures
pub struct TestSet {
    pub builders: Vec<ModelBuilder>,
    pub ensemble: Ensemble,
}

impl TestSet {
    pub fn new(builders: Vec<ModelBuilder>) -> Self {
        Self { builders, ensemble: Ensemble::Last }
    }

    pub fn with_mean(mut self) -> Self {
        self.ensemble = Ensemble::Mean;
        self
    }
}

impl ModelSet for TestSet {
    fn name(&self) -> &str {
        "test-set"
    }

    fn model_count(&self) -> usize {
        self.builders.len()
    }

    fn prepare(&mut self, models: &mut ModelList) -> AiResult<()> {
        for build in &self.builders {
            models.attach(build()?)?;
        }
        Ok(())
    }

    fn on_inference_finished(&mut self, _last: usize, models: &ModelList, out: &mut Vec<f32>) -> AiResult<()> {
        match self.ensemble {
            Ensemble::Last => edgeinfer_core::ensemble::last_model(models, out),
            Ensemble::Mean => edgeinfer_core::ensemble::mean(models, out),
        }
    }
}

/// Builder for a loaded model with the given engine, handler, and attribute
pub fn builder<E, F>(make_engine: E, attr: ModelAttribute, handler: F) -> ModelBuilder
where
    E: Fn() -> Box<dyn AiEngine> + Send + 'static,
    F: Fn() -> Option<Box<dyn ProcessHandler>> + Send + 'static,
{
    Box::new(move || {
        let mut model = Model::new(make_engine(), handler());
        model.load_model(attr.clone())?;
        Ok(model)
    })
}

/// One listener call: result code and the values handed over
pub type Calls = Arc<Mutex<Vec<(i32, Vec<f32>)>>>;

/// Listener that records every call
pub fn recording_listener() -> (InferenceResultListener, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let listener: InferenceResultListener = Box::new(move |result, values| {
        sink.lock().unwrap().push((edgeinfer_core::result_code(&result), values.to_vec()));
    });
    (listener, calls)
}
