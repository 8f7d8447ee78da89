//! Sine Wave Extrapolation Example
//!
//! Drives a one-layer dense network from a periodic timer. Every 100 ms the
//! service reads the next sample of a sine wave and pushes it through the
//! model set; the network predicts the following sample by linear
//! extrapolation (`next = 2·x[t] − x[t−1]`).
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p edgeinfer-ml --example sine_wave
//! ```

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use edgeinfer_core::{
    AiResult, CycleStatus, DataSource, InferenceHandler, InferenceResultListener, MemorySource, Model,
    ModelAttribute, ModelList, ModelService, ModelSet,
};
use edgeinfer_ml::{Activation, DenseEngine, DenseModelBuilder};

const SAMPLES: usize = 32;
const INTERVAL_MS: u32 = 100;

struct Extrapolator;

impl ModelSet for Extrapolator {
    fn name(&self) -> &str {
        "sine-extrapolator"
    }

    fn model_count(&self) -> usize {
        1
    }

    fn prepare(&mut self, models: &mut ModelList) -> AiResult<()> {
        let graph = DenseModelBuilder::new(2)
            .layer(1, Activation::Linear, vec![-1.0, 2.0], vec![0.0])
            .to_bytes()?;

        let mut model = Model::new(Box::new(DenseEngine::new()), None);
        model.load_model(
            ModelAttribute {
                version: "1.0.0".into(),
                features: vec![0],
                features_count: 1,
                inference_interval: INTERVAL_MS,
                max_rows_data_buffer: 8,
                window_size: 2,
                invoke_input_count: 2,
                invoke_output_count: 1,
                post_process_result_count: 1,
                inference_result_count: 1,
                result_bounds: Some((-2.0, 2.0)),
                ..Default::default()
            }
            .with_owned_model(graph),
        )?;
        models.attach(model)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let wave: Vec<[f32; 1]> = (0..SAMPLES)
        .map(|i| [(i as f32 * core::f32::consts::TAU / SAMPLES as f32).sin()])
        .collect();
    let wave: &'static [[f32; 1]] = Box::leak(wave.into_boxed_slice());
    let source = Mutex::new(MemorySource::new(wave).looping());

    let listener: InferenceResultListener = Box::new(|status, result| match status {
        Ok(CycleStatus::Finished) => println!("predicted next sample: {:+.3}", result[0]),
        Ok(_) => {}
        Err(e) => eprintln!("inference failed: {e}"),
    });

    let handler = InferenceHandler::new(Box::new(Extrapolator), Some(listener))?.into_shared();
    let mut service = ModelService::new(handler, move |pusher| {
        let mut row = [0.0_f32; 1];
        let Ok(mut source) = source.lock() else { return };
        if source.read_row(&mut row).is_ok() {
            if let Err(e) = pusher.push_data(&row) {
                log::warn!("push failed: {e}");
            }
        }
    });

    service.prepare()?;
    service.start()?;
    println!("service running at {} ms", service.interval_ms());

    thread::sleep(Duration::from_secs(2));

    service.stop()?;
    let cycles = service.handler().lock().cycles();
    println!("stopped after {cycles} inference cycles");
    service.destroy();
    Ok(())
}
