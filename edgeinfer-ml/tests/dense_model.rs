//! Runs dense graphs through the core model pipeline

use std::fs;

use edgeinfer_core::{AiError, CycleStatus, Model, ModelAttribute};
use edgeinfer_ml::{Activation, DenseEngine, DenseModelBuilder};

/// next = 2 * x[t] - x[t-1], over a 2-row window of one feature
fn extrapolator() -> Vec<u8> {
    DenseModelBuilder::new(2)
        .layer(1, Activation::Linear, vec![-1.0, 2.0], vec![0.0])
        .to_bytes()
        .unwrap()
}

fn attribute() -> ModelAttribute {
    ModelAttribute {
        features: vec![1],
        features_count: 1,
        inference_interval: 100,
        max_rows_data_buffer: 4,
        window_size: 2,
        invoke_input_count: 2,
        invoke_output_count: 1,
        post_process_result_count: 1,
        inference_result_count: 1,
        ..Default::default()
    }
}

fn run(model: &mut Model, rows: &[[f32; 2]]) -> Vec<f32> {
    let mut results = Vec::new();
    for row in rows {
        if model.push_data(row).unwrap() == CycleStatus::Finished {
            results.push(model.result_data().unwrap()[0]);
        }
    }
    results
}

const ROWS: [[f32; 2]; 4] = [[0.0, 1.0], [9.0, 2.0], [9.0, 4.0], [9.0, 3.0]];

#[test]
fn dense_graph_drives_model() {
    let mut model = Model::new(Box::new(DenseEngine::new()), None);
    model.load_model(attribute().with_owned_model(extrapolator())).unwrap();

    assert_eq!(run(&mut model, &ROWS), vec![3.0, 6.0, 2.0]);
    assert_eq!(model.invoke_count(), 3);
}

#[test]
fn file_and_bytes_give_identical_results() {
    let bytes = extrapolator();
    let dir = tempfile::tempdir_in(".").unwrap();
    let path = dir.path().join("x.eidn");
    fs::write(&path, &bytes).unwrap();

    let mut from_bytes = Model::new(Box::new(DenseEngine::new()), None);
    from_bytes.load_model(attribute().with_owned_model(bytes.clone())).unwrap();

    let mut from_file = Model::new(Box::new(DenseEngine::new()), None);
    from_file
        .load_model(ModelAttribute {
            model_path: path.to_string_lossy().into_owned(),
            crc32: crc32fast::hash(&bytes),
            ..attribute()
        })
        .unwrap();

    assert_eq!(run(&mut from_bytes, &ROWS), run(&mut from_file, &ROWS));
}

#[test]
fn size_mismatch_with_attribute_is_rejected() {
    let mut model = Model::new(Box::new(DenseEngine::new()), None);
    let attr = ModelAttribute {
        features: vec![0, 1],
        features_count: 2,
        invoke_input_count: 4,
        ..attribute()
    };
    assert_eq!(
        model.load_model(attr.with_owned_model(extrapolator())),
        Err(AiError::InvalidAttribute("engine input size mismatch"))
    );
    assert!(!model.is_loaded());
}

#[test]
fn corrupt_graph_is_rejected() {
    let mut bytes = extrapolator();
    bytes.truncate(bytes.len() - 2);
    let mut model = Model::new(Box::new(DenseEngine::new()), None);
    assert!(matches!(
        model.load_model(attribute().with_owned_model(bytes)),
        Err(AiError::InvalidAttribute(_))
    ));
}
