//! Cross-Model Ensembling Strategies
//!
//! Helpers a [`ModelSet`](crate::handler::ModelSet) can call from
//! `on_inference_finished` to fold per-model results into the final result.
//! The length of the final result is the last model's `inferenceResultCount`
//! (or its whole result when that count is 0). Only models that returned
//! `Finished` on the current push contribute, so a stale or intermediate
//! result never leaks into the final result.

use alloc::vec::Vec;

use crate::errors::{AiError, AiResult, CycleStatus};
use crate::handler::ModelList;

/// Publishes the last model's result unchanged
pub fn last_model(models: &ModelList, out: &mut Vec<f32>) -> AiResult<()> {
    let last = models.last().ok_or(AiError::BufferEmpty)?;
    if models.status(models.len() - 1) != Some(CycleStatus::Finished) {
        return Err(AiError::BufferEmpty);
    }
    let n = result_len(models)?;
    let result = last.result_data()?;
    fill(out, &result[..n])
}

/// Element-wise mean across the models that finished on the current push
///
/// Those models must have produced at least `n` result elements.
pub fn mean(models: &ModelList, out: &mut Vec<f32>) -> AiResult<()> {
    let n = result_len(models)?;
    let mut count = 0_usize;
    for model in models.finished() {
        if model.result_data()?.len() < n {
            return Err(AiError::InferenceFailed("model results differ in length"));
        }
        count += 1;
    }
    if count == 0 {
        return Err(AiError::BufferEmpty);
    }

    reserve(out, n)?;
    out.clear();
    out.resize(n, 0.0);
    for result in models.finished().filter_map(|m| m.result_data().ok()) {
        for (acc, v) in out.iter_mut().zip(result) {
            *acc += v;
        }
    }
    let count = count as f32;
    for acc in out.iter_mut() {
        *acc /= count;
    }
    Ok(())
}

fn result_len(models: &ModelList) -> AiResult<usize> {
    let last = models.last().ok_or(AiError::BufferEmpty)?;
    let available = last.result_data()?.len();
    match last.attribute().inference_result_count as usize {
        0 => Ok(available),
        n if n <= available => Ok(n),
        n => Err(AiError::NotEnoughSpace { required: n, available }),
    }
}

// Grows `out` only when needed, so a failed reservation keeps the previous result.
fn reserve(out: &mut Vec<f32>, len: usize) -> AiResult<()> {
    if len > out.len() {
        out.try_reserve_exact(len - out.len()).map_err(|_| AiError::NoMemory)?;
    }
    Ok(())
}

fn fill(out: &mut Vec<f32>, values: &[f32]) -> AiResult<()> {
    reserve(out, values.len())?;
    out.clear();
    out.extend_from_slice(values);
    Ok(())
}
