//! Data Transformations Around an Invoke
//!
//! A [`ProcessHandler`] owns the numeric glue between application data and an
//! engine:
//!
//! ```text
//! raw payload ──parse_data──▶ feature row ──▶ DataBuffer
//!                                                │
//!                        pre_process_data ◀──────┘ (newest windowSize rows)
//!                                │
//!                           engine.invoke
//!                                │
//!                        post_process_data ──▶ result + CycleStatus
//! ```
//!
//! Handlers receive the model's [`ModelAttribute`] on every call so one
//! implementation can serve several models with different shapes.

use crate::attribute::ModelAttribute;
use crate::buffer::DataBuffer;
use crate::errors::{AiError, AiResult, CycleStatus};

/// Per-model data transformation hooks
pub trait ProcessHandler: Send {
    /// Extracts one feature row (`featuresCount` elements) from a raw payload
    ///
    /// Returning `InvalidRawData` drops the payload without touching the buffer.
    fn parse_data(&mut self, data: &[f32], parsed: &mut [f32], attr: &ModelAttribute) -> AiResult<()>;

    /// Builds the engine input (`invokeInputCount` elements) from the buffered window
    fn pre_process_data(
        &mut self,
        buffer: &DataBuffer,
        invoke_input: &mut [f32],
        attr: &ModelAttribute,
    ) -> AiResult<()>;

    /// Interprets engine output into `postProcessResultCount` elements
    ///
    /// Return `Finished` when the model's contribution is complete, or
    /// `Proceeding` when further invokes are needed first.
    fn post_process_data(
        &mut self,
        invoke_output: &[f32],
        result: &mut [f32],
        attr: &ModelAttribute,
    ) -> AiResult<CycleStatus>;

    /// Rejects attributes this handler cannot serve. Called once at load time.
    fn check_attribute(&self, _attr: &ModelAttribute) -> AiResult<()> {
        Ok(())
    }
}

/// Column selection, optional z-score normalisation, identity post-process
///
/// Used by a model built without an explicit handler. Requires
/// `invokeInputCount == windowSize * featuresCount`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultProcessHandler;

impl DefaultProcessHandler {
    /// Creates the handler
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessHandler for DefaultProcessHandler {
    fn parse_data(&mut self, data: &[f32], parsed: &mut [f32], attr: &ModelAttribute) -> AiResult<()> {
        if parsed.len() < attr.features.len() {
            return Err(AiError::NotEnoughSpace {
                required: attr.features.len(),
                available: parsed.len(),
            });
        }
        for (slot, &column) in parsed.iter_mut().zip(attr.features.iter()) {
            let value = *data.get(column as usize).ok_or(AiError::InvalidRawData)?;
            if !value.is_finite() {
                return Err(AiError::InvalidRawData);
            }
            *slot = value;
        }
        Ok(())
    }

    fn pre_process_data(
        &mut self,
        buffer: &DataBuffer,
        invoke_input: &mut [f32],
        attr: &ModelAttribute,
    ) -> AiResult<()> {
        let written = buffer.read_window(attr.window_size as usize, invoke_input)?;
        if attr.has_normalization() {
            let stats = attr.mean_vals.iter().zip(attr.std_vals.iter());
            for (x, (mean, std)) in invoke_input[..written].iter_mut().zip(stats) {
                *x = (*x - mean) / std;
            }
        }
        Ok(())
    }

    fn post_process_data(
        &mut self,
        invoke_output: &[f32],
        result: &mut [f32],
        attr: &ModelAttribute,
    ) -> AiResult<CycleStatus> {
        let count = attr.post_process_result_count as usize;
        if invoke_output.len() < count || result.len() < count {
            return Err(AiError::InferenceFailed("post-process size mismatch"));
        }
        result[..count].copy_from_slice(&invoke_output[..count]);
        Ok(CycleStatus::Finished)
    }

    fn check_attribute(&self, attr: &ModelAttribute) -> AiResult<()> {
        if attr.invoke_input_count as usize != attr.window_len() {
            return Err(AiError::InvalidAttribute(
                "invokeInputCount must equal windowSize * featuresCount",
            ));
        }
        if attr.post_process_result_count > attr.invoke_output_count {
            return Err(AiError::InvalidAttribute(
                "postProcessResultCount exceeds invokeOutputCount",
            ));
        }
        Ok(())
    }
}
