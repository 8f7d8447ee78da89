//! Model-Set Orchestration
//!
//! ## Overview
//!
//! An [`InferenceHandler`] drives one model set: it fans every raw payload out
//! to each attached [`Model`] in attachment order and, when the last model
//! finishes, lets the set fold the per-model results into one final result
//! that goes to the application's result listener.
//!
//! ```text
//!                  push_data(raw)
//!                        │
//!        ┌───────────────┼───────────────┐
//!        ▼               ▼               ▼
//!    Model[0]  ──▶   Model[1]  ──▶   Model[n-1]      (stop at first error)
//!                                        │ Finished
//!                                        ▼
//!                   ModelSet::on_inference_finished   (ensembling)
//!                                        │
//!                                        ▼
//!                              listener(Ok(Finished), final result)
//! ```
//!
//! ## Model Sets
//!
//! What differs between model sets (which models, which engines, how results
//! combine) lives behind the [`ModelSet`] trait. The handler owns the generic
//! parts: the fixed-capacity [`ModelList`], the ready flag, failure reporting,
//! and the one-listener-call-per-cycle rule.
//!
//! ## Completion Tracking
//!
//! Each push records every model's [`CycleStatus`] in the [`ModelList`]. The
//! set finishes a cycle only when every model returned `Finished` on the same
//! push; until then the push reports `Proceeding` (some model invoked) or
//! `Accepted` (all still buffering), and neither ensembling nor the listener
//! runs. Models with different window sizes therefore warm up quietly, and a
//! multi-step model is never ensembled from an intermediate step.
//!
//! ## Failure Reporting
//!
//! A failing push returns the error and also reports it to the listener,
//! together with the last final result that was successfully computed.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::errors::{AiError, AiResult, CycleStatus};
use crate::model::Model;

/// Receives the outcome of each completed or failed push cycle
///
/// On failure the slice holds the last good final result (empty if none yet).
///
/// The listener runs while the handler is locked. It must not push into the
/// same model set or lock its handler; a push through a
/// [`DataPusher`](crate::service::DataPusher) from inside the listener is
/// refused with `OperationFailed`.
pub type InferenceResultListener = Box<dyn FnMut(AiResult<CycleStatus>, &[f32]) + Send>;

/// Fixed-capacity list of loaded models, sized to the model set
pub struct ModelList {
    models: Vec<Model>,
    statuses: Vec<Option<CycleStatus>>,
    capacity: usize,
}

impl ModelList {
    /// Creates an empty list holding at most `capacity` models
    pub fn with_capacity(capacity: usize) -> AiResult<Self> {
        let mut models = Vec::new();
        models.try_reserve_exact(capacity).map_err(|_| AiError::NoMemory)?;
        let mut statuses = Vec::new();
        statuses.try_reserve_exact(capacity).map_err(|_| AiError::NoMemory)?;
        Ok(Self { models, statuses, capacity })
    }

    /// Appends a loaded model
    ///
    /// Attaching past capacity is a programming error in the model set; it is
    /// logged and refused.
    pub fn attach(&mut self, model: Model) -> AiResult<()> {
        if !model.is_loaded() {
            return Err(AiError::InvalidArgument("model must be loaded before attaching"));
        }
        if self.models.len() >= self.capacity {
            log_error!("model list full ({} models)", self.capacity);
            return Err(AiError::NotEnoughSpace {
                required: self.models.len() + 1,
                available: self.capacity,
            });
        }
        self.models.push(model);
        self.statuses.push(None);
        Ok(())
    }

    /// Attached model count
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True when nothing is attached
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Maximum model count
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Model at attachment index `index`
    pub fn get(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    /// Last attached model
    pub fn last(&self) -> Option<&Model> {
        self.models.last()
    }

    /// Models in attachment order
    pub fn iter(&self) -> core::slice::Iter<'_, Model> {
        self.models.iter()
    }

    /// Status model `index` returned on the current push
    ///
    /// `None` if the model was not reached (an earlier model failed) or
    /// nothing has been pushed yet.
    pub fn status(&self, index: usize) -> Option<CycleStatus> {
        self.statuses.get(index).copied().flatten()
    }

    /// Models that returned `Finished` on the current push
    pub fn finished(&self) -> impl Iterator<Item = &Model> + '_ {
        self.models
            .iter()
            .zip(&self.statuses)
            .filter(|(_, status)| **status == Some(CycleStatus::Finished))
            .map(|(model, _)| model)
    }

    /// Pushes `data` to every model in order, stopping at the first failure
    fn push_all(&mut self, data: &[f32]) -> Result<(), (usize, AiError)> {
        self.statuses.iter_mut().for_each(|s| *s = None);
        for (index, (model, status)) in self.models.iter_mut().zip(self.statuses.iter_mut()).enumerate() {
            *status = Some(model.push_data(data).map_err(|e| (index, e))?);
        }
        Ok(())
    }

    /// Combined status of the current push
    fn cycle_status(&self) -> CycleStatus {
        if self.statuses.iter().all(|s| *s == Some(CycleStatus::Finished)) {
            CycleStatus::Finished
        } else if self.statuses.iter().any(|s| *s != Some(CycleStatus::Accepted)) {
            CycleStatus::Proceeding
        } else {
            CycleStatus::Accepted
        }
    }

    fn clear(&mut self) {
        self.models.clear();
        self.statuses.clear();
    }
}

/// One concrete model set
///
/// Implementations build and load their models in `prepare` and may override
/// `on_inference_finished` to ensemble. The default publishes the last model's
/// result.
pub trait ModelSet: Send {
    /// Human readable name used in logs
    fn name(&self) -> &str;

    /// Number of models this set attaches
    fn model_count(&self) -> usize;

    /// Constructs, loads, and attaches every model of the set
    ///
    /// Return the first load failure unchanged.
    fn prepare(&mut self, models: &mut ModelList) -> AiResult<()>;

    /// Folds per-model results into `final_result` after the last model finished
    fn on_inference_finished(
        &mut self,
        _last_index: usize,
        models: &ModelList,
        final_result: &mut Vec<f32>,
    ) -> AiResult<()> {
        crate::ensemble::last_model(models, final_result)
    }
}

/// Drives one model set
pub struct InferenceHandler {
    set: Box<dyn ModelSet>,
    models: ModelList,
    listener: Option<InferenceResultListener>,
    final_result: Vec<f32>,
    ready: bool,
    cycles: u64,
}

impl InferenceHandler {
    /// Creates a handler for `set`. The model list is sized to `set.model_count()`.
    pub fn new(set: Box<dyn ModelSet>, listener: Option<InferenceResultListener>) -> AiResult<Self> {
        let models = ModelList::with_capacity(set.model_count())?;
        Ok(Self {
            set,
            models,
            listener,
            final_result: Vec::new(),
            ready: false,
            cycles: 0,
        })
    }

    /// Loads every model of the set
    ///
    /// A failure leaves the handler not ready; models attached before the
    /// failing one stay attached until the next `prepare`.
    pub fn prepare(&mut self) -> AiResult<()> {
        if self.ready {
            return Ok(());
        }
        self.models.clear();

        if let Err(e) = self.set.prepare(&mut self.models) {
            log_error!("model set {} failed to prepare: {}", self.set.name(), e);
            return Err(e);
        }
        if self.models.is_empty() {
            log_error!("model set {} attached no models", self.set.name());
            return Err(AiError::OperationFailed("model set attached no models"));
        }
        self.ready = true;
        log_info!("model set {} ready with {} models", self.set.name(), self.models.len());
        Ok(())
    }

    /// Forwards one raw payload to every model in attachment order
    ///
    /// Returns `Finished` when every model finished on this push, `Proceeding`
    /// when some model invoked without the whole set finishing, and `Accepted`
    /// while every model is still filling its window. The listener fires once
    /// when the whole set finishes, and once for a failure.
    pub fn push_data(&mut self, data: &[f32]) -> AiResult<CycleStatus> {
        if !self.ready {
            return Err(AiError::OperationFailed("inference handler not prepared"));
        }

        if let Err((_index, e)) = self.models.push_all(data) {
            log_warn!("model {} of {} failed: {}", _index, self.set.name(), e);
            self.notify(Err(e));
            return Err(e);
        }

        let last = self.models.len() - 1;
        let status = self.models.cycle_status();
        if status == CycleStatus::Finished {
            if let Err(e) = self.set.on_inference_finished(last, &self.models, &mut self.final_result) {
                log_warn!("ensembling in {} failed: {}", self.set.name(), e);
                self.notify(Err(e));
                return Err(e);
            }
            self.cycles += 1;
            log_debug!("model set {} finished cycle {}", self.set.name(), self.cycles);
            self.notify(Ok(CycleStatus::Finished));
        } else {
            log_trace!("model set {} cycle {:?}", self.set.name(), status);
        }
        Ok(status)
    }

    fn notify(&mut self, result: AiResult<CycleStatus>) {
        if let Some(listener) = self.listener.as_mut() {
            listener(result, &self.final_result);
        }
    }

    /// Common inference interval of the attached models (ms)
    ///
    /// Models of one set are expected to share an interval; on a mismatch the
    /// first model's wins.
    pub fn model_service_interval(&self) -> AiResult<u32> {
        let first = self
            .models
            .get(0)
            .ok_or(AiError::OperationFailed("no models attached"))?
            .attribute()
            .inference_interval;
        if self.models.iter().any(|m| m.attribute().inference_interval != first) {
            log_warn!("model set {} mixes inference intervals, using {} ms", self.set.name(), first);
        }
        Ok(first)
    }

    /// Replaces the result listener
    pub fn set_listener(&mut self, listener: Option<InferenceResultListener>) {
        self.listener = listener;
    }

    /// Last successfully ensembled result
    pub fn final_result(&self) -> &[f32] {
        &self.final_result
    }

    /// Attached models
    pub fn models(&self) -> &ModelList {
        &self.models
    }

    /// Model set name
    pub fn name(&self) -> &str {
        self.set.name()
    }

    /// Whether `prepare` has succeeded
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Completed push cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Wraps the handler for sharing between a service and its push port
    #[cfg(feature = "std")]
    pub fn into_shared(self) -> SharedInferenceHandler {
        std::sync::Arc::new(parking_lot::Mutex::new(self))
    }
}

/// Handler shared between a [`ModelService`](crate::service::ModelService) and its timer
#[cfg(feature = "std")]
pub type SharedInferenceHandler = std::sync::Arc<parking_lot::Mutex<InferenceHandler>>;
