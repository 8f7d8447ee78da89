//! Model-Set Registry Keyed by Model Code
//!
//! The registry is the application-facing entry point when several model sets
//! run side by side. Each 32-bit model code maps to one
//! (InferenceHandler, ModelService) pair, created through a
//! [`ModelSetFactory`] when the code is first loaded.
//!
//! ## Locking
//!
//! The entry table is locked only to look up or insert entries. Calls into a
//! service happen after the table lock is released, so a collect function
//! running on a timer thread can push through the registry while another
//! thread stops or unloads a different set. Collect functions should only push;
//! stopping their own set from inside the collect function is not supported.
//!
//! ```rust,no_run
//! use edgeinfer_core::handler::ModelSet;
//! use edgeinfer_core::registry::ModelSetRegistry;
//!
//! # fn make_set(code: u32) -> Option<Box<dyn ModelSet>> { None }
//! # fn main() -> edgeinfer_core::AiResult<()> {
//! let registry = ModelSetRegistry::new(4, make_set);
//! registry.load_model(0x5149, None, |_pusher| {})?;
//! registry.start(0x5149)?;
//! registry.push_data(0x5149, &[0.5])?;
//! registry.deinit();
//! # Ok(())
//! # }
//! ```

use alloc::boxed::Box;
use alloc::vec::Vec;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::constants::DEFAULT_MAX_MODEL_SETS;
use crate::errors::{AiError, AiResult, CycleStatus};
use crate::handler::{InferenceHandler, InferenceResultListener, ModelSet};
use crate::service::{DataPusher, ModelService};

/// Resolves a model code to a fresh model set
pub trait ModelSetFactory: Send + Sync {
    /// Returns `None` for an unknown code
    fn create(&self, model_code: u32) -> Option<Box<dyn ModelSet>>;
}

impl<F> ModelSetFactory for F
where
    F: Fn(u32) -> Option<Box<dyn ModelSet>> + Send + Sync,
{
    fn create(&self, model_code: u32) -> Option<Box<dyn ModelSet>> {
        self(model_code)
    }
}

struct Entry {
    code: u32,
    service: Arc<Mutex<ModelService>>,
    pusher: DataPusher,
}

/// Bounded table of running model sets
pub struct ModelSetRegistry {
    entries: Mutex<Vec<Entry>>,
    max_sets: usize,
    factory: Box<dyn ModelSetFactory>,
}

impl ModelSetRegistry {
    /// Creates a registry holding at most `max_sets` model sets
    pub fn new<F>(max_sets: usize, factory: F) -> Self
    where
        F: ModelSetFactory + 'static,
    {
        Self {
            entries: Mutex::new(Vec::new()),
            max_sets,
            factory: Box::new(factory),
        }
    }

    /// Creates a registry with room for [`DEFAULT_MAX_MODEL_SETS`] model sets
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: ModelSetFactory + 'static,
    {
        Self::new(DEFAULT_MAX_MODEL_SETS, factory)
    }

    /// Creates and prepares the model set for `code`
    ///
    /// Loading an already loaded code succeeds without side effects.
    ///
    /// # Errors
    ///
    /// - `OperationFailed` if the factory does not know `code`
    /// - `NotEnoughSpace` if the registry is full
    /// - any preparation failure, in which case nothing is registered
    pub fn load_model<F>(
        &self,
        code: u32,
        listener: Option<InferenceResultListener>,
        collect: F,
    ) -> AiResult<()>
    where
        F: Fn(&DataPusher) + Send + Sync + 'static,
    {
        if self.is_loaded(code) {
            log_debug!("model set {:#x} already loaded", code);
            return Ok(());
        }
        self.check_room(code)?;

        let set = self.factory.create(code).ok_or_else(|| {
            log_error!("unknown model code {:#x}", code);
            AiError::OperationFailed("unknown model code")
        })?;
        let handler = InferenceHandler::new(set, listener)?.into_shared();
        let mut service = ModelService::new(handler, collect);
        if let Err(e) = service.prepare() {
            log_error!("model set {:#x} failed to load: {}", code, e);
            return Err(e);
        }

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.code == code) {
            return Ok(());
        }
        if entries.len() >= self.max_sets {
            return Err(AiError::NotEnoughSpace { required: entries.len() + 1, available: self.max_sets });
        }
        let pusher = service.pusher();
        entries.push(Entry { code, service: Arc::new(Mutex::new(service)), pusher });
        log_info!("model set {:#x} loaded ({}/{})", code, entries.len(), self.max_sets);
        Ok(())
    }

    fn check_room(&self, code: u32) -> AiResult<()> {
        let entries = self.entries.lock();
        if entries.len() >= self.max_sets {
            log_warn!("registry full, cannot load {:#x}", code);
            return Err(AiError::NotEnoughSpace { required: entries.len() + 1, available: self.max_sets });
        }
        Ok(())
    }

    fn service(&self, code: u32) -> AiResult<Arc<Mutex<ModelService>>> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.code == code)
            .map(|e| Arc::clone(&e.service))
            .ok_or(AiError::OperationFailed("model code not loaded"))
    }

    /// Starts the service of `code`
    pub fn start(&self, code: u32) -> AiResult<()> {
        self.service(code)?.lock().start()
    }

    /// Stops the service of `code`
    pub fn stop(&self, code: u32) -> AiResult<()> {
        self.service(code)?.lock().stop()
    }

    /// Changes the collection period of `code`
    pub fn set_interval(&self, code: u32, interval_ms: u32) -> AiResult<()> {
        self.service(code)?.lock().set_interval(interval_ms)
    }

    /// Pushes one raw payload to the model set of `code`
    pub fn push_data(&self, code: u32, data: &[f32]) -> AiResult<CycleStatus> {
        let pusher = self
            .entries
            .lock()
            .iter()
            .find(|e| e.code == code)
            .map(|e| e.pusher.clone())
            .ok_or(AiError::OperationFailed("model code not loaded"))?;
        pusher.push_data(data)
    }

    /// Stops and removes the model set of `code`
    pub fn unload(&self, code: u32) -> AiResult<()> {
        let entry = {
            let mut entries = self.entries.lock();
            let index = entries
                .iter()
                .position(|e| e.code == code)
                .ok_or(AiError::OperationFailed("model code not loaded"))?;
            entries.swap_remove(index)
        };
        let result = entry.service.lock().stop();
        log_info!("model set {:#x} unloaded", code);
        result
    }

    /// Stops and removes every model set
    pub fn deinit(&self) {
        let drained: Vec<Entry> = core::mem::take(&mut *self.entries.lock());
        for entry in drained {
            if let Err(_e) = entry.service.lock().stop() {
                log_warn!("model set {:#x} failed to stop: {}", entry.code, _e);
            }
        }
    }

    /// Whether `code` is loaded
    pub fn is_loaded(&self, code: u32) -> bool {
        self.entries.lock().iter().any(|e| e.code == code)
    }

    /// Loaded model-set count
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when nothing is loaded
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum model-set count
    pub fn capacity(&self) -> usize {
        self.max_sets
    }
}

impl Drop for ModelSetRegistry {
    fn drop(&mut self) {
        self.deinit();
    }
}
