//! Timer-Driven Model Service
//!
//! A [`ModelService`] pairs one [`InferenceHandler`] with an optional
//! [`PeriodicTimer`]. On each expiry the timer calls the application's
//! raw-data collection function, which reads its sensors and pushes the data
//! back through the service's [`DataPusher`].
//!
//! ## State Machine
//!
//! ```text
//!              prepare()            start()
//! Unprepared ────────────▶ Prepared ───────▶ Running
//!                             ▲                │ stop()
//!                             │   start()      ▼
//!                             └──────────── Stopped
//! ```
//!
//! A handler whose models declare an interval of 0 runs in push-only mode: no
//! timer is created and `start()` only opens the push port.
//!
//! The result listener runs while the handler is locked, so a push from inside
//! it would wait on itself. [`DataPusher`] detects that case and refuses the
//! push instead.
//!
//! ## Example
//!
//! ```rust,no_run
//! use edgeinfer_core::handler::{InferenceHandler, ModelSet};
//! use edgeinfer_core::service::ModelService;
//!
//! # fn run(set: Box<dyn ModelSet>) -> edgeinfer_core::AiResult<()> {
//! let handler = InferenceHandler::new(set, None)?.into_shared();
//! let mut service = ModelService::new(handler, |pusher| {
//!     let sample = [0.25_f32, 0.5];
//!     let _ = pusher.push_data(&sample);
//! });
//! service.prepare()?;
//! service.start()?;
//! // ...
//! service.stop()?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::errors::{AiError, AiResult, CycleStatus};
use crate::handler::SharedInferenceHandler;
use crate::timer::PeriodicTimer;

/// Push port of a service
///
/// Cheap to clone; every clone observes the service's running flag.
#[derive(Clone)]
pub struct DataPusher {
    handler: SharedInferenceHandler,
    running: Arc<AtomicBool>,
    /// Thread currently inside `InferenceHandler::push_data`
    pushing: Arc<Mutex<Option<ThreadId>>>,
}

// Clears the pushing thread even if the listener panics
struct PushGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for PushGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

impl DataPusher {
    /// Forwards one raw payload to the inference handler
    ///
    /// # Errors
    ///
    /// `ServiceNotRunning` unless the service is running; `OperationFailed` when
    /// called from the result listener of the same handler; otherwise whatever
    /// the handler returns.
    pub fn push_data(&self, data: &[f32]) -> AiResult<CycleStatus> {
        if !self.running.load(Ordering::Acquire) {
            return Err(AiError::ServiceNotRunning);
        }
        let current = thread::current().id();
        if *self.pushing.lock() == Some(current) {
            log_warn!("push from inside the result listener refused");
            return Err(AiError::OperationFailed("push from inside the result listener"));
        }

        let mut handler = self.handler.lock();
        *self.pushing.lock() = Some(current);
        let _guard = PushGuard(&self.pushing);
        handler.push_data(data)
    }

    /// Whether pushes are currently accepted
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Lifecycle state of a [`ModelService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Created; models not loaded
    Unprepared,
    /// Models loaded, timer created but not armed
    Prepared,
    /// Accepting pushes; timer armed
    Running,
    /// Stopped after running
    Stopped,
}

type CollectFn = Arc<dyn Fn(&DataPusher) + Send + Sync>;

/// Schedules periodic data collection for one model set
pub struct ModelService {
    handler: SharedInferenceHandler,
    collect: CollectFn,
    pusher: DataPusher,
    timer: Option<PeriodicTimer>,
    interval_ms: u32,
    state: ServiceState,
}

impl ModelService {
    /// Binds a handler and a raw-data collection function
    pub fn new<F>(handler: SharedInferenceHandler, collect: F) -> Self
    where
        F: Fn(&DataPusher) + Send + Sync + 'static,
    {
        let pusher = DataPusher {
            handler: Arc::clone(&handler),
            running: Arc::new(AtomicBool::new(false)),
            pushing: Arc::new(Mutex::new(None)),
        };
        Self {
            handler,
            collect: Arc::new(collect),
            pusher,
            timer: None,
            interval_ms: 0,
            state: ServiceState::Unprepared,
        }
    }

    /// Loads the model set and creates the timer
    ///
    /// Handler failures propagate unchanged. An interval of 0 selects
    /// push-only mode.
    pub fn prepare(&mut self) -> AiResult<()> {
        if self.state != ServiceState::Unprepared {
            return Ok(());
        }

        let interval_ms = {
            let mut handler = self.handler.lock();
            handler.prepare()?;
            match handler.model_service_interval() {
                Ok(ms) => ms,
                Err(_e) => {
                    log_warn!("no service interval for {}: {}, push-only mode", handler.name(), _e);
                    0
                }
            }
        };

        if interval_ms > 0 {
            let collect = Arc::clone(&self.collect);
            let pusher = self.pusher.clone();
            self.timer = Some(PeriodicTimer::create(move || collect(&pusher), interval_ms)?);
        }
        self.interval_ms = interval_ms;
        self.state = ServiceState::Prepared;
        log_info!("model service prepared, interval {} ms", interval_ms);
        Ok(())
    }

    /// Opens the push port and arms the timer. Idempotent while running.
    pub fn start(&mut self) -> AiResult<()> {
        match self.state {
            ServiceState::Unprepared => return Err(AiError::OperationFailed("service not prepared")),
            ServiceState::Running => return Ok(()),
            ServiceState::Prepared | ServiceState::Stopped => {}
        }

        self.pusher.running.store(true, Ordering::Release);
        if let Some(timer) = self.timer.as_mut() {
            if let Err(e) = timer.change_interval(self.interval_ms) {
                self.pusher.running.store(false, Ordering::Release);
                log_error!("model service failed to arm timer: {}", e);
                return Err(e);
            }
        }
        self.state = ServiceState::Running;
        log_info!("model service started");
        Ok(())
    }

    /// Closes the push port and disarms the timer. Idempotent.
    pub fn stop(&mut self) -> AiResult<()> {
        if self.state != ServiceState::Running {
            return Ok(());
        }
        self.pusher.running.store(false, Ordering::Release);
        if let Some(timer) = self.timer.as_ref() {
            timer.stop()?;
        }
        self.state = ServiceState::Stopped;
        log_info!("model service stopped");
        Ok(())
    }

    /// Changes the collection period
    ///
    /// Applied immediately while running, otherwise at the next `start()`.
    ///
    /// # Errors
    ///
    /// `OperationFailed` in push-only mode or for a zero interval; the previous
    /// interval stays in effect.
    pub fn set_interval(&mut self, interval_ms: u32) -> AiResult<()> {
        let Some(timer) = self.timer.as_mut() else {
            return Err(AiError::OperationFailed("service has no timer"));
        };
        if interval_ms == 0 {
            return Err(AiError::OperationFailed("interval must be positive"));
        }
        if self.state == ServiceState::Running {
            timer.change_interval(interval_ms)?;
        }
        self.interval_ms = interval_ms;
        log_info!("model service interval set to {} ms", interval_ms);
        Ok(())
    }

    /// Forwards one raw payload; fails with `ServiceNotRunning` unless running
    pub fn push_data(&self, data: &[f32]) -> AiResult<CycleStatus> {
        self.pusher.push_data(data)
    }

    /// A push port for application threads
    pub fn pusher(&self) -> DataPusher {
        self.pusher.clone()
    }

    /// The shared inference handler
    pub fn handler(&self) -> &SharedInferenceHandler {
        &self.handler
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Collection period in milliseconds (0 in push-only mode)
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Whether a timer backs this service
    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Stops the service and releases its timer
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for ModelService {
    fn drop(&mut self) {
        self.pusher.running.store(false, Ordering::Release);
        if self.timer.take().is_some() {
            log_debug!("model service timer released");
        }
    }
}
