//! Scheduling and pipeline engine for EdgeInfer
//!
//! Periodically collects sensor data, runs it through a set of models, and
//! hands the ensembled result to the application. Designed for edge devices
//! with limited resources.
//!
//! Key constraints:
//! - Buffers sized from model metadata and allocated once at load time
//! - No allocation on the push path
//! - Every failure reported by value, never by panic
//!
//! ```text
//! PeriodicTimer ─▶ collect(&pusher) ─▶ ModelService::push_data
//!                                          │
//!                                   InferenceHandler ─▶ Model × n ─▶ listener
//! ```
//!
//! ```no_run
//! use edgeinfer_core::{CycleStatus, InferenceHandler, InferenceResultListener, ModelService, ModelSet};
//!
//! # fn build(set: Box<dyn ModelSet>) -> edgeinfer_core::AiResult<()> {
//! let listener: InferenceResultListener = Box::new(|result, values| {
//!     if let Ok(CycleStatus::Finished) = result {
//!         println!("prediction: {:?}", values);
//!     }
//! });
//! let handler = InferenceHandler::new(set, Some(listener))?.into_shared();
//! let mut service = ModelService::new(handler, |pusher| {
//!     // Read sensors, then push
//!     let _ = pusher.push_data(&[21.5, 40.0]);
//! });
//! service.prepare()?;
//! service.start()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod macros;

pub mod attribute;
pub mod buffer;
pub mod constants;
pub mod ensemble;
pub mod errors;
pub mod handler;
pub mod model;
pub mod source;
pub mod traits;

#[cfg(feature = "std")]
pub mod registry;
#[cfg(feature = "std")]
pub mod service;
#[cfg(feature = "std")]
pub mod timer;

// Public API
pub use attribute::{ModelAttribute, ModelSource};
pub use buffer::DataBuffer;
pub use errors::{result_code, AiError, AiResult, CycleStatus};
pub use handler::{InferenceHandler, InferenceResultListener, ModelList, ModelSet};
pub use model::Model;
pub use source::{DataSource, MemorySource};
pub use traits::{AiEngine, DefaultProcessHandler, ProcessHandler};

#[cfg(feature = "std")]
pub use handler::SharedInferenceHandler;
#[cfg(feature = "std")]
pub use registry::{ModelSetFactory, ModelSetRegistry};
#[cfg(feature = "std")]
pub use service::{DataPusher, ModelService, ServiceState};
#[cfg(feature = "std")]
pub use source::CsvSource;
#[cfg(feature = "std")]
pub use timer::PeriodicTimer;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
