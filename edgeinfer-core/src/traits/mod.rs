//! Extension Points of the Pipeline
//!
//! EdgeInfer has two seams where applications plug in their own code:
//!
//! - [`engine`] - [`AiEngine`], the inference backend that turns a serialized
//!   graph into a callable function from input tensor to output tensor
//! - [`process`] - [`ProcessHandler`], the three data transformations around
//!   each invoke (raw parse, pre-process, post-process)
//!
//! Both are object safe and used behind `Box<dyn _>`. A model owns exactly one
//! of each, so several models of one set can mix backends and handlers.
//!
//! ## Usage Example
//!
//! ```rust
//! use edgeinfer_core::traits::{AiEngine, DefaultProcessHandler, ProcessHandler};
//! use edgeinfer_core::{AiResult, ModelAttribute};
//!
//! struct Doubler { out: [f32; 1] }
//!
//! impl AiEngine for Doubler {
//!     fn load_from_bytes(&mut self, _graph: &[u8]) -> AiResult<()> { Ok(()) }
//!     fn input_size(&self) -> usize { 1 }
//!     fn output_size(&self) -> usize { 1 }
//!     fn invoke(&mut self, input: &[f32]) -> AiResult<&[f32]> {
//!         self.out[0] = input[0] * 2.0;
//!         Ok(&self.out)
//!     }
//! }
//!
//! let mut engine = Doubler { out: [0.0] };
//! assert_eq!(engine.invoke(&[2.0]).unwrap(), &[4.0]);
//!
//! // Engine input must hold exactly one window of feature rows
//! let attr = ModelAttribute { window_size: 4, features_count: 2, invoke_input_count: 6, ..Default::default() };
//! let handler: Box<dyn ProcessHandler> = Box::new(DefaultProcessHandler::new());
//! assert!(handler.check_attribute(&attr).is_err());
//! ```

pub mod engine;
pub mod process;

pub use engine::AiEngine;
pub use process::{DefaultProcessHandler, ProcessHandler};
