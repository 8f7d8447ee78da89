//! Dense Network Inference for EdgeInfer
//!
//! ## Overview
//!
//! This crate provides [`DenseEngine`], an [`edgeinfer_core::AiEngine`]
//! that runs small feed-forward networks stored in the EIDN binary format.
//! It is meant for the models that fit comfortably on a microcontroller:
//! a handful of fully connected layers over a sliding sensor window.
//!
//! ## Graph Format
//!
//! See [`format`] for the byte layout. Graphs can be produced offline or
//! assembled in code with [`DenseModelBuilder`]:
//!
//! ```
//! use edgeinfer_core::AiEngine;
//! use edgeinfer_ml::{Activation, DenseEngine, DenseModelBuilder};
//!
//! // next = 2 * x[t] - x[t-1]
//! let bytes = DenseModelBuilder::new(2)
//!     .layer(1, Activation::Linear, vec![-1.0, 2.0], vec![0.0])
//!     .to_bytes()
//!     .unwrap();
//!
//! let mut engine = DenseEngine::new();
//! engine.load_from_bytes(&bytes).unwrap();
//! assert_eq!(engine.invoke(&[1.0, 2.0]).unwrap(), &[3.0]);
//! ```
//!
//! ## Memory Model
//!
//! ```text
//! Weights:  4 × Σ(inputs × outputs) bytes
//! Scratch:  2 × 4 × widest layer bytes
//! ```
//!
//! Invoke never allocates.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod builder;
pub mod dense;
pub mod error;
pub mod format;

pub use builder::DenseModelBuilder;
pub use dense::DenseEngine;
pub use error::{MlError, MlResult};
pub use format::{Activation, DenseLayer, Graph};
