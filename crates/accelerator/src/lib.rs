// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accelerator
//!
//! The boundary between the inference engine and a hardware runner.
//!
//! - [`AcceleratorAdapter`]: trait implemented by a concrete device runtime.
//! - [`LaneRunner`]: an initialised adapter enforcing the fixed-batch
//!   contract: zero-pads short batches, rejects oversized ones and trims
//!   padded output rows.
//! - [`SyntheticAccelerator`]: deterministic software adapter with fault
//!   and latency injection, plus a [`CallProbe`] for observing concurrency.
//!
//! # Example
//! ```
//! use std::path::Path;
//!
//! use accelerator::{LaneRunner, SyntheticAccelerator};
//! use tensor_core::{Shape, Tensor};
//!
//! let adapter = SyntheticAccelerator::new(4, Shape::vector(2), 1);
//! let mut lane = LaneRunner::initialise(0, adapter, Path::new("./model")).unwrap();
//! let input = Tensor::from_vec(Shape::matrix(1, 2), vec![1.0, 2.0]).unwrap();
//! let out = lane.run_batch(&input).unwrap();
//! assert_eq!(out.as_slice(), &[3.0]);
//! ```

mod adapter;
mod error;
mod lane;
mod synthetic;

pub use adapter::{AcceleratorAdapter, LaneSpec};
pub use error::AcceleratorError;
pub use lane::LaneRunner;
pub use synthetic::{CallProbe, CallWindow, SyntheticAccelerator};
