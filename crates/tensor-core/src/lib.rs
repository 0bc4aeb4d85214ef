// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Minimal tensor types for moving batches between the inference pipeline
//! and accelerator lanes.
//!
//! This crate provides:
//! - [`Tensor`]: an owned, row-major `f32` tensor whose leading dimension is
//!   the batch (row) dimension.
//! - [`Shape`]: runtime shape descriptors with batch-dimension helpers.
//! - Row operations used by the batch engine: slicing a row range, zero
//!   padding up to a fixed batch, truncating padded output rows.
//! - Postprocessing helpers: row-wise [`softmax`] and [`top_k`].
//!
//! # Row Model
//! Every tensor is viewed as `rows × row_len`, where `rows = dims[0]` and
//! `row_len` is the product of the remaining dimensions. Batching never
//! touches anything but the leading dimension.

mod error;
mod ops;
mod shape;
mod tensor;

pub use error::TensorError;
pub use ops::{softmax, top_k};
pub use shape::Shape;
pub use tensor::Tensor;
