// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`AcceleratorAdapter`] trait: the seam between the engine and a
//! concrete device runtime.
//!
//! An adapter owns one hardware runner instance. It is initialised once,
//! reports the tensor shapes it was compiled for, and then executes one
//! full native batch per call. Anything that can do that (an FPGA overlay,
//! a GPU session, a CPU reference kernel) can back an execution lane.

use std::path::Path;

use serde::Serialize;
use tensor_core::{Shape, Tensor};

use crate::AcceleratorError;

/// Tensor geometry reported by an adapter after initialisation.
///
/// Both shapes include the batch dimension, which equals `native_batch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneSpec {
    /// Input tensor shape, `[native_batch, ..item]`.
    pub input_shape: Shape,
    /// Output tensor shape, `[native_batch, ..item_out]`.
    pub output_shape: Shape,
    /// Rows the device executes per call.
    pub native_batch: usize,
}

impl LaneSpec {
    /// Builds a spec from per-item shapes and a native batch.
    pub fn new(input_item: &Shape, output_item: &Shape, native_batch: usize) -> Self {
        Self {
            input_shape: Shape::batched(input_item, native_batch),
            output_shape: Shape::batched(output_item, native_batch),
            native_batch,
        }
    }

    /// Per-item input shape.
    pub fn input_item(&self) -> Shape {
        self.input_shape.item_shape()
    }

    /// Per-item output shape.
    pub fn output_item(&self) -> Shape {
        self.output_shape.item_shape()
    }
}

/// A single accelerator runner instance.
///
/// Implementations must be `Send`: each lane is driven from its own
/// thread during fan-out, but a lane is never shared between threads.
pub trait AcceleratorAdapter: Send {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Loads the compiled model at `model_path`, brings the device up and
    /// reports its geometry.
    fn init(&mut self, model_path: &Path) -> Result<LaneSpec, AcceleratorError>;

    /// Executes exactly one native batch.
    ///
    /// `input` always has `spec.native_batch` rows; the returned tensor must
    /// have `spec.output_shape`.
    fn run(&mut self, input: &Tensor) -> Result<Tensor, AcceleratorError>;

    /// Runs one throwaway batch so later calls see a warm device.
    fn warm_up(&mut self, spec: &LaneSpec) -> Result<(), AcceleratorError> {
        self.run(&Tensor::zeros(spec.input_shape.clone()))?;
        Ok(())
    }
}

impl<A: AcceleratorAdapter + ?Sized> AcceleratorAdapter for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn init(&mut self, model_path: &Path) -> Result<LaneSpec, AcceleratorError> {
        (**self).init(model_path)
    }

    fn run(&mut self, input: &Tensor) -> Result<Tensor, AcceleratorError> {
        (**self).run(input)
    }

    fn warm_up(&mut self, spec: &LaneSpec) -> Result<(), AcceleratorError> {
        (**self).warm_up(spec)
    }
}
