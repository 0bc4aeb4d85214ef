// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for accelerator lanes.

use tensor_core::{Shape, TensorError};

/// Errors raised by an accelerator adapter or the lane wrapping it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AcceleratorError {
    /// The adapter failed to come up (device missing, model rejected, ...).
    #[error("accelerator '{adapter}' failed to initialise: {detail}")]
    Init { adapter: String, detail: String },

    /// A batch submission failed on the device.
    #[error("accelerator '{adapter}' execution failed: {detail}")]
    Execution { adapter: String, detail: String },

    /// More rows were submitted than the lane's native batch.
    #[error("batch of {rows} rows exceeds native lane batch of {native}")]
    BatchTooLarge { rows: usize, native: usize },

    /// The per-item input shape does not match what the lane expects.
    #[error("input item shape {actual} does not match lane input {expected}")]
    InputShape { expected: Shape, actual: Shape },

    /// The adapter returned an output tensor of the wrong size.
    #[error("adapter returned {actual} output, expected {expected}")]
    OutputShape { expected: Shape, actual: Shape },

    /// A tensor row operation failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
