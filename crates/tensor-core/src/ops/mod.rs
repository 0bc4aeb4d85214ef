// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Postprocessing operations applied to accelerator output rows.

mod softmax_op;
mod top_k_op;

pub use softmax_op::softmax;
pub use top_k_op::top_k;
