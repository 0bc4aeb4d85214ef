// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Model-specific data transforms around accelerator execution.
//!
//! A [`Workload`] turns raw request bytes into a batch tensor and the
//! accelerator's output tensor back into response bytes. The engine owns
//! everything in between: mode checks, batching, lane fan-out and timing.

use serde::{Deserialize, Serialize};
use tensor_core::{softmax, top_k, Shape, Tensor};

use crate::WorkloadError;

/// Request-side and response-side transforms for one model.
pub trait Workload: Send {
    /// Decoded request payload.
    type Decoded;
    /// Postprocessed result, before encoding.
    type Output;

    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Decodes raw bytes, returning the payload and its item count.
    fn decode(&mut self, raw: &[u8]) -> Result<(Self::Decoded, usize), WorkloadError>;

    /// Builds a `[n, ..item]` tensor from the decoded payload.
    fn preprocess(&mut self, decoded: Self::Decoded, item: &Shape)
        -> Result<Tensor, WorkloadError>;

    /// Turns the `[n, ..item_out]` accelerator output into a result.
    fn postprocess(&mut self, output: Tensor) -> Result<Self::Output, WorkloadError>;

    /// Encodes the result into response bytes.
    fn encode(&mut self, output: Self::Output) -> Result<Vec<u8>, WorkloadError>;
}

/// JSON request body: one flat `f32` vector per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRequest {
    pub items: Vec<Vec<f32>>,
}

/// One class score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub index: usize,
    pub score: f32,
}

/// JSON response body: `{"outputs": [...]}` or `{"predictions": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorResponse {
    Outputs(Vec<Vec<f32>>),
    Predictions(Vec<Vec<Prediction>>),
}

/// Reference workload over JSON-encoded `f32` vectors.
///
/// With `top_k` set, each output row is treated as class logits: softmax is
/// applied and the `k` best classes are returned. Otherwise raw output rows
/// are returned.
#[derive(Debug, Clone, Default)]
pub struct VectorWorkload {
    top_k: Option<usize>,
}

impl VectorWorkload {
    /// Returns raw output rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the `k` best classes per item.
    pub fn classification(k: usize) -> Self {
        Self { top_k: Some(k) }
    }
}

impl Workload for VectorWorkload {
    type Decoded = Vec<Vec<f32>>;
    type Output = VectorResponse;

    fn name(&self) -> &str {
        "vector"
    }

    fn decode(&mut self, raw: &[u8]) -> Result<(Self::Decoded, usize), WorkloadError> {
        let request: VectorRequest =
            serde_json::from_slice(raw).map_err(|e| WorkloadError::Decode(e.to_string()))?;
        let n = request.items.len();
        Ok((request.items, n))
    }

    fn preprocess(
        &mut self,
        decoded: Self::Decoded,
        item: &Shape,
    ) -> Result<Tensor, WorkloadError> {
        Ok(Tensor::from_rows(item, &decoded)?)
    }

    fn postprocess(&mut self, output: Tensor) -> Result<Self::Output, WorkloadError> {
        let Some(k) = self.top_k else {
            return Ok(VectorResponse::Outputs(
                output.iter_rows().map(<[f32]>::to_vec).collect(),
            ));
        };

        let mut probabilities = Tensor::zeros(output.shape().clone());
        softmax(&output, &mut probabilities)?;
        let predictions = (0..probabilities.rows())
            .filter_map(|i| probabilities.row(i))
            .map(|row| {
                top_k(row, k)
                    .into_iter()
                    .map(|(index, score)| Prediction { index, score })
                    .collect()
            })
            .collect();
        Ok(VectorResponse::Predictions(predictions))
    }

    fn encode(&mut self, output: Self::Output) -> Result<Vec<u8>, WorkloadError> {
        serde_json::to_vec(&output).map_err(|e| WorkloadError::Encode(e.to_string()))
    }
}
