// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution lane: one initialised adapter plus its fixed-batch contract.
//!
//! The device only ever sees full native batches. [`LaneRunner::run_rows`]
//! copies the requested rows, zero-pads them up to `native_batch`, runs the
//! adapter and trims the output back to the valid rows, so callers never
//! observe padding.

use std::path::Path;
use std::time::{Duration, Instant};

use tensor_core::Tensor;

use crate::{AcceleratorAdapter, AcceleratorError, LaneSpec};

/// An initialised accelerator lane.
pub struct LaneRunner<A> {
    index: usize,
    adapter: A,
    spec: LaneSpec,
    warm_up: Option<Duration>,
}

impl<A: AcceleratorAdapter> LaneRunner<A> {
    /// Initialises `adapter` with the model at `model_path` and checks the
    /// geometry it reports.
    pub fn initialise(index: usize, mut adapter: A, model_path: &Path) -> Result<Self, AcceleratorError> {
        let spec = adapter.init(model_path)?;

        let geometry_ok = spec.native_batch > 0
            && spec.input_shape.rank() > 0
            && spec.output_shape.rank() > 0
            && spec.input_shape.rows() == spec.native_batch
            && spec.output_shape.rows() == spec.native_batch;
        if !geometry_ok {
            return Err(AcceleratorError::Init {
                adapter: adapter.name().to_string(),
                detail: format!(
                    "inconsistent geometry: input {}, output {}, native batch {}",
                    spec.input_shape, spec.output_shape, spec.native_batch,
                ),
            });
        }

        tracing::debug!(
            lane = index,
            adapter = adapter.name(),
            model = %model_path.display(),
            input = %spec.input_shape,
            output = %spec.output_shape,
            "lane initialised",
        );

        Ok(Self {
            index,
            adapter,
            spec,
            warm_up: None,
        })
    }

    /// Lane index within the engine.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Geometry reported at initialisation.
    pub fn spec(&self) -> &LaneSpec {
        &self.spec
    }

    /// Rows per device call.
    pub fn native_batch(&self) -> usize {
        self.spec.native_batch
    }

    /// The wrapped adapter.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Duration of the warm-up call, once it has run.
    pub fn warm_up_duration(&self) -> Option<Duration> {
        self.warm_up
    }

    /// Runs the adapter's warm-up once and records how long it took.
    ///
    /// Later calls return the recorded duration without touching the device.
    pub fn warm_up(&mut self) -> Result<Duration, AcceleratorError> {
        if let Some(elapsed) = self.warm_up {
            return Ok(elapsed);
        }
        let start = Instant::now();
        self.adapter.warm_up(&self.spec)?;
        let elapsed = start.elapsed();
        self.warm_up = Some(elapsed);
        tracing::debug!(lane = self.index, ?elapsed, "lane warmed up");
        Ok(elapsed)
    }

    /// Executes rows `[start, start + count)` of `source` as one padded batch.
    ///
    /// Returns a `[count, ..item_out]` tensor.
    pub fn run_rows(
        &mut self,
        source: &Tensor,
        start: usize,
        count: usize,
    ) -> Result<Tensor, AcceleratorError> {
        let native = self.spec.native_batch;
        if count > native {
            return Err(AcceleratorError::BatchTooLarge {
                rows: count,
                native,
            });
        }
        let expected_item = self.spec.input_item();
        let actual_item = source.shape().item_shape();
        if actual_item != expected_item {
            return Err(AcceleratorError::InputShape {
                expected: expected_item,
                actual: actual_item,
            });
        }

        let batch = source.padded_rows(start, count, native)?;
        let mut output = self.adapter.run(&batch)?;
        if output.shape() != &self.spec.output_shape {
            return Err(AcceleratorError::OutputShape {
                expected: self.spec.output_shape.clone(),
                actual: output.shape().clone(),
            });
        }
        output.truncate_rows(count)?;
        Ok(output)
    }

    /// Executes every row of `input` as one padded batch.
    pub fn run_batch(&mut self, input: &Tensor) -> Result<Tensor, AcceleratorError> {
        self.run_rows(input, 0, input.rows())
    }
}

impl<A> std::fmt::Debug for LaneRunner<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaneRunner")
            .field("index", &self.index)
            .field("spec", &self.spec)
            .field("warm_up", &self.warm_up)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticAccelerator;
    use tensor_core::Shape;

    fn lane(native: usize) -> LaneRunner<SyntheticAccelerator> {
        LaneRunner::initialise(0, SyntheticAccelerator::new(native, Shape::vector(2), 3), Path::new("model"))
            .unwrap()
    }

    #[test]
    fn test_full_batch() {
        let mut lane = lane(2);
        let input = Tensor::from_vec(Shape::matrix(2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let out = lane.run_batch(&input).unwrap();
        assert_eq!(out.shape(), &Shape::matrix(2, 3));
        assert_eq!(out.as_slice(), &[3.0, 4.0, 5.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_short_batch_is_padded_and_trimmed() {
        let mut lane = lane(4);
        let input = Tensor::from_vec(Shape::matrix(3, 2), vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]).unwrap();
        let out = lane.run_rows(&input, 1, 2).unwrap();
        assert_eq!(out.rows(), 2);
        assert_eq!(out.row(0).unwrap(), &[4.0, 5.0, 6.0]);
        assert_eq!(out.row(1).unwrap(), &[6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let mut lane = lane(2);
        let input = Tensor::zeros(Shape::matrix(3, 2));
        assert!(matches!(
            lane.run_batch(&input),
            Err(AcceleratorError::BatchTooLarge { rows: 3, native: 2 })
        ));
    }

    #[test]
    fn test_wrong_item_shape_rejected() {
        let mut lane = lane(2);
        let input = Tensor::zeros(Shape::matrix(2, 5));
        assert!(matches!(
            lane.run_batch(&input),
            Err(AcceleratorError::InputShape { .. })
        ));
    }

    #[test]
    fn test_warm_up_recorded_once() {
        let mut lane = lane(2);
        assert!(lane.warm_up_duration().is_none());
        let first = lane.warm_up().unwrap();
        assert_eq!(lane.warm_up().unwrap(), first);
        assert_eq!(lane.warm_up_duration(), Some(first));
    }

    #[test]
    fn test_init_failure_propagates() {
        let adapter = SyntheticAccelerator::new(2, Shape::vector(2), 1).failing_init();
        assert!(matches!(
            LaneRunner::initialise(0, adapter, Path::new("model")),
            Err(AcceleratorError::Init { .. })
        ));
    }
}
