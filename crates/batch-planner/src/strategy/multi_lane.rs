// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Multi-lane batching strategy.
//!
//! Used when the hardware executes a fixed native batch that is smaller
//! than the configured batch, so several lanes (runner instances) share one
//! request.
//!
//! # Assignment Model
//!
//! The dataset is first cut into `total_items / native_batch` whole native
//! chunks. Lanes receive contiguous chunk ranges:
//!
//! ```text
//! per_lane = chunks / lane_count
//! lane i < last : chunks [i * per_lane, (i + 1) * per_lane)
//! last lane     : everything left, including the partial chunk
//! ```
//!
//! The split is deliberately asymmetric: the last lane absorbs all leftover
//! chunks instead of spreading them. Lanes that end up with no items are
//! left out of the plan.

use crate::plan::PlanBuilder;
use crate::strategy::BatchStrategy;
use crate::{BatchPlan, PlannerError};

/// Native-sized chunks spread over `lane_count` lanes, last lane takes the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiLane {
    lane_count: usize,
    native_batch: usize,
}

impl MultiLane {
    /// Creates the strategy for `lane_count` lanes of `native_batch` rows each.
    pub fn new(lane_count: usize, native_batch: usize) -> Result<Self, PlannerError> {
        if lane_count == 0 {
            return Err(PlannerError::ZeroLanes);
        }
        if native_batch == 0 {
            return Err(PlannerError::ZeroBatchSize {
                what: "native lane batch",
            });
        }
        Ok(Self {
            lane_count,
            native_batch,
        })
    }

    /// Returns the number of lanes.
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Returns the native batch size of every lane.
    pub fn native_batch(&self) -> usize {
        self.native_batch
    }
}

impl BatchStrategy for MultiLane {
    fn name(&self) -> &str {
        "multi-lane"
    }

    fn plan(&self, total_items: usize) -> Result<BatchPlan, PlannerError> {
        let native = self.native_batch;
        let chunks = total_items / native;
        let per_lane = chunks / self.lane_count;

        let mut builder = PlanBuilder::new(self.name(), total_items, self.lane_count, native);
        let mut start_chunk = 0;

        for lane in 0..self.lane_count {
            let start = start_chunk * native;
            if lane == self.lane_count - 1 {
                builder.add_lane(lane, start, total_items - start);
            } else {
                builder.add_lane(lane, start, per_lane * native);
                start_chunk += per_lane;
            }
        }

        let plan = builder.build();
        plan.validate()?;
        Ok(plan)
    }
}
