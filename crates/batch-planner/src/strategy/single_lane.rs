// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-lane batching strategy.
//!
//! The whole dataset goes to lane 0 in batches of exactly `exec_batch`
//! rows. When the item count is not a multiple of the batch size, one
//! remainder batch is appended: it is zero-padded up to `exec_batch` and
//! only its first `total_items mod exec_batch` output rows are valid.
//!
//! ```text
//! total_items = 10, exec_batch = 4
//!   [0,4)  [4,8)  [8,10)+2 padded
//! ```

use crate::plan::PlanBuilder;
use crate::strategy::BatchStrategy;
use crate::{BatchPlan, PlannerError};

/// All items on one lane, fixed-size batches, padded remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleLane {
    exec_batch: usize,
}

impl SingleLane {
    /// Creates the strategy for an execution batch of `exec_batch` rows.
    pub fn new(exec_batch: usize) -> Result<Self, PlannerError> {
        if exec_batch == 0 {
            return Err(PlannerError::ZeroBatchSize {
                what: "execution batch size",
            });
        }
        Ok(Self { exec_batch })
    }

    /// Returns the execution batch size.
    pub fn exec_batch(&self) -> usize {
        self.exec_batch
    }
}

impl BatchStrategy for SingleLane {
    fn name(&self) -> &str {
        "single-lane"
    }

    fn plan(&self, total_items: usize) -> Result<BatchPlan, PlannerError> {
        let mut builder = PlanBuilder::new(self.name(), total_items, 1, self.exec_batch);
        builder.add_lane(0, 0, total_items);

        let plan = builder.build();
        plan.validate()?;
        Ok(plan)
    }
}
