// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batch plan: the output of the batch planner.
//!
//! A plan is a list of [`LaneAssignment`]s, each owning a contiguous range
//! of dataset items. Inside a lane the range is cut into [`BatchSlice`]s of
//! exactly `lane_batch` rows; a final remainder slice is zero-padded up to
//! `lane_batch` and only its first `valid_rows` output rows are kept. The
//! plan is the contract between the planner and the execution engine.

use crate::PlannerError;

/// One accelerator invocation: `padded_rows` input rows of which the first
/// `valid_rows` are real items starting at dataset offset `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BatchSlice {
    /// Dataset offset of the first valid row.
    pub offset: usize,
    /// Number of real items in this batch.
    pub valid_rows: usize,
    /// Number of rows submitted to the accelerator (valid + zero padding).
    pub padded_rows: usize,
}

impl BatchSlice {
    /// Returns `true` if this batch carries zero padding.
    pub fn is_remainder(&self) -> bool {
        self.valid_rows < self.padded_rows
    }

    /// Number of zero rows appended after the valid rows.
    pub fn padding(&self) -> usize {
        self.padded_rows - self.valid_rows
    }

    /// Dataset offset one past the last valid row.
    pub fn end(&self) -> usize {
        self.offset + self.valid_rows
    }
}

/// A contiguous item range assigned to one execution lane.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LaneAssignment {
    /// Index of the lane (runner) that executes this range.
    pub lane_index: usize,
    /// Dataset offset of the first item, also the output write offset.
    pub start_offset: usize,
    /// Number of items in the range.
    pub item_count: usize,
    /// The batches this lane executes, in order.
    pub batches: Vec<BatchSlice>,
}

impl LaneAssignment {
    /// Returns the number of accelerator invocations for this lane.
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Dataset offset one past the last item.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.item_count
    }
}

/// The complete batch plan produced by a [`crate::BatchStrategy`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BatchPlan {
    /// Strategy name that produced this plan.
    pub strategy_name: String,
    /// Number of dataset items covered.
    pub total_items: usize,
    /// Number of lanes available to the plan.
    pub lane_count: usize,
    /// Rows per accelerator invocation on every lane.
    pub lane_batch: usize,
    /// Lane assignments ordered by lane index and start offset.
    pub lanes: Vec<LaneAssignment>,
}

impl BatchPlan {
    /// Returns `true` when no lane is invoked (`total_items == 0`).
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Returns the number of lanes that receive work.
    pub fn num_active_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// Returns the total number of accelerator invocations.
    pub fn total_batches(&self) -> usize {
        self.lanes.iter().map(|l| l.num_batches()).sum()
    }

    /// Returns the total number of zero rows submitted across all batches.
    pub fn total_padding(&self) -> usize {
        self.lanes
            .iter()
            .flat_map(|l| l.batches.iter())
            .map(|b| b.padding())
            .sum()
    }

    /// Iterates over all batches in dataset order.
    pub fn iter_batches(&self) -> impl Iterator<Item = &BatchSlice> {
        self.lanes.iter().flat_map(|l| l.batches.iter())
    }

    /// Validates the batch plan.
    ///
    /// Checks:
    /// - Lane indices are strictly increasing and below `lane_count`.
    /// - Lanes are non-empty and cover `[0, total_items)` contiguously.
    /// - Each lane's batches cover its range contiguously.
    /// - Every batch has `padded_rows == lane_batch` and
    ///   `1 <= valid_rows <= padded_rows`.
    pub fn validate(&self) -> Result<(), PlannerError> {
        let fail = |detail: String| PlannerError::InvalidPlan {
            strategy: self.strategy_name.clone(),
            detail,
        };

        let mut expected_offset = 0;
        let mut previous_lane: Option<usize> = None;

        for lane in &self.lanes {
            if lane.lane_index >= self.lane_count {
                return Err(fail(format!(
                    "lane index {} out of range for {} lanes",
                    lane.lane_index, self.lane_count,
                )));
            }
            if previous_lane.is_some_and(|p| lane.lane_index <= p) {
                return Err(fail(format!(
                    "lane {} listed out of order",
                    lane.lane_index
                )));
            }
            previous_lane = Some(lane.lane_index);

            if lane.item_count == 0 {
                return Err(fail(format!("lane {} is empty", lane.lane_index)));
            }
            if lane.start_offset != expected_offset {
                return Err(fail(format!(
                    "expected lane {} to start at {expected_offset}, got {}",
                    lane.lane_index, lane.start_offset,
                )));
            }

            let mut batch_offset = lane.start_offset;
            for batch in &lane.batches {
                if batch.offset != batch_offset {
                    return Err(fail(format!(
                        "lane {}: expected batch at {batch_offset}, got {}",
                        lane.lane_index, batch.offset,
                    )));
                }
                if batch.padded_rows != self.lane_batch {
                    return Err(fail(format!(
                        "lane {}: batch at {} has {} rows, lane batch is {}",
                        lane.lane_index, batch.offset, batch.padded_rows, self.lane_batch,
                    )));
                }
                if batch.valid_rows == 0 || batch.valid_rows > batch.padded_rows {
                    return Err(fail(format!(
                        "lane {}: batch at {} has {} valid of {} rows",
                        lane.lane_index, batch.offset, batch.valid_rows, batch.padded_rows,
                    )));
                }
                batch_offset = batch.end();
            }
            if batch_offset != lane.end_offset() {
                return Err(fail(format!(
                    "lane {}: batches cover up to {batch_offset}, range ends at {}",
                    lane.lane_index,
                    lane.end_offset(),
                )));
            }

            expected_offset = lane.end_offset();
        }

        if expected_offset != self.total_items {
            return Err(fail(format!(
                "lanes cover {expected_offset} of {} items",
                self.total_items
            )));
        }

        Ok(())
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let items_per_lane: Vec<usize> = self.lanes.iter().map(|l| l.item_count).collect();
        format!(
            "Plan '{}': {} items, {}/{} lanes active, {} batches of {} rows \
             ({} padded rows), lane sizes: {:?}",
            self.strategy_name,
            self.total_items,
            self.num_active_lanes(),
            self.lane_count,
            self.total_batches(),
            self.lane_batch,
            self.total_padding(),
            items_per_lane,
        )
    }
}

/// Cuts `[start, start + count)` into `lane_batch`-row batches, the last one
/// zero-padded when `count` is not a multiple of `lane_batch`.
pub(crate) fn batch_range(start: usize, count: usize, lane_batch: usize) -> Vec<BatchSlice> {
    let iterations = count / lane_batch;
    let remainder = count - iterations * lane_batch;
    let mut batches = Vec::with_capacity(iterations + usize::from(remainder > 0));

    for i in 0..iterations {
        batches.push(BatchSlice {
            offset: start + i * lane_batch,
            valid_rows: lane_batch,
            padded_rows: lane_batch,
        });
    }
    if remainder > 0 {
        batches.push(BatchSlice {
            offset: start + iterations * lane_batch,
            valid_rows: remainder,
            padded_rows: lane_batch,
        });
    }
    batches
}

/// Builder helper for constructing a `BatchPlan` incrementally.
///
/// Used internally by strategy implementations.
pub(crate) struct PlanBuilder {
    strategy_name: String,
    total_items: usize,
    lane_count: usize,
    lane_batch: usize,
    lanes: Vec<LaneAssignment>,
}

impl PlanBuilder {
    /// Creates a new builder.
    pub fn new(strategy_name: &str, total_items: usize, lane_count: usize, lane_batch: usize) -> Self {
        Self {
            strategy_name: strategy_name.to_string(),
            total_items,
            lane_count,
            lane_batch,
            lanes: Vec::new(),
        }
    }

    /// Assigns `[start, start + count)` to `lane_index`. Empty ranges are skipped.
    pub fn add_lane(&mut self, lane_index: usize, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.lanes.push(LaneAssignment {
            lane_index,
            start_offset: start,
            item_count: count,
            batches: batch_range(start, count, self.lane_batch),
        });
    }

    /// Consumes the builder and returns the finished plan.
    pub fn build(self) -> BatchPlan {
        BatchPlan {
            strategy_name: self.strategy_name,
            total_items: self.total_items,
            lane_count: self.lane_count,
            lane_batch: self.lane_batch,
            lanes: self.lanes,
        }
    }
}
