// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # batch-planner
//!
//! Splits a dataset of `N` items into fixed-size accelerator batches,
//! spread over one or more execution lanes.
//!
//! # Strategies
//!
//! | Strategy | Lanes | Batch rows | Remainder |
//! |---|---|---|---|
//! | [`SingleLane`] | 1 | execution batch size | one padded batch |
//! | [`MultiLane`] | `ceil(batch / native)` | native lane batch | last lane absorbs it |
//!
//! Every plan covers `[0, N)` exactly once, in order, and every batch is
//! submitted at exactly the lane batch size (zero-padded when short).
//!
//! # Example
//! ```
//! use batch_planner::plan;
//!
//! let p = plan(10, 4, 1, 4).unwrap();
//! assert_eq!(p.total_batches(), 3);
//! assert_eq!(p.total_padding(), 2);
//! ```

mod error;
pub(crate) mod plan;
pub mod strategy;

pub use error::PlannerError;
pub use plan::{BatchPlan, BatchSlice, LaneAssignment};
pub use strategy::multi_lane::MultiLane;
pub use strategy::single_lane::SingleLane;
pub use strategy::BatchStrategy;

/// Number of lanes needed to serve `exec_batch_size` rows with lanes that
/// each execute `native_lane_batch` rows: `ceil(exec / native)`.
pub fn required_lanes(
    exec_batch_size: usize,
    native_lane_batch: usize,
) -> Result<usize, PlannerError> {
    if exec_batch_size == 0 {
        return Err(PlannerError::ZeroBatchSize {
            what: "execution batch size",
        });
    }
    if native_lane_batch == 0 {
        return Err(PlannerError::ZeroBatchSize {
            what: "native lane batch",
        });
    }
    Ok(exec_batch_size.div_ceil(native_lane_batch))
}

/// Plans `total_items` over `lane_count` lanes.
///
/// With a single lane the dataset is cut into batches of
/// `exec_batch_size`; with several lanes each lane runs batches of
/// `native_lane_batch` and the last lane absorbs the remainder.
pub fn plan(
    total_items: usize,
    exec_batch_size: usize,
    lane_count: usize,
    native_lane_batch: usize,
) -> Result<BatchPlan, PlannerError> {
    let plan = if lane_count == 1 {
        SingleLane::new(exec_batch_size)?.plan(total_items)?
    } else {
        MultiLane::new(lane_count, native_lane_batch)?.plan(total_items)?
    };

    tracing::debug!("{}", plan.summary());
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_lanes() {
        assert_eq!(required_lanes(4, 4).unwrap(), 1);
        assert_eq!(required_lanes(3, 1).unwrap(), 3);
        assert_eq!(required_lanes(10, 4).unwrap(), 3);
        assert_eq!(required_lanes(1, 8).unwrap(), 1);
        assert!(required_lanes(0, 4).is_err());
        assert!(required_lanes(4, 0).is_err());
    }

    #[test]
    fn test_plan_dispatches_on_lane_count() {
        assert_eq!(plan(10, 4, 1, 4).unwrap().strategy_name, "single-lane");
        assert_eq!(plan(10, 3, 3, 1).unwrap().strategy_name, "multi-lane");
    }

    #[test]
    fn test_single_lane_ignores_native_batch() {
        let p = plan(10, 4, 1, 1).unwrap();
        assert_eq!(p.lane_batch, 4);
        assert_eq!(p.total_batches(), 3);
    }

    #[test]
    fn test_coverage_is_exact_for_all_shapes() {
        for lanes in 1..=5 {
            for native in 1..=6 {
                for total in 0..=40 {
                    let p = plan(total, native, lanes, native).unwrap();
                    p.validate().unwrap();

                    let mut covered = vec![0u32; total];
                    for b in p.iter_batches() {
                        assert_eq!(b.padded_rows, native);
                        for slot in &mut covered[b.offset..b.end()] {
                            *slot += 1;
                        }
                    }
                    assert!(
                        covered.iter().all(|&c| c == 1),
                        "lanes={lanes} native={native} total={total}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_zero_items_produce_no_batches() {
        assert!(plan(0, 4, 1, 4).unwrap().is_empty());
        assert!(plan(0, 4, 4, 1).unwrap().is_empty());
    }
}
