// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Executes a [`BatchPlan`] across lanes and reassembles the output.
//!
//! The output tensor is allocated up front at `[total_items, ..item_out]`
//! and split into disjoint row ranges, one per lane assignment. Each lane
//! writes only its own range, so row order never depends on which lane
//! finishes first.
//!
//! Lanes run on scoped threads that are all joined before this returns.
//! The first lane error raises a shared abort flag; the remaining lanes
//! stop before their next batch and the whole request fails.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};

use accelerator::{AcceleratorAdapter, LaneRunner};
use batch_planner::{BatchPlan, LaneAssignment};
use tensor_core::{Shape, Tensor};

use crate::RuntimeError;

type LaneJob<'a, A> = (&'a mut LaneRunner<A>, &'a LaneAssignment, &'a mut [f32]);

/// Runs `plan` over `lanes`, reading rows from `input`.
///
/// `lanes[i]` executes the assignment with `lane_index == i`. A plan with a
/// single active lane runs on the calling thread.
pub fn run_plan<A: AcceleratorAdapter>(
    lanes: &mut [LaneRunner<A>],
    plan: &BatchPlan,
    input: &Tensor,
    output_item: &Shape,
) -> Result<Tensor, RuntimeError> {
    let row_len = output_item.num_elements();
    let mut output = Tensor::zeros(Shape::batched(output_item, plan.total_items));
    if plan.is_empty() {
        return Ok(output);
    }
    if input.rows() != plan.total_items {
        return Err(RuntimeError::Internal(format!(
            "plan covers {} items, input has {} rows",
            plan.total_items,
            input.rows()
        )));
    }

    let abort = AtomicBool::new(false);
    let results: Vec<Result<(), RuntimeError>> = {
        let mut jobs = pair_jobs(lanes, plan, output.as_mut_slice(), row_len)?;

        if jobs.len() == 1 {
            let (lane, assignment, out) = jobs.remove(0);
            vec![run_lane(lane, assignment, input, out, row_len, &abort)]
        } else {
            std::thread::scope(|s| {
                let handles: Vec<_> = jobs
                    .into_iter()
                    .map(|(lane, assignment, out)| {
                        let abort = &abort;
                        let index = assignment.lane_index;
                        let handle =
                            s.spawn(move || run_lane(lane, assignment, input, out, row_len, abort));
                        (index, handle)
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|(index, handle)| {
                        handle.join().unwrap_or_else(|payload| {
                            Err(RuntimeError::Internal(format!(
                                "lane {index} panicked: {}",
                                panic_message(payload.as_ref())
                            )))
                        })
                    })
                    .collect()
            })
        }
    };

    for result in results {
        result?;
    }
    Ok(output)
}

/// Pairs each assignment with its lane and its slice of the output buffer.
fn pair_jobs<'a, A>(
    lanes: &'a mut [LaneRunner<A>],
    plan: &'a BatchPlan,
    mut out: &'a mut [f32],
    row_len: usize,
) -> Result<Vec<LaneJob<'a, A>>, RuntimeError> {
    let mut jobs = Vec::with_capacity(plan.lanes.len());
    let mut available = lanes.iter_mut().enumerate();

    for assignment in &plan.lanes {
        let lane = available
            .by_ref()
            .find_map(|(i, lane)| (i == assignment.lane_index).then_some(lane))
            .ok_or_else(|| {
                RuntimeError::Internal(format!(
                    "plan assigns lane {} but no such lane is available",
                    assignment.lane_index
                ))
            })?;

        let len = assignment.item_count * row_len;
        if out.len() < len {
            return Err(RuntimeError::Internal(format!(
                "output buffer too short for lane {}",
                assignment.lane_index
            )));
        }
        let (head, tail) = std::mem::take(&mut out).split_at_mut(len);
        jobs.push((lane, assignment, head));
        out = tail;
    }
    Ok(jobs)
}

fn run_lane<A: AcceleratorAdapter>(
    lane: &mut LaneRunner<A>,
    assignment: &LaneAssignment,
    input: &Tensor,
    out: &mut [f32],
    row_len: usize,
    abort: &AtomicBool,
) -> Result<(), RuntimeError> {
    tracing::debug!(
        lane = assignment.lane_index,
        start = assignment.start_offset,
        items = assignment.item_count,
        batches = assignment.num_batches(),
        "lane start",
    );

    for batch in &assignment.batches {
        if abort.load(Ordering::Acquire) {
            tracing::debug!(lane = assignment.lane_index, "lane aborted");
            return Ok(());
        }

        let rows = match lane.run_rows(input, batch.offset, batch.valid_rows) {
            Ok(rows) => rows,
            Err(source) => {
                abort.store(true, Ordering::Release);
                return Err(RuntimeError::LaneFailure {
                    lane: assignment.lane_index,
                    source,
                });
            }
        };

        let start = (batch.offset - assignment.start_offset) * row_len;
        let src = rows.as_slice();
        let dst = out.get_mut(start..start + src.len()).ok_or_else(|| {
            RuntimeError::Internal(format!(
                "lane {} wrote past its output range",
                assignment.lane_index
            ))
        })?;
        dst.copy_from_slice(src);
    }
    Ok(())
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accelerator::SyntheticAccelerator;
    use std::path::Path;
    use std::time::Duration;

    fn lanes(adapters: Vec<SyntheticAccelerator>) -> Vec<LaneRunner<SyntheticAccelerator>> {
        adapters
            .into_iter()
            .enumerate()
            .map(|(i, a)| LaneRunner::initialise(i, a, Path::new("model")).unwrap())
            .collect()
    }

    fn dataset(n: usize) -> Tensor {
        let data = (0..n).flat_map(|i| [i as f32, 0.0]).collect();
        Tensor::from_vec(Shape::matrix(n, 2), data).unwrap()
    }

    fn synthetic(native: usize) -> SyntheticAccelerator {
        SyntheticAccelerator::new(native, Shape::vector(2), 2)
    }

    fn assert_rows_in_order(out: &Tensor, n: usize) {
        assert_eq!(out.rows(), n);
        for i in 0..n {
            assert_eq!(out.row(i).unwrap(), &[i as f32, i as f32 + 1.0], "row {i}");
        }
    }

    #[test]
    fn test_single_lane_with_remainder() {
        let mut lanes = lanes(vec![synthetic(4)]);
        let plan = batch_planner::plan(10, 4, 1, 4).unwrap();
        let out = run_plan(&mut lanes, &plan, &dataset(10), &Shape::vector(2)).unwrap();
        assert_rows_in_order(&out, 10);
        assert_eq!(lanes[0].adapter().calls(), 3);
    }

    #[test]
    fn test_order_independent_of_completion() {
        // Lane 0 is the slowest, so it finishes last.
        let mut lanes = lanes(vec![
            synthetic(1).with_delay(Duration::from_millis(30)),
            synthetic(1).with_delay(Duration::from_millis(5)),
            synthetic(1),
        ]);
        let plan = batch_planner::plan(10, 3, 3, 1).unwrap();
        let out = run_plan(&mut lanes, &plan, &dataset(10), &Shape::vector(2)).unwrap();
        assert_rows_in_order(&out, 10);

        let calls: Vec<usize> = lanes.iter().map(|l| l.adapter().calls()).collect();
        assert_eq!(calls, vec![3, 3, 4]);
    }

    #[test]
    fn test_empty_plan() {
        let mut lanes = lanes(vec![synthetic(2)]);
        let plan = batch_planner::plan(0, 2, 1, 2).unwrap();
        let out = run_plan(&mut lanes, &plan, &dataset(0), &Shape::vector(2)).unwrap();
        assert_eq!(out.rows(), 0);
        assert_eq!(lanes[0].adapter().calls(), 0);
    }

    #[test]
    fn test_lane_failure_fails_request() {
        let mut lanes = lanes(vec![synthetic(1), synthetic(1).with_failure_after(1), synthetic(1)]);
        let plan = batch_planner::plan(9, 3, 3, 1).unwrap();
        let err = run_plan(&mut lanes, &plan, &dataset(9), &Shape::vector(2)).unwrap_err();
        assert!(matches!(err, RuntimeError::LaneFailure { lane: 1, .. }));
    }

    #[test]
    fn test_failure_aborts_other_lanes() {
        let mut lanes = lanes(vec![
            synthetic(1).with_failure_after(0),
            synthetic(1).with_delay(Duration::from_millis(20)),
        ]);
        // 20 items over 2 lanes of 1 row: 10 batches each.
        let plan = batch_planner::plan(20, 2, 2, 1).unwrap();
        let err = run_plan(&mut lanes, &plan, &dataset(20), &Shape::vector(2)).unwrap_err();
        assert!(matches!(err, RuntimeError::LaneFailure { lane: 0, .. }));
        assert!(lanes[1].adapter().calls() < 10);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
