// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `aif plan` command: show how a request is spread over lanes.

use runtime::ServerConfig;

pub fn execute(
    config: ServerConfig,
    items: usize,
    batch_size: Option<usize>,
    native_batch: usize,
    lanes: Option<usize>,
) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(config.batch_size);
    let lanes = match lanes {
        Some(lanes) => lanes,
        None => batch_planner::required_lanes(batch_size, native_batch)?,
    };
    let plan = batch_planner::plan(items, batch_size, lanes, native_batch)?;

    println!("{}", plan.summary());
    println!();
    println!(
        "  {:<6} {:>8} {:>8} {:>8} {:>8}",
        "Lane", "Start", "Items", "Batches", "Padding"
    );
    println!("  {}", "-".repeat(42));
    for lane in &plan.lanes {
        let padding: usize = lane.batches.iter().map(|b| b.padding()).sum();
        println!(
            "  {:<6} {:>8} {:>8} {:>8} {:>8}",
            lane.lane_index,
            lane.start_offset,
            lane.item_count,
            lane.num_batches(),
            padding,
        );
    }
    Ok(())
}
