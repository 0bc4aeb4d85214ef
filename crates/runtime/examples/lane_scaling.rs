// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Compare one wide lane against several narrow lanes.
//!
//! Serves the same request through engines with 1, 2 and 4 synthetic lanes
//! of a fixed native batch and prints the recorded benchmark figures.
//!
//! ```bash
//! cargo run -p runtime --example lane_scaling
//! ```

use std::time::Duration;

use accelerator::SyntheticAccelerator;
use metrics::{MetricsQuery, SnapshotEntry};
use runtime::{ExecutionMode, InferenceEngine, ServerConfig, VectorWorkload};
use tensor_core::Shape;

const NATIVE_BATCH: usize = 4;
const ITEMS: usize = 64;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let rows = vec![vec![1.0f32; 8]; ITEMS];
    let raw = serde_json::to_vec(&serde_json::json!({ "items": rows }))?;

    println!("{ITEMS} items, native lane batch {NATIVE_BATCH}, 1 ms per accelerator call\n");
    println!("{:<8} {:>14} {:>14} {:>12}", "lanes", "exec (ms/item)", "full (ms/item)", "items/s");

    for lanes in [1usize, 2, 4] {
        let config = ServerConfig {
            mode: ExecutionMode::Throughput,
            batch_size: NATIVE_BATCH * lanes,
            ..Default::default()
        };
        let adapters = (0..lanes)
            .map(|_| {
                SyntheticAccelerator::new(NATIVE_BATCH, Shape::vector(8), 2)
                    .with_delay(Duration::from_millis(1))
            })
            .collect();

        let mut engine = InferenceEngine::new(config, VectorWorkload::new(), adapters)?
            .initialise()?
            .warm_up()?;
        engine.process(&raw)?;

        for entry in engine.metrics_snapshot(&MetricsQuery::last(1))? {
            if let SnapshotEntry::Metric(m) = entry {
                println!(
                    "{:<8} {:>14.4} {:>14.4} {:>12.1}",
                    lanes, m.execution_latency, m.processing_latency, m.throughput
                );
            }
        }
    }

    Ok(())
}
