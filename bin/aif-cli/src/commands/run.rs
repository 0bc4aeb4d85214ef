// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `aif run` command: serve concurrent synthetic requests.
//!
//! Demonstrates the full lifecycle:
//! ```text
//! InferenceEngine<Idle> → initialise → <Initialised> → warm_up → <Ready>
//!     → Scheduler::spawn → N concurrent submits → metrics snapshot
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use accelerator::SyntheticAccelerator;
use metrics::MetricsQuery;
use runtime::{ExecutionMode, InferenceEngine, Scheduler, ServerConfig, VectorWorkload};
use tensor_core::Shape;

pub struct RunOptions {
    pub requests: usize,
    pub items: usize,
    pub mode: Option<String>,
    pub batch_size: Option<usize>,
    pub native_batch: usize,
    pub width: usize,
    pub delay_ms: u64,
    pub top_k: Option<usize>,
}

pub async fn execute(mut config: ServerConfig, options: RunOptions) -> anyhow::Result<()> {
    if let Some(mode) = &options.mode {
        config.mode = mode.parse()?;
    }
    if let Some(batch_size) = options.batch_size {
        config.batch_size = batch_size;
    }
    config.validate()?;

    // ── Lanes ──────────────────────────────────────────────────
    let lane_count = match config.mode {
        ExecutionMode::Latency => 1,
        ExecutionMode::Throughput => {
            batch_planner::required_lanes(config.batch_size, options.native_batch)?
        }
    };
    let adapters: Vec<SyntheticAccelerator> = (0..lane_count)
        .map(|i| {
            SyntheticAccelerator::new(options.native_batch, Shape::vector(options.width), 4)
                .with_name(format!("synthetic-{i}"))
                .with_delay(Duration::from_millis(options.delay_ms))
        })
        .collect();

    println!("  Mode:         {}", config.mode);
    println!("  Model:        {}", config.model_path.display());
    println!("  Batch size:   {}", config.batch_size);
    println!("  Lanes:        {lane_count} x native batch {}", options.native_batch);
    println!();

    // ── Type-State Pipeline ────────────────────────────────────
    let workload = match options.top_k {
        Some(k) => VectorWorkload::classification(k),
        None => VectorWorkload::new(),
    };
    let timeout = config.request_timeout();
    let engine = InferenceEngine::new(config.clone(), workload, adapters)?
        .initialise()?
        .warm_up()?;
    let scheduler = Arc::new(Scheduler::spawn(engine, timeout)?);

    // ── Requests ───────────────────────────────────────────────
    let items = match config.mode {
        ExecutionMode::Latency => 1,
        ExecutionMode::Throughput => options.items,
    };
    let start = Instant::now();
    let mut tasks = Vec::with_capacity(options.requests);
    for r in 0..options.requests {
        let scheduler = Arc::clone(&scheduler);
        let rows: Vec<Vec<f32>> = (0..items)
            .map(|i| vec![(r * items + i) as f32; options.width])
            .collect();
        let raw = serde_json::to_vec(&serde_json::json!({ "items": rows }))?;
        tasks.push(tokio::spawn(async move { scheduler.infer(raw).await }));
    }

    let mut failed = 0usize;
    for task in tasks {
        match task.await? {
            Ok(response) => {
                if let Err(e) = response.outcome {
                    tracing::warn!("request {} failed: {e}", response.id);
                    failed += 1;
                }
            }
            Err(e) => {
                tracing::warn!("{e}");
                failed += 1;
            }
        }
    }
    let elapsed = start.elapsed();

    println!(
        "  {} request(s) in {:.2} ms, {failed} failed",
        options.requests,
        elapsed.as_secs_f64() * 1000.0
    );
    println!();

    // ── Metrics Snapshot ───────────────────────────────────────
    let snapshot = scheduler
        .metrics(MetricsQuery::all())
        .await?
        .into_metrics()?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(())
}
