// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # metrics
//!
//! Per-request timing and benchmark bookkeeping for the inference engine.
//!
//! - [`StageTimer`] / [`StageTimings`]: wall-clock duration of each named
//!   pipeline stage.
//! - [`BenchmarkMetrics`]: per-item latency and throughput derived from
//!   the `experiment` and `full_inference` stages.
//! - [`BoundedHistory`]: FIFO keeping the last N metric entries.
//! - [`MetricsRecorder`]: ties it together: computes figures, exports them
//!   through a [`MetricsSink`], stores a [`MetricEntry`] and serves
//!   snapshots closed by the one-off [`InitEntry`].

mod benchmark;
mod entry;
mod error;
mod history;
mod recorder;
mod sink;
mod timer;

pub use benchmark::BenchmarkMetrics;
pub use entry::{
    Identity, InitEntry, MetricEntry, MetricsQuery, SnapshotEntry, DEFAULT_NODE_NAME,
};
pub use error::MetricsError;
pub use history::BoundedHistory;
pub use recorder::MetricsRecorder;
pub use sink::{series, MemorySink, MetricsSink, NullSink, TracingSink};
pub use timer::{Stage, StageTimer, StageTimings};
