// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Best-effort export of benchmark figures to an external store.
//!
//! Each inference is exported as a handful of `AIF:<instance_uid>:<metric>`
//! series points. Export failures never fail the request: the recorder logs
//! them and moves on.

use std::sync::{Arc, Mutex};

use crate::{BenchmarkMetrics, MetricsError};

/// A destination for per-inference series points.
pub trait MetricsSink: Send {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Exports one inference's figures under `instance_uid`.
    fn export(&mut self, instance_uid: &str, metrics: &BenchmarkMetrics)
        -> Result<(), MetricsError>;
}

/// Expands `metrics` into `(key, value)` points keyed `AIF:<uid>:<metric>`.
pub fn series(instance_uid: &str, metrics: &BenchmarkMetrics) -> Vec<(String, f64)> {
    let key = format!("AIF:{instance_uid}");
    vec![
        (format!("{key}:processing_latency"), metrics.processing_latency_ms),
        (format!("{key}:data_preparation_latency"), metrics.data_prep_latency_ms),
        (format!("{key}:execution_latency"), metrics.execution_latency_ms),
        (format!("{key}:throughput"), metrics.throughput),
        (format!("{key}:dataset_size"), metrics.dataset_size as f64),
        (format!("{key}:batch_size"), metrics.batch_size as f64),
    ]
}

/// Emits every series point as a structured `tracing` event on the
/// `aif::metrics` target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl MetricsSink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn export(
        &mut self,
        instance_uid: &str,
        metrics: &BenchmarkMetrics,
    ) -> Result<(), MetricsError> {
        for (key, value) in series(instance_uid, metrics) {
            tracing::info!(target: "aif::metrics", key = %key, value, "metric");
        }
        Ok(())
    }
}

/// Discards everything. Used when metric export is disabled.
#[derive(Debug, Default)]
pub struct NullSink;

impl MetricsSink for NullSink {
    fn name(&self) -> &str {
        "null"
    }

    fn export(&mut self, _: &str, _: &BenchmarkMetrics) -> Result<(), MetricsError> {
        Ok(())
    }
}

/// Collects series points in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    points: Arc<Mutex<Vec<(String, f64)>>>,
}

impl MemorySink {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything exported so far.
    pub fn points(&self) -> Vec<(String, f64)> {
        match self.points.lock() {
            Ok(points) => points.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn export(
        &mut self,
        instance_uid: &str,
        metrics: &BenchmarkMetrics,
    ) -> Result<(), MetricsError> {
        let mut points = self.points.lock().map_err(|_| MetricsError::Sink {
            sink: "memory".to_string(),
            detail: "buffer lock poisoned".to_string(),
        })?;
        points.extend(series(instance_uid, metrics));
        Ok(())
    }
}
