// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-request benchmark figures derived from stage timings.

use crate::{MetricsError, Stage, StageTimings};

/// Benchmark figures for one inference request.
///
/// Latencies are per item, in milliseconds:
/// - `execution_latency_ms = experiment / n`
/// - `processing_latency_ms = full_inference / n`
/// - `data_prep_latency_ms = processing - execution`
///
/// Throughput is `n / full_inference` in items per second.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BenchmarkMetrics {
    pub execution_latency_ms: f64,
    pub data_prep_latency_ms: f64,
    pub processing_latency_ms: f64,
    pub throughput: f64,
    pub dataset_size: usize,
    pub batch_size: usize,
}

impl BenchmarkMetrics {
    /// Derives the figures for `dataset_size` items from `timings`.
    ///
    /// A request with zero items yields all-zero figures.
    pub fn compute(
        timings: &StageTimings,
        dataset_size: usize,
        batch_size: usize,
    ) -> Result<Self, MetricsError> {
        let experiment = timings
            .get(Stage::Experiment)
            .ok_or(MetricsError::MissingStage {
                stage: Stage::Experiment.as_str(),
            })?
            .as_secs_f64();
        let full = timings
            .get(Stage::FullInference)
            .ok_or(MetricsError::MissingStage {
                stage: Stage::FullInference.as_str(),
            })?
            .as_secs_f64();

        if dataset_size == 0 {
            return Ok(Self {
                execution_latency_ms: 0.0,
                data_prep_latency_ms: 0.0,
                processing_latency_ms: 0.0,
                throughput: 0.0,
                dataset_size,
                batch_size,
            });
        }

        let n = dataset_size as f64;
        let execution = experiment / n * 1000.0;
        let processing = full / n * 1000.0;
        let throughput = if full > 0.0 { n / full } else { 0.0 };

        Ok(Self {
            execution_latency_ms: execution,
            data_prep_latency_ms: processing - execution,
            processing_latency_ms: processing,
            throughput,
            dataset_size,
            batch_size,
        })
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Processing latency (data preparation + execution): {:.2} ms ({:.2} + {:.2}), \
             throughput (batch size): {:.2} fps ({})",
            self.processing_latency_ms,
            self.data_prep_latency_ms,
            self.execution_latency_ms,
            self.throughput,
            self.batch_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn timings(experiment_ms: u64, full_ms: u64) -> StageTimings {
        let mut t = StageTimings::default();
        t.record(Stage::Experiment, Duration::from_millis(experiment_ms));
        t.record(Stage::FullInference, Duration::from_millis(full_ms));
        t
    }

    #[test]
    fn test_compute() {
        let m = BenchmarkMetrics::compute(&timings(400, 1000), 10, 4).unwrap();
        assert!((m.execution_latency_ms - 40.0).abs() < 1e-9);
        assert!((m.processing_latency_ms - 100.0).abs() < 1e-9);
        assert!((m.data_prep_latency_ms - 60.0).abs() < 1e-9);
        assert!((m.throughput - 10.0).abs() < 1e-9);
        assert_eq!(m.dataset_size, 10);
        assert_eq!(m.batch_size, 4);
    }

    #[test]
    fn test_zero_items() {
        let m = BenchmarkMetrics::compute(&timings(0, 5), 0, 4).unwrap();
        assert_eq!(m.throughput, 0.0);
        assert_eq!(m.processing_latency_ms, 0.0);
    }

    #[test]
    fn test_missing_stage() {
        let mut t = StageTimings::default();
        t.record(Stage::FullInference, Duration::from_millis(1));
        assert!(matches!(
            BenchmarkMetrics::compute(&t, 1, 1),
            Err(MetricsError::MissingStage { stage: "experiment" })
        ));
    }

    #[test]
    fn test_summary() {
        let m = BenchmarkMetrics::compute(&timings(1, 2), 1, 1).unwrap();
        assert!(m.summary().contains("fps (1)"));
    }
}
