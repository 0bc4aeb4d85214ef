// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end request serving.
//!
//! These tests drive a ready engine through the scheduler exactly the way a
//! transport layer would, proving that the workload, planner, lanes and
//! metrics compose correctly under concurrent producers.

use std::sync::Arc;
use std::time::Duration;

use accelerator::{CallProbe, SyntheticAccelerator};
use metrics::{MetricsQuery, SnapshotEntry};
use runtime::{
    ExecutionMode, InferenceEngine, RuntimeError, Scheduler, SchedulerError, ServerConfig,
    VectorResponse, VectorWorkload, Workload, WorkloadError,
};
use tensor_core::{Shape, Tensor};

// ── Helpers ────────────────────────────────────────────────────

fn config(mode: ExecutionMode, batch_size: usize) -> ServerConfig {
    ServerConfig {
        mode,
        batch_size,
        ..Default::default()
    }
}

fn lanes(count: usize, native: usize) -> Vec<SyntheticAccelerator> {
    (0..count)
        .map(|i| SyntheticAccelerator::new(native, Shape::vector(2), 2).with_name(format!("synthetic-{i}")))
        .collect()
}

fn start<W: Workload + 'static>(
    config: ServerConfig,
    workload: W,
    adapters: Vec<SyntheticAccelerator>,
) -> Scheduler {
    let timeout = config.request_timeout();
    let engine = InferenceEngine::new(config, workload, adapters)
        .unwrap()
        .initialise()
        .unwrap()
        .warm_up()
        .unwrap();
    Scheduler::spawn(engine, timeout).unwrap()
}

/// Items whose first feature encodes their index.
fn items(n: usize, tag: f32) -> Vec<u8> {
    let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, tag]).collect();
    serde_json::to_vec(&serde_json::json!({ "items": rows })).unwrap()
}

fn outputs(bytes: &[u8]) -> Vec<Vec<f32>> {
    match serde_json::from_slice::<VectorResponse>(bytes).unwrap() {
        VectorResponse::Outputs(rows) => rows,
        other => panic!("expected outputs, got {other:?}"),
    }
}

async fn history_len(scheduler: &Scheduler) -> usize {
    let entries = scheduler
        .metrics(MetricsQuery::all())
        .await
        .unwrap()
        .into_metrics()
        .unwrap();
    entries
        .iter()
        .filter(|e| matches!(e, SnapshotEntry::Metric(_)))
        .count()
}

// ── Throughput Mode ────────────────────────────────────────────

#[tokio::test]
async fn test_single_lane_with_padding() {
    let scheduler = start(config(ExecutionMode::Throughput, 4), VectorWorkload::new(), lanes(1, 4));

    let out = outputs(&scheduler.infer(items(10, 1.0)).await.unwrap().into_inference().unwrap());
    assert_eq!(out.len(), 10);
    for (i, row) in out.iter().enumerate() {
        assert_eq!(row, &vec![i as f32 + 1.0, i as f32 + 2.0]);
    }
}

#[tokio::test]
async fn test_multi_lane_preserves_item_order() {
    let probe = CallProbe::new();
    // Lane 0 is the slowest so lanes finish out of order.
    let adapters = (0..3)
        .map(|i| {
            SyntheticAccelerator::new(1, Shape::vector(2), 2)
                .with_delay(Duration::from_millis(15 - 5 * i as u64))
                .with_probe(probe.clone())
        })
        .collect();
    let scheduler = start(config(ExecutionMode::Throughput, 3), VectorWorkload::new(), adapters);

    let out = outputs(&scheduler.infer(items(10, 0.0)).await.unwrap().into_inference().unwrap());
    let firsts: Vec<f32> = out.iter().map(|row| row[0]).collect();
    assert_eq!(firsts, (0..10).map(|i| i as f32).collect::<Vec<_>>());
    assert_eq!(probe.calls(), 10);
    assert!(probe.max_active() >= 2, "lanes did not overlap");
}

#[tokio::test]
async fn test_concurrent_throughput_requests_never_share_lanes() {
    let calls = CallProbe::new();
    let adapters = (0..3)
        .map(|i| {
            SyntheticAccelerator::new(1, Shape::vector(2), 2)
                .with_name(format!("synthetic-{i}"))
                .with_delay(Duration::from_millis(2))
                .with_probe(calls.clone())
        })
        .collect();
    let scheduler = Arc::new(start(config(ExecutionMode::Throughput, 3), VectorWorkload::new(), adapters));

    // Every item of request r carries marker r + 1 in its first feature.
    let mut tasks = Vec::new();
    for r in 0..6 {
        let scheduler = Arc::clone(&scheduler);
        tasks.push(tokio::spawn(async move {
            let marker = (r + 1) as f32;
            let rows = vec![vec![marker, 0.0]; 6];
            let raw = serde_json::to_vec(&serde_json::json!({ "items": rows })).unwrap();
            let out = outputs(&scheduler.infer(raw).await.unwrap().into_inference().unwrap());
            assert!(out.iter().all(|row| row == &vec![marker, marker + 1.0]));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let windows = calls.windows();
    assert_eq!(windows.len(), 36);
    for a in &windows {
        for b in &windows {
            if a.marker != b.marker {
                assert!(
                    !a.overlaps(b),
                    "request {} overlapped request {} on the lanes",
                    a.marker,
                    b.marker
                );
            }
        }
    }
}

#[tokio::test]
async fn test_classification_workload() {
    let scheduler = start(
        config(ExecutionMode::Throughput, 2),
        VectorWorkload::classification(1),
        lanes(1, 2),
    );
    let bytes = scheduler.infer(items(3, 0.0)).await.unwrap().into_inference().unwrap();
    let VectorResponse::Predictions(predictions) = serde_json::from_slice(&bytes).unwrap() else {
        panic!("expected predictions");
    };
    assert_eq!(predictions.len(), 3);
    // Output k is row_sum + k, so the last class always wins.
    assert!(predictions.iter().all(|p| p.len() == 1 && p[0].index == 1));
}

// ── Latency Mode ───────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_latency_requests_are_serialized() {
    let probe = CallProbe::new();
    let adapter = SyntheticAccelerator::new(1, Shape::vector(2), 2)
        .with_delay(Duration::from_millis(2))
        .with_probe(probe.clone());
    let scheduler = Arc::new(start(config(ExecutionMode::Latency, 1), VectorWorkload::new(), vec![adapter]));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let scheduler = Arc::clone(&scheduler);
        tasks.push(tokio::spawn(async move {
            let tag = i as f32 * 10.0;
            let out = outputs(&scheduler.infer(items(1, tag)).await.unwrap().into_inference().unwrap());
            assert_eq!(out, vec![vec![tag, tag + 1.0]]);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(probe.calls(), 16);
    assert_eq!(probe.max_active(), 1);
    assert_eq!(history_len(&scheduler).await, 16);
}

#[tokio::test]
async fn test_latency_precondition_then_recovery() {
    let scheduler = start(config(ExecutionMode::Latency, 1), VectorWorkload::new(), lanes(1, 1));

    let err = scheduler.infer(items(2, 0.0)).await.unwrap().into_inference().unwrap_err();
    assert!(matches!(err, RuntimeError::Precondition(_)));
    assert_eq!(err.status_code(), 400);

    assert!(scheduler.infer(items(1, 0.0)).await.unwrap().outcome.is_ok());
    assert_eq!(history_len(&scheduler).await, 1);
}

// ── Failure Handling ───────────────────────────────────────────

#[tokio::test]
async fn test_lane_failure_drops_request() {
    let mut adapters = lanes(3, 1);
    adapters[1] = SyntheticAccelerator::new(1, Shape::vector(2), 2).with_failure_after(1);
    let scheduler = start(config(ExecutionMode::Throughput, 3), VectorWorkload::new(), adapters);

    let err = scheduler.infer(items(9, 0.0)).await.unwrap().into_inference().unwrap_err();
    assert!(matches!(err, RuntimeError::LaneFailure { lane: 1, .. }));
    assert_eq!(err.status_code(), 502);
    assert_eq!(history_len(&scheduler).await, 0);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let scheduler = start(config(ExecutionMode::Throughput, 1), VectorWorkload::new(), lanes(1, 1));
    let err = scheduler.infer(b"not json".to_vec()).await.unwrap().into_inference().unwrap_err();
    assert!(matches!(err, RuntimeError::Workload(WorkloadError::Decode(_))));
    assert_eq!(err.status_code(), 400);
}

/// Panics in postprocess once, then behaves like [`VectorWorkload`].
struct FlakyWorkload {
    inner: VectorWorkload,
    panicked: bool,
}

impl Workload for FlakyWorkload {
    type Decoded = Vec<Vec<f32>>;
    type Output = VectorResponse;

    fn name(&self) -> &str {
        "flaky"
    }

    fn decode(&mut self, raw: &[u8]) -> Result<(Self::Decoded, usize), WorkloadError> {
        self.inner.decode(raw)
    }

    fn preprocess(&mut self, decoded: Self::Decoded, item: &Shape) -> Result<Tensor, WorkloadError> {
        self.inner.preprocess(decoded, item)
    }

    fn postprocess(&mut self, output: Tensor) -> Result<Self::Output, WorkloadError> {
        if !self.panicked {
            self.panicked = true;
            panic!("postprocess blew up");
        }
        self.inner.postprocess(output)
    }

    fn encode(&mut self, output: Self::Output) -> Result<Vec<u8>, WorkloadError> {
        self.inner.encode(output)
    }
}

#[tokio::test]
async fn test_workload_panic_is_contained() {
    let workload = FlakyWorkload {
        inner: VectorWorkload::new(),
        panicked: false,
    };
    let scheduler = start(config(ExecutionMode::Throughput, 1), workload, lanes(1, 1));

    let err = scheduler.infer(items(1, 0.0)).await.unwrap().into_inference().unwrap_err();
    assert!(matches!(err, RuntimeError::Internal(_)));
    assert_eq!(err.status_code(), 500);

    assert!(scheduler.infer(items(1, 0.0)).await.unwrap().outcome.is_ok());
}

#[tokio::test]
async fn test_request_timeout() {
    let adapter = SyntheticAccelerator::new(1, Shape::vector(2), 2).with_delay(Duration::from_millis(200));
    let config = ServerConfig {
        request_timeout_ms: 20,
        ..config(ExecutionMode::Throughput, 1)
    };
    let scheduler = start(config, VectorWorkload::new(), vec![adapter]);

    let err = scheduler.infer(items(1, 0.0)).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Timeout { .. }));
}

#[test]
fn test_too_few_adapters() {
    let err = InferenceEngine::new(config(ExecutionMode::Throughput, 4), VectorWorkload::new(), lanes(2, 1))
        .unwrap()
        .initialise()
        .unwrap_err();
    assert!(matches!(err, RuntimeError::ConfigError(_)));
}

// ── Metrics Queries ────────────────────────────────────────────

#[tokio::test]
async fn test_metrics_snapshot_window() {
    let scheduler = start(config(ExecutionMode::Throughput, 2), VectorWorkload::new(), lanes(1, 2));
    for n in 1..=5 {
        scheduler.infer(items(n, 0.0)).await.unwrap().into_inference().unwrap();
    }

    let entries = scheduler
        .metrics(MetricsQuery::last(2))
        .await
        .unwrap()
        .into_metrics()
        .unwrap();
    assert_eq!(entries.len(), 3);
    let sizes: Vec<usize> = entries
        .iter()
        .filter_map(|e| match e {
            SnapshotEntry::Metric(m) => Some(m.dataset_size),
            SnapshotEntry::Init(_) => None,
        })
        .collect();
    assert_eq!(sizes, vec![4, 5]);
    assert!(matches!(entries.last(), Some(SnapshotEntry::Init(init)) if init.warm_up.is_some()));
}

#[tokio::test]
async fn test_metrics_invalid_count() {
    let scheduler = start(config(ExecutionMode::Throughput, 1), VectorWorkload::new(), lanes(1, 1));
    let err = scheduler
        .metrics(MetricsQuery::last(-3))
        .await
        .unwrap()
        .into_metrics()
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let config = ServerConfig {
        metrics_history_size: 3,
        ..config(ExecutionMode::Throughput, 1)
    };
    let scheduler = start(config, VectorWorkload::new(), lanes(1, 1));
    for _ in 0..5 {
        scheduler.infer(items(1, 0.0)).await.unwrap().into_inference().unwrap();
    }
    assert_eq!(history_len(&scheduler).await, 3);
}

// ── Config Roundtrip ───────────────────────────────────────────

#[test]
fn test_config_toml_roundtrip() {
    let config = ServerConfig {
        batch_size: 8,
        mode: ExecutionMode::Throughput,
        num_threads: Some(4),
        ..Default::default()
    };
    let toml = config.to_toml().unwrap();
    assert_eq!(ServerConfig::from_toml(&toml).unwrap(), config);
}
