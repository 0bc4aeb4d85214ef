// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The metrics recorder: turns stage timings into stored metric entries.
//!
//! The recorder is owned by the inference engine, so only the scheduler
//! worker ever mutates the history. Reading a snapshot goes through the
//! same worker, which keeps reads ordered with respect to inferences.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::entry::DEFAULT_NODE_NAME;
use crate::{
    BenchmarkMetrics, BoundedHistory, Identity, InitEntry, MetricEntry, MetricsError,
    MetricsQuery, MetricsSink, NullSink, SnapshotEntry, Stage, StageTimings,
};

/// Records per-inference metrics and one-off init/warm-up timings.
pub struct MetricsRecorder {
    identity: Identity,
    node_name: String,
    batch_size: usize,
    num_threads: Option<usize>,
    aif_timestamp: u64,
    clock: Instant,
    history: BoundedHistory<MetricEntry>,
    init: Option<Duration>,
    warm_up: Option<Duration>,
    last_timings: Option<StageTimings>,
    sink: Box<dyn MetricsSink>,
}

impl MetricsRecorder {
    /// Creates a recorder keeping the last `history_size` entries.
    ///
    /// `AIF_timestamp` is fixed here, in milliseconds since the Unix epoch.
    pub fn new(
        identity: Identity,
        batch_size: usize,
        history_size: usize,
    ) -> Result<Self, MetricsError> {
        let aif_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Ok(Self {
            identity,
            node_name: DEFAULT_NODE_NAME.to_string(),
            batch_size,
            num_threads: None,
            aif_timestamp,
            clock: Instant::now(),
            history: BoundedHistory::new(history_size)?,
            init: None,
            warm_up: None,
            last_timings: None,
            sink: Box::new(NullSink),
        })
    }

    /// Sets the `node_name` stamped on every entry.
    pub fn with_node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    /// Reports `num_threads` in the init entry and the instance UID.
    pub fn with_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Overrides the instance start timestamp.
    pub fn with_aif_timestamp(mut self, aif_timestamp: u64) -> Self {
        self.aif_timestamp = aif_timestamp;
        self
    }

    /// Exports every recorded inference to `sink`.
    pub fn with_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Instance start, in milliseconds since the Unix epoch.
    pub fn aif_timestamp(&self) -> u64 {
        self.aif_timestamp
    }

    /// `app:network:type:device:focus`.
    pub fn app_uid(&self) -> String {
        self.identity.app_uid()
    }

    /// The app UID plus the instance start timestamp.
    pub fn instance_uid(&self) -> String {
        self.identity
            .instance_uid(self.aif_timestamp, self.num_threads)
    }

    /// Stored entries, oldest first.
    pub fn history(&self) -> &BoundedHistory<MetricEntry> {
        &self.history
    }

    /// Stage timings of the most recent inference, sink and save included.
    pub fn last_timings(&self) -> Option<&StageTimings> {
        self.last_timings.as_ref()
    }

    /// Records the adapter initialisation time. Only the first call counts.
    pub fn record_init(&mut self, elapsed: Duration) {
        if self.init.is_some() {
            tracing::debug!("init time already recorded, ignoring");
            return;
        }
        tracing::info!("Initialize time: {:.2} ms", elapsed.as_secs_f64() * 1000.0);
        self.init = Some(elapsed);
    }

    /// Records the warm-up time. Only the first call counts.
    pub fn record_warm_up(&mut self, elapsed: Duration) {
        if self.warm_up.is_some() {
            tracing::debug!("warm-up time already recorded, ignoring");
            return;
        }
        tracing::info!("Warmup time: {:.2} ms", elapsed.as_secs_f64() * 1000.0);
        self.warm_up = Some(elapsed);
    }

    /// The synthetic entry closing every snapshot.
    pub fn init_entry(&self) -> InitEntry {
        InitEntry {
            init: self.init.map(|d| d.as_secs_f64()),
            warm_up: self.warm_up.map(|d| d.as_secs_f64()),
            num_threads: self.num_threads,
        }
    }

    /// Computes benchmark figures for a finished request, exports them and
    /// appends a history entry.
    ///
    /// Sink failures are logged and otherwise ignored.
    pub fn record(
        &mut self,
        mut timings: StageTimings,
        dataset_size: usize,
    ) -> Result<BenchmarkMetrics, MetricsError> {
        let metrics = BenchmarkMetrics::compute(&timings, dataset_size, self.batch_size)?;

        let instance_uid = self.instance_uid();
        let start = Instant::now();
        if let Err(e) = self.sink.export(&instance_uid, &metrics) {
            tracing::warn!(sink = self.sink.name(), error = %e, "metrics export failed");
        }
        timings.record(Stage::SinkSend, start.elapsed());

        let start = Instant::now();
        let entry = self.entry(&metrics);
        self.history.append(entry);
        timings.record(Stage::SaveMetrics, start.elapsed());

        tracing::debug!("{}", timings.summary());
        tracing::info!("{}", metrics.summary());

        self.last_timings = Some(timings);
        Ok(metrics)
    }

    /// Returns the requested history entries followed by the init entry.
    pub fn snapshot(&self, query: &MetricsQuery) -> Result<Vec<SnapshotEntry>, MetricsError> {
        let mut entries: Vec<SnapshotEntry> = match query.limit()? {
            None => self.history.iter().cloned().map(SnapshotEntry::Metric).collect(),
            Some(n) => self.history.last(n).cloned().map(SnapshotEntry::Metric).collect(),
        };
        entries.push(SnapshotEntry::Init(self.init_entry()));
        Ok(entries)
    }

    fn entry(&self, metrics: &BenchmarkMetrics) -> MetricEntry {
        let id = &self.identity;
        MetricEntry {
            app_name: id.app_name.clone(),
            network_name: id.network_name.clone(),
            network_type: id.network_type.clone(),
            device: id.device.clone(),
            focus: id.focus.clone(),
            aif_timestamp: self.aif_timestamp,
            processing_latency: metrics.processing_latency_ms,
            data_preparation_latency: metrics.data_prep_latency_ms,
            execution_latency: metrics.execution_latency_ms,
            throughput: metrics.throughput,
            dataset_size: metrics.dataset_size,
            batch_size: metrics.batch_size,
            app_uid: id.app_uid(),
            instance_uid: self.instance_uid(),
            node_name: self.node_name.clone(),
            timestamp: self.aif_timestamp + self.clock.elapsed().as_millis() as u64,
        }
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("instance_uid", &self.instance_uid())
            .field("history_len", &self.history.len())
            .field("sink", &self.sink.name())
            .finish()
    }
}
