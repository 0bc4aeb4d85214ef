// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Wall-clock timing of named pipeline stages.
//!
//! A [`StageTimer`] is created when a request enters the pipeline. Each
//! stage is run through [`StageTimer::time`], which records its duration in
//! order. [`StageTimer::finish`] adds the `full_inference` span measured
//! from construction and freezes the result into [`StageTimings`].

use std::fmt;
use std::time::{Duration, Instant};

/// A named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    DecodeInput,
    Preprocess,
    ReshapeInput,
    /// Accelerator execution, all lanes included.
    Experiment,
    ReshapeOutput,
    Postprocess,
    EncodeOutput,
    /// Start of decode to end of encode.
    FullInference,
    SinkSend,
    SaveMetrics,
}

impl Stage {
    /// Stable snake_case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DecodeInput => "decode_input",
            Stage::Preprocess => "preprocess",
            Stage::ReshapeInput => "reshape_input",
            Stage::Experiment => "experiment",
            Stage::ReshapeOutput => "reshape_output",
            Stage::Postprocess => "postprocess",
            Stage::EncodeOutput => "encode_output",
            Stage::FullInference => "full_inference",
            Stage::SinkSend => "sink_send",
            Stage::SaveMetrics => "save_metrics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered stage durations for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTimings {
    entries: Vec<(Stage, Duration)>,
}

impl StageTimings {
    /// Duration of `stage`, if it was recorded.
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.entries
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, d)| *d)
    }

    /// Stages in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (Stage, Duration)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of recorded stages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no stage was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records `stage`, replacing an earlier value for the same stage.
    pub(crate) fn record(&mut self, stage: Stage, elapsed: Duration) {
        match self.entries.iter_mut().find(|(s, _)| *s == stage) {
            Some(entry) => entry.1 = elapsed,
            None => self.entries.push((stage, elapsed)),
        }
    }

    /// Returns a single-line `stage=ms` listing.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|(s, d)| format!("{s}={:.2}ms", d.as_secs_f64() * 1000.0))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Times the stages of one request.
#[derive(Debug)]
pub struct StageTimer {
    started: Instant,
    timings: StageTimings,
}

impl StageTimer {
    /// Starts the `full_inference` clock.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            timings: StageTimings::default(),
        }
    }

    /// Runs `f` as `stage` and records how long it took.
    ///
    /// The duration is recorded even if `f` returns an error value.
    pub fn time<T>(&mut self, stage: Stage, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record(stage, start.elapsed());
        out
    }

    /// Records an externally measured duration for `stage`.
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        tracing::debug!(
            stage = stage.as_str(),
            "{} time {:.2} ms",
            stage,
            elapsed.as_secs_f64() * 1000.0
        );
        self.timings.record(stage, elapsed);
    }

    /// Stages recorded so far.
    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    /// Records `full_inference` and returns the frozen timings.
    pub fn finish(mut self) -> StageTimings {
        let full = self.started.elapsed();
        self.timings.record(Stage::FullInference, full);
        self.timings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_records_in_order() {
        let mut timer = StageTimer::start();
        let v = timer.time(Stage::DecodeInput, || 7);
        timer.time(Stage::Experiment, || std::thread::sleep(Duration::from_millis(5)));
        assert_eq!(v, 7);

        let timings = timer.finish();
        let stages: Vec<Stage> = timings.iter().map(|(s, _)| s).collect();
        assert_eq!(
            stages,
            vec![Stage::DecodeInput, Stage::Experiment, Stage::FullInference]
        );
        assert!(timings.get(Stage::Experiment).unwrap() >= Duration::from_millis(5));
        assert!(timings.get(Stage::FullInference).unwrap() >= timings.get(Stage::Experiment).unwrap());
    }

    #[test]
    fn test_time_records_on_error() {
        let mut timer = StageTimer::start();
        let r: Result<(), &str> = timer.time(Stage::Preprocess, || Err("bad"));
        assert!(r.is_err());
        assert!(timer.timings().get(Stage::Preprocess).is_some());
    }

    #[test]
    fn test_record_replaces() {
        let mut t = StageTimings::default();
        t.record(Stage::SinkSend, Duration::from_millis(1));
        t.record(Stage::SinkSend, Duration::from_millis(2));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(Stage::SinkSend), Some(Duration::from_millis(2)));
    }

    #[test]
    fn test_summary() {
        let mut t = StageTimings::default();
        t.record(Stage::Experiment, Duration::from_millis(3));
        assert_eq!(t.summary(), "experiment=3.00ms");
        assert!(StageTimings::default().is_empty());
    }
}
