// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Deterministic software adapter.
//!
//! [`SyntheticAccelerator`] stands in for real hardware in tests, benches
//! and the CLI. For every input row it emits `output_width` values where
//! element `k` is `sum(row) + k`, so any output row can be traced back to
//! the input row that produced it.
//!
//! Optional knobs: a per-call delay, an execution failure after N calls,
//! an init failure, and a shared [`CallProbe`] counting calls and peak
//! concurrency across lanes. No model file is read; the path given to
//! `init` is only remembered.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tensor_core::{Shape, Tensor};

use crate::{AcceleratorAdapter, AcceleratorError, LaneSpec};

/// Shared counters observing adapter calls across threads.
#[derive(Debug, Clone, Default)]
pub struct CallProbe {
    inner: Arc<ProbeCounters>,
}

#[derive(Debug, Default)]
struct ProbeCounters {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    windows: Mutex<Vec<CallWindow>>,
}

/// Wall-clock span of one `run` call.
///
/// `marker` is the first input element of the batch, which lets a test tag
/// every item of a request with a value and recover whose rows were in
/// flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallWindow {
    pub marker: f32,
    pub start: Instant,
    pub end: Instant,
}

impl CallWindow {
    /// True when the two spans share any instant.
    pub fn overlaps(&self, other: &CallWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl CallProbe {
    /// Creates a probe with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `run` calls observed.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in flight at the same time.
    pub fn max_active(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }

    /// Every completed `run` call, in completion order.
    pub fn windows(&self) -> Vec<CallWindow> {
        match self.inner.windows.lock() {
            Ok(windows) => windows.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn enter(&self, marker: f32) -> ActiveCall<'_> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_active.fetch_max(now, Ordering::SeqCst);
        ActiveCall {
            probe: self,
            marker,
            start: Instant::now(),
        }
    }
}

struct ActiveCall<'a> {
    probe: &'a CallProbe,
    marker: f32,
    start: Instant,
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        let window = CallWindow {
            marker: self.marker,
            start: self.start,
            end: Instant::now(),
        };
        match self.probe.inner.windows.lock() {
            Ok(mut windows) => windows.push(window),
            Err(poisoned) => poisoned.into_inner().push(window),
        }
        self.probe.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A software adapter with a fixed native batch.
#[derive(Debug, Clone)]
pub struct SyntheticAccelerator {
    name: String,
    native_batch: usize,
    input_item: Shape,
    output_width: usize,
    delay: Duration,
    fail_after: Option<usize>,
    fail_init: bool,
    calls: usize,
    probe: Option<CallProbe>,
    model_path: Option<PathBuf>,
}

impl SyntheticAccelerator {
    /// Creates an adapter executing `native_batch` rows of `input_item` and
    /// producing `output_width` values per row.
    pub fn new(native_batch: usize, input_item: Shape, output_width: usize) -> Self {
        Self {
            name: "synthetic".to_string(),
            native_batch,
            input_item,
            output_width,
            delay: Duration::ZERO,
            fail_after: None,
            fail_init: false,
            calls: 0,
            probe: None,
            model_path: None,
        }
    }

    /// Sets the name used in logs and errors.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleeps for `delay` inside every `run` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Succeeds for the first `calls` runs, then fails every run.
    pub fn with_failure_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Makes `init` fail.
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Reports every `run` call to `probe`.
    pub fn with_probe(mut self, probe: CallProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    /// `run` calls made on this adapter, warm-up excluded.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Model path received by the last `init`.
    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    fn output_item(&self) -> Shape {
        Shape::vector(self.output_width)
    }
}

impl AcceleratorAdapter for SyntheticAccelerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, model_path: &Path) -> Result<LaneSpec, AcceleratorError> {
        if self.fail_init {
            return Err(AcceleratorError::Init {
                adapter: self.name.clone(),
                detail: format!("device unavailable for model '{}'", model_path.display()),
            });
        }
        self.model_path = Some(model_path.to_path_buf());
        Ok(LaneSpec::new(
            &self.input_item,
            &self.output_item(),
            self.native_batch,
        ))
    }

    fn run(&mut self, input: &Tensor) -> Result<Tensor, AcceleratorError> {
        let marker = input.as_slice().first().copied().unwrap_or(0.0);
        let _active = self.probe.as_ref().map(|probe| probe.enter(marker));
        self.calls += 1;

        if self.fail_after.is_some_and(|limit| self.calls > limit) {
            return Err(AcceleratorError::Execution {
                adapter: self.name.clone(),
                detail: format!("injected failure on call {}", self.calls),
            });
        }
        if input.rows() != self.native_batch {
            return Err(AcceleratorError::Execution {
                adapter: self.name.clone(),
                detail: format!(
                    "expected {} rows, got {}",
                    self.native_batch,
                    input.rows()
                ),
            });
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut data = Vec::with_capacity(self.native_batch * self.output_width);
        for row in input.iter_rows() {
            let sum: f32 = row.iter().sum();
            data.extend((0..self.output_width).map(|k| sum + k as f32));
        }
        Ok(Tensor::from_vec(
            Shape::batched(&self.output_item(), self.native_batch),
            data,
        )?)
    }

    /// Warm-up only waits out the delay; it does not count as a call.
    fn warm_up(&mut self, _spec: &LaneSpec) -> Result<(), AcceleratorError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(())
    }
}
