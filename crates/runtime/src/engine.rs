// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The inference engine with type-state–enforced lifecycle.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .initialise()   adapters brought up, `init` recorded
//!     ▼
//! InferenceEngine<Initialised>
//!     │  .warm_up()      every lane warmed once, `warm_up` recorded
//!     ▼
//! InferenceEngine<Ready>
//!     │  .process(raw)
//!     ▼
//!   encoded response bytes
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! making invalid state sequences a compile error. In particular a request
//! can never reach a lane that has not been warmed up.

use std::marker::PhantomData;
use std::thread;
use std::time::Instant;

use accelerator::{AcceleratorAdapter, LaneRunner, LaneSpec};
use batch_planner::BatchPlan;
use metrics::{MetricsQuery, MetricsRecorder, SnapshotEntry, Stage, StageTimer};
use tensor_core::{Shape, Tensor};

use crate::fanout::{panic_message, run_plan};
use crate::{ExecutionMode, RuntimeError, ServerConfig, Workload, WorkloadError};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is created; adapters are not initialised.
#[derive(Debug)]
pub struct Idle;

/// Lanes are initialised but not yet warmed up.
#[derive(Debug)]
pub struct Initialised;

/// Engine is ready to serve requests.
#[derive(Debug)]
pub struct Ready;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Initialised {}
    impl Sealed for super::Ready {}
}

/// Sealed trait for engine states.
pub trait EngineState: sealed::Sealed + std::fmt::Debug {}
impl EngineState for Idle {}
impl EngineState for Initialised {}
impl EngineState for Ready {}

// ── Engine ─────────────────────────────────────────────────────

/// The inference engine: one workload, one or more accelerator lanes and
/// the metrics recorder.
///
/// `S` is a type-state marker that enforces the lifecycle ordering at
/// compile time. You cannot call `.process()` on an `Idle` engine.
///
/// # Example
/// ```
/// use accelerator::SyntheticAccelerator;
/// use runtime::{InferenceEngine, ServerConfig, VectorWorkload};
/// use tensor_core::Shape;
///
/// let config = ServerConfig { batch_size: 2, ..Default::default() };
/// let adapter = SyntheticAccelerator::new(2, Shape::vector(2), 1);
/// let mut engine = InferenceEngine::new(config, VectorWorkload::new(), vec![adapter])
///     .unwrap()
///     .initialise()
///     .unwrap()
///     .warm_up()
///     .unwrap();
///
/// let out = engine.process(br#"{"items": [[1.0, 2.0]]}"#).unwrap();
/// assert_eq!(out, br#"{"outputs":[[3.0]]}"#);
/// ```
pub struct InferenceEngine<W, A, S: EngineState = Idle> {
    config: ServerConfig,
    workload: W,
    adapters: Vec<A>,
    lanes: Vec<LaneRunner<A>>,
    spec: Option<LaneSpec>,
    recorder: MetricsRecorder,
    _state: PhantomData<S>,
}

impl<W, A, S: EngineState> InferenceEngine<W, A, S> {
    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the metrics recorder.
    pub fn recorder(&self) -> &MetricsRecorder {
        &self.recorder
    }

    /// Returns the workload.
    pub fn workload(&self) -> &W {
        &self.workload
    }

    fn transition<T: EngineState>(self) -> InferenceEngine<W, A, T> {
        InferenceEngine {
            config: self.config,
            workload: self.workload,
            adapters: self.adapters,
            lanes: self.lanes,
            spec: self.spec,
            recorder: self.recorder,
            _state: PhantomData,
        }
    }
}

// ── Idle → Initialised ─────────────────────────────────────────

impl<W: Workload, A: AcceleratorAdapter> InferenceEngine<W, A, Idle> {
    /// Creates a new engine. The configuration is validated here.
    pub fn new(config: ServerConfig, workload: W, adapters: Vec<A>) -> Result<Self, RuntimeError> {
        config.validate()?;
        let recorder = config.metrics_recorder()?;
        tracing::info!(
            "engine created: mode {}, batch size {}, workload '{}', {} adapter(s)",
            config.mode,
            config.batch_size,
            workload.name(),
            adapters.len(),
        );
        Ok(Self {
            config,
            workload,
            adapters,
            lanes: Vec::new(),
            spec: None,
            recorder,
            _state: PhantomData,
        })
    }

    /// Initialises as many adapters as the configuration needs.
    ///
    /// The first adapter's native batch decides the lane count:
    /// `ceil(batch_size / native_batch)` in Throughput mode, one lane in
    /// Latency mode. Providing fewer adapters is a configuration error;
    /// extra adapters are dropped. All lanes must report the same geometry.
    pub fn initialise(mut self) -> Result<InferenceEngine<W, A, Initialised>, RuntimeError> {
        let start = Instant::now();
        let mut adapters = std::mem::take(&mut self.adapters).into_iter();

        let first = adapters
            .next()
            .ok_or_else(|| RuntimeError::ConfigError("at least one accelerator adapter is required".into()))?;
        let model_path = self.config.model_path.clone();
        tracing::info!("loading model from {}", model_path.display());
        let first = LaneRunner::initialise(0, first, &model_path)?;
        let spec = first.spec().clone();

        let required = match self.config.mode {
            ExecutionMode::Latency => 1,
            ExecutionMode::Throughput => {
                batch_planner::required_lanes(self.config.batch_size, spec.native_batch)?
            }
        };
        let available = adapters.len() + 1;
        if available < required {
            return Err(RuntimeError::ConfigError(format!(
                "batch size {} over native lane batch {} needs {required} lanes, \
                 only {available} adapter(s) provided",
                self.config.batch_size, spec.native_batch,
            )));
        }
        if available > required {
            tracing::warn!("{} extra adapter(s) left unused", available - required);
        }

        let mut lanes = Vec::with_capacity(required);
        lanes.push(first);
        for (index, adapter) in adapters.take(required - 1).enumerate() {
            let lane = LaneRunner::initialise(index + 1, adapter, &model_path)?;
            if lane.spec() != &spec {
                return Err(RuntimeError::ConfigError(format!(
                    "lane {} reports {:?}, lane 0 reports {:?}",
                    index + 1,
                    lane.spec(),
                    spec
                )));
            }
            lanes.push(lane);
        }

        let elapsed = start.elapsed();
        tracing::info!(
            "{} lane(s) initialised: input {}, output {}, native batch {}",
            lanes.len(),
            spec.input_shape,
            spec.output_shape,
            spec.native_batch,
        );
        self.recorder.record_init(elapsed);
        self.lanes = lanes;
        self.spec = Some(spec);
        Ok(self.transition())
    }
}

// ── Initialised → Ready ────────────────────────────────────────

impl<W: Workload, A: AcceleratorAdapter> InferenceEngine<W, A, Initialised> {
    /// Number of initialised lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Geometry shared by every lane.
    pub fn lane_spec(&self) -> Option<&LaneSpec> {
        self.spec.as_ref()
    }

    /// Warms every lane concurrently and records the total time once.
    pub fn warm_up(mut self) -> Result<InferenceEngine<W, A, Ready>, RuntimeError> {
        let start = Instant::now();
        let results: Vec<Result<(), RuntimeError>> = thread::scope(|s| {
            let handles: Vec<_> = self
                .lanes
                .iter_mut()
                .map(|lane| {
                    let index = lane.index();
                    (index, s.spawn(move || lane.warm_up().map(|_| ())))
                })
                .collect();
            handles
                .into_iter()
                .map(|(index, handle)| match handle.join() {
                    Ok(result) => result.map_err(RuntimeError::from),
                    Err(payload) => Err(RuntimeError::Internal(format!(
                        "lane {index} panicked during warm-up: {}",
                        panic_message(payload.as_ref())
                    ))),
                })
                .collect()
        });
        for result in results {
            result?;
        }

        self.recorder.record_warm_up(start.elapsed());
        tracing::info!("engine ready");
        Ok(self.transition())
    }
}

// ── Ready: serve requests ──────────────────────────────────────

impl<W: Workload, A: AcceleratorAdapter> InferenceEngine<W, A, Ready> {
    /// Number of lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Geometry shared by every lane.
    pub fn lane_spec(&self) -> Option<&LaneSpec> {
        self.spec.as_ref()
    }

    /// The lanes, in index order.
    pub fn lanes(&self) -> &[LaneRunner<A>] {
        &self.lanes
    }

    /// Returns the batch plan a Throughput request of `total_items` would use.
    pub fn plan_for(&self, total_items: usize) -> Result<BatchPlan, RuntimeError> {
        let spec = self.spec()?;
        Ok(batch_planner::plan(
            total_items,
            self.config.batch_size,
            self.lanes.len(),
            spec.native_batch,
        )?)
    }

    /// Runs one request through decode → preprocess → reshape → execute →
    /// reshape → postprocess → encode, timing every stage, and records
    /// its metrics.
    pub fn process(&mut self, raw: &[u8]) -> Result<Vec<u8>, RuntimeError> {
        let spec = self.spec()?.clone();
        let input_item = spec.input_item();
        let output_item = spec.output_item();
        let mode = self.config.mode;
        let mut timer = StageTimer::start();

        let (decoded, n) = timer.time(Stage::DecodeInput, || self.workload.decode(raw))?;
        tracing::debug!("dataset size: {n}");
        if mode == ExecutionMode::Latency && (n != 1 || self.config.batch_size != 1) {
            return Err(RuntimeError::Precondition(format!(
                "latency mode needs exactly 1 item with batch size 1, got {n} item(s) with batch size {}",
                self.config.batch_size
            )));
        }

        let dataset = timer.time(Stage::Preprocess, || {
            self.workload.preprocess(decoded, &input_item)
        })?;
        if dataset.rows() != n {
            return Err(WorkloadError::RowCount {
                expected: n,
                actual: dataset.rows(),
            }
            .into());
        }
        let item = dataset.shape().item_shape();
        if item != input_item {
            return Err(WorkloadError::ItemShape {
                expected: input_item,
                actual: item,
            }
            .into());
        }

        let dataset = timer.time(Stage::ReshapeInput, || match mode {
            ExecutionMode::Latency => dataset.reshape(Shape::batched(&input_item, 1)),
            ExecutionMode::Throughput => Ok(dataset),
        })?;

        let output = timer.time(Stage::Experiment, || self.execute(&dataset, &output_item))?;

        let output = timer.time(Stage::ReshapeOutput, || {
            output.reshape(Shape::batched(&output_item, n))
        })?;
        let result = timer.time(Stage::Postprocess, || self.workload.postprocess(output))?;
        let encoded = timer.time(Stage::EncodeOutput, || self.workload.encode(result))?;

        let timings = timer.finish();
        self.recorder.record(timings, n)?;
        Ok(encoded)
    }

    /// Returns the requested history entries followed by the init entry.
    pub fn metrics_snapshot(
        &self,
        query: &MetricsQuery,
    ) -> Result<Vec<SnapshotEntry>, RuntimeError> {
        Ok(self.recorder.snapshot(query)?)
    }

    fn execute(&mut self, dataset: &Tensor, output_item: &Shape) -> Result<Tensor, RuntimeError> {
        match self.config.mode {
            ExecutionMode::Latency => {
                let lane = self
                    .lanes
                    .first_mut()
                    .ok_or_else(|| RuntimeError::Internal("engine has no lanes".into()))?;
                lane.run_batch(dataset)
                    .map_err(|source| RuntimeError::LaneFailure { lane: 0, source })
            }
            ExecutionMode::Throughput => {
                let plan = self.plan_for(dataset.rows())?;
                tracing::debug!("{}", plan.summary());
                run_plan(&mut self.lanes, &plan, dataset, output_item)
            }
        }
    }

    fn spec(&self) -> Result<&LaneSpec, RuntimeError> {
        self.spec
            .as_ref()
            .ok_or_else(|| RuntimeError::Internal("engine has no lane geometry".into()))
    }
}

impl<W, A, S: EngineState> std::fmt::Debug for InferenceEngine<W, A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("mode", &self.config.mode)
            .field("batch_size", &self.config.batch_size)
            .field("lanes", &self.lanes.len())
            .field("spec", &self.spec)
            .finish()
    }
}
