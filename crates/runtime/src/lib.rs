// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Serialized request scheduling and batch execution for accelerator
//! inference.
//!
//! The runtime ties together:
//! - A [`Workload`] that decodes raw requests into tensors and encodes
//!   results back.
//! - One or more [`accelerator::LaneRunner`]s, each owning an adapter with a
//!   fixed native batch.
//! - A [`batch_planner::BatchPlan`] that spreads a request's items over the
//!   lanes.
//! - A [`metrics::MetricsRecorder`] that times every stage and keeps a
//!   bounded history.
//!
//! # Type-State Lifecycle
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Initialised> → InferenceEngine<Ready>
//! ```
//! Transitions are compile-time checked.
//!
//! # Scheduling
//! A ready engine is moved into a [`Scheduler`], which runs it on one
//! dedicated thread behind a FIFO queue. Producers `submit` from any tokio
//! task and wait on a per-request reply channel with a timeout.

mod config;
mod engine;
mod error;
mod fanout;
mod scheduler;
mod workload;

pub use config::{ExecutionMode, ServerConfig};
pub use engine::{EngineState, Idle, InferenceEngine, Initialised, Ready};
pub use error::{ErrorKind, RuntimeError, SchedulerError, WorkloadError};
pub use fanout::run_plan;
pub use scheduler::{Payload, Request, RequestHandler, Response, ResponseBody, Scheduler};
pub use workload::{Prediction, VectorRequest, VectorResponse, VectorWorkload, Workload};
