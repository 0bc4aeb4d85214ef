// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.

use std::time::Duration;

use accelerator::AcceleratorError;
use batch_planner::PlannerError;
use metrics::MetricsError;
use tensor_core::{Shape, TensorError};
use uuid::Uuid;

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The request does not satisfy the execution mode's requirements.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// One lane's accelerator call failed; the whole request is dropped.
    #[error("lane {lane} failed: {source}")]
    LaneFailure {
        lane: usize,
        #[source]
        source: AcceleratorError,
    },

    /// Adapter initialisation or warm-up failed.
    #[error("accelerator error: {0}")]
    Accelerator(#[from] AcceleratorError),

    /// The workload could not decode, transform or encode the payload.
    #[error("workload error: {0}")]
    Workload(#[from] WorkloadError),

    /// The batch planner returned an error.
    #[error("planner error: {0}")]
    Planner(#[from] PlannerError),

    /// Metrics recording or querying failed.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// A tensor operation failed between stages.
    #[error("tensor error: {0}")]
    Tensor(#[from] TensorError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A collaborator panicked or an internal invariant broke.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification used to map errors onto transport responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Precondition,
    PartialFailure,
    Configuration,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Precondition => 400,
            ErrorKind::PartialFailure => 502,
            ErrorKind::Configuration => 400,
            ErrorKind::Internal => 500,
        }
    }
}

impl RuntimeError {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Precondition(_) | RuntimeError::Workload(_) => ErrorKind::Precondition,
            RuntimeError::LaneFailure { .. } => ErrorKind::PartialFailure,
            RuntimeError::ConfigError(_)
            | RuntimeError::Metrics(MetricsError::InvalidCount { .. }) => {
                ErrorKind::Configuration
            }
            RuntimeError::Accelerator(_)
            | RuntimeError::Planner(_)
            | RuntimeError::Metrics(_)
            | RuntimeError::Tensor(_)
            | RuntimeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for `self.kind().status_code()`.
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Stable machine-readable error type.
    pub fn error_type(&self) -> &'static str {
        match self {
            RuntimeError::Precondition(_) => "precondition_failed",
            RuntimeError::LaneFailure { .. } => "lane_failure",
            RuntimeError::Accelerator(_) => "accelerator_error",
            RuntimeError::Workload(_) => "invalid_input",
            RuntimeError::Planner(_) => "planner_error",
            RuntimeError::Metrics(MetricsError::InvalidCount { .. }) => "invalid_count",
            RuntimeError::Metrics(_) => "metrics_error",
            RuntimeError::Tensor(_) => "tensor_error",
            RuntimeError::ConfigError(_) => "configuration_error",
            RuntimeError::Internal(_) => "internal_error",
        }
    }
}

/// Errors raised by a [`crate::Workload`].
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    /// The raw payload could not be decoded.
    #[error("cannot decode input: {0}")]
    Decode(String),

    /// Preprocessing produced a different number of rows than decoded items.
    #[error("preprocess produced {actual} rows for {expected} items")]
    RowCount { expected: usize, actual: usize },

    /// Preprocessed items do not have the shape the lanes were compiled for.
    #[error("preprocess produced items of shape {actual}, lanes expect {expected}")]
    ItemShape { expected: Shape, actual: Shape },

    /// The postprocessed output could not be encoded.
    #[error("cannot encode output: {0}")]
    Encode(String),

    /// A tensor operation inside the workload failed.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}

/// Errors on the submit path, before a request result exists.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The scheduler no longer accepts requests.
    #[error("scheduler is closed")]
    Closed,

    /// No result arrived within the request timeout.
    #[error("request {id} timed out after {after:?}")]
    Timeout { id: Uuid, after: Duration },

    /// The worker dropped the request without answering.
    #[error("scheduler worker exited before answering request {id}")]
    WorkerGone { id: Uuid },

    /// The worker thread could not be started.
    #[error("cannot start scheduler worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_status_codes() {
        let pre = RuntimeError::Precondition("two items".into());
        assert_eq!(pre.kind(), ErrorKind::Precondition);
        assert_eq!(pre.status_code(), 400);

        let lane = RuntimeError::LaneFailure {
            lane: 1,
            source: AcceleratorError::BatchTooLarge { rows: 2, native: 1 },
        };
        assert_eq!(lane.kind(), ErrorKind::PartialFailure);
        assert_eq!(lane.status_code(), 502);
        assert_eq!(lane.error_type(), "lane_failure");

        let count = RuntimeError::from(MetricsError::InvalidCount { count: Some(0) });
        assert_eq!(count.kind(), ErrorKind::Configuration);
        assert_eq!(count.status_code(), 400);
        assert_eq!(count.error_type(), "invalid_count");

        let internal = RuntimeError::Internal("boom".into());
        assert_eq!(internal.status_code(), 500);
    }

    #[test]
    fn test_display_includes_source() {
        let e = RuntimeError::LaneFailure {
            lane: 2,
            source: AcceleratorError::Execution {
                adapter: "synthetic".into(),
                detail: "bus error".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("lane 2"));
        assert!(msg.contains("bus error"));
    }
}
