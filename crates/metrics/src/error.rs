// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for metrics recording.

/// Errors that can occur while recording or reading metrics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricsError {
    /// A history was created with room for nothing.
    #[error("metrics history capacity must be at least 1")]
    ZeroCapacity,

    /// A snapshot query asked for a missing or non-positive number of entries.
    #[error("invalid metrics count: {}", describe_count(.count))]
    InvalidCount { count: Option<i64> },

    /// Benchmark figures need a stage that was never timed.
    #[error("stage '{stage}' was not recorded")]
    MissingStage { stage: &'static str },

    /// An export sink rejected the metrics.
    #[error("metrics sink '{sink}' failed: {detail}")]
    Sink { sink: String, detail: String },
}

fn describe_count(count: &Option<i64>) -> String {
    match count {
        Some(c) => c.to_string(),
        None => "missing".to_string(),
    }
}
