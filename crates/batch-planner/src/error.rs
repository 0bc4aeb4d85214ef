// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the batch planner.

/// Errors that can occur during batch planning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlannerError {
    /// A batch size parameter was zero.
    #[error("{what} must be at least 1")]
    ZeroBatchSize { what: &'static str },

    /// The lane count was zero.
    #[error("lane count must be at least 1")]
    ZeroLanes,

    /// The produced plan violates a coverage or sizing invariant.
    #[error("strategy '{strategy}' produced an invalid plan: {detail}")]
    InvalidPlan { strategy: String, detail: String },
}
