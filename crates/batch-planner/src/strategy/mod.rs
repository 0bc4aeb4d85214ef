// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`BatchStrategy`] trait and strategy implementations.

pub mod multi_lane;
pub mod single_lane;

use crate::{BatchPlan, PlannerError};

/// Trait for batch strategies.
///
/// A strategy holds its lane and batch parameters and turns an item count
/// into a [`BatchPlan`] covering `[0, total_items)` exactly.
///
/// Strategies are pure arithmetic, no I/O and no accelerator access, which
/// keeps them trivially unit-testable.
pub trait BatchStrategy: Send + Sync {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Produces a batch plan for `total_items` dataset items.
    fn plan(&self, total_items: usize) -> Result<BatchPlan, PlannerError>;
}
