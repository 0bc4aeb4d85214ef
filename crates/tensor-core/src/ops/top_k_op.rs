// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Top-k selection over a single row of scores.

use std::cmp::Ordering;

/// Returns the `k` highest-scoring `(index, score)` pairs of `row`,
/// sorted by descending score. Ties keep the lower index first.
///
/// `k` larger than the row length returns the whole row sorted.
///
/// ```
/// use tensor_core::top_k;
/// let best = top_k(&[0.1, 0.7, 0.2], 2);
/// assert_eq!(best, vec![(1, 0.7), (2, 0.2)]);
/// ```
pub fn top_k(row: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = row.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    indexed.truncate(k);
    indexed
}
