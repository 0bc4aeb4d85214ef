// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fixed-capacity FIFO of recent entries.

use std::collections::VecDeque;

use crate::MetricsError;

/// Keeps the last `capacity` appended values, oldest first.
///
/// Appending at capacity evicts the oldest value before the new one is
/// stored, so `len() <= capacity()` always holds.
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> BoundedHistory<T> {
    /// Creates an empty history holding at most `capacity` values.
    pub fn new(capacity: usize) -> Result<Self, MetricsError> {
        if capacity == 0 {
            return Err(MetricsError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        })
    }

    /// Appends `item`, returning the evicted oldest value if the history was full.
    pub fn append(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Maximum number of values kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Iterates over the newest `count` values, oldest first.
    ///
    /// Yields everything when `count >= len()`.
    pub fn last(&self, count: usize) -> impl Iterator<Item = &T> {
        self.items.iter().skip(self.items.len().saturating_sub(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            BoundedHistory::<u32>::new(0),
            Err(MetricsError::ZeroCapacity)
        ));
    }

    #[test]
    fn test_fills_then_evicts_oldest() {
        let mut h = BoundedHistory::new(3).unwrap();
        assert_eq!(h.append(1), None);
        assert_eq!(h.append(2), None);
        assert_eq!(h.append(3), None);
        assert_eq!(h.append(4), Some(1));
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut h = BoundedHistory::new(5).unwrap();
        for i in 0..5 + 7 {
            h.append(i);
            assert!(h.len() <= h.capacity());
        }
        assert_eq!(h.iter().copied().collect::<Vec<_>>(), vec![7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_last() {
        let mut h = BoundedHistory::new(10).unwrap();
        for i in 0..10 {
            h.append(i);
        }
        assert_eq!(h.last(3).copied().collect::<Vec<_>>(), vec![7, 8, 9]);
        assert_eq!(h.last(0).count(), 0);
        assert_eq!(h.last(50).count(), 10);
    }

    #[test]
    fn test_capacity_one() {
        let mut h = BoundedHistory::new(1).unwrap();
        h.append("a");
        assert_eq!(h.append("b"), Some("a"));
        assert_eq!(h.len(), 1);
        assert!(!h.is_empty());
    }
}
