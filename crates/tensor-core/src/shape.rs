// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and batch-dimension utilities.

use std::fmt;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// The leading dimension is the batch dimension. Accelerator shapes are
/// reported with their native batch in `dims[0]`, e.g. `[4, 224, 224, 3]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements.
    ///
    /// For a scalar shape (rank 0), returns 1.
    pub fn num_elements(&self) -> usize {
        if self.dims.is_empty() {
            1
        } else {
            self.dims.iter().product()
        }
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Returns the leading (batch) dimension. A scalar counts as one row.
    pub fn rows(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Returns the number of elements in one row (product of `dims[1..]`).
    pub fn row_len(&self) -> usize {
        self.dims.iter().skip(1).product()
    }

    /// Returns the per-item shape, i.e. this shape without its batch dimension.
    pub fn item_shape(&self) -> Shape {
        Shape::new(self.dims.iter().skip(1).copied().collect())
    }

    /// Returns a copy of this shape with the batch dimension replaced.
    ///
    /// A scalar shape gains a leading dimension.
    ///
    /// ```
    /// use tensor_core::Shape;
    /// let native = Shape::new(vec![4, 3, 2]);
    /// assert_eq!(native.with_rows(1), Shape::new(vec![1, 3, 2]));
    /// ```
    pub fn with_rows(&self, rows: usize) -> Shape {
        let mut dims = self.dims.clone();
        match dims.first_mut() {
            Some(first) => *first = rows,
            None => dims.push(rows),
        }
        Shape::new(dims)
    }

    /// Prepends a batch dimension to an item shape.
    pub fn batched(item: &Shape, rows: usize) -> Shape {
        let mut dims = Vec::with_capacity(item.rank() + 1);
        dims.push(rows);
        dims.extend_from_slice(item.dims());
        Shape::new(dims)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_shape() {
        let s = Shape::vector(5);
        assert_eq!(s.rank(), 1);
        assert_eq!(s.num_elements(), 5);
        assert_eq!(s.rows(), 5);
        assert_eq!(s.row_len(), 1);
    }

    #[test]
    fn test_matrix_rows() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.rows(), 3);
        assert_eq!(s.row_len(), 4);
        assert_eq!(s.num_elements(), 12);
    }

    #[test]
    fn test_image_batch() {
        let s = Shape::new(vec![8, 224, 224, 3]);
        assert_eq!(s.rows(), 8);
        assert_eq!(s.row_len(), 224 * 224 * 3);
        assert_eq!(s.item_shape(), Shape::new(vec![224, 224, 3]));
    }

    #[test]
    fn test_with_rows() {
        let s = Shape::matrix(4, 10);
        assert_eq!(s.with_rows(1), Shape::matrix(1, 10));
        assert_eq!(Shape::new(vec![]).with_rows(3), Shape::vector(3));
    }

    #[test]
    fn test_batched() {
        let item = Shape::new(vec![2, 2]);
        assert_eq!(Shape::batched(&item, 5), Shape::new(vec![5, 2, 2]));
    }

    #[test]
    fn test_scalar_rows() {
        let s = Shape::new(vec![]);
        assert_eq!(s.rows(), 1);
        assert_eq!(s.row_len(), 1);
        assert_eq!(s.num_elements(), 1);
    }

    #[test]
    fn test_display() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(format!("{s}"), "[2, 3, 4]");
    }

    #[test]
    fn test_from_conversions() {
        let s1: Shape = vec![2, 3].into();
        let s2: Shape = (&[2, 3][..]).into();
        assert_eq!(s1, s2);
    }
}
