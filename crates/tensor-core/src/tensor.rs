// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type.

use crate::{Shape, TensorError};

/// An owned, row-major `f32` tensor.
///
/// `Tensor` is the data carrier between pipeline stages and accelerator
/// lanes. The leading dimension is treated as the row (batch) dimension;
/// see [`Shape::rows`] and [`Shape::row_len`].
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::zeros(Shape::matrix(2, 3));
    /// assert_eq!(t.as_slice(), &[0.0; 6]);
    /// ```
    pub fn zeros(shape: Shape) -> Self {
        let size = shape.num_elements();
        Self {
            shape,
            data: vec![0.0; size],
        }
    }

    /// Creates a tensor from an owned buffer.
    ///
    /// Returns an error if `data.len()` does not match `shape.num_elements()`.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self, TensorError> {
        let expected = shape.num_elements();
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Stacks equally sized rows into a `[rows.len(), ..item]` tensor.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_rows(&Shape::vector(2), &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(t.shape(), &Shape::matrix(2, 2));
    /// ```
    pub fn from_rows(item: &Shape, rows: &[Vec<f32>]) -> Result<Self, TensorError> {
        let row_len = item.num_elements();
        let mut data = Vec::with_capacity(rows.len() * row_len);
        for row in rows {
            if row.len() != row_len {
                return Err(TensorError::BufferSizeMismatch {
                    expected: row_len,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            shape: Shape::batched(item, rows.len()),
            data,
        })
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the number of rows (leading dimension).
    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    /// Returns the number of elements per row.
    pub fn row_len(&self) -> usize {
        self.shape.row_len()
    }

    /// Returns the flat element buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Returns the flat element buffer mutably.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns row `index`, or `None` if out of bounds.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let len = self.row_len();
        if index >= self.rows() {
            return None;
        }
        self.data.get(index * len..(index + 1) * len)
    }

    /// Iterates over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // `max(1)` keeps `chunks_exact` valid for zero-width rows.
        self.data.chunks_exact(self.row_len().max(1))
    }

    /// Returns a borrowed view of rows `[start, start + count)` as a flat slice.
    pub fn rows_slice(&self, start: usize, count: usize) -> Result<&[f32], TensorError> {
        let end = start + count;
        if end > self.rows() {
            return Err(TensorError::RowsOutOfBounds {
                start,
                end,
                rows: self.rows(),
            });
        }
        let len = self.row_len();
        Ok(&self.data[start * len..end * len])
    }

    /// Copies rows `[start, start + count)` into a new tensor and zero-pads it
    /// to `padded_rows` rows.
    ///
    /// This is how remainder batches are built: the valid rows come first,
    /// followed by zero rows up to the execution batch size.
    ///
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_vec(Shape::matrix(3, 1), vec![1.0, 2.0, 3.0]).unwrap();
    /// let b = t.padded_rows(2, 1, 4).unwrap();
    /// assert_eq!(b.as_slice(), &[3.0, 0.0, 0.0, 0.0]);
    /// ```
    pub fn padded_rows(
        &self,
        start: usize,
        count: usize,
        padded_rows: usize,
    ) -> Result<Tensor, TensorError> {
        if self.shape.rank() == 0 {
            return Err(TensorError::Scalar { op: "padded_rows" });
        }
        let rows = self.rows_slice(start, count)?;
        let target = padded_rows.max(count);
        let mut data = Vec::with_capacity(target * self.row_len());
        data.extend_from_slice(rows);
        data.resize(target * self.row_len(), 0.0);
        Ok(Tensor {
            shape: self.shape.with_rows(target),
            data,
        })
    }

    /// Drops every row past `rows`, keeping the leading valid rows.
    pub fn truncate_rows(&mut self, rows: usize) -> Result<(), TensorError> {
        if self.shape.rank() == 0 {
            return Err(TensorError::Scalar { op: "truncate_rows" });
        }
        if rows > self.rows() {
            return Err(TensorError::RowsOutOfBounds {
                start: 0,
                end: rows,
                rows: self.rows(),
            });
        }
        self.data.truncate(rows * self.row_len());
        self.shape = self.shape.with_rows(rows);
        Ok(())
    }

    /// Reinterprets the buffer under a new shape with the same element count.
    pub fn reshape(self, shape: Shape) -> Result<Tensor, TensorError> {
        if shape.num_elements() != self.data.len() {
            return Err(TensorError::ShapeMismatch {
                op: "reshape",
                lhs: self.shape,
                rhs: shape,
            });
        }
        Ok(Tensor {
            shape,
            data: self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(Shape::matrix(2, 3));
        assert_eq!(t.shape(), &Shape::matrix(2, 3));
        assert!(t.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_from_vec_size_mismatch() {
        let result = Tensor::from_vec(Shape::matrix(2, 3), vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(TensorError::BufferSizeMismatch {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(Tensor::from_rows(&Shape::vector(2), &rows).is_err());
    }

    #[test]
    fn test_row_access() {
        let t = Tensor::from_vec(Shape::matrix(3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(t.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(t.row(3), None);
        assert_eq!(t.iter_rows().count(), 3);
    }

    #[test]
    fn test_rows_slice_bounds() {
        let t = Tensor::zeros(Shape::matrix(4, 2));
        assert_eq!(t.rows_slice(1, 3).unwrap().len(), 6);
        assert!(matches!(
            t.rows_slice(3, 2),
            Err(TensorError::RowsOutOfBounds { start: 3, end: 5, rows: 4 })
        ));
    }

    #[test]
    fn test_padded_rows_remainder() {
        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let t = Tensor::from_vec(Shape::matrix(10, 1), data).unwrap();
        let last = t.padded_rows(8, 2, 4).unwrap();
        assert_eq!(last.shape(), &Shape::matrix(4, 1));
        assert_eq!(last.as_slice(), &[8.0, 9.0, 0.0, 0.0]);
    }

    #[test]
    fn test_padded_rows_full_batch_is_copy() {
        let t = Tensor::from_vec(Shape::matrix(2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = t.padded_rows(0, 2, 2).unwrap();
        assert_eq!(b, t);
    }

    #[test]
    fn test_truncate_rows() {
        let mut t = Tensor::from_vec(Shape::matrix(4, 2), (0..8).map(|i| i as f32).collect()).unwrap();
        t.truncate_rows(2).unwrap();
        assert_eq!(t.shape(), &Shape::matrix(2, 2));
        assert_eq!(t.as_slice(), &[0.0, 1.0, 2.0, 3.0]);
        assert!(t.truncate_rows(3).is_err());
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::zeros(Shape::new(vec![1, 2, 3]));
        let r = t.clone().reshape(Shape::matrix(1, 6)).unwrap();
        assert_eq!(r.shape(), &Shape::matrix(1, 6));
        assert!(t.reshape(Shape::matrix(1, 5)).is_err());
    }
}
