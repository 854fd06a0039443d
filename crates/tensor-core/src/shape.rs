// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shape descriptors and dimension utilities.

use std::fmt;

/// Sentinel for an axis whose size is not known yet.
pub const UNRESOLVED_DIM: i64 = -1;

/// Describes the dimensionality of a [`crate::Tensor`].
///
/// Dimensions are signed because model shapes may carry symbolic axes that
/// stay [`UNRESOLVED_DIM`] until an operator's reshape step fixes them.
/// Non-positive dimensions count as 1 when sizing buffers and strides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<i64>,
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
    pub fn new(dims: Vec<i64>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: i64) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: i64, cols: i64) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<i64> {
        self.dims.get(index).copied()
    }

    /// Returns `true` when no axis is symbolic or negative.
    pub fn is_resolved(&self) -> bool {
        self.dims.iter().all(|&d| d >= 0)
    }

    /// Returns the number of elements a buffer for this shape holds.
    ///
    /// Non-positive axes count as 1, so the result is never zero.
    pub fn num_elements(&self) -> usize {
        self.dims
            .iter()
            .map(|&d| if d > 0 { d as usize } else { 1 })
            .product()
    }

    /// Computes row-major (C-order) strides for this shape.
    ///
    /// `stride[n-1] = 1`; an axis following a non-positive dimension
    /// inherits the stride to its right.
    pub fn strides(&self) -> Vec<usize> {
        let rank = self.dims.len();
        if rank == 0 {
            return vec![];
        }
        let mut strides = vec![1usize; rank];
        for i in (0..rank - 1).rev() {
            let next = self.dims[i + 1];
            strides[i] = if next > 0 {
                next as usize * strides[i + 1]
            } else {
                strides[i + 1]
            };
        }
        strides
    }

    /// Returns `true` if two shapes are broadcast-compatible.
    ///
    /// Shapes are compatible when, aligning dimensions from the right,
    /// each pair is either equal or one of them is 1.
    pub fn is_broadcast_compatible(&self, other: &Shape) -> bool {
        self.broadcast_with(other).is_some()
    }

    /// Computes the multidirectional broadcast of two shapes.
    ///
    /// The result has the larger rank; the lower-rank operand is treated
    /// as left-padded with size-1 axes.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let rank = self.rank().max(other.rank());
        let mut dims = vec![0i64; rank];
        for i in 0..rank {
            let a = axis_from_right(&self.dims, rank - 1 - i);
            let b = axis_from_right(&other.dims, rank - 1 - i);
            dims[i] = if a == b || b == 1 {
                a
            } else if a == 1 {
                b
            } else {
                return None;
            };
        }
        Some(Shape::new(dims))
    }
}

/// Returns the axis `offset` positions from the right, or 1 when the shape
/// is too short.
fn axis_from_right(dims: &[i64], offset: usize) -> i64 {
    if offset < dims.len() {
        dims[dims.len() - 1 - offset]
    } else {
        1
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<i64>> for Shape {
    fn from(dims: Vec<i64>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[i64]> for Shape {
    fn from(dims: &[i64]) -> Self {
        Self::new(dims.to_vec())
    }
}
