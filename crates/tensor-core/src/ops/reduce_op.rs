// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Axis reductions.

use crate::{dispatch_numeric, Numeric, Shape, Tensor, TensorError};

/// A validated reduction over a set of axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducePlan {
    /// Per input axis: `true` when the axis is reduced.
    reduced: Vec<bool>,
    out_dims: Vec<i64>,
}

impl ReducePlan {
    /// Normalizes `axes` against `dims`. An empty `axes` reduces every axis.
    ///
    /// # Errors
    /// Returns [`TensorError::Numeric`] for an axis outside `[-rank, rank)`.
    pub fn new(dims: &[i64], axes: &[i64], keepdims: bool) -> Result<Self, TensorError> {
        let rank = dims.len() as i64;
        let mut reduced = vec![axes.is_empty(); dims.len()];
        for &axis in axes {
            let normalized = if axis < 0 { axis + rank } else { axis };
            if !(0..rank).contains(&normalized) {
                return Err(TensorError::Numeric {
                    op: "reduce",
                    detail: format!("axis {axis} out of range for rank {rank}"),
                });
            }
            reduced[normalized as usize] = true;
        }

        let out_dims = dims
            .iter()
            .zip(&reduced)
            .filter_map(|(&d, &r)| match (r, keepdims) {
                (false, _) => Some(d),
                (true, true) => Some(1),
                (true, false) => None,
            })
            .collect();
        Ok(Self { reduced, out_dims })
    }

    pub fn out_dims(&self) -> &[i64] {
        &self.out_dims
    }

    /// Output offset contributed by each input axis: 0 for reduced axes.
    fn out_strides(&self, dims: &[i64]) -> Vec<usize> {
        let kept: Vec<i64> = dims
            .iter()
            .zip(&self.reduced)
            .filter(|(_, &r)| !r)
            .map(|(&d, _)| d)
            .collect();
        let kept_strides = Shape::new(kept).strides();
        let mut it = kept_strides.into_iter();
        self.reduced
            .iter()
            .map(|&r| if r { 0 } else { it.next().unwrap_or(0) })
            .collect()
    }
}

/// Computes the minimum of `input` over the axes in `plan`.
///
/// `output` must have the plan's dims and the input's dtype.
pub fn reduce_min(input: &Tensor, plan: &ReducePlan, output: &mut Tensor) -> Result<(), TensorError> {
    if input.dtype() != output.dtype() {
        return Err(TensorError::UnsupportedDType {
            op: "reduce_min",
            dtype: output.dtype(),
        });
    }
    if output.dims() != plan.out_dims() {
        return Err(TensorError::ShapeMismatch {
            op: "reduce_min (output)",
            lhs: Shape::from(plan.out_dims()),
            rhs: output.shape().clone(),
        });
    }

    dispatch_numeric!(input.dtype(), T => reduce_min_typed::<T>(input, plan, output), _ => Err(
        TensorError::UnsupportedDType {
            op: "reduce_min",
            dtype: input.dtype(),
        }
    ))
}

fn reduce_min_typed<T: Numeric>(
    input: &Tensor,
    plan: &ReducePlan,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let dtype = input.dtype();
    let missing = TensorError::UnsupportedDType { op: "reduce_min", dtype };
    let src = input.as_slice::<T>().ok_or(TensorError::UnsupportedDType {
        op: "reduce_min",
        dtype,
    })?;
    let dst = output.as_slice_mut::<T>().ok_or(missing)?;

    let in_strides = input.strides().to_vec();
    let out_strides = plan.out_strides(input.dims());
    let mut seen = vec![false; dst.len()];

    for (i, &v) in src.iter().enumerate() {
        // Walk the input coordinates and project onto the kept axes.
        let mut rest = i;
        let mut o = 0;
        for (&is, &os) in in_strides.iter().zip(&out_strides) {
            o += (rest / is) * os;
            rest %= is;
        }
        if !seen[o] || v.widen() < dst[o].widen() {
            dst[o] = v;
            seen[o] = true;
        }
    }
    Ok(())
}
