// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Batched matrix multiplication, float and integer.

use super::quantize_op::Int8Data;
use super::BroadcastMap;
use crate::{dispatch_numeric, DType, Numeric, Shape, Tensor, TensorError};

/// Geometry of a batched `[..., M, K] x [..., K, N]` product.
///
/// A 1-D left operand is promoted to `[1, K]` and a 1-D right operand to
/// `[K, 1]`; the promoted axes are dropped again from [`MatMulPlan::out_dims`].
/// Batch axes broadcast like elementwise operands.
#[derive(Debug, Clone)]
pub struct MatMulPlan {
    pub m: usize,
    pub k: usize,
    pub n: usize,
    out_dims: Vec<i64>,
    batches: usize,
    a_batch: BroadcastMap,
    b_batch: BroadcastMap,
}

impl MatMulPlan {
    /// Plans the product of operands with dims `a` and `b`.
    ///
    /// # Errors
    /// Returns [`TensorError::ShapeMismatch`] for scalars, mismatched inner
    /// dimensions or batch axes that do not broadcast.
    pub fn new(a: &[i64], b: &[i64]) -> Result<Self, TensorError> {
        let mismatch = || TensorError::ShapeMismatch {
            op: "matmul",
            lhs: Shape::from(a),
            rhs: Shape::from(b),
        };
        if a.is_empty() || b.is_empty() {
            return Err(mismatch());
        }

        let a_vec = a.len() == 1;
        let b_vec = b.len() == 1;
        let a_dims: Vec<i64> = if a_vec { vec![1, a[0]] } else { a.to_vec() };
        let b_dims: Vec<i64> = if b_vec { vec![b[0], 1] } else { b.to_vec() };

        let (a_batch, a_mat) = a_dims.split_at(a_dims.len() - 2);
        let (b_batch, b_mat) = b_dims.split_at(b_dims.len() - 2);
        if a_mat[1] != b_mat[0] {
            return Err(mismatch());
        }

        let a_batch = Shape::from(a_batch);
        let b_batch = Shape::from(b_batch);
        let batch = a_batch.broadcast_with(&b_batch).ok_or_else(mismatch)?;

        let mut out_dims = batch.dims().to_vec();
        if !a_vec {
            out_dims.push(a_mat[0]);
        }
        if !b_vec {
            out_dims.push(b_mat[1]);
        }

        Ok(Self {
            m: extent(a_mat[0]),
            k: extent(a_mat[1]),
            n: extent(b_mat[1]),
            out_dims,
            batches: batch.num_elements(),
            a_batch: BroadcastMap::new(&a_batch, &batch),
            b_batch: BroadcastMap::new(&b_batch, &batch),
        })
    }

    /// Returns the dims of the product.
    pub fn out_dims(&self) -> &[i64] {
        &self.out_dims
    }

    fn offsets(&self, batch: usize) -> (usize, usize, usize) {
        (
            self.a_batch.offset(batch) * self.m * self.k,
            self.b_batch.offset(batch) * self.k * self.n,
            batch * self.m * self.n,
        )
    }
}

/// Unresolved axes have no extent.
fn extent(dim: i64) -> usize {
    usize::try_from(dim).unwrap_or(0)
}

/// Performs matrix multiplication: `output = lhs @ rhs`.
///
/// Inputs must share a numeric dtype; `output` must have the planned dims
/// and that dtype.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
/// Returns [`TensorError::UnsupportedDType`] for non-numeric dtypes.
pub fn matmul(lhs: &Tensor, rhs: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    if lhs.dtype() != rhs.dtype() || lhs.dtype() != output.dtype() {
        return Err(TensorError::UnsupportedDType {
            op: "matmul",
            dtype: rhs.dtype(),
        });
    }

    let plan = MatMulPlan::new(lhs.dims(), rhs.dims())?;
    check_output("matmul (output)", &plan, output)?;

    dispatch_numeric!(lhs.dtype(), T => matmul_typed::<T>(lhs, rhs, output, &plan), _ => Err(
        TensorError::UnsupportedDType {
            op: "matmul",
            dtype: lhs.dtype(),
        }
    ))
}

fn check_output(op: &'static str, plan: &MatMulPlan, output: &Tensor) -> Result<(), TensorError> {
    if output.dims() != plan.out_dims() {
        return Err(TensorError::ShapeMismatch {
            op,
            lhs: Shape::from(plan.out_dims()),
            rhs: output.shape().clone(),
        });
    }
    Ok(())
}

fn matmul_typed<T: Numeric>(
    lhs: &Tensor,
    rhs: &Tensor,
    output: &mut Tensor,
    plan: &MatMulPlan,
) -> Result<(), TensorError> {
    let dtype = output.dtype();
    let missing = TensorError::UnsupportedDType { op: "matmul", dtype };
    let (Some(a), Some(b)) = (lhs.as_slice::<T>(), rhs.as_slice::<T>()) else {
        return Err(missing);
    };
    let c = output.as_slice_mut::<T>().ok_or(missing)?;

    let (m, k, n) = (plan.m, plan.k, plan.n);
    let mut row = vec![T::Acc::default(); n];
    for batch in 0..plan.batches {
        let (ao, bo, co) = plan.offsets(batch);
        // ikj order: the inner loop is a saxpy over one row of B.
        for i in 0..m {
            row.iter_mut().for_each(|x| *x = T::Acc::default());
            for p in 0..k {
                let a_ip = a[ao + i * k + p].widen();
                let b_row = &b[bo + p * n..bo + (p + 1) * n];
                for (acc, &b_pj) in row.iter_mut().zip(b_row) {
                    *acc = *acc + a_ip * b_pj.widen();
                }
            }
            for (dst, &acc) in c[co + i * n..co + (i + 1) * n].iter_mut().zip(&row) {
                *dst = T::narrow(acc);
            }
        }
    }
    Ok(())
}

// ── MatMulInteger ──────────────────────────────────────────────

/// Zero-point lookup: scalar, or one value per row/column.
struct ZeroPoint<'a> {
    values: Option<Int8Data<'a>>,
}

impl<'a> ZeroPoint<'a> {
    fn new(
        tensor: Option<&'a Tensor>,
        per_axis: usize,
        detail: &'static str,
    ) -> Result<Self, TensorError> {
        let Some(t) = tensor else {
            return Ok(Self { values: None });
        };
        let values = Int8Data::from_tensor(t).ok_or(TensorError::UnsupportedDType {
            op: "matmul_integer",
            dtype: t.dtype(),
        })?;
        if values.len() != 1 && values.len() != per_axis {
            return Err(TensorError::Numeric {
                op: "matmul_integer",
                detail: format!("{detail} has {} values, expected 1 or {per_axis}", values.len()),
            });
        }
        Ok(Self {
            values: Some(values),
        })
    }

    #[inline]
    fn get(&self, i: usize) -> i32 {
        match &self.values {
            None => 0,
            Some(v) if v.len() == 1 => v.get(0),
            Some(v) => v.get(i),
        }
    }
}

/// Integer matrix product with zero-point correction, accumulated in `i32`.
///
/// `lhs` and `rhs` are each `int8` or `uint8`. `a_zero_point` is a scalar or
/// one value per row of `lhs`, `b_zero_point` a scalar or one value per
/// column of `rhs`. `output` must be `int32` with the planned dims.
pub fn matmul_integer(
    lhs: &Tensor,
    rhs: &Tensor,
    a_zero_point: Option<&Tensor>,
    b_zero_point: Option<&Tensor>,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let unsupported = |dtype| TensorError::UnsupportedDType {
        op: "matmul_integer",
        dtype,
    };
    let a = Int8Data::from_tensor(lhs).ok_or_else(|| unsupported(lhs.dtype()))?;
    let b = Int8Data::from_tensor(rhs).ok_or_else(|| unsupported(rhs.dtype()))?;

    let plan = MatMulPlan::new(lhs.dims(), rhs.dims())?;
    check_output("matmul_integer (output)", &plan, output)?;

    let a_zp = ZeroPoint::new(a_zero_point, plan.m, "a_zero_point")?;
    let b_zp = ZeroPoint::new(b_zero_point, plan.n, "b_zero_point")?;

    let dtype = output.dtype();
    let c = output
        .as_slice_mut::<i32>()
        .ok_or_else(|| unsupported(dtype))?;

    let (m, k, n) = (plan.m, plan.k, plan.n);
    for batch in 0..plan.batches {
        let (ao, bo, co) = plan.offsets(batch);
        for i in 0..m {
            let za = a_zp.get(i);
            for j in 0..n {
                let zb = b_zp.get(j);
                let mut acc = 0i32;
                for p in 0..k {
                    let x = a.get(ao + i * k + p) - za;
                    let y = b.get(bo + p * n + j) - zb;
                    acc = acc.wrapping_add(x.wrapping_mul(y));
                }
                c[co + i * n + j] = acc;
            }
        }
    }
    Ok(())
}

/// Returns `true` for the operand kinds [`matmul_integer`] accepts.
pub fn is_int8(dtype: DType) -> bool {
    matches!(dtype, DType::I8 | DType::U8)
}
