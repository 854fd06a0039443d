// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise addition with multidirectional broadcasting.

use super::BroadcastMap;
use crate::{dispatch_numeric, Numeric, Shape, Tensor, TensorError};

/// Returns the broadcast shape of `a` and `b`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if an axis pair is neither equal
/// nor 1.
pub fn broadcast_shape(op: &'static str, a: &Shape, b: &Shape) -> Result<Shape, TensorError> {
    a.broadcast_with(b).ok_or_else(|| TensorError::ShapeMismatch {
        op,
        lhs: a.clone(),
        rhs: b.clone(),
    })
}

/// Computes `output = a + b` with broadcasting.
///
/// `output` must already have the broadcast shape and the dtype of `a`.
/// Integer sums wrap, 16-bit floats are added in `f32`.
///
/// # Errors
/// Returns [`TensorError::UnsupportedDType`] for non-numeric or mismatched
/// dtypes and [`TensorError::ShapeMismatch`] if `output` has the wrong shape.
pub fn add(a: &Tensor, b: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    if a.dtype() != b.dtype() || a.dtype() != output.dtype() {
        return Err(TensorError::UnsupportedDType {
            op: "add",
            dtype: b.dtype(),
        });
    }

    let expected = broadcast_shape("add", a.shape(), b.shape())?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "add (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    dispatch_numeric!(a.dtype(), T => add_typed::<T>(a, b, output), _ => Err(
        TensorError::UnsupportedDType {
            op: "add",
            dtype: a.dtype(),
        }
    ))
}

fn add_typed<T: Numeric>(a: &Tensor, b: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    let a_map = BroadcastMap::new(a.shape(), output.shape());
    let b_map = BroadcastMap::new(b.shape(), output.shape());
    let dtype = output.dtype();
    let missing = TensorError::UnsupportedDType { op: "add", dtype };

    let (Some(x), Some(y)) = (a.as_slice::<T>(), b.as_slice::<T>()) else {
        return Err(missing);
    };
    let out = output.as_slice_mut::<T>().ok_or(missing)?;

    for (i, dst) in out.iter_mut().enumerate() {
        let lhs = x[a_map.offset(i)].widen();
        let rhs = y[b_map.offset(i)].widen();
        *dst = T::narrow(lhs + rhs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bf16, DType};

    #[test]
    fn test_add_broadcast_column_plus_row() {
        let a = Tensor::from_values("a", &[4, 1], &[0.0f32, 10.0, 20.0, 30.0]).unwrap();
        let b = Tensor::from_values("b", &[1, 3], &[1.0f32, 2.0, 3.0]).unwrap();
        let mut out = Tensor::new("c", DType::F32, &[4, 3]);

        add(&a, &b, &mut out).unwrap();

        let c = out.as_slice::<f32>().unwrap();
        for i in 0..4 {
            for j in 0..3 {
                assert_eq!(c[i * 3 + j], (i * 10) as f32 + (j + 1) as f32);
            }
        }
    }

    #[test]
    fn test_add_integer_wraps() {
        let a = Tensor::from_values("a", &[2], &[i8::MAX, -1]).unwrap();
        let b = Tensor::from_values("b", &[], &[1i8]).unwrap();
        let mut out = Tensor::new("c", DType::I8, &[2]);

        add(&a, &b, &mut out).unwrap();
        assert_eq!(out.as_slice::<i8>().unwrap(), &[i8::MIN, 0]);
    }

    #[test]
    fn test_add_bf16() {
        let a = Tensor::from_values("a", &[2], &[bf16::from_f32(1.5), bf16::from_f32(2.0)]).unwrap();
        let mut out = Tensor::new("c", DType::BF16, &[2]);

        add(&a, &a, &mut out).unwrap();
        let c = out.as_slice::<bf16>().unwrap();
        assert_eq!(c[0].to_f32(), 3.0);
        assert_eq!(c[1].to_f32(), 4.0);
    }

    #[test]
    fn test_add_incompatible_shapes() {
        let a = Tensor::new("a", DType::F32, &[4, 2]);
        let b = Tensor::new("b", DType::F32, &[1, 3]);
        assert!(broadcast_shape("add", a.shape(), b.shape()).is_err());
    }

    #[test]
    fn test_add_rejects_strings() {
        let a = Tensor::from_strings("a", &[1], &["x"]).unwrap();
        let mut out = Tensor::new("c", DType::String, &[1]);
        assert!(add(&a, &a, &mut out).is_err());
    }
}
