// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise transcendental functions.

use crate::{bf16, f16, DType, FloatElement, Tensor, TensorError};

/// The elementwise functions available to unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFn {
    Acos,
    Acosh,
    Atan,
}

impl UnaryFn {
    #[inline]
    pub fn eval(self, x: f64) -> f64 {
        match self {
            UnaryFn::Acos => x.acos(),
            UnaryFn::Acosh => x.acosh(),
            UnaryFn::Atan => x.atan(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryFn::Acos => "acos",
            UnaryFn::Acosh => "acosh",
            UnaryFn::Atan => "atan",
        }
    }
}

/// Applies `f` to every element of `input`, writing `output`.
///
/// `output` must have the dims and dtype of `input`, which must be one of
/// the floating kinds.
pub fn unary(f: UnaryFn, input: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    if input.dims() != output.dims() {
        return Err(TensorError::ShapeMismatch {
            op: f.name(),
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    match input.dtype() {
        DType::F16 => unary_typed::<f16>(f, input, output),
        DType::BF16 => unary_typed::<bf16>(f, input, output),
        DType::F32 => unary_typed::<f32>(f, input, output),
        DType::F64 => unary_typed::<f64>(f, input, output),
        dtype => Err(TensorError::UnsupportedDType { op: f.name(), dtype }),
    }
}

fn unary_typed<T: FloatElement>(
    f: UnaryFn,
    input: &Tensor,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let dtype = output.dtype();
    let src = input.as_slice::<T>();
    let dst = output.as_slice_mut::<T>();
    let (Some(src), Some(dst)) = (src, dst) else {
        return Err(TensorError::UnsupportedDType { op: f.name(), dtype });
    };
    for (d, &x) in dst.iter_mut().zip(src) {
        *d = T::from_f64(f.eval(x.to_f64()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acos() {
        let x = Tensor::from_values("x", &[3], &[1.0f32, 0.0, -1.0]).unwrap();
        let mut y = Tensor::new("y", DType::F32, &[3]);
        unary(UnaryFn::Acos, &x, &mut y).unwrap();
        let v = y.as_slice::<f32>().unwrap();
        assert!(v[0].abs() < 1e-6);
        assert!((v[1] - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((v[2] - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_acosh_domain() {
        let x = Tensor::from_values("x", &[2], &[1.0f64, 0.5]).unwrap();
        let mut y = Tensor::new("y", DType::F64, &[2]);
        unary(UnaryFn::Acosh, &x, &mut y).unwrap();
        let v = y.as_slice::<f64>().unwrap();
        assert_eq!(v[0], 0.0);
        assert!(v[1].is_nan());
    }

    #[test]
    fn test_atan_f16() {
        let x = Tensor::from_values("x", &[1], &[f16::ONE]).unwrap();
        let mut y = Tensor::new("y", DType::F16, &[1]);
        unary(UnaryFn::Atan, &x, &mut y).unwrap();
        let v = y.as_slice::<f16>().unwrap()[0].to_f32();
        assert!((v - std::f32::consts::FRAC_PI_4).abs() < 1e-3);
    }

    #[test]
    fn test_unary_rejects_integers() {
        let x = Tensor::from_values("x", &[1], &[1i32]).unwrap();
        let mut y = Tensor::new("y", DType::I32, &[1]);
        assert!(unary(UnaryFn::Atan, &x, &mut y).is_err());
    }
}
