// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 8-bit quantization helpers.

use crate::{Tensor, TensorData, TensorError};

/// Read-only view over an `int8` or `uint8` buffer, widened to `i32` on read.
#[derive(Debug, Clone, Copy)]
pub enum Int8Data<'a> {
    I8(&'a [i8]),
    U8(&'a [u8]),
}

impl<'a> Int8Data<'a> {
    /// Borrows `t` if it holds `int8` or `uint8` data.
    pub fn from_tensor(t: &'a Tensor) -> Option<Self> {
        match t.data() {
            TensorData::I8(v) => Some(Int8Data::I8(v)),
            TensorData::U8(v) => Some(Int8Data::U8(v)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Int8Data::I8(v) => v.len(),
            Int8Data::U8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Int8Data::I8(_))
    }

    #[inline]
    pub fn get(&self, i: usize) -> i32 {
        match self {
            Int8Data::I8(v) => i32::from(v[i]),
            Int8Data::U8(v) => i32::from(v[i]),
        }
    }
}

// ── Dequantization ─────────────────────────────────────────────

/// Quantized weights of a recurrent layer, laid out `[dirs, rows, 4 * hidden]`.
#[derive(Debug, Clone, Copy)]
pub struct QuantizedWeights<'a> {
    pub values: Int8Data<'a>,
    pub scales: &'a [f32],
    pub zero_points: Option<Int8Data<'a>>,
    pub directions: usize,
    /// Input size for W, hidden size for R.
    pub rows: usize,
    pub hidden: usize,
}

/// How scales are spread over a weight tensor, chosen from the scale count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    PerTensor,
    PerDirection,
    /// `dirs * 4` scales; each covers a contiguous block of `rows * hidden`.
    PerGate,
    /// Any other count: equal contiguous blocks, one per scale.
    Blocked,
}

impl ScaleMode {
    pub fn detect(scales: usize, directions: usize) -> Self {
        if scales <= 1 {
            ScaleMode::PerTensor
        } else if scales == directions {
            ScaleMode::PerDirection
        } else if scales == directions * 4 {
            ScaleMode::PerGate
        } else {
            ScaleMode::Blocked
        }
    }
}

impl QuantizedWeights<'_> {
    /// Dequantizes into `f32`: `(q - zero_point) * scale`.
    ///
    /// Signed weights ignore the zero point.
    ///
    /// # Errors
    /// Returns [`TensorError::Numeric`] when there are no scales or the
    /// element count does not match `dirs * rows * 4 * hidden`.
    pub fn dequantize(&self) -> Result<Vec<f32>, TensorError> {
        let total = self.directions * self.rows * 4 * self.hidden;
        if self.values.len() < total {
            return Err(TensorError::Numeric {
                op: "dequantize",
                detail: format!("expected {total} weights, got {}", self.values.len()),
            });
        }
        if self.scales.is_empty() {
            return Err(TensorError::Numeric {
                op: "dequantize",
                detail: "no scales".to_string(),
            });
        }

        let block = (total / self.scales.len()).max(1);
        let signed = self.values.is_signed();
        let mut out = Vec::with_capacity(total);
        for i in 0..total {
            let s = (i / block).min(self.scales.len() - 1);
            let zp = match (&self.zero_points, signed) {
                (Some(zp), false) if !zp.is_empty() => zp.get(s.min(zp.len() - 1)),
                _ => 0,
            };
            out.push((self.values.get(i) - zp) as f32 * self.scales[s]);
        }
        Ok(out)
    }

    pub fn scale_mode(&self) -> ScaleMode {
        ScaleMode::detect(self.scales.len(), self.directions)
    }
}

// ── DynamicQuantizeLinear ──────────────────────────────────────

/// Computes the uint8 quantization of `x` over its own range.
///
/// The range is widened to include 0. `y_scale = (max - min) / 255`, or 1
/// when the range is empty; `y_zero_point = saturate(round(-min / scale))`;
/// `y = saturate(round(x / scale) + zero_point)`. Rounding is half to even.
///
/// `y` must be `uint8` shaped like `x`; `y_scale` an `f32` scalar and
/// `y_zero_point` a `uint8` scalar.
pub fn dynamic_quantize_linear(
    x: &Tensor,
    y: &mut Tensor,
    y_scale: &mut Tensor,
    y_zero_point: &mut Tensor,
) -> Result<(), TensorError> {
    let src = x.as_slice::<f32>().ok_or(TensorError::UnsupportedDType {
        op: "dynamic_quantize_linear",
        dtype: x.dtype(),
    })?;
    if y.dims() != x.dims() {
        return Err(TensorError::ShapeMismatch {
            op: "dynamic_quantize_linear",
            lhs: x.shape().clone(),
            rhs: y.shape().clone(),
        });
    }

    let (min, max) = src
        .iter()
        .fold((0.0f32, 0.0f32), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let mut scale = (max - min) / 255.0;
    if scale == 0.0 {
        scale = 1.0;
    }
    let zero_point = saturate_u8((-min / scale).round_ties_even());

    let wrong = |t: &Tensor| TensorError::UnsupportedDType {
        op: "dynamic_quantize_linear",
        dtype: t.dtype(),
    };
    let y_dtype_err = wrong(y);
    let dst = y.as_slice_mut::<u8>().ok_or(y_dtype_err)?;
    for (d, &v) in dst.iter_mut().zip(src) {
        *d = saturate_u8((v / scale).round_ties_even() + f32::from(zero_point));
    }

    let scale_err = wrong(y_scale);
    y_scale
        .as_slice_mut::<f32>()
        .and_then(|s| s.first_mut())
        .map(|s| *s = scale)
        .ok_or(scale_err)?;
    let zp_err = wrong(y_zero_point);
    y_zero_point
        .as_slice_mut::<u8>()
        .and_then(|s| s.first_mut())
        .map(|s| *s = zero_point)
        .ok_or(zp_err)?;
    Ok(())
}

fn saturate_u8(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_dynamic_quantize_linear_reference() {
        // Range [-3, 2]: scale 5 / 255, zero point 153.
        let x = Tensor::from_values("x", &[4], &[0.0f32, 2.0, -3.0, 1.34]).unwrap();
        let mut y = Tensor::new("y", DType::U8, &[4]);
        let mut scale = Tensor::new("s", DType::F32, &[]);
        let mut zp = Tensor::new("zp", DType::U8, &[]);

        dynamic_quantize_linear(&x, &mut y, &mut scale, &mut zp).unwrap();

        let s = scale.as_slice::<f32>().unwrap()[0];
        assert!((s - 0.019_607_844).abs() < 1e-6);
        assert_eq!(zp.as_slice::<u8>().unwrap(), &[153]);
        assert_eq!(y.as_slice::<u8>().unwrap(), &[153, 255, 0, 221]);
    }

    #[test]
    fn test_dynamic_quantize_linear_all_zero() {
        let x = Tensor::from_values("x", &[2], &[0.0f32, 0.0]).unwrap();
        let mut y = Tensor::new("y", DType::U8, &[2]);
        let mut scale = Tensor::new("s", DType::F32, &[]);
        let mut zp = Tensor::new("zp", DType::U8, &[]);

        dynamic_quantize_linear(&x, &mut y, &mut scale, &mut zp).unwrap();
        assert_eq!(scale.as_slice::<f32>().unwrap(), &[1.0]);
        assert_eq!(zp.as_slice::<u8>().unwrap(), &[0]);
    }

    #[test]
    fn test_scale_mode_detection() {
        assert_eq!(ScaleMode::detect(1, 2), ScaleMode::PerTensor);
        assert_eq!(ScaleMode::detect(2, 2), ScaleMode::PerDirection);
        assert_eq!(ScaleMode::detect(8, 2), ScaleMode::PerGate);
        assert_eq!(ScaleMode::detect(3, 2), ScaleMode::Blocked);
    }

    #[test]
    fn test_dequantize_unsigned_per_gate() {
        // One direction, rows 1, hidden 1: four weights, one scale per gate.
        let values = [10u8, 20, 30, 40];
        let zps = [10u8, 10, 10, 10];
        let w = QuantizedWeights {
            values: Int8Data::U8(&values),
            scales: &[1.0, 0.5, 0.25, 2.0],
            zero_points: Some(Int8Data::U8(&zps)),
            directions: 1,
            rows: 1,
            hidden: 1,
        };
        assert_eq!(w.scale_mode(), ScaleMode::PerGate);
        assert_eq!(w.dequantize().unwrap(), vec![0.0, 5.0, 5.0, 60.0]);
    }

    #[test]
    fn test_dequantize_signed_ignores_zero_point() {
        let values = [-2i8, 4, 6, -8];
        let zps = [3i8];
        let w = QuantizedWeights {
            values: Int8Data::I8(&values),
            scales: &[0.5],
            zero_points: Some(Int8Data::I8(&zps)),
            directions: 1,
            rows: 1,
            hidden: 1,
        };
        assert_eq!(w.dequantize().unwrap(), vec![-1.0, 2.0, 3.0, -4.0]);
    }

    #[test]
    fn test_dequantize_too_few_weights() {
        let values = [1u8, 2];
        let w = QuantizedWeights {
            values: Int8Data::U8(&values),
            scales: &[1.0],
            zero_points: None,
            directions: 1,
            rows: 1,
            hidden: 1,
        };
        assert!(w.dequantize().is_err());
    }
}
