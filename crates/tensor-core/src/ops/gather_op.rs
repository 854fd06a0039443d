// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Index gathering along one axis.

use crate::{Tensor, TensorData, TensorError};

/// Normalizes `axis` and returns it with the output dims
/// `data[..axis] ++ indices ++ data[axis + 1..]`.
pub fn gather_output_dims(
    data: &[i64],
    indices: &[i64],
    axis: i64,
) -> Result<(usize, Vec<i64>), TensorError> {
    let rank = data.len() as i64;
    let normalized = if axis < 0 { axis + rank } else { axis };
    if !(0..rank).contains(&normalized) {
        return Err(TensorError::Numeric {
            op: "gather",
            detail: format!("axis {axis} out of range for rank {rank}"),
        });
    }
    let axis = normalized as usize;
    let mut dims = Vec::with_capacity(data.len() + indices.len());
    dims.extend_from_slice(&data[..axis]);
    dims.extend_from_slice(indices);
    dims.extend_from_slice(&data[axis + 1..]);
    Ok((axis, dims))
}

/// Reads an `int32` or `int64` index tensor, wrapping negative entries
/// against `axis_len`.
fn read_indices(indices: &Tensor, axis_len: usize) -> Result<Vec<usize>, TensorError> {
    let raw: Vec<i64> = match indices.data() {
        TensorData::I32(v) => v.iter().map(|&i| i64::from(i)).collect(),
        TensorData::I64(v) => v.clone(),
        _ => {
            return Err(TensorError::UnsupportedDType {
                op: "gather",
                dtype: indices.dtype(),
            })
        }
    };
    let len = axis_len as i64;
    raw.into_iter()
        .map(|i| {
            let wrapped = if i < 0 { i + len } else { i };
            if (0..len).contains(&wrapped) {
                Ok(wrapped as usize)
            } else {
                Err(TensorError::Numeric {
                    op: "gather",
                    detail: format!("index {i} out of range for axis of size {axis_len}"),
                })
            }
        })
        .collect()
}

/// Copies slices of `data` selected by `indices` along `axis` into `output`.
///
/// Works for every fixed-size dtype and strings. `output` must already have
/// the dims from [`gather_output_dims`] and the dtype of `data`.
pub fn gather(
    data: &Tensor,
    indices: &Tensor,
    axis: usize,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let (_, expected) = gather_output_dims(data.dims(), indices.dims(), axis as i64)?;
    if output.dims() != expected.as_slice() || output.dtype() != data.dtype() {
        return Err(TensorError::ShapeMismatch {
            op: "gather (output)",
            lhs: expected.into(),
            rhs: output.shape().clone(),
        });
    }

    let dims = data.dims();
    let extent = |d: &i64| usize::try_from(*d).unwrap_or(0);
    let outer: usize = dims[..axis].iter().map(extent).product();
    let axis_len = extent(&dims[axis]);
    let inner: usize = dims[axis + 1..].iter().map(extent).product();
    let picks = read_indices(indices, axis_len)?;
    let geometry = Geometry {
        outer,
        axis_len,
        inner,
        picks: &picks,
    };

    match (data.data(), output.data_mut()) {
        (TensorData::Bool(s), TensorData::Bool(d)) => geometry.copy(s, d),
        (TensorData::I8(s), TensorData::I8(d)) => geometry.copy(s, d),
        (TensorData::I16(s), TensorData::I16(d)) => geometry.copy(s, d),
        (TensorData::I32(s), TensorData::I32(d)) => geometry.copy(s, d),
        (TensorData::I64(s), TensorData::I64(d)) => geometry.copy(s, d),
        (TensorData::U8(s), TensorData::U8(d)) => geometry.copy(s, d),
        (TensorData::U16(s), TensorData::U16(d)) => geometry.copy(s, d),
        (TensorData::U32(s), TensorData::U32(d)) => geometry.copy(s, d),
        (TensorData::U64(s), TensorData::U64(d)) => geometry.copy(s, d),
        (TensorData::F16(s), TensorData::F16(d)) => geometry.copy(s, d),
        (TensorData::BF16(s), TensorData::BF16(d)) => geometry.copy(s, d),
        (TensorData::F32(s), TensorData::F32(d)) => geometry.copy(s, d),
        (TensorData::F64(s), TensorData::F64(d)) => geometry.copy(s, d),
        (TensorData::Complex64(s), TensorData::Complex64(d)) => geometry.copy(s, d),
        (TensorData::Complex128(s), TensorData::Complex128(d)) => geometry.copy(s, d),
        (TensorData::String(s), TensorData::String(d)) => geometry.copy(s, d),
        (TensorData::Opaque(s), TensorData::Opaque(d)) => geometry.copy(s, d),
        _ => {
            return Err(TensorError::UnsupportedDType {
                op: "gather",
                dtype: data.dtype(),
            })
        }
    }
    Ok(())
}

struct Geometry<'a> {
    outer: usize,
    axis_len: usize,
    inner: usize,
    picks: &'a [usize],
}

impl Geometry<'_> {
    fn copy<T: Clone>(&self, src: &[T], dst: &mut [T]) {
        let n = self.picks.len();
        for o in 0..self.outer {
            for (slot, &idx) in self.picks.iter().enumerate() {
                let from = (o * self.axis_len + idx) * self.inner;
                let to = (o * n + slot) * self.inner;
                dst[to..to + self.inner].clone_from_slice(&src[from..from + self.inner]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn test_gather_rows() {
        let data = Tensor::from_values("d", &[3, 2], &[1.0f32, 1.2, 2.3, 3.4, 4.5, 5.7]).unwrap();
        let indices = Tensor::from_values("i", &[2, 2], &[0i64, 1, 1, 2]).unwrap();
        let (axis, dims) = gather_output_dims(data.dims(), indices.dims(), 0).unwrap();
        assert_eq!(dims, vec![2, 2, 2]);

        let mut out = Tensor::new("o", DType::F32, &dims);
        gather(&data, &indices, axis, &mut out).unwrap();
        assert_eq!(
            out.as_slice::<f32>().unwrap(),
            &[1.0, 1.2, 2.3, 3.4, 2.3, 3.4, 4.5, 5.7]
        );
    }

    #[test]
    fn test_gather_columns_negative_index() {
        let data = Tensor::from_values("d", &[2, 3], &[1i32, 2, 3, 4, 5, 6]).unwrap();
        let indices = Tensor::from_values("i", &[1], &[-1i32]).unwrap();
        let (axis, dims) = gather_output_dims(data.dims(), indices.dims(), -1).unwrap();
        assert_eq!((axis, dims.clone()), (1, vec![2, 1]));

        let mut out = Tensor::new("o", DType::I32, &dims);
        gather(&data, &indices, axis, &mut out).unwrap();
        assert_eq!(out.as_slice::<i32>().unwrap(), &[3, 6]);
    }

    #[test]
    fn test_gather_strings_scalar_index() {
        let data = Tensor::from_strings("d", &[3], &["a", "b", "c"]).unwrap();
        let indices = Tensor::scalar("i", 2i64);
        let (axis, dims) = gather_output_dims(data.dims(), indices.dims(), 0).unwrap();
        assert!(dims.is_empty());

        let mut out = Tensor::new("o", DType::String, &dims);
        gather(&data, &indices, axis, &mut out).unwrap();
        assert_eq!(out.as_strings().unwrap(), &["c"]);
    }

    #[test]
    fn test_gather_index_out_of_range() {
        let data = Tensor::from_values("d", &[2], &[1u8, 2]).unwrap();
        let indices = Tensor::from_values("i", &[1], &[5i64]).unwrap();
        let mut out = Tensor::new("o", DType::U8, &[1]);
        assert!(gather(&data, &indices, 0, &mut out).is_err());
        assert!(gather_output_dims(&[2], &[1], 1).is_err());
    }
}
