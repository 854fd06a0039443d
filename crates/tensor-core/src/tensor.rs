// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The named, typed, shaped tensor every graph edge carries.

use crate::ops::BroadcastMap;
use crate::{DType, Element, Shape, TensorData, TensorError};
use half::{bf16, f16};
use std::fmt::Write as _;

/// Elements printed by [`Tensor::dump`] before truncating.
const DUMP_LIMIT: usize = 100;

/// Tolerance used by [`Tensor::equal`] for floating kinds.
const EQUAL_TOLERANCE: f64 = 1e-3;

/// An owned, named, n-dimensional tensor.
///
/// # Memory Layout
/// Data is stored in row-major (C) order in a typed buffer ([`TensorData`]).
/// Strides are derived from the dims and kept alongside them.
///
/// # Invariant
/// `dtype() == DType::Undefined` exactly when no buffer is held.
#[derive(Debug, Clone, Default)]
pub struct Tensor {
    name: String,
    dtype: DType,
    shape: Shape,
    strides: Vec<usize>,
    data: TensorData,
}

impl Tensor {
    /// Creates a tensor and allocates a zero-filled buffer for `dims`.
    ///
    /// A dimension below -1 leaves the tensor undefined with no buffer.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Tensor};
    /// let t = Tensor::new("x", DType::F32, &[2, 3]);
    /// assert_eq!(t.ndata(), 6);
    /// assert_eq!(t.strides(), &[3, 1]);
    /// ```
    pub fn new(name: impl Into<String>, dtype: DType, dims: &[i64]) -> Self {
        let mut t = Self::undefined(name);
        // An invalid dims list leaves the tensor undefined; callers inspect dtype().
        let _ = t.reinit(dtype, dims);
        t
    }

    /// Creates a placeholder tensor with no type, shape or buffer.
    pub fn undefined(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a tensor holding `values`.
    ///
    /// Returns an error if `values.len()` differs from the element count of `dims`.
    pub fn from_values<T: Element>(
        name: impl Into<String>,
        dims: &[i64],
        values: &[T],
    ) -> Result<Self, TensorError> {
        let mut t = Self::undefined(name);
        t.reinit(T::DTYPE, dims)?;
        if values.len() != t.ndata() {
            return Err(TensorError::BufferSizeMismatch {
                expected: t.ndata(),
                actual: values.len(),
            });
        }
        t.apply_values(values)?;
        Ok(t)
    }

    /// Creates a string tensor holding deep copies of `values`.
    pub fn from_strings<S: AsRef<str>>(
        name: impl Into<String>,
        dims: &[i64],
        values: &[S],
    ) -> Result<Self, TensorError> {
        let mut t = Self::undefined(name);
        t.reinit(DType::String, dims)?;
        if values.len() != t.ndata() {
            return Err(TensorError::BufferSizeMismatch {
                expected: t.ndata(),
                actual: values.len(),
            });
        }
        t.apply_strings(values);
        Ok(t)
    }

    /// Creates a rank-0 tensor holding one value.
    pub fn scalar<T: Element>(name: impl Into<String>, value: T) -> Self {
        let mut t = Self::new(name, T::DTYPE, &[]);
        if let Some(slot) = t.as_slice_mut::<T>() {
            slot[0] = value;
        }
        t
    }

    // ── Accessors ──────────────────────────────────────────────

    /// Returns the tensor's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the dimensions.
    pub fn dims(&self) -> &[i64] {
        self.shape.dims()
    }

    /// Returns the rank.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Returns the row-major strides, in elements.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns the number of elements held by the buffer.
    pub fn ndata(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when a buffer is allocated.
    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    /// Borrows the typed buffer.
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// Mutably borrows the typed buffer.
    pub fn data_mut(&mut self) -> &mut TensorData {
        &mut self.data
    }

    /// Borrows the elements as `T`, or `None` on a dtype mismatch.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    /// Mutably borrows the elements as `T`, or `None` on a dtype mismatch.
    pub fn as_slice_mut<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.data)
    }

    /// Borrows the elements of a string tensor.
    pub fn as_strings(&self) -> Option<&[String]> {
        match &self.data {
            TensorData::String(v) => Some(v),
            _ => None,
        }
    }

    /// Borrows the raw bytes of a float8 or 4-bit tensor.
    pub fn as_opaque(&self) -> Option<&[u8]> {
        match &self.data {
            TensorData::Opaque(v) => Some(v),
            _ => None,
        }
    }

    // ── Allocation ─────────────────────────────────────────────

    /// Releases the current buffer and re-allocates for `dtype` and `dims`.
    ///
    /// Strides are recomputed right to left, and the new buffer holds
    /// `max(1, product(dims))` zeroed elements with non-positive axes
    /// counting as 1. `DType::Undefined` keeps no buffer. A dimension below
    /// -1 leaves the tensor undefined and is reported as an error.
    pub fn reinit(&mut self, dtype: DType, dims: &[i64]) -> Result<(), TensorError> {
        self.data = TensorData::Empty;
        self.strides.clear();
        self.shape = Shape::scalar();
        self.dtype = DType::Undefined;

        if dtype == DType::Undefined {
            return Ok(());
        }
        if let Some((axis, &dim)) = dims.iter().enumerate().find(|(_, &d)| d < -1) {
            return Err(TensorError::InvalidDimension { axis, dim });
        }

        self.shape = Shape::new(dims.to_vec());
        self.strides = self.shape.strides();
        self.data = TensorData::zeroed(dtype, self.shape.num_elements());
        self.dtype = dtype;
        Ok(())
    }

    /// Re-allocates only when `dims` or `dtype` differ from the current ones.
    ///
    /// This is what operator reshape steps call on their outputs, so buffers
    /// survive passes whose shapes did not change.
    pub fn reshape(&mut self, dims: &[i64], dtype: DType) -> Result<(), TensorError> {
        if self.dtype == dtype && self.shape.dims() == dims && self.has_data() {
            return Ok(());
        }
        self.reinit(dtype, dims)
    }

    /// Reshapes to the same dims as `src` with the given dtype.
    pub fn reshape_identity(&mut self, src: &Tensor, dtype: DType) -> Result<(), TensorError> {
        let dims = src.dims().to_vec();
        self.reshape(&dims, dtype)
    }

    // ── Bulk copy ──────────────────────────────────────────────

    /// Overwrites the buffer from little-endian bytes, bounded by both sides.
    ///
    /// Returns the number of elements written. String tensors are untouched;
    /// use [`Tensor::apply_strings`] for those.
    pub fn apply_bytes(&mut self, buf: &[u8]) -> usize {
        self.data.copy_from_le_bytes(buf)
    }

    /// Replaces the elements of a string tensor with deep copies.
    ///
    /// Existing strings are dropped; at most `ndata` values are copied and
    /// elements past `values.len()` are cleared.
    pub fn apply_strings<S: AsRef<str>>(&mut self, values: &[S]) -> usize {
        match &mut self.data {
            TensorData::String(v) => {
                for s in v.iter_mut() {
                    s.clear();
                }
                let n = v.len().min(values.len());
                for (dst, src) in v.iter_mut().zip(values) {
                    *dst = src.as_ref().to_owned();
                }
                n
            }
            _ => 0,
        }
    }

    /// Copies typed values into the buffer, bounded by both sides.
    pub fn apply_values<T: Element>(&mut self, values: &[T]) -> Result<usize, TensorError> {
        let dtype = self.dtype;
        let dst = self
            .as_slice_mut::<T>()
            .ok_or(TensorError::UnsupportedDType { op: "apply", dtype })?;
        let n = dst.len().min(values.len());
        dst[..n].copy_from_slice(&values[..n]);
        Ok(n)
    }

    /// Returns the little-endian byte image of non-string data.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.to_le_bytes()
    }

    // ── Comparison / addressing ────────────────────────────────

    /// Structural equality with per-kind element comparison.
    ///
    /// Dtype, rank, element count and dims must match. Integer, bool,
    /// float8 and 4-bit data compare exactly; 16/32/64-bit floats and
    /// complex values (component-wise) within `1e-3`; strings by value.
    pub fn equal(&self, other: &Tensor) -> bool {
        if self.dtype != other.dtype
            || self.rank() != other.rank()
            || self.ndata() != other.ndata()
            || self.dims() != other.dims()
        {
            return false;
        }
        match (&self.data, &other.data) {
            (TensorData::F16(a), TensorData::F16(b)) => {
                close_by(a, b, |v: &f16| f64::from(v.to_f32()))
            }
            (TensorData::BF16(a), TensorData::BF16(b)) => {
                close_by(a, b, |v: &bf16| f64::from(v.to_f32()))
            }
            (TensorData::F32(a), TensorData::F32(b)) => close_by(a, b, |v: &f32| f64::from(*v)),
            (TensorData::F64(a), TensorData::F64(b)) => close_by(a, b, |v: &f64| *v),
            (TensorData::Complex64(a), TensorData::Complex64(b)) => a.iter().zip(b).all(|(x, y)| {
                x.iter()
                    .zip(y)
                    .all(|(p, q)| (f64::from(*p) - f64::from(*q)).abs() <= EQUAL_TOLERANCE)
            }),
            (TensorData::Complex128(a), TensorData::Complex128(b)) => {
                a.iter().zip(b).all(|(x, y)| {
                    x.iter()
                        .zip(y)
                        .all(|(p, q)| (p - q).abs() <= EQUAL_TOLERANCE)
                })
            }
            (a, b) => a == b,
        }
    }

    /// Maps a flat index of a broadcast output with dims `out` to the
    /// flat index of the corresponding element of `self`.
    pub fn broadcast_offset(&self, out: &Shape, index: usize) -> usize {
        BroadcastMap::new(&self.shape, out).offset(index)
    }

    // ── Diagnostics ────────────────────────────────────────────

    /// Renders `name: dtype[d0 x d1]`, followed with `detail` by the values.
    ///
    /// At most 100 values are printed; a scalar prints its value, a tensor
    /// without data prints `null`.
    pub fn dump(&self, detail: bool) -> String {
        let mut out = format!("{}: {}", self.name, self.dtype);
        if !self.has_data() {
            out.push_str(" = null");
            return out;
        }
        if self.rank() == 0 {
            let _ = write!(out, " = {}", self.element_to_string(0));
            return out;
        }
        let _ = write!(out, "{}", self.shape);
        if !detail || !self.shape.is_resolved() {
            return out;
        }

        out.push_str(" = \n");
        let dims = self.dims();
        // sizes[j]: elements spanned by one step of axis j-1.
        let mut sizes = vec![1usize; dims.len()];
        let mut acc = 1usize;
        for j in (0..dims.len()).rev() {
            acc *= dims[j].max(1) as usize;
            sizes[j] = acc;
        }
        let shown = self.ndata().min(DUMP_LIMIT);
        for idx in 0..shown {
            for &size in &sizes {
                if idx % size == 0 {
                    out.push('[');
                }
            }
            out.push_str(&self.element_to_string(idx));
            let closing = sizes.iter().filter(|&&size| (idx + 1) % size == 0).count();
            for _ in 0..closing {
                out.push(']');
            }
            if idx + 1 < shown {
                out.push_str(", ");
            }
        }
        if shown < self.ndata() {
            out.push_str(", ...");
        }
        out
    }

    fn element_to_string(&self, i: usize) -> String {
        match &self.data {
            TensorData::Empty => "null".to_string(),
            TensorData::Bool(v) => v[i].to_string(),
            TensorData::I8(v) => v[i].to_string(),
            TensorData::I16(v) => v[i].to_string(),
            TensorData::I32(v) => v[i].to_string(),
            TensorData::I64(v) => v[i].to_string(),
            TensorData::U8(v) => v[i].to_string(),
            TensorData::U16(v) => v[i].to_string(),
            TensorData::U32(v) => v[i].to_string(),
            TensorData::U64(v) => v[i].to_string(),
            TensorData::F16(v) => format!("{}", v[i].to_f32()),
            TensorData::BF16(v) => format!("{}", v[i].to_f32()),
            TensorData::F32(v) => format!("{}", v[i]),
            TensorData::F64(v) => format!("{}", v[i]),
            TensorData::Complex64(v) => format!("{} + {}i", v[i][0], v[i][1]),
            TensorData::Complex128(v) => format!("{} + {}i", v[i][0], v[i][1]),
            TensorData::String(v) => v[i].clone(),
            TensorData::Opaque(v) => format!("0x{:02x}", v[i]),
        }
    }
}

fn close_by<T>(a: &[T], b: &[T], f: impl Fn(&T) -> f64) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| (f(x) - f(y)).abs() <= EQUAL_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes(dtype: DType, n: usize) -> Vec<u8> {
        let len = n * dtype.size_bytes();
        match dtype {
            // Only 0/1 are valid bool encodings.
            DType::Bool => (0..len).map(|i| (i % 2) as u8).collect(),
            // Finite, non-NaN bit patterns for the float kinds.
            _ => (0..len).map(|i| (i as u8).wrapping_mul(7) % 0x3f).collect(),
        }
    }

    #[test]
    fn test_reinit_strides_and_zeroes() {
        let mut t = Tensor::undefined("x");
        t.reinit(DType::F32, &[2, 3, 4]).unwrap();
        assert_eq!(t.strides(), &[12, 4, 1]);
        assert_eq!(t.ndata(), 24);
        assert!(t.as_slice::<f32>().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_reinit_scalar_and_unresolved() {
        let t = Tensor::new("s", DType::I64, &[]);
        assert_eq!(t.ndata(), 1);
        assert_eq!(t.rank(), 0);

        let t = Tensor::new("u", DType::F32, &[-1, 3]);
        assert_eq!(t.ndata(), 3);
        assert_eq!(t.dims(), &[-1, 3]);
    }

    #[test]
    fn test_reinit_invalid_dim_leaves_no_buffer() {
        let mut t = Tensor::new("bad", DType::F32, &[2]);
        assert!(t.reinit(DType::F32, &[2, -5]).is_err());
        assert_eq!(t.dtype(), DType::Undefined);
        assert!(!t.has_data());
    }

    #[test]
    fn test_undefined_has_no_buffer() {
        let t = Tensor::new("u", DType::Undefined, &[4]);
        assert!(!t.has_data());
        assert_eq!(t.ndata(), 0);
    }

    #[test]
    fn test_round_trip_every_fixed_size_dtype() {
        for dtype in DType::ALL {
            if matches!(dtype, DType::Undefined | DType::String) {
                continue;
            }
            let mut t = Tensor::new("rt", dtype, &[2, 3]);
            let buf = sample_bytes(dtype, 6);
            assert_eq!(t.apply_bytes(&buf), 6, "{dtype}");
            assert_eq!(t.to_bytes(), buf, "{dtype}");
        }
    }

    #[test]
    fn test_string_apply_deep_copies() {
        let mut t = Tensor::new("s", DType::String, &[3]);
        let source = vec!["alpha".to_string(), "beta".to_string()];
        assert_eq!(t.apply_strings(&source), 2);
        drop(source);
        assert_eq!(t.as_strings().unwrap(), &["alpha", "beta", ""]);
    }

    #[test]
    fn test_apply_is_byte_bounded() {
        let mut t = Tensor::new("b", DType::U8, &[2]);
        assert_eq!(t.apply_bytes(&[1, 2, 3, 4]), 2);
        assert_eq!(t.as_slice::<u8>().unwrap(), &[1, 2]);
    }

    #[test]
    fn test_reshape_keeps_buffer_when_unchanged() {
        let mut t = Tensor::from_values("x", &[2], &[5i32, 6]).unwrap();
        t.reshape(&[2], DType::I32).unwrap();
        assert_eq!(t.as_slice::<i32>().unwrap(), &[5, 6]);
        t.reshape(&[3], DType::I32).unwrap();
        assert_eq!(t.as_slice::<i32>().unwrap(), &[0, 0, 0]);
    }

    #[test]
    fn test_equal_tolerance() {
        let a = Tensor::from_values("a", &[2], &[1.0f32, 2.0]).unwrap();
        let b = Tensor::from_values("b", &[2], &[1.0005f32, 2.0]).unwrap();
        let c = Tensor::from_values("c", &[2], &[1.01f32, 2.0]).unwrap();
        assert!(a.equal(&b));
        assert!(!a.equal(&c));

        let i = Tensor::from_values("i", &[2], &[1i32, 2]).unwrap();
        let j = Tensor::from_values("j", &[1, 2], &[1i32, 2]).unwrap();
        assert!(!i.equal(&j));
    }

    #[test]
    fn test_equal_strings() {
        let a = Tensor::from_strings("a", &[2], &["x", "y"]).unwrap();
        let b = Tensor::from_strings("b", &[2], &["x", "y"]).unwrap();
        let c = Tensor::from_strings("c", &[2], &["x", "z"]).unwrap();
        assert!(a.equal(&b));
        assert!(!a.equal(&c));
    }

    #[test]
    fn test_from_values_size_mismatch() {
        assert!(Tensor::from_values("x", &[2, 2], &[1.0f32]).is_err());
    }

    #[test]
    fn test_dump_formats() {
        let t = Tensor::from_values("m", &[2, 2], &[1i32, 2, 3, 4]).unwrap();
        assert_eq!(t.dump(false), "m: int32[2 x 2]");
        assert_eq!(t.dump(true), "m: int32[2 x 2] = \n[[1, 2], [3, 4]]");

        let s = Tensor::scalar("s", 2.5f32);
        assert_eq!(s.dump(true), "s: float32 = 2.5");

        let u = Tensor::undefined("u");
        assert_eq!(u.dump(true), "u: undefined = null");
    }

    #[test]
    fn test_dump_truncates() {
        let values: Vec<i64> = (0..150).collect();
        let t = Tensor::from_values("big", &[150], &values).unwrap();
        let dump = t.dump(true);
        assert!(dump.ends_with(", ..."));
        assert!(dump.contains("99"));
        assert!(!dump.contains("100"));
    }
}
