// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed element storage and the traits kernels are generic over.
//!
//! Every dtype has exactly one [`TensorData`] variant. Kernels never match
//! on the variant themselves: they go through [`Element::slice`] and friends,
//! and the arithmetic ones through [`Numeric`], which is implemented once per
//! kind by macro. 16-bit floats are decoded to `f32` for arithmetic and
//! re-encoded on store, integers wrap on overflow.

use crate::DType;
use half::{bf16, f16};
use std::fmt;
use std::num::Wrapping;
use std::ops::{Add, Mul, Sub};

/// Owned element buffer of a tensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TensorData {
    /// No buffer (undefined dtype or failed allocation).
    #[default]
    Empty,
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F16(Vec<f16>),
    BF16(Vec<bf16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Complex64(Vec<[f32; 2]>),
    Complex128(Vec<[f64; 2]>),
    String(Vec<String>),
    /// Float8 and 4-bit kinds, one element per byte, never interpreted.
    Opaque(Vec<u8>),
}

impl TensorData {
    /// Allocates a zero-filled buffer of `len` elements for `dtype`.
    pub fn zeroed(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Undefined => TensorData::Empty,
            DType::Bool => TensorData::Bool(vec![false; len]),
            DType::I8 => TensorData::I8(vec![0; len]),
            DType::I16 => TensorData::I16(vec![0; len]),
            DType::I32 => TensorData::I32(vec![0; len]),
            DType::I64 => TensorData::I64(vec![0; len]),
            DType::U8 => TensorData::U8(vec![0; len]),
            DType::U16 => TensorData::U16(vec![0; len]),
            DType::U32 => TensorData::U32(vec![0; len]),
            DType::U64 => TensorData::U64(vec![0; len]),
            DType::F16 => TensorData::F16(vec![f16::ZERO; len]),
            DType::BF16 => TensorData::BF16(vec![bf16::ZERO; len]),
            DType::F32 => TensorData::F32(vec![0.0; len]),
            DType::F64 => TensorData::F64(vec![0.0; len]),
            DType::Complex64 => TensorData::Complex64(vec![[0.0; 2]; len]),
            DType::Complex128 => TensorData::Complex128(vec![[0.0; 2]; len]),
            DType::String => TensorData::String(vec![String::new(); len]),
            DType::Float8E4M3Fn
            | DType::Float8E4M3FnUz
            | DType::Float8E5M2
            | DType::Float8E5M2FnUz
            | DType::U4
            | DType::I4 => TensorData::Opaque(vec![0; len]),
        }
    }

    /// Returns the number of elements held.
    pub fn len(&self) -> usize {
        match self {
            TensorData::Empty => 0,
            TensorData::Bool(v) => v.len(),
            TensorData::I8(v) => v.len(),
            TensorData::I16(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::U8(v) => v.len(),
            TensorData::U16(v) => v.len(),
            TensorData::U32(v) => v.len(),
            TensorData::U64(v) => v.len(),
            TensorData::F16(v) => v.len(),
            TensorData::BF16(v) => v.len(),
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::Complex64(v) => v.len(),
            TensorData::Complex128(v) => v.len(),
            TensorData::String(v) => v.len(),
            TensorData::Opaque(v) => v.len(),
        }
    }

    /// Returns `true` when no element is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Overwrites elements from a little-endian byte image.
    ///
    /// Copies whole elements only, up to whichever of the buffer or the
    /// byte image runs out first. Returns the number of elements written.
    /// String data is left untouched.
    pub fn copy_from_le_bytes(&mut self, buf: &[u8]) -> usize {
        match self {
            TensorData::Empty | TensorData::String(_) => 0,
            TensorData::Bool(v) => {
                let n = v.len().min(buf.len());
                for (d, &b) in v.iter_mut().zip(buf) {
                    *d = b != 0;
                }
                n
            }
            TensorData::I8(v) => fill_le(v, buf),
            TensorData::I16(v) => fill_le(v, buf),
            TensorData::I32(v) => fill_le(v, buf),
            TensorData::I64(v) => fill_le(v, buf),
            TensorData::U8(v) => fill_le(v, buf),
            TensorData::U16(v) => fill_le(v, buf),
            TensorData::U32(v) => fill_le(v, buf),
            TensorData::U64(v) => fill_le(v, buf),
            TensorData::F16(v) => fill_le(v, buf),
            TensorData::BF16(v) => fill_le(v, buf),
            TensorData::F32(v) => fill_le(v, buf),
            TensorData::F64(v) => fill_le(v, buf),
            TensorData::Complex64(v) => {
                let mut n = 0;
                for (d, chunk) in v.iter_mut().zip(buf.chunks_exact(8)) {
                    *d = [f32::read_le(&chunk[..4]), f32::read_le(&chunk[4..])];
                    n += 1;
                }
                n
            }
            TensorData::Complex128(v) => {
                let mut n = 0;
                for (d, chunk) in v.iter_mut().zip(buf.chunks_exact(16)) {
                    *d = [f64::read_le(&chunk[..8]), f64::read_le(&chunk[8..])];
                    n += 1;
                }
                n
            }
            TensorData::Opaque(v) => {
                let n = v.len().min(buf.len());
                v[..n].copy_from_slice(&buf[..n]);
                n
            }
        }
    }

    /// Returns the little-endian byte image of the buffer (empty for strings).
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            TensorData::Empty | TensorData::String(_) => {}
            TensorData::Bool(v) => out.extend(v.iter().map(|&b| u8::from(b))),
            TensorData::I8(v) => write_all_le(v, &mut out),
            TensorData::I16(v) => write_all_le(v, &mut out),
            TensorData::I32(v) => write_all_le(v, &mut out),
            TensorData::I64(v) => write_all_le(v, &mut out),
            TensorData::U8(v) => write_all_le(v, &mut out),
            TensorData::U16(v) => write_all_le(v, &mut out),
            TensorData::U32(v) => write_all_le(v, &mut out),
            TensorData::U64(v) => write_all_le(v, &mut out),
            TensorData::F16(v) => write_all_le(v, &mut out),
            TensorData::BF16(v) => write_all_le(v, &mut out),
            TensorData::F32(v) => write_all_le(v, &mut out),
            TensorData::F64(v) => write_all_le(v, &mut out),
            TensorData::Complex64(v) => {
                for c in v {
                    c[0].write_le(&mut out);
                    c[1].write_le(&mut out);
                }
            }
            TensorData::Complex128(v) => {
                for c in v {
                    c[0].write_le(&mut out);
                    c[1].write_le(&mut out);
                }
            }
            TensorData::Opaque(v) => out.extend_from_slice(v),
        }
        out
    }
}

fn fill_le<T: Element>(dst: &mut [T], buf: &[u8]) -> usize {
    let mut n = 0;
    for (d, chunk) in dst.iter_mut().zip(buf.chunks_exact(T::SIZE)) {
        *d = T::read_le(chunk);
        n += 1;
    }
    n
}

fn write_all_le<T: Element>(src: &[T], out: &mut Vec<u8>) {
    out.reserve(src.len() * T::SIZE);
    for &v in src {
        v.write_le(out);
    }
}

// ── Element ────────────────────────────────────────────────────

/// A fixed-size element kind with its own [`TensorData`] variant.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The dtype whose buffers hold this element.
    const DTYPE: DType;
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Borrows the buffer if it holds this element kind.
    fn slice(data: &TensorData) -> Option<&[Self]>;
    /// Mutably borrows the buffer if it holds this element kind.
    fn slice_mut(data: &mut TensorData) -> Option<&mut [Self]>;
    /// Decodes one element from exactly `SIZE` little-endian bytes.
    fn read_le(bytes: &[u8]) -> Self;
    /// Appends the little-endian encoding of `self`.
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident, $dtype:ident, $size:literal;)*) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;
                const SIZE: usize = $size;

                fn slice(data: &TensorData) -> Option<&[Self]> {
                    match data {
                        TensorData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn slice_mut(data: &mut TensorData) -> Option<&mut [Self]> {
                    match data {
                        TensorData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn read_le(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; $size];
                    raw.copy_from_slice(&bytes[..$size]);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_element! {
    i8 => I8, I8, 1;
    i16 => I16, I16, 2;
    i32 => I32, I32, 4;
    i64 => I64, I64, 8;
    u8 => U8, U8, 1;
    u16 => U16, U16, 2;
    u32 => U32, U32, 4;
    u64 => U64, U64, 8;
    f16 => F16, F16, 2;
    bf16 => BF16, BF16, 2;
    f32 => F32, F32, 4;
    f64 => F64, F64, 8;
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;
    const SIZE: usize = 1;

    fn slice(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut TensorData) -> Option<&mut [Self]> {
        match data {
            TensorData::Bool(v) => Some(v),
            _ => None,
        }
    }

    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }
}

// ── Numeric ────────────────────────────────────────────────────

/// Element kinds the arithmetic kernels handle.
///
/// `Acc` is the type arithmetic happens in: `Wrapping<T>` for integers,
/// `f32` for the 16-bit floats, the type itself for `f32`/`f64`.
pub trait Numeric: Element {
    type Acc: Copy
        + Default
        + PartialOrd
        + Add<Output = Self::Acc>
        + Sub<Output = Self::Acc>
        + Mul<Output = Self::Acc>;

    fn widen(self) -> Self::Acc;
    fn narrow(acc: Self::Acc) -> Self;
}

macro_rules! impl_numeric_int {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                type Acc = Wrapping<$ty>;

                #[inline]
                fn widen(self) -> Self::Acc {
                    Wrapping(self)
                }

                #[inline]
                fn narrow(acc: Self::Acc) -> Self {
                    acc.0
                }
            }
        )*
    };
}

impl_numeric_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Numeric for f32 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self
    }

    #[inline]
    fn narrow(acc: f32) -> Self {
        acc
    }
}

impl Numeric for f64 {
    type Acc = f64;

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    #[inline]
    fn narrow(acc: f64) -> Self {
        acc
    }
}

impl Numeric for f16 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn narrow(acc: f32) -> Self {
        f16::from_f32(acc)
    }
}

impl Numeric for bf16 {
    type Acc = f32;

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn narrow(acc: f32) -> Self {
        bf16::from_f32(acc)
    }
}

// ── FloatElement ───────────────────────────────────────────────

/// Floating kinds that transcendental kernels evaluate through `f64`.
pub trait FloatElement: Element {
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

impl FloatElement for f16 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}

impl FloatElement for bf16 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    fn from_f64(v: f64) -> Self {
        bf16::from_f64(v)
    }
}

impl FloatElement for f32 {
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl FloatElement for f64 {
    fn to_f64(self) -> f64 {
        self
    }
    fn from_f64(v: f64) -> Self {
        v
    }
}

/// Dispatches `$body` with the type alias `$t` bound to the Rust element
/// type of a numeric `$dtype`; evaluates `$fallback` for anything else.
#[macro_export]
macro_rules! dispatch_numeric {
    ($dtype:expr, $t:ident => $body:expr, _ => $fallback:expr) => {
        match $dtype {
            $crate::DType::I8 => { type $t = i8; $body }
            $crate::DType::I16 => { type $t = i16; $body }
            $crate::DType::I32 => { type $t = i32; $body }
            $crate::DType::I64 => { type $t = i64; $body }
            $crate::DType::U8 => { type $t = u8; $body }
            $crate::DType::U16 => { type $t = u16; $body }
            $crate::DType::U32 => { type $t = u32; $body }
            $crate::DType::U64 => { type $t = u64; $body }
            $crate::DType::F16 => { type $t = $crate::f16; $body }
            $crate::DType::BF16 => { type $t = $crate::bf16; $body }
            $crate::DType::F32 => { type $t = f32; $body }
            $crate::DType::F64 => { type $t = f64; $body }
            _ => $fallback,
        }
    };
}
