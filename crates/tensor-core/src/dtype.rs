// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! ONNX tensor element data types.

/// Enumerates the element kinds a [`crate::Tensor`] can hold.
///
/// Discriminants match the `TensorProto.DataType` enum of the ONNX schema,
/// so a model's `elem_type` / `data_type` field converts directly through
/// [`DType::from_onnx`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[repr(i32)]
pub enum DType {
    /// No type yet; a tensor of this type owns no buffer.
    #[default]
    Undefined = 0,
    F32 = 1,
    U8 = 2,
    I8 = 3,
    U16 = 4,
    I16 = 5,
    I32 = 6,
    I64 = 7,
    String = 8,
    Bool = 9,
    /// IEEE 754 half precision.
    F16 = 10,
    F64 = 11,
    U32 = 12,
    U64 = 13,
    /// Pair of f32 (real, imaginary).
    Complex64 = 14,
    /// Pair of f64 (real, imaginary).
    Complex128 = 15,
    /// Brain floating point (truncated f32).
    BF16 = 16,
    Float8E4M3Fn = 17,
    Float8E4M3FnUz = 18,
    Float8E5M2 = 19,
    Float8E5M2FnUz = 20,
    /// 4-bit unsigned integer, stored one element per byte.
    U4 = 21,
    /// 4-bit signed integer, stored one element per byte.
    I4 = 22,
}

impl DType {
    /// Every defined kind in ONNX enum order.
    pub const ALL: [DType; 23] = [
        DType::Undefined,
        DType::F32,
        DType::U8,
        DType::I8,
        DType::U16,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::String,
        DType::Bool,
        DType::F16,
        DType::F64,
        DType::U32,
        DType::U64,
        DType::Complex64,
        DType::Complex128,
        DType::BF16,
        DType::Float8E4M3Fn,
        DType::Float8E4M3FnUz,
        DType::Float8E5M2,
        DType::Float8E5M2FnUz,
        DType::U4,
        DType::I4,
    ];

    /// Converts an ONNX `DataType` value. Unknown values map to `None`.
    pub fn from_onnx(value: i32) -> Option<DType> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    /// Returns the ONNX `DataType` value.
    pub fn onnx_id(self) -> i32 {
        self as i32
    }

    /// Returns the size of a single element in bytes.
    ///
    /// Strings report the size of a pointer, 4-bit kinds one byte.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::Undefined => 0,
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 | DType::F16 | DType::BF16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
            DType::String => std::mem::size_of::<usize>(),
            DType::Float8E4M3Fn
            | DType::Float8E4M3FnUz
            | DType::Float8E5M2
            | DType::Float8E5M2FnUz
            | DType::U4
            | DType::I4 => 1,
        }
    }

    /// Returns the ONNX-style name used in dumps (`"float32"`, `"int64"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Undefined => "undefined",
            DType::F32 => "float32",
            DType::U8 => "uint8",
            DType::I8 => "int8",
            DType::U16 => "uint16",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::String => "string",
            DType::Bool => "bool",
            DType::F16 => "float16",
            DType::F64 => "float64",
            DType::U32 => "uint32",
            DType::U64 => "uint64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
            DType::BF16 => "bfloat16",
            DType::Float8E4M3Fn => "float8e4m3fn",
            DType::Float8E4M3FnUz => "float8e4m3fnuz",
            DType::Float8E5M2 => "float8e5m2",
            DType::Float8E5M2FnUz => "float8e5m2fnuz",
            DType::U4 => "uint4",
            DType::I4 => "int4",
        }
    }

    /// Returns `true` for the 8-bit float encodings.
    pub fn is_float8(self) -> bool {
        matches!(
            self,
            DType::Float8E4M3Fn | DType::Float8E4M3FnUz | DType::Float8E5M2 | DType::Float8E5M2FnUz
        )
    }

    /// Returns `true` for kinds stored as opaque bytes (float8 and 4-bit).
    pub fn is_opaque_byte(self) -> bool {
        self.is_float8() || matches!(self, DType::U4 | DType::I4)
    }

    /// Returns `true` for the twelve kinds the arithmetic kernels handle.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DType::I8
                | DType::I16
                | DType::I32
                | DType::I64
                | DType::U8
                | DType::U16
                | DType::U32
                | DType::U64
                | DType::F16
                | DType::BF16
                | DType::F32
                | DType::F64
        )
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onnx_ids_follow_table_order() {
        for (i, dtype) in DType::ALL.iter().enumerate() {
            assert_eq!(dtype.onnx_id(), i as i32);
            assert_eq!(DType::from_onnx(i as i32), Some(*dtype));
        }
        assert_eq!(DType::from_onnx(23), None);
        assert_eq!(DType::from_onnx(-1), None);
    }

    #[test]
    fn test_size_table() {
        assert_eq!(DType::Undefined.size_bytes(), 0);
        assert_eq!(DType::Complex64.size_bytes(), 8);
        assert_eq!(DType::Complex128.size_bytes(), 16);
        assert_eq!(DType::BF16.size_bytes(), 2);
        assert_eq!(DType::Float8E5M2.size_bytes(), 1);
        assert_eq!(DType::I4.size_bytes(), 1);
        assert_eq!(DType::String.size_bytes(), std::mem::size_of::<usize>());
    }

    #[test]
    fn test_names() {
        assert_eq!(DType::F32.as_str(), "float32");
        assert_eq!(DType::BF16.to_string(), "bfloat16");
        assert_eq!(DType::Float8E4M3FnUz.as_str(), "float8e4m3fnuz");
    }
}
