// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Conversion between protobuf tensor declarations and [`Tensor`]s.
//!
//! Initializer payloads come either as `raw_data` (little-endian bytes in
//! the element layout) or through one of the typed repeated fields. Which
//! typed field carries which element kind:
//!
//! | field         | element kinds                                        |
//! |---------------|------------------------------------------------------|
//! | `float_data`  | float32, complex64 (pairs)                           |
//! | `int32_data`  | 8/16-bit ints, int32, bool, float16/bfloat16 bits, float8, 4-bit |
//! | `string_data` | string                                               |
//! | `int64_data`  | int64                                                |
//! | `double_data` | float64, complex128 (pairs)                          |
//! | `uint64_data` | uint32, uint64                                       |

use crate::proto::{
    tensor_proto::DataLocation, tensor_shape_proto::dimension, type_proto, TensorProto,
    ValueInfoProto,
};
use crate::ModelError;
use prost::Message;
use std::collections::HashMap;
use std::path::Path;
use tensor_core::{bf16, f16, DType, Tensor, TensorError, UNRESOLVED_DIM};

/// Creates a tensor named after `proto` and fills it from the payload.
pub fn tensor_from_proto(proto: &TensorProto) -> Result<Tensor, ModelError> {
    let dtype = DType::from_onnx(proto.data_type).ok_or_else(|| ModelError::InvalidTensor {
        name: proto.name.clone(),
        detail: format!("unknown data type {}", proto.data_type),
    })?;
    let mut tensor = Tensor::new(proto.name.clone(), dtype, &proto.dims);
    apply_proto(&mut tensor, proto)?;
    Ok(tensor)
}

/// Copies the payload of `proto` into an already allocated tensor.
///
/// At most `ndata` elements are copied; a short payload leaves the rest
/// zeroed. Externally stored data is not read and leaves the tensor zeroed.
pub fn apply_proto(tensor: &mut Tensor, proto: &TensorProto) -> Result<(), ModelError> {
    if !tensor.has_data() {
        return Ok(());
    }
    if proto.data_location == DataLocation::External as i32 || !proto.external_data.is_empty() {
        tracing::warn!(tensor = %proto.name, "external tensor data is not supported");
        return Ok(());
    }

    let dtype = tensor.dtype();
    if dtype == DType::String {
        let strings: Vec<String> = proto
            .string_data
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        tensor.apply_strings(&strings);
        return Ok(());
    }
    if !proto.raw_data.is_empty() {
        tensor.apply_bytes(&proto.raw_data);
        return Ok(());
    }

    let ints = &proto.int32_data;
    match dtype {
        DType::F32 => tensor.apply_values(&proto.float_data).map(drop)?,
        DType::Complex64 => {
            tensor.apply_bytes(&le_bytes(proto.float_data.iter().map(|v| v.to_le_bytes())));
        }
        DType::U8 => apply_cast(tensor, ints, |v| v as u8)?,
        DType::I8 => apply_cast(tensor, ints, |v| v as i8)?,
        DType::U16 => apply_cast(tensor, ints, |v| v as u16)?,
        DType::I16 => apply_cast(tensor, ints, |v| v as i16)?,
        DType::I32 => tensor.apply_values(ints).map(drop)?,
        DType::Bool => apply_cast(tensor, ints, |v| v != 0)?,
        DType::F16 => apply_cast(tensor, ints, |v| f16::from_bits(v as u16))?,
        DType::BF16 => apply_cast(tensor, ints, |v| bf16::from_bits(v as u16))?,
        DType::Float8E4M3Fn
        | DType::Float8E4M3FnUz
        | DType::Float8E5M2
        | DType::Float8E5M2FnUz
        | DType::U4
        | DType::I4 => {
            let bytes: Vec<u8> = ints.iter().map(|&v| v as u8).collect();
            tensor.apply_bytes(&bytes);
        }
        DType::I64 => tensor.apply_values(&proto.int64_data).map(drop)?,
        DType::F64 => tensor.apply_values(&proto.double_data).map(drop)?,
        DType::Complex128 => {
            tensor.apply_bytes(&le_bytes(proto.double_data.iter().map(|v| v.to_le_bytes())));
        }
        DType::U32 => apply_cast(tensor, &proto.uint64_data, |v| v as u32)?,
        DType::U64 => tensor.apply_values(&proto.uint64_data).map(drop)?,
        DType::String | DType::Undefined => {}
    }
    Ok(())
}

fn apply_cast<S: Copy, T: tensor_core::Element>(
    tensor: &mut Tensor,
    src: &[S],
    cast: impl Fn(S) -> T,
) -> Result<(), TensorError> {
    let values: Vec<T> = src.iter().map(|&v| cast(v)).collect();
    tensor.apply_values(&values).map(drop)
}

fn le_bytes<const N: usize>(chunks: impl Iterator<Item = [u8; N]>) -> Vec<u8> {
    chunks.flatten().collect()
}

/// Encodes a tensor as a `TensorProto` with `raw_data` (or `string_data`).
pub fn tensor_to_proto(tensor: &Tensor) -> TensorProto {
    let mut proto = TensorProto {
        name: tensor.name().to_string(),
        dims: tensor.dims().to_vec(),
        data_type: tensor.dtype().onnx_id(),
        ..Default::default()
    };
    match tensor.as_strings() {
        Some(strings) => {
            proto.string_data = strings.iter().map(|s| s.as_bytes().to_vec()).collect();
        }
        None => proto.raw_data = tensor.to_bytes(),
    }
    proto
}

/// Resolves the declared dims of a value: `dim_value`, else the shape
/// parameter named by `dim_param`, else unresolved.
pub fn declared_dims(
    shape: Option<&crate::proto::TensorShapeProto>,
    shape_params: &HashMap<String, i64>,
) -> Vec<i64> {
    let Some(shape) = shape else {
        return Vec::new();
    };
    shape
        .dim
        .iter()
        .map(|d| match &d.value {
            Some(dimension::Value::DimValue(v)) => *v,
            Some(dimension::Value::DimParam(p)) => {
                shape_params.get(p).copied().unwrap_or(UNRESOLVED_DIM)
            }
            None => UNRESOLVED_DIM,
        })
        .collect()
}

/// Allocates the tensor a graph input, output or value-info declares.
///
/// Returns `Ok(None)` for sequence, map, optional and sparse values, which
/// have no tensor representation. A declared dimension below -1 yields an
/// undefined tensor without a buffer.
pub fn tensor_from_value_info(
    info: &ValueInfoProto,
    shape_params: &HashMap<String, i64>,
) -> Result<Option<Tensor>, ModelError> {
    let Some(type_proto::Value::TensorType(tt)) = info.r#type.as_ref().and_then(|t| t.value.as_ref())
    else {
        return Ok(None);
    };
    let dtype = DType::from_onnx(tt.elem_type).ok_or_else(|| ModelError::InvalidTensor {
        name: info.name.clone(),
        detail: format!("unknown element type {}", tt.elem_type),
    })?;
    let dims = declared_dims(tt.shape.as_ref(), shape_params);
    Ok(Some(Tensor::new(info.name.clone(), dtype, &dims)))
}

/// Loads a serialized `TensorProto` file (the `.pb` files of ONNX test data).
pub fn load_tensor_file(path: &Path) -> Result<Tensor, ModelError> {
    let bytes = std::fs::read(path)?;
    let proto = TensorProto::decode(bytes.as_slice())?;
    let tensor = tensor_from_proto(&proto)?;
    tracing::debug!(
        path = %path.display(),
        tensor = %tensor.name(),
        "loaded tensor file"
    );
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{tensor_shape_proto::Dimension, TensorShapeProto, TypeProto};

    fn proto(dtype: DType, dims: &[i64]) -> TensorProto {
        TensorProto {
            name: "t".into(),
            dims: dims.to_vec(),
            data_type: dtype.onnx_id(),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_raw_data() {
        let mut p = proto(DType::I32, &[2]);
        p.raw_data = [7i32, -3].iter().flat_map(|v| v.to_le_bytes()).collect();
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.as_slice::<i32>().unwrap(), &[7, -3]);
    }

    #[test]
    fn test_decode_float_data() {
        let mut p = proto(DType::F32, &[2, 2]);
        p.float_data = vec![1.0, 2.0, 3.0, 4.0];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.dims(), &[2, 2]);
        assert_eq!(t.as_slice::<f32>().unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_decode_int32_data_narrow_kinds() {
        let mut p = proto(DType::I8, &[3]);
        p.int32_data = vec![-1, 5, 127];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.as_slice::<i8>().unwrap(), &[-1, 5, 127]);

        let mut p = proto(DType::F16, &[1]);
        p.int32_data = vec![i32::from(f16::from_f32(1.5).to_bits())];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.as_slice::<f16>().unwrap()[0].to_f32(), 1.5);

        let mut p = proto(DType::Bool, &[2]);
        p.int32_data = vec![0, 1];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.as_slice::<bool>().unwrap(), &[false, true]);
    }

    #[test]
    fn test_decode_complex_pairs() {
        let mut p = proto(DType::Complex128, &[1]);
        p.double_data = vec![1.5, -2.0];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.to_bytes().len(), 16);
        let expected: Vec<u8> = [1.5f64, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(t.to_bytes(), expected);
    }

    #[test]
    fn test_decode_uint64_data() {
        let mut p = proto(DType::U32, &[2]);
        p.uint64_data = vec![1, 4_000_000_000];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.as_slice::<u32>().unwrap(), &[1, 4_000_000_000]);
    }

    #[test]
    fn test_decode_short_payload_zero_fills() {
        let mut p = proto(DType::I64, &[3]);
        p.int64_data = vec![9];
        let t = tensor_from_proto(&p).unwrap();
        assert_eq!(t.as_slice::<i64>().unwrap(), &[9, 0, 0]);
    }

    #[test]
    fn test_strings_round_trip() {
        let t = Tensor::from_strings("s", &[2], &["hello", "world"]).unwrap();
        let back = tensor_from_proto(&tensor_to_proto(&t)).unwrap();
        assert!(t.equal(&back));
    }

    #[test]
    fn test_unknown_data_type() {
        let mut p = proto(DType::F32, &[1]);
        p.data_type = 99;
        assert!(matches!(
            tensor_from_proto(&p),
            Err(ModelError::InvalidTensor { .. })
        ));
    }

    #[test]
    fn test_value_info_shape_params() {
        let dims = vec![
            Dimension {
                value: Some(dimension::Value::DimParam("batch".into())),
                ..Default::default()
            },
            Dimension {
                value: Some(dimension::Value::DimValue(3)),
                ..Default::default()
            },
            Dimension {
                value: Some(dimension::Value::DimParam("seq".into())),
                ..Default::default()
            },
        ];
        let info = ValueInfoProto {
            name: "x".into(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: DType::F32.onnx_id(),
                    shape: Some(TensorShapeProto { dim: dims }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        };
        let params = HashMap::from([("batch".to_string(), 4)]);
        let t = tensor_from_value_info(&info, &params).unwrap().unwrap();
        assert_eq!(t.dims(), &[4, 3, -1]);
        assert_eq!(t.ndata(), 12);
    }

    #[test]
    fn test_value_info_sequence_has_no_tensor() {
        let info = ValueInfoProto {
            name: "seq".into(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::SequenceType(type_proto::Sequence {
                    elem_type: None,
                })),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(tensor_from_value_info(&info, &HashMap::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_load_tensor_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input_0.pb");
        let t = Tensor::from_values("input", &[2], &[0.25f32, 0.5]).unwrap();
        std::fs::write(&path, tensor_to_proto(&t).encode_to_vec()).unwrap();

        let loaded = load_tensor_file(&path).unwrap();
        assert_eq!(loaded.name(), "input");
        assert!(loaded.equal(&t));
    }
}
