// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Input tensors from SafeTensors files.
//!
//! A SafeTensors file holds any number of named tensors. The runtime uses
//! them as host inputs: each tensor is matched to a graph input by name.

use crate::ModelError;
use std::path::Path;
use tensor_core::{DType, Tensor};

/// Reads every tensor of a SafeTensors file, in name order.
///
/// The file is memory-mapped; tensor data is copied into owned tensors.
pub fn load_safetensors(path: &Path) -> Result<Vec<Tensor>, ModelError> {
    let file = std::fs::File::open(path).map_err(|e| {
        ModelError::SafeTensors(format!("cannot open '{}': {e}", path.display()))
    })?;

    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(|e| ModelError::SafeTensors(format!("mmap failed: {e}")))?;

    let tensors = safetensors::SafeTensors::deserialize(&mmap)
        .map_err(|e| ModelError::SafeTensors(format!("SafeTensors parse error: {e}")))?;

    let mut names = tensors.names();
    names.sort();

    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let view = tensors
            .tensor(name)
            .map_err(|e| ModelError::SafeTensors(format!("tensor '{name}': {e}")))?;
        let dtype = convert_safetensor_dtype(view.dtype())?;
        let dims: Vec<i64> = view.shape().iter().map(|&d| d as i64).collect();
        let mut tensor = Tensor::new(name.as_str(), dtype, &dims);
        let copied = tensor.apply_bytes(view.data());
        if copied != view.data().len() {
            return Err(ModelError::InvalidTensor {
                name: name.clone(),
                detail: format!(
                    "payload holds {} bytes, shape needs {copied}",
                    view.data().len()
                ),
            });
        }
        out.push(tensor);
    }

    tracing::debug!(path = %path.display(), tensors = out.len(), "loaded SafeTensors file");
    Ok(out)
}

/// Converts a SafeTensors `Dtype` to our [`DType`].
fn convert_safetensor_dtype(st_dtype: safetensors::Dtype) -> Result<DType, ModelError> {
    match st_dtype {
        safetensors::Dtype::BOOL => Ok(DType::Bool),
        safetensors::Dtype::U8 => Ok(DType::U8),
        safetensors::Dtype::I8 => Ok(DType::I8),
        safetensors::Dtype::U16 => Ok(DType::U16),
        safetensors::Dtype::I16 => Ok(DType::I16),
        safetensors::Dtype::U32 => Ok(DType::U32),
        safetensors::Dtype::I32 => Ok(DType::I32),
        safetensors::Dtype::U64 => Ok(DType::U64),
        safetensors::Dtype::I64 => Ok(DType::I64),
        safetensors::Dtype::F16 => Ok(DType::F16),
        safetensors::Dtype::BF16 => Ok(DType::BF16),
        safetensors::Dtype::F32 => Ok(DType::F32),
        safetensors::Dtype::F64 => Ok(DType::F64),
        safetensors::Dtype::F8_E4M3 => Ok(DType::Float8E4M3Fn),
        safetensors::Dtype::F8_E5M2 => Ok(DType::Float8E5M2),
        other => Err(ModelError::SafeTensors(format!(
            "unsupported SafeTensors dtype: {other:?}"
        ))),
    }
}
