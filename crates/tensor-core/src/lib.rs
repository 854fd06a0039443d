// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Typed ONNX tensors and the numeric kernels the runtime's operators call.
//!
//! This crate provides:
//! - [`Tensor`]: a named, n-dimensional tensor holding any of the 23 ONNX
//!   element kinds in a typed buffer ([`TensorData`]).
//! - [`Shape`]: signed dims (with unresolved axes), strides, broadcasting.
//! - [`DType`]: the ONNX element type table.
//! - [`Element`] / [`Numeric`]: the traits kernels are generic over.
//! - Core operations in [`ops`]: broadcast add, batched matmul (float and
//!   integer), min reduction, gather, LSTM cell math, dynamic quantization,
//!   elementwise trigonometry.
//!
//! # Design Goals
//! - Kernels write into caller-shaped outputs; no reallocation between passes.
//! - No `unsafe`: 16-bit floats go through [`half`].
//! - Clean error types via `thiserror`.

mod dtype;
mod element;
mod error;
pub mod ops;
mod shape;
mod tensor;

pub use dtype::DType;
pub use element::{Element, FloatElement, Numeric, TensorData};
pub use error::TensorError;
pub use half::{bf16, f16};
pub use shape::{Shape, UNRESOLVED_DIM};
pub use tensor::Tensor;
