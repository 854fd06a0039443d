// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Each operation writes into an output tensor that the caller has already
//! shaped, so repeated passes over a graph reuse the same buffers. Shape
//! planning (`MatMulPlan`, `ConvPlan`, `ReducePlan`, `gather_output_dims`,
//! ...) is kept separate from the compute functions for the same reason.

mod add_op;
mod broadcast;
mod conv_op;
mod gather_op;
mod lstm_op;
mod matmul_op;
mod quantize_op;
mod reduce_op;
mod unary_op;

pub use add_op::{add, broadcast_shape};
pub use broadcast::BroadcastMap;
pub use conv_op::{conv_integer, AutoPad, ConvParams, ConvPlan};
pub use gather_op::{gather, gather_output_dims};
pub use lstm_op::{
    lstm_forward, sigmoid, LstmConfig, LstmDirection, LstmInputs, LstmOutputs, WeightLayout,
};
pub use matmul_op::{is_int8, matmul, matmul_integer, MatMulPlan};
pub use quantize_op::{dynamic_quantize_linear, Int8Data, QuantizedWeights, ScaleMode};
pub use reduce_op::{reduce_min, ReducePlan};
pub use unary_op::{unary, UnaryFn};
