// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `DynamicQuantizeLinear`: `f32` to `uint8` over the input's own range.

use super::{required_input, LATEST};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::dynamic_quantize_linear;
use tensor_core::{DType, TensorError};

#[derive(Debug, Default)]
pub struct DynamicQuantizeLinear;

impl Operator for DynamicQuantizeLinear {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        node.num_inputs() == 1 && node.num_outputs() == 3
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let Some(x) = io.input(0) else {
            return false;
        };
        let [Some(y), Some(y_scale), Some(y_zp)] = io.outputs_mut() else {
            return false;
        };
        y.reshape_identity(x, DType::U8).is_ok()
            && y_scale.reshape(&[], DType::F32).is_ok()
            && y_zp.reshape(&[], DType::U8).is_ok()
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let x = required_input(io, 0, "DynamicQuantizeLinear")?;
        let [Some(y), Some(y_scale), Some(y_zp)] = io.outputs_mut() else {
            return Err(TensorError::Numeric {
                op: "DynamicQuantizeLinear",
                detail: "expected three outputs".to_string(),
            });
        };
        dynamic_quantize_linear(x, y, y_scale, y_zp)
    }
}

fn new_dynamic_quantize_linear(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(DynamicQuantizeLinear)
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register(
        "DynamicQuantizeLinear",
        "",
        11..=LATEST,
        &[DType::F32],
        new_dynamic_quantize_linear,
    );
}
