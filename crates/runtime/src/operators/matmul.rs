// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `MatMul`: batched matrix product with numpy semantics.

use super::{required_input, required_output, LATEST, WIDE_NUMERIC, WIDE_NUMERIC_NO_BF16};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{matmul, MatMulPlan};
use tensor_core::TensorError;

#[derive(Debug, Default)]
pub struct MatMul;

impl Operator for MatMul {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        node.num_inputs() == 2 && node.num_outputs() == 1
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let (Some(a), Some(b)) = (io.input(0), io.input(1)) else {
            return false;
        };
        if a.dtype() != b.dtype() {
            return false;
        }
        let plan = match MatMulPlan::new(a.dims(), b.dims()) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(error = %e, "MatMul operands do not align");
                return false;
            }
        };
        io.output_mut(0)
            .is_some_and(|y| y.reshape(plan.out_dims(), a.dtype()).is_ok())
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let a = required_input(io, 0, "MatMul")?;
        let b = required_input(io, 1, "MatMul")?;
        matmul(a, b, required_output(io, 0, "MatMul")?)
    }
}

fn new_matmul(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(MatMul)
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry
        .register("MatMul", "", 13..=LATEST, WIDE_NUMERIC, new_matmul)
        .register("MatMul", "", 1..=12, WIDE_NUMERIC_NO_BF16, new_matmul);
}
