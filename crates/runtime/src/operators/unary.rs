// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Elementwise float operators: `Acos`, `Acosh`, `Atan`.

use super::{required_input, required_output, FLOATS, FLOATS_BF16, LATEST};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{unary, UnaryFn};
use tensor_core::TensorError;

/// One kernel type for every single-input float function.
#[derive(Debug)]
pub struct Unary {
    f: UnaryFn,
}

impl Unary {
    pub fn new(f: UnaryFn) -> Self {
        Self { f }
    }
}

impl Operator for Unary {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        node.num_inputs() == 1 && node.num_outputs() == 1
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let Some(x) = io.input(0) else {
            return false;
        };
        io.output_mut(0)
            .is_some_and(|y| y.reshape_identity(x, x.dtype()).is_ok())
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let op = self.f.name();
        let x = required_input(io, 0, op)?;
        unary(self.f, x, required_output(io, 0, op)?)
    }
}

fn new_acos(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(Unary::new(UnaryFn::Acos))
}

fn new_acosh(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(Unary::new(UnaryFn::Acosh))
}

fn new_atan(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(Unary::new(UnaryFn::Atan))
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry
        .register("Acos", "", 22..=LATEST, FLOATS_BF16, new_acos)
        .register("Acos", "", 7..=21, FLOATS, new_acos)
        .register("Acosh", "", 22..=LATEST, FLOATS_BF16, new_acosh)
        .register("Acosh", "", 9..=21, FLOATS, new_acosh)
        .register("Atan", "", 22..=LATEST, FLOATS_BF16, new_atan)
        .register("Atan", "", 7..=21, FLOATS, new_atan);
}
