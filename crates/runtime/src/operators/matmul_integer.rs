// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `MatMulInteger`: 8-bit matrix product accumulated in `int32`.
//!
//! Inputs: `A`, `B`, optional `a_zero_point`, optional `b_zero_point`.

use super::{required_input, required_output, LATEST};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{is_int8, matmul_integer, MatMulPlan};
use tensor_core::{DType, TensorError};

#[derive(Debug, Default)]
pub struct MatMulInteger;

impl Operator for MatMulInteger {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        (2..=4).contains(&node.num_inputs()) && node.num_outputs() == 1
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let (Some(a), Some(b)) = (io.input(0), io.input(1)) else {
            return false;
        };
        if !is_int8(a.dtype()) || !is_int8(b.dtype()) {
            return false;
        }
        let Ok(plan) = MatMulPlan::new(a.dims(), b.dims()) else {
            return false;
        };
        io.output_mut(0)
            .is_some_and(|y| y.reshape(plan.out_dims(), DType::I32).is_ok())
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let a = required_input(io, 0, "MatMulInteger")?;
        let b = required_input(io, 1, "MatMulInteger")?;
        let (a_zp, b_zp) = (io.input(2), io.input(3));
        matmul_integer(a, b, a_zp, b_zp, required_output(io, 0, "MatMulInteger")?)
    }
}

fn new_matmul_integer(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(MatMulInteger)
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register(
        "MatMulInteger",
        "",
        10..=LATEST,
        &[DType::I8, DType::U8],
        new_matmul_integer,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_util::{outputs, run, Harness};
    use tensor_core::Tensor;

    #[test]
    fn test_matmul_integer_zero_points() {
        let a = Tensor::from_values("a", &[2, 2], &[10u8, 12, 14, 16]).unwrap();
        let b = Tensor::from_values("b", &[2, 1], &[3i8, -1]).unwrap();
        let a_zp = Tensor::scalar("a_zp", 10u8);

        let mut op = MatMulInteger;
        assert!(Harness::new("MatMulInteger", 10, 3, 1).init(&mut op));
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&a), Some(&b), Some(&a_zp)], &mut out));

        // [[0, 2], [4, 6]] x [[3], [-1]]
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dtype(), DType::I32);
        assert_eq!(y.dims(), &[2, 1]);
        assert_eq!(y.as_slice::<i32>(), Some(&[-2i32, 6][..]));
    }

    #[test]
    fn test_matmul_integer_rejects_float() {
        let a = Tensor::new("a", DType::F32, &[2, 2]);
        let b = Tensor::new("b", DType::U8, &[2, 2]);
        let mut out = outputs(1);
        assert!(!run(&mut MatMulInteger, &[Some(&a), Some(&b)], &mut out));
    }
}
