// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `Add`: elementwise sum with multidirectional broadcasting.

use super::{
    required_input, required_output, ALL_NUMERIC, LATEST, WIDE_NUMERIC, WIDE_NUMERIC_NO_BF16,
};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{add, broadcast_shape};
use tensor_core::TensorError;

#[derive(Debug, Default)]
pub struct Add;

impl Operator for Add {
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
        let Ok(shape) = broadcast_shape("Add", a.shape(), b.shape()) else {
            return false;
        };
        io.output_mut(0)
            .is_some_and(|y| y.reshape(shape.dims(), a.dtype()).is_ok())
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let a = required_input(io, 0, "Add")?;
        let b = required_input(io, 1, "Add")?;
        add(a, b, required_output(io, 0, "Add")?)
    }
}

fn new_add(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(Add)
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry
        .register("Add", "", 14..=LATEST, ALL_NUMERIC, new_add)
        .register("Add", "", 13..=13, WIDE_NUMERIC, new_add)
        .register("Add", "", 7..=12, WIDE_NUMERIC_NO_BF16, new_add);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_util::{outputs, run, Harness};
    use crate::resolver::Resolver;
    use tensor_core::{DType, Tensor};

    #[test]
    fn test_add_broadcast() {
        let a = Tensor::from_values("a", &[2, 1], &[1i32, 2]).unwrap();
        let b = Tensor::from_values("b", &[3], &[10i32, 20, 30]).unwrap();
        let mut op = Add;
        assert!(Harness::new("Add", 14, 2, 1).init(&mut op));
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&a), Some(&b)], &mut out));

        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[2, 3]);
        assert_eq!(y.dtype(), DType::I32);
        assert_eq!(y.as_slice::<i32>(), Some(&[11, 21, 31, 12, 22, 32][..]));
    }

    #[test]
    fn test_add_rejects_mismatch() {
        let a = Tensor::from_values("a", &[2], &[1.0f32, 2.0]).unwrap();
        let b = Tensor::from_values("b", &[3], &[1.0f32, 2.0, 3.0]).unwrap();
        let c = Tensor::from_values("c", &[2], &[1.0f64, 2.0]).unwrap();
        let mut op = Add;

        let mut out = outputs(1);
        assert!(!run(&mut op, &[Some(&a), Some(&b)], &mut out));
        assert!(!run(&mut op, &[Some(&a), Some(&c)], &mut out));
        assert_eq!(out[0].as_ref().unwrap().dtype(), DType::Undefined);
    }

    #[test]
    fn test_add_arity() {
        let mut op = Add;
        assert!(!Harness::new("Add", 14, 1, 1).init(&mut op));
    }

    #[test]
    fn test_add_opset_tables() {
        let registry = OperatorRegistry::with_defaults();
        let resolves = |opset, dtype| {
            registry
                .resolve(&OpQuery {
                    op_type: "Add",
                    domain: "",
                    opset,
                    input_dtypes: &[dtype, dtype],
                })
                .is_some()
        };
        assert!(resolves(14, DType::I8));
        assert!(!resolves(13, DType::I8));
        assert!(resolves(13, DType::BF16));
        assert!(!resolves(12, DType::BF16));
        assert!(resolves(7, DType::F32));
        assert!(!resolves(6, DType::F32));
    }
}
