// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `ReduceMin`: minimum over a set of axes.
//!
//! Up to opset 17 the axes come from the `axes` attribute. From opset 18
//! they come from an optional int64 second input, and
//! `noop_with_empty_axes = 1` turns an empty axes list into a copy.

use super::{int64_values, required_input, required_output, LATEST, WIDE_NUMERIC_NO_BF16};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{reduce_min, ReducePlan};
use tensor_core::{DType, Tensor, TensorError};

const REDUCE_TYPES: &[DType] = &[
    DType::I8,
    DType::I32,
    DType::I64,
    DType::U8,
    DType::U32,
    DType::U64,
    DType::BF16,
    DType::F16,
    DType::F32,
    DType::F64,
];

const REDUCE_TYPES_NO_BF16: &[DType] = &[
    DType::I8,
    DType::I32,
    DType::I64,
    DType::U8,
    DType::U32,
    DType::U64,
    DType::F16,
    DType::F32,
    DType::F64,
];

#[derive(Debug, Default)]
pub struct ReduceMin {
    axes_from_input: bool,
    attr_axes: Vec<i64>,
    keepdims: bool,
    noop_with_empty_axes: bool,
    /// Axes the current plan was built from.
    axes: Vec<i64>,
    /// `None` while the node copies its input through.
    plan: Option<ReducePlan>,
}

impl ReduceMin {
    fn current_axes(&self, io: &KernelIo<'_>) -> Vec<i64> {
        if self.axes_from_input {
            io.input(1).and_then(int64_values).unwrap_or_default()
        } else {
            self.attr_axes.clone()
        }
    }

    fn is_noop(&self, axes: &[i64]) -> bool {
        axes.is_empty() && self.noop_with_empty_axes
    }

    fn plan_output(&mut self, x: &Tensor, axes: Vec<i64>, y: &mut Tensor) -> Result<(), TensorError> {
        if self.is_noop(&axes) {
            y.reshape_identity(x, x.dtype())?;
            self.plan = None;
        } else {
            let plan = ReducePlan::new(x.dims(), &axes, self.keepdims)?;
            y.reshape(plan.out_dims(), x.dtype())?;
            self.plan = Some(plan);
        }
        self.axes = axes;
        Ok(())
    }
}

impl Operator for ReduceMin {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        if node.num_outputs() != 1 {
            return false;
        }
        let attrs = node.attributes();
        self.axes_from_input = node.opset >= 18;
        let inputs_ok = if self.axes_from_input {
            (1..=2).contains(&node.num_inputs())
        } else {
            node.num_inputs() == 1
        };
        self.attr_axes = attrs.ints("axes").to_vec();
        self.keepdims = attrs.int("keepdims", 1) != 0;
        self.noop_with_empty_axes = attrs.int("noop_with_empty_axes", 0) != 0;
        inputs_ok
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let Some(x) = io.input(0) else {
            return false;
        };
        let axes = self.current_axes(io);
        let Some(y) = io.output_mut(0) else {
            return false;
        };
        match self.plan_output(x, axes, y) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "ReduceMin axes rejected");
                false
            }
        }
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let x = required_input(io, 0, "ReduceMin")?;
        // Axes fed through an input may change without the dims changing.
        let axes = self.current_axes(io);
        let y = required_output(io, 0, "ReduceMin")?;
        if axes != self.axes {
            self.plan_output(x, axes, y)?;
        }
        match &self.plan {
            Some(plan) => reduce_min(x, plan, y),
            None => {
                y.apply_bytes(&x.to_bytes());
                Ok(())
            }
        }
    }
}

fn new_reduce_min(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(ReduceMin::default())
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry
        .register("ReduceMin", "", 13..=LATEST, REDUCE_TYPES, new_reduce_min)
        .register("ReduceMin", "", 12..=12, REDUCE_TYPES_NO_BF16, new_reduce_min)
        .register("ReduceMin", "", 1..=11, WIDE_NUMERIC_NO_BF16, new_reduce_min);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_util::{outputs, run, Harness};
    use model_ir::proto::AttributeProto;

    fn x() -> Tensor {
        Tensor::from_values("x", &[2, 3], &[5.0f32, 1.0, 7.0, -2.0, 8.0, 3.0]).unwrap()
    }

    #[test]
    fn test_reduce_min_axes_attribute() {
        let mut op = ReduceMin::default();
        let h = Harness::new("ReduceMin", 13, 1, 1)
            .attr(AttributeProto::from_ints("axes", &[-1]))
            .attr(AttributeProto::from_int("keepdims", 0));
        assert!(h.init(&mut op));

        let x = x();
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&x)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[2]);
        assert_eq!(y.as_slice::<f32>(), Some(&[1.0f32, -2.0][..]));
    }

    #[test]
    fn test_reduce_min_all_axes_keepdims() {
        let mut op = ReduceMin::default();
        assert!(Harness::new("ReduceMin", 11, 1, 1).init(&mut op));
        let x = x();
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&x)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[1, 1]);
        assert_eq!(y.as_slice::<f32>(), Some(&[-2.0f32][..]));
    }

    #[test]
    fn test_reduce_min_axes_input() {
        let mut op = ReduceMin::default();
        assert!(Harness::new("ReduceMin", 18, 2, 1).init(&mut op));
        let x = x();
        let axes = Tensor::from_values("axes", &[1], &[0i64]).unwrap();
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&x), Some(&axes)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[1, 3]);
        assert_eq!(y.as_slice::<f32>(), Some(&[-2.0f32, 1.0, 3.0][..]));
    }

    #[test]
    fn test_reduce_min_noop_with_empty_axes() {
        let mut op = ReduceMin::default();
        let h = Harness::new("ReduceMin", 18, 2, 1)
            .attr(AttributeProto::from_int("noop_with_empty_axes", 1))
            .absent_input(1);
        assert!(h.init(&mut op));
        let x = x();
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&x), None], &mut out));
        assert!(out[0].as_ref().unwrap().equal(&x));
    }

    #[test]
    fn test_reduce_min_bad_axis() {
        let mut op = ReduceMin::default();
        let h = Harness::new("ReduceMin", 13, 1, 1)
            .attr(AttributeProto::from_ints("axes", &[2]));
        assert!(h.init(&mut op));
        let x = x();
        let mut out = outputs(1);
        assert!(!run(&mut op, &[Some(&x)], &mut out));
    }

    #[test]
    fn test_reduce_min_resolves_at_recent_opsets() {
        use crate::resolver::Resolver;

        let registry = OperatorRegistry::with_defaults();
        for opset in [18, 21, 22, 30] {
            let query = OpQuery {
                op_type: "ReduceMin",
                domain: "",
                opset,
                input_dtypes: &[DType::F32, DType::I64],
            };
            let mut op = registry.resolve(&query).expect("ReduceMin kernel");
            assert!(Harness::new("ReduceMin", opset, 2, 1).init(op.as_mut()));

            let x = x();
            let axes = Tensor::from_values("axes", &[2], &[0i64, 1]).unwrap();
            let mut out = outputs(1);
            assert!(run(op.as_mut(), &[Some(&x), Some(&axes)], &mut out));
            let y = out[0].as_ref().unwrap();
            assert_eq!(y.dims(), &[1, 1]);
            assert_eq!(y.as_slice::<f32>(), Some(&[-2.0f32][..]));
        }
    }

    #[test]
    fn test_reduce_min_arity_by_opset() {
        assert!(!Harness::new("ReduceMin", 13, 2, 1).init(&mut ReduceMin::default()));
        assert!(Harness::new("ReduceMin", 18, 1, 1).init(&mut ReduceMin::default()));
    }
}
