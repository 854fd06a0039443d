// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `Gather`: picks slices of `data` along `axis` using an index tensor.

use super::{required_input, required_output, LATEST};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{gather, gather_output_dims};
use tensor_core::{DType, TensorError};

#[derive(Debug, Default)]
pub struct Gather {
    axis: i64,
    /// Normalized against the data rank in `reshape`.
    resolved_axis: usize,
}

impl Operator for Gather {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        self.axis = node.attributes().int("axis", 0);
        node.num_inputs() == 2 && node.num_outputs() == 1
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let (Some(data), Some(indices)) = (io.input(0), io.input(1)) else {
            return false;
        };
        if !matches!(indices.dtype(), DType::I32 | DType::I64) {
            return false;
        }
        let Ok((axis, dims)) = gather_output_dims(data.dims(), indices.dims(), self.axis) else {
            return false;
        };
        self.resolved_axis = axis;
        io.output_mut(0)
            .is_some_and(|y| y.reshape(&dims, data.dtype()).is_ok())
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let data = required_input(io, 0, "Gather")?;
        let indices = required_input(io, 1, "Gather")?;
        gather(data, indices, self.resolved_axis, required_output(io, 0, "Gather")?)
    }
}

fn new_gather(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(Gather::default())
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register("Gather", "", 1..=LATEST, &[], new_gather);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_util::{outputs, run, Harness};
    use model_ir::proto::AttributeProto;
    use tensor_core::Tensor;

    #[test]
    fn test_gather_rows_negative_index() {
        let data = Tensor::from_values("d", &[3, 2], &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let idx = Tensor::from_values("i", &[2], &[-1i64, 0]).unwrap();
        let mut op = Gather::default();
        assert!(Harness::new("Gather", 13, 2, 1).init(&mut op));
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&data), Some(&idx)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[2, 2]);
        assert_eq!(y.as_slice::<f32>(), Some(&[5.0f32, 6.0, 1.0, 2.0][..]));
    }

    #[test]
    fn test_gather_axis_one_strings() {
        let data = Tensor::from_strings("d", &[2, 2], &["a", "b", "c", "d"]).unwrap();
        let idx = Tensor::from_values("i", &[1], &[1i32]).unwrap();
        let mut op = Gather::default();
        let h = Harness::new("Gather", 13, 2, 1).attr(AttributeProto::from_int("axis", 1));
        assert!(h.init(&mut op));
        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&data), Some(&idx)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[2, 1]);
        assert_eq!(y.as_strings(), Some(&["b".to_string(), "d".to_string()][..]));
    }

    #[test]
    fn test_gather_rejects_float_indices() {
        let data = Tensor::new("d", DType::F32, &[2]);
        let idx = Tensor::new("i", DType::F32, &[1]);
        let mut out = outputs(1);
        assert!(!run(&mut Gather::default(), &[Some(&data), Some(&idx)], &mut out));
    }
}
