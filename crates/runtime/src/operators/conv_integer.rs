// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `ConvInteger`: 8-bit convolution accumulated in `int32`.
//!
//! Inputs: `x`, `w`, optional `x_zero_point`, optional `w_zero_point`.

use super::{required_input, required_output, LATEST};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{conv_integer, is_int8, AutoPad, ConvParams, ConvPlan};
use tensor_core::{DType, TensorError};

#[derive(Debug, Default)]
pub struct ConvInteger {
    params: ConvParams,
    plan: Option<ConvPlan>,
}

impl Operator for ConvInteger {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        if !(2..=4).contains(&node.num_inputs()) || node.num_outputs() != 1 {
            return false;
        }
        let attrs = node.attributes();
        let Some(auto_pad) = AutoPad::parse(&attrs.string("auto_pad", "NOTSET")) else {
            return false;
        };
        self.params = ConvParams {
            auto_pad,
            group: attrs.int("group", 1),
            kernel_shape: attrs.ints("kernel_shape").to_vec(),
            dilations: attrs.ints("dilations").to_vec(),
            pads: attrs.ints("pads").to_vec(),
            strides: attrs.ints("strides").to_vec(),
        };
        self.params.group > 0
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let (Some(x), Some(w)) = (io.input(0), io.input(1)) else {
            return false;
        };
        if !is_int8(x.dtype()) || !is_int8(w.dtype()) {
            return false;
        }
        let plan = match ConvPlan::new(x.dims(), w.dims(), &self.params) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::debug!(error = %e, "ConvInteger geometry rejected");
                return false;
            }
        };
        let ok = io
            .output_mut(0)
            .is_some_and(|y| y.reshape(plan.out_dims(), DType::I32).is_ok());
        self.plan = Some(plan);
        ok
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let plan = self.plan.as_ref().ok_or_else(|| TensorError::Numeric {
            op: "ConvInteger",
            detail: "compute before reshape".to_string(),
        })?;
        let x = required_input(io, 0, "ConvInteger")?;
        let w = required_input(io, 1, "ConvInteger")?;
        let (x_zp, w_zp) = (io.input(2), io.input(3));
        conv_integer(x, w, x_zp, w_zp, plan, required_output(io, 0, "ConvInteger")?)
    }
}

fn new_conv_integer(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(ConvInteger::default())
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register(
        "ConvInteger",
        "",
        10..=LATEST,
        &[DType::I8, DType::U8],
        new_conv_integer,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::test_util::{outputs, run, Harness};
    use model_ir::proto::AttributeProto;
    use tensor_core::Tensor;

    #[test]
    fn test_conv_integer_same_upper() {
        // 3x3 box filter over x - 1, padded to keep the 3x3 extent.
        let x = Tensor::from_values("x", &[1, 1, 3, 3], &[1u8, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
        let w = Tensor::from_values("w", &[1, 1, 3, 3], &[1u8; 9]).unwrap();
        let x_zp = Tensor::scalar("x_zp", 1u8);

        let mut op = ConvInteger::default();
        let h = Harness::new("ConvInteger", 10, 3, 1)
            .attr(AttributeProto::from_string("auto_pad", "SAME_UPPER"))
            .attr(AttributeProto::from_ints("kernel_shape", &[3, 3]));
        assert!(h.init(&mut op));

        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&x), Some(&w), Some(&x_zp)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dtype(), DType::I32);
        assert_eq!(y.dims(), &[1, 1, 3, 3]);
        // [[0, 1, 2], [3, 4, 5], [6, 7, 8]] summed over each 3x3 neighborhood.
        assert_eq!(
            y.as_slice::<i32>(),
            Some(&[8, 15, 12, 21, 36, 27, 20, 33, 24][..])
        );
    }

    #[test]
    fn test_conv_integer_strided_signed() {
        let x = Tensor::from_values("x", &[1, 1, 4], &[1i8, -2, 3, -4]).unwrap();
        let w = Tensor::from_values("w", &[2, 1, 2], &[1i8, 1, 2, -1]).unwrap();

        let mut op = ConvInteger::default();
        let h = Harness::new("ConvInteger", 10, 2, 1)
            .attr(AttributeProto::from_ints("strides", &[2]));
        assert!(h.init(&mut op));

        let mut out = outputs(1);
        assert!(run(&mut op, &[Some(&x), Some(&w)], &mut out));
        let y = out[0].as_ref().unwrap();
        assert_eq!(y.dims(), &[1, 2, 2]);
        // Channel 0 sums pairs, channel 1 takes 2a - b.
        assert_eq!(y.as_slice::<i32>(), Some(&[-1, -1, 4, 10][..]));
    }

    #[test]
    fn test_conv_integer_rejects_bad_attributes() {
        let h = Harness::new("ConvInteger", 10, 2, 1)
            .attr(AttributeProto::from_string("auto_pad", "SAME"));
        assert!(!h.init(&mut ConvInteger::default()));
        let h = Harness::new("ConvInteger", 10, 2, 1).attr(AttributeProto::from_int("group", 0));
        assert!(!h.init(&mut ConvInteger::default()));
        assert!(!Harness::new("ConvInteger", 10, 1, 1).init(&mut ConvInteger::default()));
    }

    #[test]
    fn test_conv_integer_rejects_float_and_channel_mismatch() {
        let mut op = ConvInteger::default();
        assert!(Harness::new("ConvInteger", 10, 2, 1).init(&mut op));

        let x = Tensor::new("x", DType::F32, &[1, 1, 2, 2]);
        let w = Tensor::new("w", DType::U8, &[1, 1, 1, 1]);
        let mut out = outputs(1);
        assert!(!run(&mut op, &[Some(&x), Some(&w)], &mut out));

        let x = Tensor::new("x", DType::U8, &[1, 3, 2, 2]);
        let w = Tensor::new("w", DType::U8, &[1, 2, 1, 1]);
        assert!(!run(&mut op, &[Some(&x), Some(&w)], &mut out));
        assert_eq!(out[0].as_ref().unwrap().dtype(), DType::Undefined);
    }
}
