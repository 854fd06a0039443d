// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in operator catalog.
//!
//! Each module holds one kernel and registers it with the opset ranges and
//! first-input dtypes it supports. The numeric work lives in
//! `tensor_core::ops`; kernels here validate node arity, read attributes,
//! size outputs in `reshape` and call the numeric routine in `compute`.

mod add;
mod conv_integer;
mod dynamic_quantize_linear;
mod dynamic_quantize_lstm;
mod gather;
mod lstm;
mod matmul;
mod matmul_integer;
mod reduce_min;
mod unary;

use crate::operator::KernelIo;
use crate::resolver::OperatorRegistry;
use tensor_core::{DType, Tensor, TensorError};

pub use add::Add;
pub use conv_integer::ConvInteger;
pub use dynamic_quantize_linear::DynamicQuantizeLinear;
pub use dynamic_quantize_lstm::DynamicQuantizeLstm;
pub use gather::Gather;
pub use lstm::Lstm;
pub use matmul::MatMul;
pub use matmul_integer::MatMulInteger;
pub use reduce_min::ReduceMin;
pub use unary::Unary;

/// Domain of the Microsoft contrib operators.
pub const MS_DOMAIN: &str = "com.microsoft";

/// Highest opset any built-in kernel claims.
pub(crate) const LATEST: i64 = i64::MAX;

// ── DType sets ─────────────────────────────────────────────────────

pub(crate) const ALL_NUMERIC: &[DType] = &[
    DType::I8,
    DType::I16,
    DType::I32,
    DType::I64,
    DType::U8,
    DType::U16,
    DType::U32,
    DType::U64,
    DType::F16,
    DType::BF16,
    DType::F32,
    DType::F64,
];

/// Wide integers and every float kind.
pub(crate) const WIDE_NUMERIC: &[DType] = &[
    DType::I32,
    DType::I64,
    DType::U32,
    DType::U64,
    DType::BF16,
    DType::F16,
    DType::F32,
    DType::F64,
];

/// [`WIDE_NUMERIC`] before bfloat16 was admitted.
pub(crate) const WIDE_NUMERIC_NO_BF16: &[DType] = &[
    DType::I32,
    DType::I64,
    DType::U32,
    DType::U64,
    DType::F16,
    DType::F32,
    DType::F64,
];

pub(crate) const FLOATS: &[DType] = &[DType::F16, DType::F32, DType::F64];

pub(crate) const FLOATS_BF16: &[DType] = &[DType::BF16, DType::F16, DType::F32, DType::F64];

/// Registers every built-in kernel.
pub(crate) fn register_defaults(registry: &mut OperatorRegistry) {
    add::register(registry);
    matmul::register(registry);
    matmul_integer::register(registry);
    conv_integer::register(registry);
    reduce_min::register(registry);
    gather::register(registry);
    unary::register(registry);
    lstm::register(registry);
    dynamic_quantize_lstm::register(registry);
    dynamic_quantize_linear::register(registry);
}

// ── Kernel helpers ─────────────────────────────────────────────────

/// Input `index`, or an error naming the missing slot.
pub(crate) fn required_input<'a>(
    io: &KernelIo<'a>,
    index: usize,
    op: &'static str,
) -> Result<&'a Tensor, TensorError> {
    io.input(index).ok_or_else(|| TensorError::Numeric {
        op,
        detail: format!("missing input {index}"),
    })
}

/// Output `index`, or an error naming the missing slot.
pub(crate) fn required_output<'b>(
    io: &'b mut KernelIo<'_>,
    index: usize,
    op: &'static str,
) -> Result<&'b mut Tensor, TensorError> {
    io.output_mut(index).ok_or_else(|| TensorError::Numeric {
        op,
        detail: format!("missing output {index}"),
    })
}

/// Reads an `int64` tensor as a list of values.
pub(crate) fn int64_values(tensor: &Tensor) -> Option<Vec<i64>> {
    tensor.as_slice::<i64>().map(<[i64]>::to_vec)
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Drives a kernel through init, reshape and compute without a graph.

    use crate::operator::{KernelIo, NodeInfo, Operator};
    use model_ir::proto::{AttributeProto, NodeProto};
    use tensor_core::Tensor;

    pub struct Harness {
        pub proto: NodeProto,
        pub opset: i64,
    }

    impl Harness {
        pub fn new(op_type: &str, opset: i64, inputs: usize, outputs: usize) -> Self {
            Self {
                proto: NodeProto {
                    name: format!("{op_type}_0"),
                    op_type: op_type.to_string(),
                    input: (0..inputs).map(|i| format!("in{i}")).collect(),
                    output: (0..outputs).map(|i| format!("out{i}")).collect(),
                    ..Default::default()
                },
                opset,
            }
        }

        pub fn attr(mut self, attr: AttributeProto) -> Self {
            self.proto.attribute.push(attr);
            self
        }

        /// Marks input slot `index` as absent.
        pub fn absent_input(mut self, index: usize) -> Self {
            self.proto.input[index].clear();
            self
        }

        pub fn init(&self, op: &mut dyn Operator) -> bool {
            op.init(&NodeInfo::new(&self.proto, self.opset))
        }
    }

    /// Undefined output placeholders named after their slot.
    pub fn outputs(n: usize) -> Vec<Option<Tensor>> {
        (0..n)
            .map(|i| Some(Tensor::undefined(format!("out{i}"))))
            .collect()
    }

    /// Runs reshape and, if it succeeds, compute. Returns reshape's result.
    pub fn run(
        op: &mut dyn Operator,
        inputs: &[Option<&Tensor>],
        outputs: &mut [Option<Tensor>],
    ) -> bool {
        let mut io = KernelIo::new(inputs.to_vec(), outputs);
        if !op.reshape(&mut io) {
            return false;
        }
        op.compute(&mut io).expect("compute");
        true
    }
}
