// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The kernel interface every operator implements.
//!
//! A kernel is created when its node is bound and lives until the node is
//! re-bound or dropped. Its fields are the node's private state.
//!
//! ```text
//! bind ─▶ init ─▶ reshape ─▶ compute ─▶ compute ─▶ … ─▶ exit
//!                    ▲                                   │
//!                    └──── inputs changed: re-bind ◀─────┘
//! ```

use model_ir::{proto::NodeProto, NodeAttributes};
use tensor_core::{Tensor, TensorError};

/// Static facts about a node, handed to [`Operator::init`].
#[derive(Debug, Clone, Copy)]
pub struct NodeInfo<'a> {
    pub name: &'a str,
    pub op_type: &'a str,
    pub domain: &'a str,
    pub opset: i64,
    proto: &'a NodeProto,
}

impl<'a> NodeInfo<'a> {
    pub(crate) fn new(proto: &'a NodeProto, opset: i64) -> Self {
        Self {
            name: &proto.name,
            op_type: &proto.op_type,
            domain: &proto.domain,
            opset,
            proto,
        }
    }

    /// Number of input slots, including absent optional ones.
    pub fn num_inputs(&self) -> usize {
        self.proto.input.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.proto.output.len()
    }

    /// Returns `true` if input slot `index` names a tensor.
    pub fn has_input(&self, index: usize) -> bool {
        self.proto.input.get(index).is_some_and(|n| !n.is_empty())
    }

    pub fn has_output(&self, index: usize) -> bool {
        self.proto.output.get(index).is_some_and(|n| !n.is_empty())
    }

    pub fn attributes(&self) -> NodeAttributes<'a> {
        NodeAttributes::new(self.proto)
    }
}

/// Tensors a kernel works on during one `reshape` or `compute` call.
///
/// Inputs are shared borrows from the arena; outputs are owned by the call
/// and returned to the arena afterwards.
#[derive(Debug)]
pub struct KernelIo<'a> {
    inputs: Vec<Option<&'a Tensor>>,
    outputs: &'a mut [Option<Tensor>],
}

impl<'a> KernelIo<'a> {
    pub fn new(inputs: Vec<Option<&'a Tensor>>, outputs: &'a mut [Option<Tensor>]) -> Self {
        Self { inputs, outputs }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Input slot `index`, or `None` when absent. The borrow is not tied to
    /// `self`, so inputs can be held while an output is mutated.
    pub fn input(&self, index: usize) -> Option<&'a Tensor> {
        self.inputs.get(index).copied().flatten()
    }

    pub fn output(&self, index: usize) -> Option<&Tensor> {
        self.outputs.get(index).and_then(Option::as_ref)
    }

    pub fn output_mut(&mut self, index: usize) -> Option<&mut Tensor> {
        self.outputs.get_mut(index).and_then(Option::as_mut)
    }

    /// All output slots at once, for kernels that fill several outputs.
    pub fn outputs_mut(&mut self) -> &mut [Option<Tensor>] {
        self.outputs
    }
}

/// A kernel bound to one node.
///
/// `init` and `reshape` report failure through their return value; the run
/// loop logs it and continues with the next node.
pub trait Operator: Send {
    /// Validates arity and reads attributes.
    fn init(&mut self, node: &NodeInfo<'_>) -> bool;

    /// Infers output dtypes and dims and resizes the output buffers.
    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool;

    /// Fills the outputs from the inputs.
    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError>;

    /// Called once before the kernel is dropped or replaced.
    fn exit(&mut self) {}

    /// `false` for kernels that stand in for a missing implementation. The
    /// run loop reports their nodes as skipped.
    fn is_supported(&self) -> bool {
        true
    }
}

// ── Unsupported ────────────────────────────────────────────────────

/// Bound to nodes no resolver can serve. Never touches its outputs.
#[derive(Debug, Default)]
pub struct Unsupported {
    label: String,
    warned: bool,
}

impl Unsupported {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Operator for Unsupported {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        self.label = format!(
            "{}-{} ({})",
            node.op_type,
            node.opset,
            model_ir::normalize_domain(node.domain)
        );
        true
    }

    fn reshape(&mut self, _io: &mut KernelIo<'_>) -> bool {
        true
    }

    fn compute(&mut self, _io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        if !self.warned {
            tracing::warn!("Unsupported opset => {}", self.label);
            self.warned = true;
        }
        Ok(())
    }

    fn is_supported(&self) -> bool {
        false
    }
}
