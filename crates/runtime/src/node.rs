// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One operator instance of the execution graph.

use crate::arena::{TensorArena, TensorId};
use crate::operator::{KernelIo, NodeInfo, Operator, Unsupported};
use crate::resolver::{OpQuery, Resolver};
use model_ir::proto::NodeProto;
use tensor_core::{DType, Tensor, TensorError};

/// Dtype and dims of one input as seen at the last binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pub dtype: DType,
    pub dims: Vec<i64>,
}

impl InputState {
    fn of(tensor: &Tensor) -> Self {
        Self {
            dtype: tensor.dtype(),
            dims: tensor.dims().to_vec(),
        }
    }
}

/// Input fingerprint: `None` until captured, then one entry per input slot
/// (`None` for absent optional inputs).
pub type Fingerprint = Option<Vec<Option<InputState>>>;

pub struct Node {
    proto: NodeProto,
    opset: i64,
    inputs: Vec<Option<TensorId>>,
    outputs: Vec<Option<TensorId>>,
    resolver: Option<usize>,
    kernel: Option<Box<dyn Operator>>,
    last_input_state: Fingerprint,
    initialized: bool,
    needs_reshape: bool,
}

impl Node {
    pub(crate) fn new(
        proto: NodeProto,
        opset: i64,
        inputs: Vec<Option<TensorId>>,
        outputs: Vec<Option<TensorId>>,
        resolver: Option<usize>,
    ) -> Self {
        Self {
            proto,
            opset,
            inputs,
            outputs,
            resolver,
            kernel: None,
            last_input_state: None,
            initialized: false,
            needs_reshape: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.proto.name
    }

    pub fn op_type(&self) -> &str {
        &self.proto.op_type
    }

    pub fn domain(&self) -> &str {
        model_ir::normalize_domain(&self.proto.domain)
    }

    pub fn opset(&self) -> i64 {
        self.opset
    }

    pub fn proto(&self) -> &NodeProto {
        &self.proto
    }

    pub fn inputs(&self) -> &[Option<TensorId>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Option<TensorId>] {
        &self.outputs
    }

    /// Index of the resolver chosen at build time.
    pub fn resolver_slot(&self) -> Option<usize> {
        self.resolver
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn last_input_state(&self) -> &Fingerprint {
        &self.last_input_state
    }

    /// Captures the current dtype and dims of every input slot.
    pub(crate) fn fingerprint(&self, arena: &TensorArena) -> Vec<Option<InputState>> {
        self.inputs
            .iter()
            .map(|id| id.map(|id| InputState::of(arena.get(id))))
            .collect()
    }

    /// Whether the node must be re-bound before the next reshape.
    pub(crate) fn is_dirty(&self, current: &[Option<InputState>]) -> bool {
        if !self.initialized {
            return true;
        }
        match &self.last_input_state {
            None => true,
            Some(last) => last.as_slice() != current,
        }
    }

    /// Every present input has a dtype and data.
    pub(crate) fn is_ready(&self, arena: &TensorArena) -> bool {
        self.inputs.iter().flatten().all(|&id| {
            let t = arena.get(id);
            t.dtype() != DType::Undefined && t.ndata() > 0
        })
    }

    /// Replaces the kernel with a fresh one for the current input dtypes.
    pub(crate) fn bind(
        &mut self,
        resolvers: &[Box<dyn Resolver>],
        fingerprint: Vec<Option<InputState>>,
    ) {
        self.release_kernel();

        let dtypes: Vec<DType> = fingerprint
            .iter()
            .map(|s| s.as_ref().map_or(DType::Undefined, |s| s.dtype))
            .collect();
        let query = OpQuery {
            op_type: &self.proto.op_type,
            domain: &self.proto.domain,
            opset: self.opset,
            input_dtypes: &dtypes,
        };
        let mut kernel = self
            .resolver
            .and_then(|slot| resolvers.get(slot))
            .and_then(|r| r.resolve(&query))
            .unwrap_or_else(|| Box::new(Unsupported::new()));

        let info = NodeInfo::new(&self.proto, self.opset);
        if !kernel.init(&info) {
            tracing::warn!(
                node = %self.proto.name,
                "init failed for {}-{}, node left unsupported",
                self.proto.op_type,
                self.opset
            );
            kernel = Box::new(Unsupported::new());
            kernel.init(&info);
        }

        tracing::debug!(node = %self.proto.name, op = %self.proto.op_type, "bound kernel");
        self.kernel = Some(kernel);
        self.initialized = true;
        self.last_input_state = Some(fingerprint);
        self.needs_reshape = true;
    }

    /// Runs `reshape` if pending, then `compute`.
    pub(crate) fn execute(&mut self, arena: &mut TensorArena) -> NodeOutcome {
        let Some(kernel) = self.kernel.as_mut() else {
            return NodeOutcome::Skipped;
        };

        let mut outputs: Vec<Option<Tensor>> = self
            .outputs
            .iter()
            .map(|id| id.map(|id| arena.take(id)))
            .collect();

        let outcome = {
            let inputs = self
                .inputs
                .iter()
                .map(|id| id.map(|id| arena.get(id)))
                .collect();
            let mut io = KernelIo::new(inputs, &mut outputs);
            run_kernel(kernel.as_mut(), &mut io, &mut self.needs_reshape)
        };

        for (id, tensor) in self.outputs.iter().zip(outputs) {
            if let (Some(id), Some(tensor)) = (id, tensor) {
                arena.restore(*id, tensor);
            }
        }
        outcome
    }

    fn release_kernel(&mut self) {
        if let Some(mut kernel) = self.kernel.take() {
            kernel.exit();
        }
    }
}

fn run_kernel(
    kernel: &mut dyn Operator,
    io: &mut KernelIo<'_>,
    needs_reshape: &mut bool,
) -> NodeOutcome {
    if *needs_reshape {
        if !kernel.reshape(io) {
            return NodeOutcome::ReshapeFailed;
        }
        *needs_reshape = false;
    }
    match kernel.compute(io) {
        Ok(()) if kernel.is_supported() => NodeOutcome::Computed,
        Ok(()) => NodeOutcome::Skipped,
        Err(e) => NodeOutcome::ComputeFailed(e),
    }
}

/// What happened to a node during one pass.
#[derive(Debug)]
pub(crate) enum NodeOutcome {
    Computed,
    Skipped,
    ReshapeFailed,
    ComputeFailed(TensorError),
}

impl Drop for Node {
    fn drop(&mut self) {
        self.release_kernel();
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.proto.name)
            .field("op_type", &self.proto.op_type)
            .field("opset", &self.opset)
            .field("resolver", &self.resolver)
            .field("initialized", &self.initialized)
            .finish()
    }
}
