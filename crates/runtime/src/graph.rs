// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution graph: tensor namespace construction and the run loop.
//!
//! Nodes execute in the order the model lists them. The model is expected
//! to be topologically sorted; no reordering or cycle check is done.

use crate::arena::TensorArena;
use crate::metrics::{NodeMetrics, RunReport};
use crate::node::{Node, NodeOutcome};
use crate::resolver::Resolver;
use crate::RuntimeError;
use model_ir::proto::ValueInfoProto;
use model_ir::{apply_proto, tensor_from_proto, tensor_from_value_info, OnnxModel};
use std::collections::HashMap;
use std::time::Instant;
use tensor_core::Tensor;

/// Ordered nodes of a model, bound against a context's tensor arena.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Populates `arena` with every tensor the model names and creates one
    /// node per model node.
    ///
    /// Steps:
    /// 1. Allocate declared inputs, outputs and value-infos; any of them that
    ///    is also an initializer gets the initializer payload.
    /// 2. Add undefined placeholders for node outputs not declared anywhere.
    /// 3. Decode initializers consumed by nodes but not declared as inputs.
    /// 4. Create nodes with their opset and resolver slot. Kernels are bound
    ///    lazily on the first pass.
    pub(crate) fn build(
        model: &OnnxModel,
        arena: &mut TensorArena,
        resolvers: &[Box<dyn Resolver>],
        shape_params: &HashMap<String, i64>,
    ) -> Result<Self, RuntimeError> {
        let graph = model.graph();

        // 1. Declared values.
        for info in graph
            .input
            .iter()
            .chain(&graph.output)
            .chain(&graph.value_info)
        {
            declare(arena, info, shape_params, |t| match model.initializer(t.name()) {
                Some(init) => apply_proto(t, init),
                None => Ok(()),
            })?;
        }

        // 2. Intermediate outputs.
        for name in graph.node.iter().flat_map(|n| &n.output) {
            if !name.is_empty() && !arena.contains(name) {
                arena.insert(Tensor::undefined(name.as_str()));
            }
        }

        // 3. Constant inputs.
        for node in &graph.node {
            for name in &node.input {
                if name.is_empty() || arena.contains(name) {
                    continue;
                }
                match model.initializer(name) {
                    Some(init) => {
                        let tensor =
                            tensor_from_proto(init).map_err(|e| RuntimeError::GraphBuild {
                                node: node.name.clone(),
                                detail: e.to_string(),
                            })?;
                        arena.insert(tensor);
                    }
                    None => {
                        tracing::warn!(
                            node = %node.name,
                            tensor = %name,
                            "input is neither declared nor produced"
                        );
                        arena.insert(Tensor::undefined(name.as_str()));
                    }
                }
            }
        }

        // 4. Nodes.
        let mut nodes = Vec::with_capacity(graph.node.len());
        for proto in &graph.node {
            let opset = model.opset_for(&proto.domain);
            let slot = |name: &String| {
                if name.is_empty() {
                    None
                } else {
                    arena.id(name)
                }
            };
            let inputs = proto.input.iter().map(slot).collect();
            let outputs = proto.output.iter().map(slot).collect();
            let resolver = resolvers
                .iter()
                .position(|r| r.supports(&proto.op_type, &proto.domain));
            if resolver.is_none() {
                tracing::debug!(
                    node = %proto.name,
                    "no resolver knows {}-{}",
                    proto.op_type,
                    opset
                );
            }
            nodes.push(Node::new(proto.clone(), opset, inputs, outputs, resolver));
        }

        tracing::info!(
            nodes = nodes.len(),
            tensors = arena.len(),
            "graph built"
        );
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Finds a node by name.
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    /// Executes one pass over every node.
    ///
    /// A node whose input dtypes or dims changed since its last binding is
    /// re-bound first. Nodes with missing input data are skipped; a failed
    /// reshape or compute is logged and the pass continues.
    pub(crate) fn run(
        &mut self,
        arena: &mut TensorArena,
        resolvers: &[Box<dyn Resolver>],
        profiling: bool,
    ) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::default();

        for node in &mut self.nodes {
            let node_start = Instant::now();

            let current = node.fingerprint(arena);
            let rebound = node.is_dirty(&current);
            if rebound {
                node.bind(resolvers, current);
                report.rebound += 1;
            }

            if !node.is_ready(arena) {
                tracing::debug!(node = %node.name(), "Not all inputs are ready");
                report.skipped += 1;
                continue;
            }

            match node.execute(arena) {
                NodeOutcome::Computed => report.computed += 1,
                NodeOutcome::Skipped => report.skipped += 1,
                NodeOutcome::ReshapeFailed => {
                    tracing::warn!(node = %node.name(), op = %node.op_type(), "Reshape problem");
                    report.failed += 1;
                }
                NodeOutcome::ComputeFailed(e) => {
                    tracing::warn!(node = %node.name(), error = %e, "Compute problem");
                    report.failed += 1;
                }
            }

            if profiling {
                report.record_node(NodeMetrics {
                    node: node.name().to_string(),
                    op_type: node.op_type().to_string(),
                    rebound,
                    duration: node_start.elapsed(),
                });
            }
        }

        report.total_duration = start.elapsed();
        tracing::debug!("{}", report.summary());
        report
    }
}

/// Allocates the tensor `info` declares unless the name is already taken.
fn declare(
    arena: &mut TensorArena,
    info: &ValueInfoProto,
    shape_params: &HashMap<String, i64>,
    fill: impl FnOnce(&mut Tensor) -> Result<(), model_ir::ModelError>,
) -> Result<(), RuntimeError> {
    if arena.contains(&info.name) {
        return Ok(());
    }
    if let Some(mut tensor) = tensor_from_value_info(info, shape_params)? {
        fill(&mut tensor)?;
        arena.insert(tensor);
    }
    Ok(())
}
