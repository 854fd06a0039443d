// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The context: a parsed model with its tensors, resolvers and graph.
//!
//! # Example
//! ```no_run
//! use runtime::Context;
//! use std::collections::HashMap;
//! use std::path::Path;
//!
//! let mut ctx = Context::from_file(Path::new("model.onnx"), Vec::new(), HashMap::new())?;
//! if let Some(x) = ctx.tensor_mut("input") {
//!     x.apply_values(&[0.5f32; 4])?;
//! }
//! let report = ctx.run();
//! println!("{}", report.summary());
//! println!("{}", ctx.dump(true));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::arena::{TensorArena, TensorId};
use crate::graph::Graph;
use crate::metrics::RunReport;
use crate::resolver::{OperatorRegistry, Resolver};
use crate::RuntimeError;
use model_ir::OnnxModel;
use std::collections::HashMap;
use std::path::Path;
use tensor_core::Tensor;

/// Owns everything needed to execute a model.
///
/// Dropping the context exits every bound kernel before tensors, resolvers
/// and the model are released.
pub struct Context {
    // Field order is drop order.
    graph: Graph,
    arena: TensorArena,
    resolvers: Vec<Box<dyn Resolver>>,
    model: OnnxModel,
    shape_params: HashMap<String, i64>,
    profiling: bool,
}

impl Context {
    /// Decodes a model buffer and builds its graph.
    ///
    /// `resolvers` are consulted before the built-in operator catalog.
    /// `shape_params` resolves symbolic input axes by name.
    pub fn from_bytes(
        buf: &[u8],
        resolvers: Vec<Box<dyn Resolver>>,
        shape_params: HashMap<String, i64>,
    ) -> Result<Self, RuntimeError> {
        let model = OnnxModel::from_bytes(buf)?;
        Self::from_model(model, resolvers, shape_params)
    }

    /// Memory-maps a model file and builds its graph.
    pub fn from_file(
        path: &Path,
        resolvers: Vec<Box<dyn Resolver>>,
        shape_params: HashMap<String, i64>,
    ) -> Result<Self, RuntimeError> {
        let model = OnnxModel::from_file(path)?;
        Self::from_model(model, resolvers, shape_params)
    }

    pub fn from_model(
        model: OnnxModel,
        mut resolvers: Vec<Box<dyn Resolver>>,
        shape_params: HashMap<String, i64>,
    ) -> Result<Self, RuntimeError> {
        resolvers.push(Box::new(OperatorRegistry::with_defaults()));

        let mut arena = TensorArena::new();
        let graph = Graph::build(&model, &mut arena, &resolvers, &shape_params)?;
        tracing::info!(
            graph = %model.graph().name,
            nodes = graph.len(),
            resolvers = resolvers.len(),
            "context ready"
        );

        Ok(Self {
            graph,
            arena,
            resolvers,
            model,
            shape_params,
            profiling: false,
        })
    }

    pub fn model(&self) -> &OnnxModel {
        &self.model
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn arena(&self) -> &TensorArena {
        &self.arena
    }

    pub fn shape_params(&self) -> &HashMap<String, i64> {
        &self.shape_params
    }

    /// Resolver names in lookup order.
    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    pub fn tensor_id(&self, name: &str) -> Option<TensorId> {
        self.arena.id(name)
    }

    pub fn tensor(&self, name: &str) -> Option<&Tensor> {
        self.arena.by_name(name)
    }

    /// Mutable access for writing inputs between passes.
    pub fn tensor_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.arena.by_name_mut(name)
    }

    /// Enables per-node timings in [`RunReport::node_metrics`].
    pub fn set_profiling(&mut self, enabled: bool) {
        self.profiling = enabled;
    }

    /// Runs one pass over the graph.
    pub fn run(&mut self) -> RunReport {
        self.graph
            .run(&mut self.arena, &self.resolvers, self.profiling)
    }

    /// Renders the model header and every node with its tensors.
    pub fn dump(&self, detail: bool) -> String {
        crate::dump::dump_context(self, detail)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("graph", &self.model.graph().name)
            .field("nodes", &self.graph.len())
            .field("tensors", &self.arena.len())
            .field("resolvers", &self.resolver_names())
            .field("profiling", &self.profiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::GraphBuilder;
    use tensor_core::DType;

    fn add_model() -> OnnxModel {
        GraphBuilder::new("add")
            .opset("", 14)
            .input("a", DType::F32, &[2])
            .initializer(Tensor::from_values("b", &[2], &[10.0f32, 20.0]).unwrap())
            .node("add0", "Add", &["a", "b"], &["c"])
            .output("c", DType::F32, &[2])
            .build()
    }

    #[test]
    fn test_build_namespace() {
        let ctx = Context::from_model(add_model(), Vec::new(), HashMap::new()).unwrap();
        assert_eq!(ctx.graph().len(), 1);
        assert_eq!(ctx.arena().len(), 3);
        assert_eq!(ctx.tensor("b").unwrap().as_slice::<f32>(), Some(&[10.0f32, 20.0][..]));
        assert_eq!(ctx.tensor("c").unwrap().dims(), &[2]);
        assert_eq!(ctx.resolver_names(), vec!["default"]);

        let node = ctx.graph().node("add0").unwrap();
        assert_eq!(node.opset(), 14);
        assert_eq!(node.resolver_slot(), Some(0));
        assert!(!node.is_initialized());
        assert!(node.last_input_state().is_none());
    }

    #[test]
    fn test_run_add() {
        let mut ctx = Context::from_model(add_model(), Vec::new(), HashMap::new()).unwrap();
        ctx.tensor_mut("a")
            .unwrap()
            .apply_values(&[1.0f32, 2.0])
            .unwrap();
        let report = ctx.run();
        assert_eq!(report.computed, 1);
        assert!(report.is_complete());
        assert_eq!(ctx.tensor("c").unwrap().as_slice::<f32>(), Some(&[11.0f32, 22.0][..]));
        assert!(ctx.graph().node("add0").unwrap().is_initialized());
    }

    #[test]
    fn test_profiling_records_nodes() {
        let mut ctx = Context::from_model(add_model(), Vec::new(), HashMap::new()).unwrap();
        ctx.set_profiling(true);
        let report = ctx.run();
        assert_eq!(report.node_metrics.len(), 1);
        assert!(report.node_metrics[0].rebound);
        let second = ctx.run();
        assert!(!second.node_metrics[0].rebound);
        assert_eq!(second.rebound, 0);
    }

    #[test]
    fn test_shape_params_resolve_inputs() {
        let model = GraphBuilder::new("sym")
            .opset("", 14)
            .input_symbolic(
                "x",
                DType::F32,
                &[model_ir::Dim::Param("batch".into()), model_ir::Dim::Fixed(3)],
            )
            .build();
        let params = HashMap::from([("batch".to_string(), 5)]);
        let ctx = Context::from_model(model, Vec::new(), params).unwrap();
        assert_eq!(ctx.tensor("x").unwrap().dims(), &[5, 3]);
        assert_eq!(ctx.tensor("x").unwrap().ndata(), 15);
    }

    #[test]
    fn test_missing_graph_fails() {
        // An empty buffer decodes to a model without a graph.
        assert!(matches!(
            Context::from_bytes(&[], Vec::new(), HashMap::new()),
            Err(RuntimeError::Model(model_ir::ModelError::MissingGraph))
        ));
    }

    #[test]
    fn test_truncated_model_fails() {
        let mut buf = add_model().to_bytes();
        buf.truncate(buf.len() / 2);
        assert!(Context::from_bytes(&buf, Vec::new(), HashMap::new()).is_err());
    }

    #[test]
    fn test_bad_initializer_aborts() {
        let mut proto = GraphBuilder::new("bad")
            .opset("", 14)
            .input("a", DType::F32, &[2])
            .initializer(Tensor::from_values("b", &[2], &[1.0f32, 2.0]).unwrap())
            .node("add0", "Add", &["a", "b"], &["c"])
            .into_proto();
        if let Some(graph) = proto.graph.as_mut() {
            graph.initializer[0].data_type = 99;
        }
        let model = OnnxModel::from_proto(proto).unwrap();
        assert!(matches!(
            Context::from_model(model, Vec::new(), HashMap::new()),
            Err(RuntimeError::GraphBuild { .. })
        ));
    }
}
