// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Programmatic model construction.
//!
//! Builds small models in memory, for tests, benchmarks and tools that
//! synthesize graphs without an exporter.
//!
//! # Example
//! ```
//! use model_ir::GraphBuilder;
//! use tensor_core::DType;
//!
//! let model = GraphBuilder::new("add")
//!     .opset("", 17)
//!     .input("a", DType::F32, &[2])
//!     .input("b", DType::F32, &[2])
//!     .node("add0", "Add", &["a", "b"], &["c"])
//!     .output("c", DType::F32, &[2])
//!     .build();
//! assert_eq!(model.graph().node.len(), 1);
//! ```

use crate::proto::{
    tensor_shape_proto::{dimension, Dimension},
    type_proto, AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto,
    TensorShapeProto, TypeProto, ValueInfoProto,
};
use crate::{tensor_to_proto, OnnxModel};
use tensor_core::{DType, Tensor};

/// IR version stamped on built models.
const IR_VERSION: i64 = 9;

/// Accumulates graph pieces and produces an [`OnnxModel`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    model: ModelProto,
    graph: GraphProto,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            model: ModelProto {
                ir_version: IR_VERSION,
                producer_name: env!("CARGO_PKG_NAME").to_string(),
                producer_version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            graph: GraphProto {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    /// Imports `version` of `domain` (empty for `ai.onnx`).
    pub fn opset(mut self, domain: &str, version: i64) -> Self {
        self.model.opset_import.push(OperatorSetIdProto {
            domain: domain.to_string(),
            version,
        });
        self
    }

    /// Declares a graph input with fixed dims.
    pub fn input(mut self, name: &str, dtype: DType, dims: &[i64]) -> Self {
        let dims: Vec<Dim> = dims.iter().map(|&d| Dim::Fixed(d)).collect();
        self.graph.input.push(value_info(name, dtype, &dims));
        self
    }

    /// Declares a graph input whose axes may be symbolic.
    pub fn input_symbolic(mut self, name: &str, dtype: DType, dims: &[Dim]) -> Self {
        self.graph.input.push(value_info(name, dtype, dims));
        self
    }

    pub fn output(mut self, name: &str, dtype: DType, dims: &[i64]) -> Self {
        let dims: Vec<Dim> = dims.iter().map(|&d| Dim::Fixed(d)).collect();
        self.graph.output.push(value_info(name, dtype, &dims));
        self
    }

    /// Records the type of an intermediate or constant value.
    pub fn value_info(mut self, name: &str, dtype: DType, dims: &[i64]) -> Self {
        let dims: Vec<Dim> = dims.iter().map(|&d| Dim::Fixed(d)).collect();
        self.graph.value_info.push(value_info(name, dtype, &dims));
        self
    }

    /// Adds a constant tensor named after `tensor`.
    pub fn initializer(mut self, tensor: Tensor) -> Self {
        self.graph.initializer.push(tensor_to_proto(&tensor));
        self
    }

    /// Appends a node in the default domain with no attributes.
    pub fn node(self, name: &str, op_type: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        self.node_with(name, op_type, "", inputs, outputs, Vec::new())
    }

    /// Appends a node with an explicit domain and attributes.
    pub fn node_with(
        mut self,
        name: &str,
        op_type: &str,
        domain: &str,
        inputs: &[&str],
        outputs: &[&str],
        attributes: Vec<AttributeProto>,
    ) -> Self {
        self.graph.node.push(NodeProto {
            name: name.to_string(),
            op_type: op_type.to_string(),
            domain: domain.to_string(),
            input: inputs.iter().map(|s| s.to_string()).collect(),
            output: outputs.iter().map(|s| s.to_string()).collect(),
            attribute: attributes,
            ..Default::default()
        });
        self
    }

    /// Returns the assembled protobuf model.
    pub fn into_proto(self) -> ModelProto {
        let mut model = self.model;
        model.graph = Some(self.graph);
        model
    }

    pub fn build(self) -> OnnxModel {
        let (meta, graph) = (self.model, self.graph);
        OnnxModel::from_parts(meta, graph)
    }
}

/// One declared axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Dim {
    Fixed(i64),
    Param(String),
    Unknown,
}

fn value_info(name: &str, dtype: DType, dims: &[Dim]) -> ValueInfoProto {
    let dim = dims
        .iter()
        .map(|d| Dimension {
            value: match d {
                Dim::Fixed(v) => Some(dimension::Value::DimValue(*v)),
                Dim::Param(p) => Some(dimension::Value::DimParam(p.clone())),
                Dim::Unknown => None,
            },
            ..Default::default()
        })
        .collect();
    ValueInfoProto {
        name: name.to_string(),
        r#type: Some(TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type: dtype.onnx_id(),
                shape: Some(TensorShapeProto { dim }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}
