// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A decoded ONNX model and its serializable summary.

use crate::proto::{
    type_proto, tensor_shape_proto::dimension, GraphProto, ModelProto, OperatorSetIdProto,
    TensorProto, ValueInfoProto,
};
use crate::ModelError;
use prost::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tensor_core::DType;

/// Canonical name of the default operator domain.
pub const DEFAULT_DOMAIN: &str = "ai.onnx";

/// Maps the empty domain to [`DEFAULT_DOMAIN`].
pub fn normalize_domain(domain: &str) -> &str {
    if domain.is_empty() {
        DEFAULT_DOMAIN
    } else {
        domain
    }
}

/// A parsed model whose main graph is known to be present.
#[derive(Debug, Clone)]
pub struct OnnxModel {
    /// Model metadata with the graph moved out into `graph`.
    meta: ModelProto,
    graph: GraphProto,
}

impl OnnxModel {
    /// Decodes a serialized model.
    ///
    /// # Errors
    /// [`ModelError::Decode`] for a malformed buffer and
    /// [`ModelError::MissingGraph`] if the model has no graph.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, ModelError> {
        let proto = ModelProto::decode(buf)?;
        Self::from_proto(proto)
    }

    /// Wraps an already decoded model.
    pub fn from_proto(mut proto: ModelProto) -> Result<Self, ModelError> {
        let graph = proto.graph.take().ok_or(ModelError::MissingGraph)?;
        tracing::debug!(
            ir_version = proto.ir_version,
            nodes = graph.node.len(),
            initializers = graph.initializer.len(),
            "decoded model"
        );
        Ok(Self { meta: proto, graph })
    }

    pub(crate) fn from_parts(meta: ModelProto, graph: GraphProto) -> Self {
        Self { meta, graph }
    }

    /// Memory-maps and decodes a model file.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before returning; the
        // decoded model owns copies of everything it keeps.
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        let model = Self::from_bytes(&mmap)?;
        tracing::info!(
            path = %path.display(),
            bytes = mmap.len(),
            "loaded model"
        );
        Ok(model)
    }

    /// Re-encodes the model.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut proto = self.meta.clone();
        proto.graph = Some(self.graph.clone());
        proto.encode_to_vec()
    }

    pub fn ir_version(&self) -> i64 {
        self.meta.ir_version
    }

    pub fn producer_name(&self) -> &str {
        &self.meta.producer_name
    }

    pub fn producer_version(&self) -> &str {
        &self.meta.producer_version
    }

    pub fn domain(&self) -> &str {
        &self.meta.domain
    }

    pub fn opset_imports(&self) -> &[OperatorSetIdProto] {
        &self.meta.opset_import
    }

    /// Returns the imported opset version for `domain`, or 0 when the
    /// model does not import it. The empty domain means `ai.onnx`.
    pub fn opset_for(&self, domain: &str) -> i64 {
        let wanted = normalize_domain(domain);
        self.meta
            .opset_import
            .iter()
            .find(|o| normalize_domain(&o.domain) == wanted)
            .map(|o| o.version)
            .unwrap_or(0)
    }

    pub fn graph(&self) -> &GraphProto {
        &self.graph
    }

    /// Looks up an initializer by name.
    pub fn initializer(&self, name: &str) -> Option<&TensorProto> {
        self.graph.initializer.iter().find(|t| t.name == name)
    }

    /// Returns `true` if `name` is a graph input that is not an initializer.
    pub fn is_runtime_input(&self, name: &str) -> bool {
        self.graph.input.iter().any(|i| i.name == name) && self.initializer(name).is_none()
    }

    /// Builds a serializable overview of the model.
    pub fn summary(&self) -> ModelSummary {
        let mut op_counts = BTreeMap::new();
        for node in &self.graph.node {
            *op_counts.entry(node.op_type.clone()).or_insert(0usize) += 1;
        }
        ModelSummary {
            ir_version: self.ir_version(),
            producer: format!("{} {}", self.producer_name(), self.producer_version())
                .trim()
                .to_string(),
            domain: self.domain().to_string(),
            graph_name: self.graph.name.clone(),
            opsets: self
                .meta
                .opset_import
                .iter()
                .map(|o| OpsetSummary {
                    domain: normalize_domain(&o.domain).to_string(),
                    version: o.version,
                })
                .collect(),
            inputs: self
                .graph
                .input
                .iter()
                .filter(|i| self.initializer(&i.name).is_none())
                .map(ValueSummary::from)
                .collect(),
            outputs: self.graph.output.iter().map(ValueSummary::from).collect(),
            initializers: self.graph.initializer.len(),
            nodes: self.graph.node.len(),
            op_counts,
        }
    }
}

// ── Summary ────────────────────────────────────────────────────────

/// Overview of a model, printable and serializable to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub ir_version: i64,
    pub producer: String,
    pub domain: String,
    pub graph_name: String,
    pub opsets: Vec<OpsetSummary>,
    /// Graph inputs that are not initializers.
    pub inputs: Vec<ValueSummary>,
    pub outputs: Vec<ValueSummary>,
    pub initializers: usize,
    pub nodes: usize,
    /// Node count per operator type.
    pub op_counts: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsetSummary {
    pub domain: String,
    pub version: i64,
}

/// A declared graph input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    pub name: String,
    pub dtype: String,
    /// Fixed sizes as numbers, symbolic axes by name, unknown axes as `?`.
    pub dims: Vec<String>,
}

impl From<&ValueInfoProto> for ValueSummary {
    fn from(info: &ValueInfoProto) -> Self {
        let (dtype, dims) = match info.r#type.as_ref().and_then(|t| t.value.as_ref()) {
            Some(type_proto::Value::TensorType(tt)) => {
                let dtype = DType::from_onnx(tt.elem_type)
                    .map(|d| d.as_str().to_string())
                    .unwrap_or_else(|| format!("type#{}", tt.elem_type));
                let dims = tt
                    .shape
                    .iter()
                    .flat_map(|s| &s.dim)
                    .map(|d| match &d.value {
                        Some(dimension::Value::DimValue(v)) => v.to_string(),
                        Some(dimension::Value::DimParam(p)) => p.clone(),
                        None => "?".to_string(),
                    })
                    .collect();
                (dtype, dims)
            }
            Some(type_proto::Value::SequenceType(_)) => ("sequence".to_string(), vec![]),
            Some(type_proto::Value::MapType(_)) => ("map".to_string(), vec![]),
            Some(type_proto::Value::OptionalType(_)) => ("optional".to_string(), vec![]),
            Some(type_proto::Value::SparseTensorType(_)) => ("sparse".to_string(), vec![]),
            None => ("unknown".to_string(), vec![]),
        };
        Self {
            name: info.name.clone(),
            dtype,
            dims,
        }
    }
}

impl ModelSummary {
    /// Serializes the summary as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ValueSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}[{}]", self.name, self.dtype, self.dims.join(" x "))
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Model '{}' (IR v{}, {} nodes, {} initializers)",
            self.graph_name, self.ir_version, self.nodes, self.initializers
        )?;
        if !self.producer.is_empty() {
            writeln!(f, "  Producer: {}", self.producer)?;
        }
        for opset in &self.opsets {
            writeln!(f, "  Opset:    {} v{}", opset.domain, opset.version)?;
        }
        for input in &self.inputs {
            writeln!(f, "  Input:    {input}")?;
        }
        for output in &self.outputs {
            writeln!(f, "  Output:   {output}")?;
        }
        for (op, count) in &self.op_counts {
            writeln!(f, "  {op:<24} x{count}")?;
        }
        Ok(())
    }
}
