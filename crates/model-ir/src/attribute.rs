// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed readers for node attributes.
//!
//! Every reader takes a default that is returned when the attribute is
//! missing or carries a different kind, so kernels can read optional
//! attributes in one call.

use crate::proto::{attribute_proto::AttributeType, AttributeProto, GraphProto, NodeProto, TensorProto};

/// Borrowed view over the attributes of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeAttributes<'a> {
    attrs: &'a [AttributeProto],
}

impl<'a> NodeAttributes<'a> {
    pub fn new(node: &'a NodeProto) -> Self {
        Self {
            attrs: &node.attribute,
        }
    }

    fn find(&self, name: &str, kind: AttributeType) -> Option<&'a AttributeProto> {
        self.attrs
            .iter()
            .find(|a| a.name == name && a.r#type == kind as i32)
    }

    /// Returns `true` if an attribute of any kind is named `name`.
    pub fn has(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    pub fn float(&self, name: &str, default: f32) -> f32 {
        self.find(name, AttributeType::Float)
            .map_or(default, |a| a.f)
    }

    pub fn int(&self, name: &str, default: i64) -> i64 {
        self.find(name, AttributeType::Int).map_or(default, |a| a.i)
    }

    /// Reads a string attribute, replacing invalid UTF-8.
    pub fn string(&self, name: &str, default: &str) -> String {
        self.find(name, AttributeType::String)
            .map_or_else(|| default.to_string(), |a| {
                String::from_utf8_lossy(&a.s).into_owned()
            })
    }

    pub fn floats(&self, name: &str) -> &'a [f32] {
        self.find(name, AttributeType::Floats)
            .map_or(&[], |a| a.floats.as_slice())
    }

    pub fn ints(&self, name: &str) -> &'a [i64] {
        self.find(name, AttributeType::Ints)
            .map_or(&[], |a| a.ints.as_slice())
    }

    pub fn strings(&self, name: &str) -> Vec<String> {
        self.find(name, AttributeType::Strings)
            .map(|a| {
                a.strings
                    .iter()
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tensor(&self, name: &str) -> Option<&'a TensorProto> {
        self.find(name, AttributeType::Tensor)
            .and_then(|a| a.t.as_ref())
    }

    pub fn graph(&self, name: &str) -> Option<&'a GraphProto> {
        self.find(name, AttributeType::Graph)
            .and_then(|a| a.g.as_deref())
    }
}

// ── Construction helpers ───────────────────────────────────────────

impl AttributeProto {
    pub fn from_float(name: &str, value: f32) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Float as i32,
            f: value,
            ..Default::default()
        }
    }

    pub fn from_int(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Int as i32,
            i: value,
            ..Default::default()
        }
    }

    pub fn from_string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::String as i32,
            s: value.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    pub fn from_ints(name: &str, values: &[i64]) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Ints as i32,
            ints: values.to_vec(),
            ..Default::default()
        }
    }

    pub fn from_floats(name: &str, values: &[f32]) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Floats as i32,
            floats: values.to_vec(),
            ..Default::default()
        }
    }

    pub fn from_strings(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Strings as i32,
            strings: values.iter().map(|s| s.as_bytes().to_vec()).collect(),
            ..Default::default()
        }
    }

    pub fn from_tensor(name: &str, value: TensorProto) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Tensor as i32,
            t: Some(value),
            ..Default::default()
        }
    }

    pub fn from_graph(name: &str, value: GraphProto) -> Self {
        Self {
            name: name.to_string(),
            r#type: AttributeType::Graph as i32,
            g: Some(Box::new(value)),
            ..Default::default()
        }
    }
}
