// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The ONNX model format as the runtime sees it:
//!
//! - [`proto`] - `prost` messages for the subset of `onnx.proto` the runtime
//!   reads (model, graph, node, attribute, tensor, value info).
//! - [`OnnxModel`] - a decoded model with its main graph, opset lookup and a
//!   serializable [`ModelSummary`].
//! - [`NodeAttributes`] - typed attribute readers with defaults.
//! - Tensor decoding: initializers ([`tensor_from_proto`]), declared graph
//!   values ([`tensor_from_value_info`]), `.pb` tensor files
//!   ([`load_tensor_file`]) and SafeTensors input files
//!   ([`load_safetensors`]).
//! - [`GraphBuilder`] - in-memory model construction.
//!
//! # Example
//! ```no_run
//! use model_ir::OnnxModel;
//! use std::path::Path;
//!
//! let model = OnnxModel::from_file(Path::new("./models/lstm.onnx")).unwrap();
//! println!("{}", model.summary());
//! for node in &model.graph().node {
//!     println!("  {}: {}", node.name, node.op_type);
//! }
//! ```

mod attribute;
mod builder;
mod error;
mod loader;
mod model;
pub mod proto;
mod tensor_proto;

pub use attribute::NodeAttributes;
pub use builder::{Dim, GraphBuilder};
pub use error::ModelError;
pub use loader::load_safetensors;
pub use model::{
    normalize_domain, ModelSummary, OnnxModel, OpsetSummary, ValueSummary, DEFAULT_DOMAIN,
};
pub use tensor_proto::{
    apply_proto, declared_dims, load_tensor_file, tensor_from_proto, tensor_from_value_info,
    tensor_to_proto,
};
