// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Executes ONNX graphs on the CPU, one node at a time.
//!
//! The runtime takes:
//! - An [`OnnxModel`](model_ir::OnnxModel) decoded by `model-ir`.
//! - An ordered list of [`Resolver`]s that turn `(op type, domain, opset,
//!   input dtypes)` into a kernel; the built-in catalog is always last.
//!
//! and builds a [`Context`]: every named tensor in a [`TensorArena`] and one
//! [`Node`] per model node. Each [`Context::run`] walks the nodes in model
//! order. A node whose input dtypes or dims changed since its last pass is
//! re-bound (`exit`, resolve, `init`) and reshaped before it computes; a node
//! whose inputs have no data yet is skipped.
//!
//! # Failure model
//! Only construction fails with a [`RuntimeError`]. Unsupported operators
//! and shape mismatches during a pass are logged with `tracing` and counted
//! in the returned [`RunReport`]; their outputs are left untouched.
//!
//! # Type-State Pipeline
//! [`InferenceEngine`] wraps a context for host code:
//! ```text
//! InferenceEngine<Idle> → InferenceEngine<Ready>
//! ```

mod arena;
mod config;
mod context;
mod dump;
mod engine;
mod error;
mod graph;
mod metrics;
mod node;
mod operator;
pub mod operators;
mod resolver;

pub use arena::{TensorArena, TensorId};
pub use config::{parse_shape_param, RuntimeConfig};
pub use context::Context;
pub use dump::dump_node;
pub use engine::{EngineState, Idle, InferenceEngine, InferenceOutput, Ready};
pub use error::RuntimeError;
pub use graph::Graph;
pub use metrics::{NodeMetrics, RunMetrics, RunReport};
pub use node::{Fingerprint, InputState, Node};
pub use operator::{KernelIo, NodeInfo, Operator, Unsupported};
pub use resolver::{OpQuery, OperatorFactory, OperatorRegistry, Resolver};
