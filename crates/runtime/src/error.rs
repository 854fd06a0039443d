// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the inference runtime.
//!
//! Only construction and host-side marshalling fail with an error. Problems
//! inside a pass (unsupported operators, shape mismatches) are logged and
//! reported through [`RunReport`](crate::RunReport).

/// Errors that can occur while building or driving a context.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Model decoding or initializer loading failed.
    #[error("model error: {0}")]
    Model(#[from] model_ir::ModelError),

    /// A tensor could not be allocated or filled.
    #[error("tensor error: {0}")]
    Tensor(#[from] tensor_core::TensorError),

    /// The execution graph could not be built.
    #[error("graph build failed at node '{node}': {detail}")]
    GraphBuild { node: String, detail: String },

    /// No tensor with this name exists in the context.
    #[error("tensor '{0}' not found")]
    TensorNotFound(String),

    /// Host data does not fit the bound input or output tensor.
    #[error("input mismatch for '{tensor}': {detail}")]
    InputMismatch { tensor: String, detail: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
