// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model loading and tensor decoding.

/// Errors that can occur when reading models and tensor files.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A model or tensor file could not be read.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The protobuf payload is malformed.
    #[error("failed to decode protobuf: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The model carries no main graph.
    #[error("model has no graph")]
    MissingGraph,

    /// A tensor payload or declaration cannot be turned into a tensor.
    #[error("invalid tensor '{name}': {detail}")]
    InvalidTensor { name: String, detail: String },

    /// The SafeTensors file could not be parsed.
    #[error("failed to load SafeTensors: {0}")]
    SafeTensors(String),

    /// A summary could not be serialized.
    #[error("failed to serialize: {0}")]
    Json(#[from] serde_json::Error),

    /// A tensor could not be allocated.
    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}
