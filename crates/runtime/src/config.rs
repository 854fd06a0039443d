// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/mnist.onnx"
//! input_layer = "Input3"
//! output_layer = "Plus214_Output_0"
//! enable_profiling = true
//!
//! [shape_params]
//! batch = 1
//! sequence = 16
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration for the inference engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Path to the `.onnx` model file.
    pub model_path: PathBuf,
    /// Tensor fed by [`crate::InferenceEngine::run`]; defaults to the first
    /// graph input that is not an initializer.
    #[serde(default)]
    pub input_layer: Option<String>,
    /// Tensor returned by a run; defaults to the first graph output.
    #[serde(default)]
    pub output_layer: Option<String>,
    /// Whether to record per-node timings.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
    /// Values for symbolic input axes, keyed by parameter name. Kept last
    /// so it serialises as a trailing table.
    #[serde(default)]
    pub shape_params: HashMap<String, i64>,
}

fn default_true() -> bool {
    true
}

impl RuntimeConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::RuntimeError::ConfigError(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::RuntimeError> {
        toml::from_str(toml_str).map_err(|e| {
            super::RuntimeError::ConfigError(format!("TOML parse error: {e}"))
        })
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| {
            super::RuntimeError::ConfigError(format!("TOML serialise error: {e}"))
        })
    }

    /// Adds or replaces one symbolic axis value.
    pub fn with_shape_param(mut self, name: impl Into<String>, value: i64) -> Self {
        self.shape_params.insert(name.into(), value);
        self
    }
}

/// Parses a `name=value` shape override, as given on the command line.
pub fn parse_shape_param(s: &str) -> Result<(String, i64), super::RuntimeError> {
    let (name, value) = s.split_once('=').ok_or_else(|| {
        super::RuntimeError::ConfigError(format!("shape param '{s}' is not name=value"))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(super::RuntimeError::ConfigError(format!(
            "shape param '{s}' has an empty name"
        )));
    }
    let value = value.trim().parse::<i64>().map_err(|e| {
        super::RuntimeError::ConfigError(format!("shape param '{s}': {e}"))
    })?;
    Ok((name.to_string(), value))
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./model.onnx"),
            input_layer: None,
            output_layer: None,
            enable_profiling: true,
            shape_params: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let c = RuntimeConfig::default();
        assert_eq!(c.model_path, PathBuf::from("./model.onnx"));
        assert!(c.shape_params.is_empty());
        assert!(c.input_layer.is_none());
        assert!(c.enable_profiling);
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
model_path = "/tmp/model.onnx"
output_layer = "probs"
enable_profiling = false

[shape_params]
batch = 4
"#;
        let c = RuntimeConfig::from_toml(toml).unwrap();
        assert_eq!(c.model_path, PathBuf::from("/tmp/model.onnx"));
        assert_eq!(c.shape_params.get("batch"), Some(&4));
        assert!(c.input_layer.is_none());
        assert_eq!(c.output_layer.as_deref(), Some("probs"));
        assert!(!c.enable_profiling);
    }

    #[test]
    fn test_minimal_toml() {
        let c = RuntimeConfig::from_toml("model_path = \"m.onnx\"").unwrap();
        assert!(c.enable_profiling);
        assert!(c.shape_params.is_empty());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            RuntimeConfig::from_toml("model_path = 3"),
            Err(crate::RuntimeError::ConfigError(_))
        ));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = RuntimeConfig {
            input_layer: Some("x".into()),
            ..Default::default()
        }
        .with_shape_param("batch", 2);
        let toml = c.to_toml().unwrap();
        let back = RuntimeConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rt.toml");
        std::fs::write(&path, "model_path = \"a.onnx\"\n").unwrap();
        let c = RuntimeConfig::from_file(&path).unwrap();
        assert_eq!(c.model_path, PathBuf::from("a.onnx"));
        assert!(RuntimeConfig::from_file(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_parse_shape_param() {
        assert_eq!(parse_shape_param("batch=8").unwrap(), ("batch".to_string(), 8));
        assert_eq!(parse_shape_param(" seq = -1 ").unwrap(), ("seq".to_string(), -1));
        assert!(parse_shape_param("batch").is_err());
        assert!(parse_shape_param("=3").is_err());
        assert!(parse_shape_param("batch=x").is_err());
    }
}
