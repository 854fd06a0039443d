// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The host-side inference engine with a type-state-enforced pipeline.
//!
//! ```text
//! InferenceEngine<Idle>
//!     │  .load_model() / .load_model_from_bytes()
//!     ▼
//! InferenceEngine<Ready>
//!     │  .run(&[f32])
//!     ▼
//!   InferenceOutput
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! making invalid state sequences a compile error.

use crate::metrics::{RunMetrics, RunReport};
use crate::resolver::Resolver;
use crate::{Context, RuntimeConfig, RuntimeError};
use model_ir::OnnxModel;
use tensor_core::{DType, Tensor};

// ── Type-state markers ─────────────────────────────────────────

/// Engine is created but no model is loaded.
pub struct Idle {
    resolvers: Vec<Box<dyn Resolver>>,
}

/// Engine holds a built context and can run passes.
#[derive(Debug)]
pub struct Ready {
    context: Context,
    input_layer: Option<String>,
    output_layer: Option<String>,
    metrics: RunMetrics,
}

/// Sealed trait for engine states.
pub trait EngineState: std::fmt::Debug + sealed::Sealed {}
impl EngineState for Idle {}
impl EngineState for Ready {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Ready {}
}

impl std::fmt::Debug for Idle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.resolvers.iter().map(|r| r.name()).collect();
        f.debug_struct("Idle").field("resolvers", &names).finish()
    }
}

// ── Inference output ───────────────────────────────────────────

/// The result of a single inference run.
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    /// Contents of the output layer after the pass.
    pub values: Vec<f32>,
    /// Dims of the output layer.
    pub dims: Vec<i64>,
    /// What happened during the pass.
    pub report: RunReport,
}

// ── Engine ─────────────────────────────────────────────────────

/// Wraps a [`Context`] with named input and output layers.
///
/// `S` is a type-state marker that enforces the pipeline ordering at
/// compile time. You cannot call `.run()` on an `Idle` engine or
/// `.load_model()` on a `Ready` engine; the compiler catches it.
///
/// # Example
/// ```no_run
/// use runtime::{InferenceEngine, RuntimeConfig};
///
/// # fn example() -> Result<(), runtime::RuntimeError> {
/// let config = RuntimeConfig::from_file("runtime.toml".as_ref())?;
/// let mut engine = InferenceEngine::new(config).load_model()?;
/// let output = engine.run(&[0.0; 784])?;
/// println!("{:?} {}", output.dims, output.report.summary());
/// # Ok(())
/// # }
/// ```
pub struct InferenceEngine<S: EngineState = Idle> {
    config: RuntimeConfig,
    state: S,
}

// ── Idle → Ready ───────────────────────────────────────────────

impl InferenceEngine<Idle> {
    /// Creates a new engine from the given configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        tracing::info!("engine created for '{}'", config.model_path.display());
        Self {
            config,
            state: Idle {
                resolvers: Vec::new(),
            },
        }
    }

    /// Adds a resolver consulted before the built-in operators.
    pub fn with_resolver(mut self, resolver: Box<dyn Resolver>) -> Self {
        self.state.resolvers.push(resolver);
        self
    }

    /// Loads the model at `config.model_path` and builds its graph.
    pub fn load_model(self) -> Result<InferenceEngine<Ready>, RuntimeError> {
        let model = OnnxModel::from_file(&self.config.model_path)?;
        self.into_ready(model)
    }

    /// Builds the graph from an in-memory model; `model_path` is ignored.
    pub fn load_model_from_bytes(
        self,
        buf: &[u8],
    ) -> Result<InferenceEngine<Ready>, RuntimeError> {
        let model = OnnxModel::from_bytes(buf)?;
        self.into_ready(model)
    }

    fn into_ready(self, model: OnnxModel) -> Result<InferenceEngine<Ready>, RuntimeError> {
        tracing::info!("{}", model.summary());

        let default_input = model
            .graph()
            .input
            .iter()
            .map(|v| v.name.as_str())
            .find(|name| model.is_runtime_input(name))
            .map(str::to_string);
        let default_output = model.graph().output.first().map(|v| v.name.clone());

        let mut context = Context::from_model(
            model,
            self.state.resolvers,
            self.config.shape_params.clone(),
        )?;
        context.set_profiling(self.config.enable_profiling);

        let mut engine = InferenceEngine {
            state: Ready {
                context,
                input_layer: default_input,
                output_layer: default_output,
                metrics: RunMetrics::new(),
            },
            config: self.config,
        };
        if let Some(name) = engine.config.input_layer.clone() {
            engine.set_input_layer(&name)?;
        }
        if let Some(name) = engine.config.output_layer.clone() {
            engine.set_output_layer(&name)?;
        }
        tracing::info!(
            input = ?engine.state.input_layer,
            output = ?engine.state.output_layer,
            "engine ready"
        );
        Ok(engine)
    }
}

// ── Ready: run inference ───────────────────────────────────────

impl InferenceEngine<Ready> {
    pub fn context(&self) -> &Context {
        &self.state.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.state.context
    }

    pub fn input_layer(&self) -> Option<&str> {
        self.state.input_layer.as_deref()
    }

    pub fn output_layer(&self) -> Option<&str> {
        self.state.output_layer.as_deref()
    }

    /// Aggregate timings over every run so far.
    pub fn metrics(&self) -> &RunMetrics {
        &self.state.metrics
    }

    /// Selects the tensor [`run`](Self::run) writes its input into.
    pub fn set_input_layer(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.require_tensor(name)?;
        self.state.input_layer = Some(name.to_string());
        Ok(())
    }

    /// Selects the tensor [`run`](Self::run) reads its output from.
    pub fn set_output_layer(&mut self, name: &str) -> Result<(), RuntimeError> {
        self.require_tensor(name)?;
        self.state.output_layer = Some(name.to_string());
        Ok(())
    }

    /// Writes `input` into the input layer, runs one pass and returns the
    /// output layer.
    ///
    /// The input layer must be float32 and hold exactly `input.len()`
    /// elements. An output layer that the pass left without data is
    /// returned as an empty vector; the report says which nodes failed.
    pub fn run(&mut self, input: &[f32]) -> Result<InferenceOutput, RuntimeError> {
        let input_name = self
            .state
            .input_layer
            .clone()
            .ok_or_else(|| RuntimeError::TensorNotFound("<input layer>".to_string()))?;
        let output_name = self
            .state
            .output_layer
            .clone()
            .ok_or_else(|| RuntimeError::TensorNotFound("<output layer>".to_string()))?;

        let tensor = self
            .state
            .context
            .tensor_mut(&input_name)
            .ok_or_else(|| RuntimeError::TensorNotFound(input_name.clone()))?;
        if tensor.dtype() != DType::F32 {
            return Err(RuntimeError::InputMismatch {
                tensor: input_name,
                detail: format!("expected float32, layer is {}", tensor.dtype()),
            });
        }
        if tensor.ndata() != input.len() {
            return Err(RuntimeError::InputMismatch {
                tensor: input_name,
                detail: format!("expected {} values, got {}", tensor.ndata(), input.len()),
            });
        }
        tensor.apply_values(input)?;

        let report = self.run_pass();
        tracing::debug!("{}", report.summary());

        let output = self
            .state
            .context
            .tensor(&output_name)
            .ok_or_else(|| RuntimeError::TensorNotFound(output_name.clone()))?;
        if output.has_data() && output.dtype() != DType::F32 {
            return Err(RuntimeError::InputMismatch {
                tensor: output_name,
                detail: format!("expected float32, layer is {}", output.dtype()),
            });
        }
        Ok(InferenceOutput {
            values: output.as_slice::<f32>().map(<[f32]>::to_vec).unwrap_or_default(),
            dims: output.dims().to_vec(),
            report,
        })
    }

    /// Copies `tensor` into the layer of the same name, or into the input
    /// layer when the model has no tensor by that name. The layer takes the
    /// dtype and dims of `tensor`; affected nodes re-bind on the next pass.
    pub fn feed(&mut self, tensor: &Tensor) -> Result<(), RuntimeError> {
        let target = if self.state.context.tensor_id(tensor.name()).is_some() {
            tensor.name().to_string()
        } else {
            self.state
                .input_layer
                .clone()
                .ok_or_else(|| RuntimeError::TensorNotFound(tensor.name().to_string()))?
        };
        let layer = self
            .state
            .context
            .tensor_mut(&target)
            .ok_or_else(|| RuntimeError::TensorNotFound(target.clone()))?;
        layer.reinit(tensor.dtype(), tensor.dims())?;
        match tensor.as_strings() {
            Some(values) => layer.apply_strings(values),
            None => layer.apply_bytes(&tensor.to_bytes()),
        };
        tracing::debug!(layer = %target, "fed {}", tensor.dump(false));
        Ok(())
    }

    /// Runs one pass over whatever the layers currently hold.
    pub fn run_pass(&mut self) -> RunReport {
        let report = self.state.context.run();
        self.state.metrics.record(&report);
        report
    }

    fn require_tensor(&self, name: &str) -> Result<(), RuntimeError> {
        match self.state.context.tensor_id(name) {
            Some(_) => Ok(()),
            None => Err(RuntimeError::TensorNotFound(name.to_string())),
        }
    }
}

impl<S: EngineState> std::fmt::Debug for InferenceEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("state", &std::any::type_name::<S>())
            .field("model_path", &self.config.model_path)
            .field("profiling", &self.config.enable_profiling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::GraphBuilder;

    /// y = x · W + b with x `[1, 2]`.
    fn linear_model() -> Vec<u8> {
        GraphBuilder::new("linear")
            .opset("", 14)
            .input("x", DType::F32, &[1, 2])
            .initializer(Tensor::from_values("w", &[2, 2], &[1.0f32, 2.0, 3.0, 4.0]).unwrap())
            .initializer(Tensor::from_values("b", &[2], &[0.5f32, -0.5]).unwrap())
            .node("mm", "MatMul", &["x", "w"], &["xw"])
            .node("add", "Add", &["xw", "b"], &["y"])
            .output("y", DType::F32, &[1, 2])
            .build()
            .to_bytes()
    }

    fn ready() -> InferenceEngine<Ready> {
        InferenceEngine::new(RuntimeConfig::default())
            .load_model_from_bytes(&linear_model())
            .unwrap()
    }

    #[test]
    fn test_idle_to_ready_defaults() {
        let engine = ready();
        assert_eq!(engine.input_layer(), Some("x"));
        assert_eq!(engine.output_layer(), Some("y"));
        assert_eq!(engine.context().graph().len(), 2);
    }

    #[test]
    fn test_run_linear() {
        let mut engine = ready();
        let out = engine.run(&[1.0, 1.0]).unwrap();
        assert_eq!(out.dims, vec![1, 2]);
        assert_eq!(out.values, vec![4.5, 5.5]);
        assert!(out.report.is_complete());

        let out = engine.run(&[2.0, 0.0]).unwrap();
        assert_eq!(out.values, vec![2.5, 3.5]);
        assert_eq!(out.report.rebound, 0);
        assert_eq!(engine.metrics().passes, 2);
    }

    #[test]
    fn test_run_rejects_wrong_length() {
        let mut engine = ready();
        assert!(matches!(
            engine.run(&[1.0, 2.0, 3.0]),
            Err(RuntimeError::InputMismatch { .. })
        ));
    }

    #[test]
    fn test_layer_selection() {
        let mut engine = ready();
        engine.set_output_layer("xw").unwrap();
        let out = engine.run(&[1.0, 0.0]).unwrap();
        assert_eq!(out.values, vec![1.0, 2.0]);
        assert!(matches!(
            engine.set_input_layer("nope"),
            Err(RuntimeError::TensorNotFound(_))
        ));
    }

    #[test]
    fn test_feed_new_batch() {
        let mut engine = ready();
        let x = Tensor::from_values("x", &[2, 2], &[1.0f32, 0.0, 0.0, 1.0]).unwrap();
        engine.feed(&x).unwrap();
        let report = engine.run_pass();
        assert!(report.is_complete());
        assert_eq!(report.rebound, 2);

        let y = engine.context().tensor("y").unwrap();
        assert_eq!(y.dims(), &[2, 2]);
        assert_eq!(y.as_slice::<f32>(), Some(&[1.5f32, 1.5, 3.5, 3.5][..]));
        assert_eq!(engine.metrics().passes, 1);
    }

    #[test]
    fn test_feed_unnamed_goes_to_input_layer() {
        let mut engine = ready();
        let x = Tensor::from_values("", &[1, 2], &[0.0f32, 1.0]).unwrap();
        engine.feed(&x).unwrap();
        engine.run_pass();
        let y = engine.context().tensor("y").unwrap();
        assert_eq!(y.as_slice::<f32>(), Some(&[3.5f32, 3.5][..]));
    }

    #[test]
    fn test_configured_layers_checked() {
        let config = RuntimeConfig {
            output_layer: Some("missing".into()),
            ..Default::default()
        };
        let result = InferenceEngine::new(config).load_model_from_bytes(&linear_model());
        assert!(matches!(result, Err(RuntimeError::TensorNotFound(_))));
    }

    #[test]
    fn test_missing_model_file() {
        let config = RuntimeConfig {
            model_path: "/nonexistent/model.onnx".into(),
            ..Default::default()
        };
        assert!(InferenceEngine::new(config).load_model().is_err());
    }

    #[tokio::test]
    async fn test_run_on_blocking_pool() {
        let mut engine = ready();
        let out = tokio::task::spawn_blocking(move || engine.run(&[0.0, 1.0]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.values, vec![3.5, 3.5]);
    }

    #[test]
    fn test_debug_format() {
        let engine = InferenceEngine::new(RuntimeConfig::default());
        let debug = format!("{engine:?}");
        assert!(debug.contains("InferenceEngine"));
        assert!(debug.contains("Idle"));
    }
}
