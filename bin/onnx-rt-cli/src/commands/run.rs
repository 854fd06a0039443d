// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-rt run` command: feed input files and run the graph.
//!
//! Walks the type-state pipeline:
//! ```text
//! InferenceEngine<Idle> → load_model → <Ready> → feed → run_pass
//! ```

use super::{banner, truncate};
use anyhow::{bail, Context as _};
use runtime::{InferenceEngine, RunMetrics, RunReport, RuntimeConfig};
use std::path::{Path, PathBuf};
use tensor_core::Tensor;

struct RunResult {
    input_layer: Option<String>,
    output_layer: Option<String>,
    fed: Vec<String>,
    report: RunReport,
    output: Option<String>,
    metrics: RunMetrics,
}

pub async fn execute(
    config: RuntimeConfig,
    inputs: Vec<PathBuf>,
    passes: usize,
) -> anyhow::Result<()> {
    banner("Inference Runner");

    // ── Configuration ──────────────────────────────────────────
    println!("  Config:");
    println!("   Model:    {}", config.model_path.display());
    for path in &inputs {
        println!("   Input:    {}", truncate(&path.display().to_string(), 60));
    }
    if !config.shape_params.is_empty() {
        let mut params: Vec<_> = config.shape_params.iter().collect();
        params.sort();
        println!("   Shapes:   {params:?}");
    }
    println!("   Passes:   {passes}");
    println!();

    let result =
        tokio::task::spawn_blocking(move || run_blocking(config, &inputs, passes.max(1)))
            .await??;

    // ── Results ────────────────────────────────────────────────
    println!(
        "  Layers:   {} → {}",
        result.input_layer.as_deref().unwrap_or("-"),
        result.output_layer.as_deref().unwrap_or("-"),
    );
    if !result.fed.is_empty() {
        println!("  Fed:      {}", result.fed.join(", "));
    }
    println!("  {}", result.report.summary());
    println!();

    match &result.output {
        Some(dump) => {
            println!("  Output:");
            for line in dump.lines() {
                println!("   {line}");
            }
        }
        None => println!("  Output:   (no output layer)"),
    }
    println!();

    if result.metrics.passes > 1 {
        println!("  Metrics:");
        println!("   {}", result.metrics.summary());
        println!();
    }
    Ok(())
}

fn run_blocking(
    config: RuntimeConfig,
    inputs: &[PathBuf],
    passes: usize,
) -> anyhow::Result<RunResult> {
    let model_path = config.model_path.clone();
    let mut engine = InferenceEngine::new(config)
        .load_model()
        .with_context(|| format!("failed to load model '{}'", model_path.display()))?;

    let mut fed = Vec::new();
    for path in inputs {
        for tensor in load_inputs(path)? {
            engine
                .feed(&tensor)
                .with_context(|| format!("cannot feed '{}'", path.display()))?;
            fed.push(format!("{}{}", tensor.dtype(), tensor.shape()));
        }
    }

    let mut report = RunReport::default();
    for pass in 0..passes {
        report = engine.run_pass();
        tracing::debug!(pass, "{}", report.summary());
    }

    let output = engine
        .output_layer()
        .and_then(|name| engine.context().tensor(name))
        .map(|t| t.dump(true));
    Ok(RunResult {
        input_layer: engine.input_layer().map(str::to_string),
        output_layer: engine.output_layer().map(str::to_string),
        fed,
        report,
        output,
        metrics: engine.metrics().clone(),
    })
}

/// Reads every tensor in an input file, chosen by extension.
fn load_inputs(path: &Path) -> anyhow::Result<Vec<Tensor>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let tensors = match ext {
        "pb" => vec![model_ir::load_tensor_file(path)?],
        "safetensors" => model_ir::load_safetensors(path)?,
        other => bail!(
            "unsupported input file '{}' (extension '{other}'); expected .pb or .safetensors",
            path.display()
        ),
    };
    Ok(tensors)
}
