// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-rt benchmark` command: repeated passes with profiling on.
//!
//! The first pass binds and reshapes every node and is excluded from the
//! numbers. Later passes reuse the bindings, so they measure compute only.

use super::{banner, truncate};
use anyhow::Context as _;
use runtime::{InferenceEngine, RunMetrics, RunReport, RuntimeConfig};
use std::time::Duration;

pub async fn execute(
    mut config: RuntimeConfig,
    iterations: usize,
    json: bool,
) -> anyhow::Result<()> {
    config.enable_profiling = true;
    let model_path = config.model_path.clone();

    let (warmup, metrics) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut engine = InferenceEngine::new(config)
            .load_model()
            .with_context(|| format!("failed to load model '{}'", model_path.display()))?;
        let warmup = engine.run_pass();

        let mut metrics = RunMetrics::new();
        for _ in 0..iterations {
            metrics.record(&engine.run_pass());
        }
        Ok((warmup, metrics))
    })
    .await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    banner("Benchmark Suite");
    print_warmup(&warmup);

    // ── Results Table ──────────────────────────────────────────
    println!("  {}", metrics.summary());
    println!();

    let total = metrics.total_duration;
    println!("  {:<24} {:>12} {:>12} {:>8}", "Operator", "Total", "Per pass", "Share");
    println!("  {}", "-".repeat(60));
    for (op, d) in metrics.hottest_ops() {
        println!(
            "  {:<24} {:>10.3}ms {:>10.3}ms {:>7.1}%",
            truncate(op, 24),
            ms(d),
            ms(d) / metrics.passes.max(1) as f64,
            share(d, total),
        );
    }
    println!();
    Ok(())
}

fn print_warmup(report: &RunReport) {
    println!("  Warm-up:  {}", report.summary());
    if !report.is_complete() {
        println!(
            "  Warning:  {} node(s) skipped and {} failed; numbers cover the rest.",
            report.skipped, report.failed
        );
    }
    println!();
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn share(part: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    100.0 * part.as_secs_f64() / total.as_secs_f64()
}
