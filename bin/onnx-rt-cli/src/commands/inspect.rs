// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-rt inspect` command: display model metadata and node listing.
//!
//! Decodes the model without building a graph and marks which nodes the
//! built-in operator catalog knows.

use super::{banner, truncate};
use anyhow::Context as _;
use model_ir::OnnxModel;
use runtime::{OperatorRegistry, Resolver};

pub async fn execute(config: runtime::RuntimeConfig, json: bool) -> anyhow::Result<()> {
    let path = config.model_path.clone();
    let model = tokio::task::spawn_blocking(move || OnnxModel::from_file(&path))
        .await?
        .with_context(|| format!("failed to load model '{}'", config.model_path.display()))?;
    let summary = model.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    banner("Model Inspector");

    // ── Summary ────────────────────────────────────────────────
    for line in summary.to_string().lines() {
        println!("  {line}");
    }
    println!();

    // ── Per-Node Detail ────────────────────────────────────────
    let registry = OperatorRegistry::with_defaults();
    println!(
        "  {:<4} {:<30} {:<22} {:>6} {:>4} {:>4}  {}",
        "Idx", "Name", "Op", "Opset", "#In", "#Out", "Known",
    );
    println!("  {}", "-".repeat(82));

    let mut unknown = 0usize;
    for (idx, node) in model.graph().node.iter().enumerate() {
        let known = registry.supports(&node.op_type, &node.domain);
        if !known {
            unknown += 1;
        }
        println!(
            "  {:<4} {:<30} {:<22} {:>6} {:>4} {:>4}  {}",
            idx,
            truncate(&node.name, 30),
            truncate(&node.op_type, 22),
            model.opset_for(&node.domain),
            node.input.iter().filter(|n| !n.is_empty()).count(),
            node.output.iter().filter(|n| !n.is_empty()).count(),
            if known { "yes" } else { "no" },
        );
    }
    println!();

    if unknown > 0 {
        println!("  {unknown} node(s) have no built-in kernel and will be skipped.");
    } else {
        println!("  Every operator has a built-in kernel.");
    }
    println!();
    Ok(())
}
