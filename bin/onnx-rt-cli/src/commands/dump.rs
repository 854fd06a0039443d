// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `onnx-rt dump` command: one pass over zero-filled inputs, then the
//! context dump. Shows the dims every kernel inferred.

use anyhow::Context as _;
use runtime::Context;

pub async fn execute(config: runtime::RuntimeConfig, detail: bool) -> anyhow::Result<()> {
    let (text, summary) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut ctx = Context::from_file(&config.model_path, Vec::new(), config.shape_params)
            .with_context(|| format!("failed to load model '{}'", config.model_path.display()))?;
        let report = ctx.run();
        Ok((ctx.dump(detail), report.summary()))
    })
    .await??;

    print!("{text}");
    println!();
    println!("{summary}");
    Ok(())
}
