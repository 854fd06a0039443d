// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared helpers.

pub mod benchmark;
pub mod dump;
pub mod inspect;
pub mod run;

use anyhow::Context as _;
use runtime::{parse_shape_param, RuntimeConfig};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the `fmt` subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merges the optional TOML file with command-line overrides.
pub fn resolve_config(
    path: Option<&Path>,
    model: Option<PathBuf>,
    shape_params: &[String],
) -> anyhow::Result<RuntimeConfig> {
    let mut config = match path {
        Some(p) => RuntimeConfig::from_file(p)
            .with_context(|| format!("loading config '{}'", p.display()))?,
        None => {
            let model = model
                .clone()
                .context("no model given: pass --model or --config")?;
            RuntimeConfig {
                model_path: model,
                ..Default::default()
            }
        }
    };
    if let Some(model) = model {
        config.model_path = model;
    }
    for param in shape_params {
        let (name, value) = parse_shape_param(param)?;
        config = config.with_shape_param(name, value);
    }
    tracing::debug!(?config, "resolved configuration");
    Ok(config)
}

/// Truncates a string to `max_len` characters with an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║{:^54}║", format!("onnx-rt · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}
