// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # onnx-rt
//!
//! Command-line interface for the ONNX graph runtime.
//!
//! ## Usage
//! ```bash
//! # Summarise a model
//! onnx-rt inspect --model ./models/lstm.onnx
//!
//! # Print every node with its tensors after one pass
//! onnx-rt dump --model ./models/lstm.onnx --detail
//!
//! # Feed inputs from ONNX test data and run
//! onnx-rt run --model ./models/lstm.onnx --input ./test_data_set_0/input_0.pb
//!
//! # Time repeated passes
//! onnx-rt benchmark --model ./models/lstm.onnx --iterations 200
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "onnx-rt",
    about = "Incremental ONNX graph inference on the CPU",
    version,
    author
)]
struct Cli {
    /// Path to a TOML runtime configuration. CLI arguments override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print model metadata, declared inputs and outputs, and operator use.
    Inspect {
        /// Path to the `.onnx` file.
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Emit the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build the graph, run one pass and print every node with its tensors.
    Dump {
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Include tensor values.
        #[arg(long)]
        detail: bool,

        /// Symbolic axis value, `name=value` (repeatable).
        #[arg(long = "shape-param", value_name = "NAME=VALUE")]
        shape_params: Vec<String>,
    },

    /// Run inference and print the output layer.
    Run {
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Input tensors: a serialized TensorProto (`.pb`) or a
        /// `.safetensors` file (repeatable).
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Tensor fed by unnamed inputs.
        #[arg(long)]
        input_layer: Option<String>,

        /// Tensor printed after the last pass.
        #[arg(long)]
        output_layer: Option<String>,

        /// Symbolic axis value, `name=value` (repeatable).
        #[arg(long = "shape-param", value_name = "NAME=VALUE")]
        shape_params: Vec<String>,

        /// Number of passes to run.
        #[arg(long, default_value_t = 1)]
        passes: usize,
    },

    /// Time repeated passes over the same inputs.
    Benchmark {
        #[arg(short, long)]
        model: Option<PathBuf>,

        #[arg(short = 'n', long, default_value_t = 100)]
        iterations: usize,

        #[arg(long = "shape-param", value_name = "NAME=VALUE")]
        shape_params: Vec<String>,

        /// Emit the aggregate metrics as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Inspect { model, json } => {
            let config = commands::resolve_config(config, model, &[])?;
            commands::inspect::execute(config, json).await
        }
        Commands::Dump {
            model,
            detail,
            shape_params,
        } => {
            let config = commands::resolve_config(config, model, &shape_params)?;
            commands::dump::execute(config, detail).await
        }
        Commands::Run {
            model,
            input,
            input_layer,
            output_layer,
            shape_params,
            passes,
        } => {
            let mut config = commands::resolve_config(config, model, &shape_params)?;
            if input_layer.is_some() {
                config.input_layer = input_layer;
            }
            if output_layer.is_some() {
                config.output_layer = output_layer;
            }
            commands::run::execute(config, input, passes).await
        }
        Commands::Benchmark {
            model,
            iterations,
            shape_params,
            json,
        } => {
            let config = commands::resolve_config(config, model, &shape_params)?;
            commands::benchmark::execute(config, iterations, json).await
        }
    }
}
