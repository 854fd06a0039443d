// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for graph construction and steady-state passes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_ir::proto::AttributeProto;
use model_ir::GraphBuilder;
use runtime::Context;
use std::collections::HashMap;
use tensor_core::{DType, Tensor};

fn filled(name: &str, dims: &[i64]) -> Tensor {
    let n: i64 = dims.iter().product();
    let values: Vec<f32> = (0..n).map(|i| (i % 13) as f32 * 0.05).collect();
    Tensor::from_values(name, dims, &values).expect("bench tensor")
}

/// `layers` stacked MatMul + Add + Atan blocks over a `[1, width]` input.
fn mlp(width: i64, layers: usize) -> Vec<u8> {
    let mut builder = GraphBuilder::new("mlp")
        .opset("", 14)
        .input("x0", DType::F32, &[1, width]);
    for l in 0..layers {
        let (w, b) = (format!("w{l}"), format!("b{l}"));
        let (x, mm, sum) = (format!("x{l}"), format!("mm{l}"), format!("sum{l}"));
        let out = format!("x{}", l + 1);
        builder = builder
            .initializer(filled(&w, &[width, width]))
            .initializer(filled(&b, &[width]))
            .node(&format!("matmul{l}"), "MatMul", &[x.as_str(), w.as_str()], &[mm.as_str()])
            .node(&format!("add{l}"), "Add", &[mm.as_str(), b.as_str()], &[sum.as_str()])
            .node(&format!("atan{l}"), "Atan", &[sum.as_str()], &[out.as_str()]);
    }
    builder.build().to_bytes()
}

fn lstm_model(hidden: i64, input: i64, seq_len: i64) -> Vec<u8> {
    GraphBuilder::new("lstm")
        .opset("", 14)
        .input("x", DType::F32, &[seq_len, 1, input])
        .initializer(filled("w", &[1, 4 * hidden, input]))
        .initializer(filled("r", &[1, 4 * hidden, hidden]))
        .node_with(
            "lstm",
            "LSTM",
            "",
            &["x", "w", "r"],
            &["y", "y_h"],
            vec![AttributeProto::from_int("hidden_size", hidden)],
        )
        .build()
        .to_bytes()
}

fn bench_build_context(c: &mut Criterion) {
    let bytes = mlp(64, 8);
    c.bench_function("context_build_mlp_8x64", |bench| {
        bench.iter(|| {
            Context::from_bytes(black_box(&bytes), Vec::new(), HashMap::new()).expect("context")
        })
    });
}

fn bench_mlp_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("mlp_pass");
    for width in [32i64, 128, 256] {
        let bytes = mlp(width, 4);
        let mut ctx = Context::from_bytes(&bytes, Vec::new(), HashMap::new()).expect("context");
        // First pass binds and reshapes every node.
        ctx.run();
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |bench, _| {
            bench.iter(|| black_box(ctx.run()))
        });
    }
    group.finish();
}

fn bench_lstm_pass(c: &mut Criterion) {
    let bytes = lstm_model(32, 16, 20);
    let mut ctx = Context::from_bytes(&bytes, Vec::new(), HashMap::new()).expect("context");
    ctx.run();
    c.bench_function("lstm_pass_h32_seq20", |bench| bench.iter(|| black_box(ctx.run())));
}

fn bench_rebind(c: &mut Criterion) {
    let bytes = mlp(64, 2);
    let mut ctx = Context::from_bytes(&bytes, Vec::new(), HashMap::new()).expect("context");
    let mut batch = 1;
    c.bench_function("rebind_on_shape_change", |bench| {
        bench.iter(|| {
            batch = if batch == 1 { 2 } else { 1 };
            if let Some(x) = ctx.tensor_mut("x0") {
                x.reinit(DType::F32, &[batch, 64]).expect("reinit");
            }
            black_box(ctx.run())
        })
    });
}

criterion_group!(
    benches,
    bench_build_context,
    bench_mlp_pass,
    bench_lstm_pass,
    bench_rebind
);
criterion_main!(benches);
