// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Text dumps of a context for diagnostics.
//!
//! ```text
//! IR Version: v9
//! Producer: exporter 1.0
//! Domain:
//! Imports:
//!     ai.onnx v17
//! add0: Add-17 (ai.onnx)
//!     Inputs:
//!         a: float32[2]
//!     Outputs:
//!         c: float32[2]
//! ```

use crate::arena::{TensorArena, TensorId};
use crate::node::Node;
use crate::Context;
use model_ir::normalize_domain;
use std::fmt::Write;

pub(crate) fn dump_context(ctx: &Context, detail: bool) -> String {
    let model = ctx.model();
    let mut out = String::new();
    let _ = writeln!(out, "IR Version: v{}", model.ir_version());
    let _ = writeln!(
        out,
        "Producer: {} {}",
        model.producer_name(),
        model.producer_version()
    );
    let _ = writeln!(out, "Domain: {}", model.domain());
    let _ = writeln!(out, "Imports:");
    for opset in model.opset_imports() {
        let _ = writeln!(
            out,
            "\t{} v{}",
            normalize_domain(&opset.domain),
            opset.version
        );
    }
    for node in ctx.graph().nodes() {
        out.push_str(&dump_node(node, ctx.arena(), detail));
    }
    out
}

/// Renders one node header and its tensors.
pub fn dump_node(node: &Node, arena: &TensorArena, detail: bool) -> String {
    let mut out = format!(
        "{}: {}-{} ({})\n",
        node.name(),
        node.op_type(),
        node.opset(),
        node.domain()
    );
    write_slots(&mut out, "Inputs", node.inputs(), arena, detail);
    write_slots(&mut out, "Outputs", node.outputs(), arena, detail);
    out
}

fn write_slots(
    out: &mut String,
    label: &str,
    slots: &[Option<TensorId>],
    arena: &TensorArena,
    detail: bool,
) {
    if slots.is_empty() {
        return;
    }
    let _ = writeln!(out, "\t{label}:");
    for slot in slots {
        let line = match slot {
            Some(id) => arena.get(*id).dump(detail),
            None => "null".to_string(),
        };
        let _ = writeln!(out, "\t\t{line}");
    }
}

#[cfg(test)]
mod tests {
    use model_ir::GraphBuilder;
    use std::collections::HashMap;
    use tensor_core::{DType, Tensor};

    #[test]
    fn test_dump_format() {
        let model = GraphBuilder::new("g")
            .opset("", 17)
            .opset("com.microsoft", 1)
            .input("a", DType::F32, &[2])
            .initializer(Tensor::from_values("b", &[2], &[3.0f32, 4.0]).unwrap())
            .node("add0", "Add", &["a", "b"], &["c"])
            .node_with("q", "Mystery", "com.microsoft", &["c", ""], &["d"], vec![])
            .build();
        let ctx = crate::Context::from_model(model, Vec::new(), HashMap::new()).unwrap();

        let text = ctx.dump(false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "IR Version: v9");
        assert!(lines[1].starts_with("Producer: model-ir "));
        assert_eq!(lines[2], "Domain: ");
        assert_eq!(lines[3], "Imports:");
        assert_eq!(lines[4], "\tai.onnx v17");
        assert_eq!(lines[5], "\tcom.microsoft v1");
        assert_eq!(lines[6], "add0: Add-17 (ai.onnx)");
        assert_eq!(lines[7], "\tInputs:");
        assert_eq!(lines[8], "\t\ta: float32[2]");
        assert_eq!(lines[9], "\t\tb: float32[2]");
        assert_eq!(lines[10], "\tOutputs:");
        assert_eq!(lines[11], "\t\tc: undefined = null");
        assert_eq!(lines[12], "q: Mystery-1 (com.microsoft)");
        assert_eq!(lines[15], "\t\tnull");
    }

    #[test]
    fn test_dump_detail_values() {
        let model = GraphBuilder::new("g")
            .opset("", 17)
            .initializer(Tensor::from_values("b", &[2, 2], &[1i64, 2, 3, 4]).unwrap())
            .node("n", "Identity", &["b"], &["c"])
            .build();
        let ctx = crate::Context::from_model(model, Vec::new(), HashMap::new()).unwrap();
        let text = ctx.dump(true);
        assert!(text.contains("b: int64[2 x 2] = \n[[1, 2], [3, 4]]"));
    }
}
