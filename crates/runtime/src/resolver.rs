// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator resolution: mapping `(op type, domain, opset, dtype)` to a kernel.
//!
//! A context consults its custom resolvers first and the built-in
//! [`OperatorRegistry::with_defaults`] last. The resolver that claims a node
//! at build time is asked for a kernel every time the node is re-bound.

use crate::operator::Operator;
use model_ir::normalize_domain;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use tensor_core::DType;

/// What a node needs from a resolver.
#[derive(Debug, Clone, Copy)]
pub struct OpQuery<'a> {
    pub op_type: &'a str,
    pub domain: &'a str,
    pub opset: i64,
    /// One entry per input slot; absent slots are `DType::Undefined`.
    pub input_dtypes: &'a [DType],
}

impl OpQuery<'_> {
    /// Dtype of input slot `index`, `Undefined` if absent.
    pub fn input_dtype(&self, index: usize) -> DType {
        self.input_dtypes.get(index).copied().unwrap_or_default()
    }
}

/// A pluggable source of kernels.
pub trait Resolver: Send {
    fn name(&self) -> &str;

    /// Whether this resolver knows `op_type` in `domain` at any version.
    fn supports(&self, op_type: &str, domain: &str) -> bool;

    /// Creates a kernel for the exact opset and input dtypes, if one exists.
    fn resolve(&self, query: &OpQuery<'_>) -> Option<Box<dyn Operator>>;
}

/// Creates a kernel for a matched registry entry.
pub type OperatorFactory = fn(&OpQuery<'_>) -> Box<dyn Operator>;

#[derive(Clone)]
struct OperatorEntry {
    domain: String,
    opsets: RangeInclusive<i64>,
    /// Accepted dtypes of the first input; empty accepts any.
    dtypes: Vec<DType>,
    factory: OperatorFactory,
}

impl OperatorEntry {
    fn matches(&self, query: &OpQuery<'_>) -> bool {
        self.domain == normalize_domain(query.domain)
            && self.opsets.contains(&query.opset)
            && (self.dtypes.is_empty() || self.dtypes.contains(&query.input_dtype(0)))
    }
}

/// Table-driven resolver keyed by operator type.
///
/// Entries for one op type are tried in registration order; register the
/// newest opset range first.
#[derive(Clone)]
pub struct OperatorRegistry {
    name: String,
    entries: HashMap<String, Vec<OperatorEntry>>,
}

impl OperatorRegistry {
    /// Creates an empty registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
        }
    }

    /// The built-in operator catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new("default");
        crate::operators::register_defaults(&mut registry);
        registry
    }

    /// Adds a kernel for `op_type` in `domain` over an inclusive opset range.
    /// An empty `dtypes` slice accepts any first-input dtype.
    pub fn register(
        &mut self,
        op_type: &str,
        domain: &str,
        opsets: RangeInclusive<i64>,
        dtypes: &[DType],
        factory: OperatorFactory,
    ) -> &mut Self {
        self.entries
            .entry(op_type.to_string())
            .or_default()
            .push(OperatorEntry {
                domain: normalize_domain(domain).to_string(),
                opsets,
                dtypes: dtypes.to_vec(),
                factory,
            });
        self
    }

    /// Registered op types, sorted.
    pub fn op_types(&self) -> Vec<&str> {
        let mut ops: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ops.sort_unstable();
        ops
    }
}

impl Resolver for OperatorRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, op_type: &str, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        self.entries
            .get(op_type)
            .is_some_and(|entries| entries.iter().any(|e| e.domain == domain))
    }

    fn resolve(&self, query: &OpQuery<'_>) -> Option<Box<dyn Operator>> {
        self.entries
            .get(query.op_type)?
            .iter()
            .find(|e| e.matches(query))
            .map(|e| (e.factory)(query))
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("name", &self.name)
            .field("op_types", &self.op_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{KernelIo, NodeInfo};
    use tensor_core::TensorError;

    struct Marker(i64);

    impl Operator for Marker {
        fn init(&mut self, _node: &NodeInfo<'_>) -> bool {
            true
        }
        fn reshape(&mut self, _io: &mut KernelIo<'_>) -> bool {
            self.0 >= 0
        }
        fn compute(&mut self, _io: &mut KernelIo<'_>) -> Result<(), TensorError> {
            Ok(())
        }
    }

    fn new_kernel(_q: &OpQuery<'_>) -> Box<dyn Operator> {
        Box::new(Marker(1))
    }

    fn old_kernel(_q: &OpQuery<'_>) -> Box<dyn Operator> {
        Box::new(Marker(-1))
    }

    fn query<'a>(op: &'a str, domain: &'a str, opset: i64, dtypes: &'a [DType]) -> OpQuery<'a> {
        OpQuery {
            op_type: op,
            domain,
            opset,
            input_dtypes: dtypes,
        }
    }

    fn registry() -> OperatorRegistry {
        let mut r = OperatorRegistry::new("test");
        r.register("Relu", "", 14..=i64::MAX, &[DType::F32], new_kernel)
            .register("Relu", "ai.onnx", 6..=13, &[], old_kernel);
        r
    }

    fn reshape_ok(mut op: Box<dyn Operator>) -> bool {
        let mut outputs: Vec<Option<tensor_core::Tensor>> = Vec::new();
        op.reshape(&mut KernelIo::new(vec![], &mut outputs))
    }

    #[test]
    fn test_supports_normalizes_domain() {
        let r = registry();
        assert!(r.supports("Relu", ""));
        assert!(r.supports("Relu", "ai.onnx"));
        assert!(!r.supports("Relu", "com.microsoft"));
        assert!(!r.supports("Tanh", ""));
    }

    #[test]
    fn test_resolve_picks_opset_range() {
        let r = registry();
        let f32s = [DType::F32];
        let newer = r.resolve(&query("Relu", "", 14, &f32s)).unwrap();
        assert!(reshape_ok(newer));
        let older = r.resolve(&query("Relu", "", 6, &f32s)).unwrap();
        assert!(!reshape_ok(older));
        assert!(r.resolve(&query("Relu", "", 5, &f32s)).is_none());
    }

    #[test]
    fn test_resolve_checks_dtype() {
        let r = registry();
        assert!(r.resolve(&query("Relu", "", 14, &[DType::I32])).is_none());
        // The old range accepts any dtype.
        assert!(r.resolve(&query("Relu", "", 13, &[DType::I32])).is_some());
        assert!(r.resolve(&query("Relu", "", 14, &[])).is_none());
    }

    #[test]
    fn test_defaults_catalog() {
        let r = OperatorRegistry::with_defaults();
        for op in [
            "Acos",
            "Acosh",
            "Add",
            "Atan",
            "ConvInteger",
            "DynamicQuantizeLinear",
            "Gather",
            "LSTM",
            "MatMul",
            "MatMulInteger",
            "ReduceMin",
        ] {
            assert!(r.supports(op, ""), "{op} missing");
        }
        assert!(r.supports("DynamicQuantizeLSTM", "com.microsoft"));
        assert_eq!(r.name(), "default");
    }
}
