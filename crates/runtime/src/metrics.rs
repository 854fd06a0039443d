// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pass reports and profiling metrics.
//!
//! [`RunReport`] describes one pass over the graph: how many nodes computed,
//! were skipped or failed, and (with profiling on) how long each node took.
//! [`RunMetrics`] aggregates many passes for benchmarking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Timing for one node in one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub node: String,
    pub op_type: String,
    /// The kernel was re-bound before this pass.
    pub rebound: bool,
    /// Wall-clock time for reshape and compute.
    pub duration: Duration,
}

/// Outcome of one pass over the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Nodes whose kernel computed successfully.
    pub computed: usize,
    /// Nodes with inputs that were not ready, or bound to no real kernel.
    pub skipped: usize,
    /// Nodes whose reshape or compute failed.
    pub failed: usize,
    /// Nodes re-bound because their inputs changed.
    pub rebound: usize,
    pub total_duration: Duration,
    /// Per-node timings; empty unless profiling is enabled.
    pub node_metrics: Vec<NodeMetrics>,
}

impl RunReport {
    /// Returns `true` if every node computed.
    pub fn is_complete(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }

    pub(crate) fn record_node(&mut self, metrics: NodeMetrics) {
        self.node_metrics.push(metrics);
    }

    /// Returns a one-line summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Pass: {:.3}ms, {} computed, {} skipped, {} failed, {} rebound",
            self.total_duration.as_secs_f64() * 1000.0,
            self.computed,
            self.skipped,
            self.failed,
            self.rebound,
        )
    }
}

/// Aggregate over several passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub passes: usize,
    pub total_duration: Duration,
    pub min_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    /// Accumulated node time per operator type.
    pub op_durations: BTreeMap<String, Duration>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one pass into the aggregate.
    pub fn record(&mut self, report: &RunReport) {
        let d = report.total_duration;
        self.passes += 1;
        self.total_duration += d;
        self.min_duration = Some(self.min_duration.map_or(d, |m| m.min(d)));
        self.max_duration = Some(self.max_duration.map_or(d, |m| m.max(d)));
        for node in &report.node_metrics {
            *self
                .op_durations
                .entry(node.op_type.clone())
                .or_insert(Duration::ZERO) += node.duration;
        }
    }

    pub fn mean_duration(&self) -> Duration {
        if self.passes == 0 {
            return Duration::ZERO;
        }
        self.total_duration / self.passes as u32
    }

    /// Passes per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.total_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.passes as f64 / secs
    }

    /// Operator types by accumulated time, slowest first.
    pub fn hottest_ops(&self) -> Vec<(&str, Duration)> {
        let mut ops: Vec<(&str, Duration)> = self
            .op_durations
            .iter()
            .map(|(op, d)| (op.as_str(), *d))
            .collect();
        ops.sort_by(|a, b| b.1.cmp(&a.1));
        ops
    }

    pub fn summary(&self) -> String {
        let ms = |d: Option<Duration>| d.map_or(0.0, |d| d.as_secs_f64() * 1000.0);
        format!(
            "Benchmark: {} passes, mean {:.3}ms, min {:.3}ms, max {:.3}ms ({:.1} passes/s)",
            self.passes,
            self.mean_duration().as_secs_f64() * 1000.0,
            ms(self.min_duration),
            ms(self.max_duration),
            self.throughput(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(ms: u64, nodes: &[(&str, u64)]) -> RunReport {
        RunReport {
            computed: nodes.len(),
            total_duration: Duration::from_millis(ms),
            node_metrics: nodes
                .iter()
                .map(|(op, d)| NodeMetrics {
                    node: format!("{op}_0"),
                    op_type: op.to_string(),
                    rebound: false,
                    duration: Duration::from_millis(*d),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_metrics() {
        let m = RunMetrics::new();
        assert_eq!(m.mean_duration(), Duration::ZERO);
        assert_eq!(m.throughput(), 0.0);
        assert!(m.hottest_ops().is_empty());
    }

    #[test]
    fn test_record_passes() {
        let mut m = RunMetrics::new();
        m.record(&report(10, &[("MatMul", 6), ("Add", 1)]));
        m.record(&report(20, &[("MatMul", 12), ("Add", 2)]));

        assert_eq!(m.passes, 2);
        assert_eq!(m.mean_duration(), Duration::from_millis(15));
        assert_eq!(m.min_duration, Some(Duration::from_millis(10)));
        assert_eq!(m.max_duration, Some(Duration::from_millis(20)));
        assert_eq!(m.hottest_ops()[0], ("MatMul", Duration::from_millis(18)));
        assert!((m.throughput() - 2.0 / 0.03).abs() < 0.01);
    }

    #[test]
    fn test_report_summary() {
        let r = RunReport {
            computed: 3,
            skipped: 1,
            ..Default::default()
        };
        assert!(!r.is_complete());
        let s = r.summary();
        assert!(s.contains("3 computed"));
        assert!(s.contains("1 skipped"));
    }

    #[test]
    fn test_report_json() {
        let r = report(5, &[("Add", 1)]);
        let json = serde_json::to_string(&r).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
