// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `com.microsoft::DynamicQuantizeLSTM`: an LSTM with 8-bit W and R.
//!
//! W is `[dirs, input, 4 * hidden]` and R is `[dirs, hidden, 4 * hidden]`,
//! each with its own scales (input 8 / 10) and optional zero points
//! (input 9 / 11). Weights are dequantized once per reshape and reused by
//! every later compute.

use super::lstm::{reshape_outputs, run_layer, LstmAttrs, IN_R, IN_W, IN_X};
use super::{required_input, LATEST, MS_DOMAIN};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{is_int8, Int8Data, LstmConfig, QuantizedWeights, WeightLayout};
use tensor_core::{DType, Tensor, TensorError};

const IN_W_SCALE: usize = 8;
const IN_W_ZERO_POINT: usize = 9;
const IN_R_SCALE: usize = 10;
const IN_R_ZERO_POINT: usize = 11;

const OP: &str = "DynamicQuantizeLSTM";

#[derive(Debug, Default)]
pub struct DynamicQuantizeLstm {
    attrs: LstmAttrs,
    config: Option<LstmConfig>,
    /// Dequantized W and R.
    weights: Option<(Vec<f32>, Vec<f32>)>,
}

impl DynamicQuantizeLstm {
    fn dequantize(
        io: &KernelIo<'_>,
        cfg: &LstmConfig,
        values: usize,
        scale: usize,
        zero_point: usize,
        rows: usize,
    ) -> Result<Vec<f32>, TensorError> {
        let q = required_input(io, values, OP)?;
        let scales = required_input(io, scale, OP)?;
        let weights = QuantizedWeights {
            values: Int8Data::from_tensor(q).ok_or(TensorError::UnsupportedDType {
                op: OP,
                dtype: q.dtype(),
            })?,
            scales: scales.as_slice::<f32>().ok_or(TensorError::UnsupportedDType {
                op: OP,
                dtype: scales.dtype(),
            })?,
            zero_points: io.input(zero_point).and_then(Int8Data::from_tensor),
            directions: cfg.num_directions(),
            rows,
            hidden: cfg.hidden,
        };
        tracing::trace!(scales = ?weights.scale_mode(), rows, "dequantizing");
        weights.dequantize()
    }
}

fn check_weights(w: &Tensor, r: &Tensor, cfg: &LstmConfig) -> bool {
    let dirs = cfg.num_directions() as i64;
    let (h, h4) = (cfg.hidden as i64, 4 * cfg.hidden as i64);
    is_int8(w.dtype())
        && is_int8(r.dtype())
        && w.dims() == [dirs, cfg.input as i64, h4]
        && r.dims() == [dirs, h, h4]
}

impl Operator for DynamicQuantizeLstm {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        if node.num_inputs() <= IN_R_SCALE || node.num_outputs() < 1 {
            return false;
        }
        if !node.has_input(IN_W_SCALE) || !node.has_input(IN_R_SCALE) {
            return false;
        }
        match LstmAttrs::read(node) {
            Some(attrs) => {
                self.attrs = attrs;
                true
            }
            None => false,
        }
    }

    fn reshape(&mut self, io: &mut KernelIo<'_>) -> bool {
        let (Some(x), Some(w), Some(r)) = (io.input(IN_X), io.input(IN_W), io.input(IN_R))
        else {
            return false;
        };
        // R is [dirs, hidden, 4 * hidden].
        let hidden_from_r = r.dims().get(1).copied();
        let Some(cfg) = self
            .attrs
            .config(x.dims(), hidden_from_r, WeightLayout::InputMajor)
        else {
            return false;
        };
        if !check_weights(w, r, &cfg) {
            tracing::debug!(w = ?w.dims(), r = ?r.dims(), "quantized weights do not match X");
            return false;
        }
        self.config = Some(cfg);
        self.weights = None;
        reshape_outputs(&cfg, io)
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let cfg = self.config.ok_or_else(|| TensorError::Numeric {
            op: OP,
            detail: "compute before reshape".to_string(),
        })?;
        if self.weights.is_none() {
            let w = Self::dequantize(io, &cfg, IN_W, IN_W_SCALE, IN_W_ZERO_POINT, cfg.input)?;
            let r = Self::dequantize(io, &cfg, IN_R, IN_R_SCALE, IN_R_ZERO_POINT, cfg.hidden)?;
            self.weights = Some((w, r));
        }
        let Some((w, r)) = &self.weights else {
            return Ok(());
        };
        run_layer(&cfg, io, w, r, OP)
    }
}

fn new_dynamic_quantize_lstm(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(DynamicQuantizeLstm::default())
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register(
        "DynamicQuantizeLSTM",
        MS_DOMAIN,
        1..=LATEST,
        &[DType::F32],
        new_dynamic_quantize_lstm,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::lstm::Lstm;
    use crate::operators::test_util::{outputs, Harness};
    use model_ir::proto::AttributeProto;

    fn quantized_node() -> Harness {
        let mut h = Harness::new("DynamicQuantizeLSTM", 1, 12, 3)
            .attr(AttributeProto::from_int("hidden_size", 1));
        for i in [3, 4, 5, 6, 7] {
            h = h.absent_input(i);
        }
        h
    }

    /// Per-gate scales over uint8 weights with zero point 128 must give the
    /// same result as the float LSTM fed the dequantized weights.
    #[test]
    fn test_matches_float_lstm() {
        let x = Tensor::from_values("x", &[2, 1, 1], &[1.0f32, -0.5]).unwrap();
        // Input-major [1, 1, 4]: gates i, o, f, c.
        let wq = Tensor::from_values("w", &[1, 1, 4], &[138u8, 118, 148, 128]).unwrap();
        let rq = Tensor::from_values("r", &[1, 1, 4], &[133u8, 128, 123, 138]).unwrap();
        let w_scale = Tensor::from_values("ws", &[4], &[0.05f32, 0.03, 0.04, 0.02]).unwrap();
        let w_zp = Tensor::from_values("wz", &[4], &[128u8; 4]).unwrap();
        let r_scale = Tensor::scalar("rs", 0.1f32);
        let r_zp = Tensor::scalar("rz", 128u8);

        let mut op = DynamicQuantizeLstm::default();
        assert!(quantized_node().init(&mut op));
        let mut q_out = outputs(3);
        {
            let inputs = vec![
                Some(&x), Some(&wq), Some(&rq), None, None, None, None, None,
                Some(&w_scale), Some(&w_zp), Some(&r_scale), Some(&r_zp),
            ];
            let mut io = KernelIo::new(inputs, &mut q_out);
            assert!(op.reshape(&mut io));
            op.compute(&mut io).unwrap();
            // Cached weights give the same answer on a second pass.
            op.compute(&mut io).unwrap();
        }

        // Gate-major float weights, one column per gate.
        let w = Tensor::from_values("w", &[1, 4, 1], &[0.5f32, -0.3, 0.8, 0.0]).unwrap();
        let r = Tensor::from_values("r", &[1, 4, 1], &[0.5f32, 0.0, -0.5, 1.0]).unwrap();
        let mut float_op = Lstm::default();
        let h = Harness::new("LSTM", 14, 3, 3).attr(AttributeProto::from_int("hidden_size", 1));
        assert!(h.init(&mut float_op));
        let mut f_out = outputs(3);
        {
            let mut io = KernelIo::new(vec![Some(&x), Some(&w), Some(&r)], &mut f_out);
            assert!(float_op.reshape(&mut io));
            float_op.compute(&mut io).unwrap();
        }

        for (q, f) in q_out.iter().zip(&f_out) {
            let (q, f) = (q.as_ref().unwrap(), f.as_ref().unwrap());
            assert_eq!(q.dims(), f.dims());
            assert!(q.equal(f), "{} vs {}", q.dump(true), f.dump(true));
        }
    }

    #[test]
    fn test_requires_scales() {
        let mut op = DynamicQuantizeLstm::default();
        assert!(!Harness::new("DynamicQuantizeLSTM", 1, 8, 1).init(&mut op));
        let h = quantized_node().absent_input(IN_R_SCALE);
        assert!(!h.init(&mut op));
    }

    #[test]
    fn test_rejects_float_weights() {
        let x = Tensor::new("x", DType::F32, &[1, 1, 1]);
        let w = Tensor::new("w", DType::F32, &[1, 1, 4]);
        let r = Tensor::new("r", DType::F32, &[1, 1, 4]);
        let mut op = DynamicQuantizeLstm::default();
        assert!(quantized_node().init(&mut op));
        let mut out = outputs(3);
        let mut io = KernelIo::new(vec![Some(&x), Some(&w), Some(&r)], &mut out);
        assert!(!op.reshape(&mut io));
    }
}
