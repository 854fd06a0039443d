// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `LSTM`: one recurrent layer over a whole sequence.
//!
//! Inputs: `X`, `W`, `R`, then optional `B`, `sequence_lens`, `initial_h`,
//! `initial_c`, `P`. Outputs: optional `Y`, `Y_h`, `Y_c`.
//!
//! The attribute handling, output sizing and buffer plumbing here are shared
//! with `DynamicQuantizeLSTM`, which differs only in how W and R arrive.

use super::{required_input, LATEST};
use crate::operator::{KernelIo, NodeInfo, Operator};
use crate::resolver::{OpQuery, OperatorRegistry};
use tensor_core::ops::{
    lstm_forward, LstmConfig, LstmDirection, LstmInputs, LstmOutputs, WeightLayout,
};
use tensor_core::{DType, Tensor, TensorError};

pub(super) const IN_X: usize = 0;
pub(super) const IN_W: usize = 1;
pub(super) const IN_R: usize = 2;
const IN_B: usize = 3;
const IN_SEQ_LENS: usize = 4;
const IN_INITIAL_H: usize = 5;
const IN_INITIAL_C: usize = 6;
const IN_P: usize = 7;

// ── Shared attribute handling ──────────────────────────────────────

/// Attributes common to the float and quantized recurrent operators.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct LstmAttrs {
    /// 0 when the attribute is missing; inferred from R.
    pub hidden_size: usize,
    pub clip: f32,
    pub batch_first: bool,
    pub input_forget: bool,
    pub direction: LstmDirection,
}

impl LstmAttrs {
    /// Returns `None` for an unknown direction or a negative hidden size.
    pub fn read(node: &NodeInfo<'_>) -> Option<Self> {
        let attrs = node.attributes();
        let direction = LstmDirection::parse(&attrs.string("direction", "forward"))?;
        let hidden_size = usize::try_from(attrs.int("hidden_size", 0)).ok()?;
        Some(Self {
            hidden_size,
            clip: attrs.float("clip", 0.0),
            batch_first: attrs.int("layout", 0) != 0,
            input_forget: attrs.int("input_forget", 0) != 0,
            direction,
        })
    }

    /// Derives the layer geometry from X's dims. `hidden_from_r` is used
    /// when the attribute did not give a hidden size.
    pub fn config(
        &self,
        x_dims: &[i64],
        hidden_from_r: Option<i64>,
        weight_layout: WeightLayout,
    ) -> Option<LstmConfig> {
        let [a, b, input] = *x_dims else {
            return None;
        };
        let (seq_len, batch) = if self.batch_first { (b, a) } else { (a, b) };
        let hidden = match self.hidden_size {
            0 => usize::try_from(hidden_from_r?).ok()?,
            h => h,
        };
        Some(LstmConfig {
            hidden,
            input: usize::try_from(input).ok()?,
            seq_len: usize::try_from(seq_len).ok()?,
            batch: usize::try_from(batch).ok()?,
            direction: self.direction,
            clip: self.clip,
            input_forget: self.input_forget,
            batch_first: self.batch_first,
            weight_layout,
        })
    }
}

/// Sizes whichever of Y, Y_h and Y_c the node produces.
pub(super) fn reshape_outputs(cfg: &LstmConfig, io: &mut KernelIo<'_>) -> bool {
    let y_dims = cfg.y_dims();
    let state_dims = cfg.state_dims();
    io.outputs_mut()
        .iter_mut()
        .take(3)
        .enumerate()
        .all(|(i, slot)| match slot {
            None => true,
            Some(t) => {
                let dims = if i == 0 { &y_dims } else { &state_dims };
                t.reshape(dims, DType::F32).is_ok()
            }
        })
}

/// Present `f32` input at `index`; an input of another dtype is an error.
pub(super) fn optional_f32<'a>(
    io: &KernelIo<'a>,
    index: usize,
    op: &'static str,
) -> Result<Option<&'a [f32]>, TensorError> {
    io.input(index).map(|t| f32_data(t, op)).transpose()
}

pub(super) fn f32_data<'a>(t: &'a Tensor, op: &'static str) -> Result<&'a [f32], TensorError> {
    t.as_slice::<f32>().ok_or(TensorError::UnsupportedDType {
        op,
        dtype: t.dtype(),
    })
}

/// Runs the layer with already-float W and R, reading every other input
/// from `io` and writing every present output.
pub(super) fn run_layer(
    cfg: &LstmConfig,
    io: &mut KernelIo<'_>,
    w: &[f32],
    r: &[f32],
    op: &'static str,
) -> Result<(), TensorError> {
    let x = f32_data(required_input(io, IN_X, op)?, op)?;
    let seq_lens = match io.input(IN_SEQ_LENS) {
        Some(t) => Some(t.as_slice::<i32>().ok_or(TensorError::UnsupportedDType {
            op,
            dtype: t.dtype(),
        })?),
        None => None,
    };
    let inputs = LstmInputs {
        x,
        w,
        r,
        b: optional_f32(io, IN_B, op)?,
        seq_lens,
        initial_h: optional_f32(io, IN_INITIAL_H, op)?,
        initial_c: optional_f32(io, IN_INITIAL_C, op)?,
        p: optional_f32(io, IN_P, op)?,
    };

    let mut slots = io
        .outputs_mut()
        .iter_mut()
        .map(|slot| slot.as_mut().and_then(|t| t.as_slice_mut::<f32>()));
    let mut outputs = LstmOutputs {
        y: slots.next().flatten(),
        y_h: slots.next().flatten(),
        y_c: slots.next().flatten(),
    };
    lstm_forward(cfg, &inputs, &mut outputs)
}

// ── LSTM ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Lstm {
    attrs: LstmAttrs,
    config: Option<LstmConfig>,
}

impl Operator for Lstm {
    fn init(&mut self, node: &NodeInfo<'_>) -> bool {
        if node.num_inputs() < 3 || node.num_outputs() < 1 {
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
        // R is [dirs, 4 * hidden, hidden].
        let hidden_from_r = r.dims().get(2).copied();
        let Some(cfg) = self
            .attrs
            .config(x.dims(), hidden_from_r, WeightLayout::GateMajor)
        else {
            return false;
        };
        let dirs = cfg.num_directions() as i64;
        let expected_w = [dirs, 4 * cfg.hidden as i64, cfg.input as i64];
        if w.dims() != expected_w {
            tracing::debug!(w = ?w.dims(), expected = ?expected_w, "LSTM weights do not match X");
            return false;
        }
        self.config = Some(cfg);
        reshape_outputs(&cfg, io)
    }

    fn compute(&mut self, io: &mut KernelIo<'_>) -> Result<(), TensorError> {
        let cfg = self.config.ok_or_else(|| TensorError::Numeric {
            op: "LSTM",
            detail: "compute before reshape".to_string(),
        })?;
        let w = f32_data(required_input(io, IN_W, "LSTM")?, "LSTM")?;
        let r = f32_data(required_input(io, IN_R, "LSTM")?, "LSTM")?;
        run_layer(&cfg, io, w, r, "LSTM")
    }
}

fn new_lstm(_query: &OpQuery<'_>) -> Box<dyn Operator> {
    Box::new(Lstm::default())
}

pub(super) fn register(registry: &mut OperatorRegistry) {
    registry.register("LSTM", "", 7..=LATEST, &[DType::F32], new_lstm);
}
