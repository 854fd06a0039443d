// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! LSTM cell math shared by the float and quantized recurrent operators.
//!
//! Gate order is input, output, forget, cell. For one direction and step:
//!
//! ```text
//! i  = σ(Wi·x + Ri·h + Wbi + Rbi + Pi ⊙ c)
//! f  = σ(Wf·x + Rf·h + Wbf + Rbf + Pf ⊙ c)     (1 - i with input_forget)
//! c̃  = tanh(Wc·x + Rc·h + Wbc + Rbc)
//! c' = f ⊙ c + i ⊙ c̃                            (clipped to ±clip)
//! o  = σ(Wo·x + Ro·h + Wbo + Rbo + Po ⊙ c')
//! h' = o ⊙ tanh(c')
//! ```

use crate::TensorError;

const GATE_I: usize = 0;
const GATE_O: usize = 1;
const GATE_F: usize = 2;
const GATE_C: usize = 3;

/// Which way each direction walks the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LstmDirection {
    #[default]
    Forward,
    Reverse,
    Bidirectional,
}

impl LstmDirection {
    /// Parses the `direction` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(LstmDirection::Forward),
            "reverse" => Some(LstmDirection::Reverse),
            "bidirectional" => Some(LstmDirection::Bidirectional),
            _ => None,
        }
    }

    pub fn num_directions(self) -> usize {
        match self {
            LstmDirection::Bidirectional => 2,
            _ => 1,
        }
    }

    fn is_reversed(self, direction: usize) -> bool {
        match self {
            LstmDirection::Forward => false,
            LstmDirection::Reverse => true,
            LstmDirection::Bidirectional => direction == 1,
        }
    }
}

/// Memory layout of the W/R weight tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightLayout {
    /// `[dirs, 4 * hidden, rows]`, the layout of the standard LSTM.
    GateMajor,
    /// `[dirs, rows, 4 * hidden]`, the layout of the quantized variant.
    InputMajor,
}

/// Scalar settings of a recurrent layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LstmConfig {
    pub hidden: usize,
    pub input: usize,
    pub seq_len: usize,
    pub batch: usize,
    pub direction: LstmDirection,
    /// 0 disables clipping.
    pub clip: f32,
    pub input_forget: bool,
    /// `layout = 1`: X and Y are batch-major.
    pub batch_first: bool,
    pub weight_layout: WeightLayout,
}

/// Input buffers of a recurrent layer. All are `f32`, already dequantized.
#[derive(Debug, Clone, Copy)]
pub struct LstmInputs<'a> {
    pub x: &'a [f32],
    pub w: &'a [f32],
    pub r: &'a [f32],
    /// `[dirs, 8 * hidden]`: input biases then recurrence biases.
    pub b: Option<&'a [f32]>,
    pub seq_lens: Option<&'a [i32]>,
    pub initial_h: Option<&'a [f32]>,
    pub initial_c: Option<&'a [f32]>,
    /// `[dirs, 3 * hidden]`: input, output and forget peepholes.
    pub p: Option<&'a [f32]>,
}

/// Output buffers; any of them may be absent.
#[derive(Debug, Default)]
pub struct LstmOutputs<'a> {
    pub y: Option<&'a mut [f32]>,
    pub y_h: Option<&'a mut [f32]>,
    pub y_c: Option<&'a mut [f32]>,
}

impl LstmConfig {
    pub fn num_directions(&self) -> usize {
        self.direction.num_directions()
    }

    /// Dims of Y.
    pub fn y_dims(&self) -> Vec<i64> {
        let (s, d, b, h) = self.dims_i64();
        if self.batch_first {
            vec![b, s, d, h]
        } else {
            vec![s, d, b, h]
        }
    }

    /// Dims of Y_h and Y_c.
    pub fn state_dims(&self) -> Vec<i64> {
        let (_, d, b, h) = self.dims_i64();
        if self.batch_first {
            vec![b, d, h]
        } else {
            vec![d, b, h]
        }
    }

    fn dims_i64(&self) -> (i64, i64, i64, i64) {
        (
            self.seq_len as i64,
            self.num_directions() as i64,
            self.batch as i64,
            self.hidden as i64,
        )
    }

    fn x_index(&self, s: usize, b: usize) -> usize {
        if self.batch_first {
            (b * self.seq_len + s) * self.input
        } else {
            (s * self.batch + b) * self.input
        }
    }

    fn y_index(&self, s: usize, d: usize, b: usize) -> usize {
        let dirs = self.num_directions();
        if self.batch_first {
            ((b * self.seq_len + s) * dirs + d) * self.hidden
        } else {
            ((s * dirs + d) * self.batch + b) * self.hidden
        }
    }

    fn state_index(&self, d: usize, b: usize) -> usize {
        if self.batch_first {
            (b * self.num_directions() + d) * self.hidden
        } else {
            (d * self.batch + b) * self.hidden
        }
    }

    /// Index of the weight feeding gate `g`, unit `j` from input `k`.
    #[inline]
    fn weight_index(&self, rows: usize, d: usize, g: usize, j: usize, k: usize) -> usize {
        let h4 = 4 * self.hidden;
        match self.weight_layout {
            WeightLayout::GateMajor => (d * h4 + g * self.hidden + j) * rows + k,
            WeightLayout::InputMajor => d * rows * h4 + k * h4 + g * self.hidden + j,
        }
    }
}

/// Numerically stable logistic function.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn check_len(what: &str, actual: usize, expected: usize) -> Result<(), TensorError> {
    if actual < expected {
        return Err(TensorError::Numeric {
            op: "lstm",
            detail: format!("{what} holds {actual} values, expected {expected}"),
        });
    }
    Ok(())
}

/// Runs every direction of the layer over the whole sequence.
///
/// Y entries past a batch row's sequence length are zero.
///
/// # Errors
/// Returns [`TensorError::Numeric`] if a buffer is shorter than the shapes
/// in `cfg` require.
pub fn lstm_forward(
    cfg: &LstmConfig,
    inputs: &LstmInputs<'_>,
    outputs: &mut LstmOutputs<'_>,
) -> Result<(), TensorError> {
    let (h, batch, dirs) = (cfg.hidden, cfg.batch, cfg.num_directions());
    check_len("X", inputs.x.len(), cfg.seq_len * batch * cfg.input)?;
    check_len("W", inputs.w.len(), dirs * 4 * h * cfg.input)?;
    check_len("R", inputs.r.len(), dirs * 4 * h * h)?;
    if let Some(b) = inputs.b {
        check_len("B", b.len(), dirs * 8 * h)?;
    }
    if let Some(p) = inputs.p {
        check_len("P", p.len(), dirs * 3 * h)?;
    }
    if let Some(sl) = inputs.seq_lens {
        check_len("sequence_lens", sl.len(), batch)?;
    }
    for init in [inputs.initial_h, inputs.initial_c].into_iter().flatten() {
        check_len("initial state", init.len(), dirs * batch * h)?;
    }

    let row_len = |b: usize| -> usize {
        inputs
            .seq_lens
            .map(|sl| usize::try_from(sl[b]).unwrap_or(0).min(cfg.seq_len))
            .unwrap_or(cfg.seq_len)
    };

    if let Some(y) = outputs.y.as_deref_mut() {
        y.iter_mut().for_each(|v| *v = 0.0);
    }

    let mut gates = vec![0.0f32; 4 * h];
    let mut h_next = vec![0.0f32; h];
    for d in 0..dirs {
        let reversed = cfg.direction.is_reversed(d);
        for b in 0..batch {
            let base = cfg.state_index(d, b);
            let mut h_state: Vec<f32> = inputs
                .initial_h
                .map(|v| v[base..base + h].to_vec())
                .unwrap_or_else(|| vec![0.0; h]);
            let mut c_state: Vec<f32> = inputs
                .initial_c
                .map(|v| v[base..base + h].to_vec())
                .unwrap_or_else(|| vec![0.0; h]);

            let len = row_len(b);
            for step in 0..len {
                let s = if reversed { len - 1 - step } else { step };
                let x = &inputs.x[cfg.x_index(s, b)..cfg.x_index(s, b) + cfg.input];

                // Pre-activations of all four gates.
                for g in 0..4 {
                    for j in 0..h {
                        let mut acc = inputs
                            .b
                            .map(|bias| {
                                bias[d * 8 * h + g * h + j] + bias[d * 8 * h + 4 * h + g * h + j]
                            })
                            .unwrap_or(0.0);
                        for (k, &xk) in x.iter().enumerate() {
                            acc += xk * inputs.w[cfg.weight_index(cfg.input, d, g, j, k)];
                        }
                        for (k, &hk) in h_state.iter().enumerate() {
                            acc += hk * inputs.r[cfg.weight_index(h, d, g, j, k)];
                        }
                        gates[g * h + j] = acc;
                    }
                }

                for j in 0..h {
                    let peep = |slot: usize| {
                        inputs
                            .p
                            .map(|p| p[d * 3 * h + slot * h + j])
                            .unwrap_or(0.0)
                    };
                    let c_prev = c_state[j];
                    let i = sigmoid(gates[GATE_I * h + j] + peep(0) * c_prev);
                    let f = if cfg.input_forget {
                        1.0 - i
                    } else {
                        sigmoid(gates[GATE_F * h + j] + peep(2) * c_prev)
                    };
                    let c_tilde = gates[GATE_C * h + j].tanh();
                    let mut c = f * c_prev + i * c_tilde;
                    if cfg.clip > 0.0 {
                        c = c.clamp(-cfg.clip, cfg.clip);
                    }
                    let o = sigmoid(gates[GATE_O * h + j] + peep(1) * c);
                    c_state[j] = c;
                    h_next[j] = o * c.tanh();
                }
                h_state.copy_from_slice(&h_next);

                if let Some(y) = outputs.y.as_deref_mut() {
                    let at = cfg.y_index(s, d, b);
                    y[at..at + h].copy_from_slice(&h_state);
                }
            }

            if let Some(y_h) = outputs.y_h.as_deref_mut() {
                y_h[base..base + h].copy_from_slice(&h_state);
            }
            if let Some(y_c) = outputs.y_c.as_deref_mut() {
                y_c[base..base + h].copy_from_slice(&c_state);
            }
        }
    }
    Ok(())
}
