// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! N-dimensional integer convolution.
//!
//! X is `[N, C, D1, ..., Dk]`, W is `[M, C / group, K1, ..., Kk]` and the
//! output is `int32` `[N, M, O1, ..., Ok]`. Padded positions hold the input
//! zero point, so they add nothing to the sum.

use super::quantize_op::Int8Data;
use crate::{Shape, Tensor, TensorError};

/// How spatial padding is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoPad {
    /// Explicit `pads`.
    #[default]
    NotSet,
    /// Output extent `ceil(in / stride)`, extra padding at the end.
    SameUpper,
    /// Same output extent, extra padding at the start.
    SameLower,
    /// No padding.
    Valid,
}

impl AutoPad {
    /// Parses the `auto_pad` attribute value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "NOTSET" => Some(AutoPad::NotSet),
            "SAME_UPPER" => Some(AutoPad::SameUpper),
            "SAME_LOWER" => Some(AutoPad::SameLower),
            "VALID" => Some(AutoPad::Valid),
            _ => None,
        }
    }
}

/// Convolution attributes as written on a node. Empty lists take the
/// defaults: kernel from W, unit strides and dilations, zero pads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvParams {
    pub auto_pad: AutoPad,
    pub group: i64,
    pub kernel_shape: Vec<i64>,
    pub dilations: Vec<i64>,
    /// `[x1_begin, x2_begin, ..., x1_end, x2_end, ...]`.
    pub pads: Vec<i64>,
    pub strides: Vec<i64>,
}

impl Default for ConvParams {
    fn default() -> Self {
        Self {
            auto_pad: AutoPad::NotSet,
            group: 1,
            kernel_shape: Vec::new(),
            dilations: Vec::new(),
            pads: Vec::new(),
            strides: Vec::new(),
        }
    }
}

/// Validated geometry of one convolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvPlan {
    batch: usize,
    in_channels: usize,
    out_channels: usize,
    /// Input channels seen by each output channel.
    group_channels: usize,
    /// Output channels per group.
    group_outputs: usize,
    in_spatial: Vec<usize>,
    kernel: Vec<usize>,
    out_spatial: Vec<usize>,
    strides: Vec<usize>,
    dilations: Vec<usize>,
    pads_begin: Vec<i64>,
    out_dims: Vec<i64>,
}

fn invalid(detail: String) -> TensorError {
    TensorError::Numeric { op: "conv", detail }
}

/// `values`, or `n` ones when empty. Entries must be positive.
fn per_axis(name: &str, values: &[i64], n: usize) -> Result<Vec<usize>, TensorError> {
    if values.is_empty() {
        return Ok(vec![1; n]);
    }
    if values.len() != n {
        return Err(invalid(format!("{name} has {} entries, expected {n}", values.len())));
    }
    values
        .iter()
        .map(|&v| {
            usize::try_from(v)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| invalid(format!("{name} entry {v} must be positive")))
        })
        .collect()
}

fn positive(dim: i64, what: &str) -> Result<usize, TensorError> {
    usize::try_from(dim)
        .ok()
        .filter(|&d| d > 0)
        .ok_or_else(|| invalid(format!("{what} extent {dim} must be positive")))
}

impl ConvPlan {
    /// Plans the convolution of an input with dims `x` by weights `w`.
    ///
    /// # Errors
    /// Returns [`TensorError::ShapeMismatch`] when the ranks or channel
    /// counts of X and W disagree, and [`TensorError::Numeric`] for bad
    /// attributes or an empty output.
    pub fn new(x: &[i64], w: &[i64], params: &ConvParams) -> Result<Self, TensorError> {
        let mismatch = || TensorError::ShapeMismatch {
            op: "conv",
            lhs: Shape::from(x),
            rhs: Shape::from(w),
        };
        if x.len() < 3 || x.len() != w.len() {
            return Err(mismatch());
        }
        let spatial = x.len() - 2;

        let group = usize::try_from(params.group)
            .ok()
            .filter(|&g| g > 0)
            .ok_or_else(|| invalid(format!("group {} must be positive", params.group)))?;
        let batch = usize::try_from(x[0]).map_err(|_| mismatch())?;
        let in_channels = positive(x[1], "input channel")?;
        let out_channels = positive(w[0], "output channel")?;
        let group_channels = positive(w[1], "weight channel")?;
        if group_channels * group != in_channels || out_channels % group != 0 {
            return Err(mismatch());
        }

        let kernel = w[2..]
            .iter()
            .map(|&k| positive(k, "kernel"))
            .collect::<Result<Vec<_>, _>>()?;
        if !params.kernel_shape.is_empty() && params.kernel_shape != w[2..] {
            return Err(invalid(format!(
                "kernel_shape {:?} does not match weights {:?}",
                params.kernel_shape,
                &w[2..]
            )));
        }
        let in_spatial = x[2..]
            .iter()
            .map(|&d| positive(d, "input"))
            .collect::<Result<Vec<_>, _>>()?;
        let strides = per_axis("strides", &params.strides, spatial)?;
        let dilations = per_axis("dilations", &params.dilations, spatial)?;

        let explicit_pads = match params.pads.len() {
            0 => vec![0; 2 * spatial],
            n if n == 2 * spatial => params.pads.clone(),
            n => return Err(invalid(format!("pads has {n} entries, expected {}", 2 * spatial))),
        };

        let mut pads_begin = Vec::with_capacity(spatial);
        let mut out_spatial = Vec::with_capacity(spatial);
        for a in 0..spatial {
            let (input, stride) = (in_spatial[a] as i64, strides[a] as i64);
            let span = (kernel[a] as i64 - 1) * dilations[a] as i64 + 1;
            let (begin, out) = match params.auto_pad {
                AutoPad::NotSet => {
                    let (begin, end) = (explicit_pads[a], explicit_pads[a + spatial]);
                    (begin, (input + begin + end - span).div_euclid(stride) + 1)
                }
                AutoPad::Valid => (0, (input - span).div_euclid(stride) + 1),
                AutoPad::SameUpper | AutoPad::SameLower => {
                    let out = (input + stride - 1) / stride;
                    let total = ((out - 1) * stride + span - input).max(0);
                    let begin = if params.auto_pad == AutoPad::SameUpper {
                        total / 2
                    } else {
                        total - total / 2
                    };
                    (begin, out)
                }
            };
            pads_begin.push(begin);
            out_spatial.push(positive(out, "output")?);
        }

        let mut out_dims = vec![batch as i64, out_channels as i64];
        out_dims.extend(out_spatial.iter().map(|&d| d as i64));
        Ok(Self {
            batch,
            in_channels,
            out_channels,
            group_channels,
            group_outputs: out_channels / group,
            in_spatial,
            kernel,
            out_spatial,
            strides,
            dilations,
            pads_begin,
            out_dims,
        })
    }

    pub fn out_dims(&self) -> &[i64] {
        &self.out_dims
    }

    /// Padding before the first element of each spatial axis.
    pub fn pads_begin(&self) -> &[i64] {
        &self.pads_begin
    }

    /// Flat spatial offset into one input channel, or `None` in the padding.
    #[inline]
    fn input_offset(&self, out_pos: &[usize], k_pos: &[usize]) -> Option<usize> {
        let mut offset = 0usize;
        for a in 0..self.kernel.len() {
            let at = (out_pos[a] * self.strides[a] + k_pos[a] * self.dilations[a]) as i64
                - self.pads_begin[a];
            let at = usize::try_from(at).ok().filter(|&v| v < self.in_spatial[a])?;
            offset = offset * self.in_spatial[a] + at;
        }
        Some(offset)
    }
}

/// Row-major coordinates of `flat` within `dims`.
fn unravel(mut flat: usize, dims: &[usize], pos: &mut [usize]) {
    for (p, &d) in pos.iter_mut().zip(dims).rev() {
        *p = flat % d;
        flat /= d;
    }
}

/// Integer convolution accumulated in `i32`.
///
/// `x` and `w` are each `int8` or `uint8`. `x_zero_point` is a scalar;
/// `w_zero_point` a scalar or one value per output channel. `output` must
/// be `int32` with the plan's dims.
pub fn conv_integer(
    x: &Tensor,
    w: &Tensor,
    x_zero_point: Option<&Tensor>,
    w_zero_point: Option<&Tensor>,
    plan: &ConvPlan,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let unsupported = |dtype| TensorError::UnsupportedDType {
        op: "conv_integer",
        dtype,
    };
    let xd = Int8Data::from_tensor(x).ok_or_else(|| unsupported(x.dtype()))?;
    let wd = Int8Data::from_tensor(w).ok_or_else(|| unsupported(w.dtype()))?;
    if output.dims() != plan.out_dims() {
        return Err(TensorError::ShapeMismatch {
            op: "conv_integer (output)",
            lhs: Shape::from(plan.out_dims()),
            rhs: output.shape().clone(),
        });
    }

    let x_zp = match x_zero_point {
        Some(t) => {
            let zp = Int8Data::from_tensor(t).ok_or_else(|| unsupported(t.dtype()))?;
            if zp.is_empty() { 0 } else { zp.get(0) }
        }
        None => 0,
    };
    let w_zp = match w_zero_point {
        Some(t) => {
            let zp = Int8Data::from_tensor(t).ok_or_else(|| unsupported(t.dtype()))?;
            if zp.len() != 1 && zp.len() != plan.out_channels {
                return Err(invalid(format!(
                    "w_zero_point has {} values, expected 1 or {}",
                    zp.len(),
                    plan.out_channels
                )));
            }
            Some(zp)
        }
        None => None,
    };

    let in_count: usize = plan.in_spatial.iter().product();
    let k_count: usize = plan.kernel.iter().product();
    let out_count: usize = plan.out_spatial.iter().product();
    if xd.len() < plan.batch * plan.in_channels * in_count
        || wd.len() < plan.out_channels * plan.group_channels * k_count
    {
        return Err(invalid("input buffers are shorter than their dims".to_string()));
    }

    let out_dtype = output.dtype();
    let dst = output
        .as_slice_mut::<i32>()
        .ok_or_else(|| unsupported(out_dtype))?;

    let spatial = plan.kernel.len();
    let mut out_pos = vec![0usize; spatial];
    let mut k_pos = vec![0usize; spatial];
    for n in 0..plan.batch {
        for m in 0..plan.out_channels {
            let first_channel = (m / plan.group_outputs) * plan.group_channels;
            let zw = match &w_zp {
                None => 0,
                Some(zp) if zp.len() == 1 => zp.get(0),
                Some(zp) => zp.get(m),
            };
            for o in 0..out_count {
                unravel(o, &plan.out_spatial, &mut out_pos);
                let mut acc = 0i32;
                for kk in 0..k_count {
                    unravel(kk, &plan.kernel, &mut k_pos);
                    let Some(xi) = plan.input_offset(&out_pos, &k_pos) else {
                        continue;
                    };
                    for c in 0..plan.group_channels {
                        let xv = xd.get((n * plan.in_channels + first_channel + c) * in_count + xi);
                        let wv = wd.get((m * plan.group_channels + c) * k_count + kk);
                        acc = acc.wrapping_add((xv - x_zp).wrapping_mul(wv - zw));
                    }
                }
                dst[(n * plan.out_channels + m) * out_count + o] = acc;
            }
        }
    }
    Ok(())
}
