// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Multidirectional broadcast address mapping.

use crate::Shape;

/// Maps flat indices of a broadcast output to flat indices of one operand.
///
/// Built once per operand/output pair. For each output axis it holds the
/// operand stride to advance by, or 0 where the operand has size 1 or is
/// shorter than the output (right-aligned).
#[derive(Debug, Clone)]
pub struct BroadcastMap {
    out_strides: Vec<usize>,
    operand_strides: Vec<usize>,
    identity: bool,
}

impl BroadcastMap {
    /// Builds the map from `operand` into `out`.
    pub fn new(operand: &Shape, out: &Shape) -> Self {
        let rank = out.rank();
        let out_strides = out.strides();
        let src_strides = operand.strides();
        let src_dims = operand.dims();
        let shift = rank.saturating_sub(src_dims.len());

        let mut operand_strides = vec![0usize; rank];
        for (axis, stride) in operand_strides.iter_mut().enumerate().skip(shift) {
            let k = axis - shift;
            if src_dims[k] != 1 {
                *stride = src_strides[k];
            }
        }

        let identity = operand.dims() == out.dims();
        Self {
            out_strides,
            operand_strides,
            identity,
        }
    }

    /// Returns the operand offset for output element `index`.
    #[inline]
    pub fn offset(&self, index: usize) -> usize {
        if self.identity {
            return index;
        }
        let mut rest = index;
        let mut offset = 0;
        for (&os, &ss) in self.out_strides.iter().zip(&self.operand_strides) {
            let coord = rest / os;
            rest %= os;
            offset += coord * ss;
        }
        offset
    }
}
