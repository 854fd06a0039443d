// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Name-indexed storage for every tensor of a context.
//!
//! Nodes refer to tensors through [`TensorId`] handles. While a kernel runs,
//! its output tensors are taken out of the arena and put back afterwards,
//! which lets the kernel borrow inputs shared and outputs exclusively.

use std::collections::HashMap;
use tensor_core::Tensor;

/// Stable handle to a tensor in a [`TensorArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(usize);

impl TensorId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct TensorArena {
    tensors: Vec<Tensor>,
    index: HashMap<String, TensorId>,
}

impl TensorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tensor under its own name. If the name is taken, the existing
    /// tensor is kept and its handle returned.
    pub fn insert(&mut self, tensor: Tensor) -> TensorId {
        if let Some(&id) = self.index.get(tensor.name()) {
            return id;
        }
        let id = TensorId(self.tensors.len());
        self.index.insert(tensor.name().to_string(), id);
        self.tensors.push(tensor);
        id
    }

    pub fn id(&self, name: &str) -> Option<TensorId> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, id: TensorId) -> &Tensor {
        &self.tensors[id.0]
    }

    pub fn get_mut(&mut self, id: TensorId) -> &mut Tensor {
        &mut self.tensors[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Tensor> {
        self.id(name).map(|id| self.get(id))
    }

    pub fn by_name_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        self.id(name).map(|id| self.get_mut(id))
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Iterates tensors in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TensorId, &Tensor)> {
        self.tensors
            .iter()
            .enumerate()
            .map(|(i, t)| (TensorId(i), t))
    }

    /// Moves a tensor out, leaving an unnamed undefined tensor in its slot.
    pub(crate) fn take(&mut self, id: TensorId) -> Tensor {
        std::mem::take(&mut self.tensors[id.0])
    }

    /// Puts back a tensor previously obtained from [`take`](Self::take).
    pub(crate) fn restore(&mut self, id: TensorId, tensor: Tensor) {
        self.tensors[id.0] = tensor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::DType;

    #[test]
    fn test_insert_and_lookup() {
        let mut arena = TensorArena::new();
        let a = arena.insert(Tensor::new("a", DType::F32, &[2]));
        let b = arena.insert(Tensor::new("b", DType::I64, &[3]));
        assert_ne!(a, b);
        assert_eq!(arena.id("a"), Some(a));
        assert_eq!(arena.get(b).dtype(), DType::I64);
        assert_eq!(arena.len(), 2);
        assert!(arena.by_name("c").is_none());
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let mut arena = TensorArena::new();
        let first = arena.insert(Tensor::new("x", DType::F32, &[2]));
        let second = arena.insert(Tensor::new("x", DType::I8, &[9]));
        assert_eq!(first, second);
        assert_eq!(arena.get(first).dtype(), DType::F32);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_take_and_restore() {
        let mut arena = TensorArena::new();
        let id = arena.insert(Tensor::from_values("y", &[2], &[1.0f32, 2.0]).unwrap());
        let mut t = arena.take(id);
        assert_eq!(arena.get(id).dtype(), DType::Undefined);
        t.as_slice_mut::<f32>().unwrap()[0] = 5.0;
        arena.restore(id, t);
        assert_eq!(arena.get(id).as_slice::<f32>(), Some(&[5.0f32, 2.0][..]));
        assert_eq!(arena.id("y"), Some(id));
    }
}
