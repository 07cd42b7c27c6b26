//! Implementations of [OwnedTape], [NoneTape], and generic Nd array containers via [Gradients].
#![allow(clippy::type_complexity)]

use std::collections::BTreeMap;

use super::{unique_id, Error, Tensor, Tensorlike, UniqueId};
use crate::dtypes::Dtype;

/// A generic container for keeping gradients of tensors keyed by the
/// tensor's [UniqueId].
///
/// You can:
/// 1. Insert array values into it
/// 2. Remove entries
/// 3. Access references to arrays
/// 4. Access mutable references to arrays
#[derive(Clone, Debug)]
pub struct Gradients<E> {
    gradient_by_id: BTreeMap<UniqueId, Vec<E>>,
}

impl<E> Gradients<E> {
    /// Creates an empty [Gradients]. Gradients of intermediate tensors are
    /// kept alongside those of the traced inputs until the whole object is
    /// dropped, which is why this is called `leaky`.
    pub fn leaky() -> Self {
        Self {
            gradient_by_id: Default::default(),
        }
    }
}

impl<E: Dtype> Gradients<E> {
    /// Retrieves mutable gradient for `t`, allocating one if it isn't present.
    pub fn get_or_alloc_mut(&mut self, t: &impl Tensorlike) -> &mut Vec<E> {
        self.gradient_by_id
            .entry(t.id())
            .or_insert_with(|| vec![E::zero(); t.len()])
    }

    /// Inserts a zeroed gradient for `t` unless one exists.
    pub fn alloc_for(&mut self, t: &impl Tensorlike) {
        self.get_or_alloc_mut(t);
    }

    /// Returns a reference to the underlying gradient if found.
    pub fn get_ref_checked(&self, t: &impl Tensorlike) -> Option<&[E]> {
        self.gradient_by_id.get(&t.id()).map(Vec::as_slice)
    }

    /// Clones the gradient of `t` into a new tensor with `t`'s shape, if
    /// `t` took part in the recorded computation.
    pub fn get<T>(&self, t: &Tensor<E, T>) -> Option<Tensor<E>> {
        let buf = self.gradient_by_id.get(&t.id)?.clone();
        Some(t.device.upgrade(buf, t.shape.clone()))
    }

    /// Borrows a pair of gradients `(&mut L, &R)`.
    /// `l` is the gradient to update, and `r` is the gradient to backprop.
    pub(crate) fn mut_and_ref<Out>(
        &mut self,
        l: &impl Tensorlike,
        r: &impl Tensorlike,
        f: impl FnOnce(&mut [E], &[E]) -> Out,
    ) -> Result<Out, Error> {
        debug_assert_ne!(l.id(), r.id());
        let grad_r = self
            .gradient_by_id
            .remove(&r.id())
            .ok_or(Error::MissingGradient(r.id()))?;
        let out = f(self.get_or_alloc_mut(l), &grad_r);
        self.gradient_by_id.insert(r.id(), grad_r);
        Ok(out)
    }

    /// Borrows a triplet of gradients `(&mut L1, &mut L2, &R)`.
    ///
    /// `l1` and `l2` may be the same tensor (e.g. `x * x`), in which case both
    /// contributions are accumulated into the one buffer.
    pub(crate) fn muts_and_ref<Out>(
        &mut self,
        l1: &impl Tensorlike,
        l2: &impl Tensorlike,
        r: &impl Tensorlike,
        f: impl FnOnce(&mut [E], &mut [E], &[E]) -> Out,
    ) -> Result<Out, Error> {
        debug_assert_ne!(l1.id(), r.id());
        debug_assert_ne!(l2.id(), r.id());
        let grad_r = self
            .gradient_by_id
            .remove(&r.id())
            .ok_or(Error::MissingGradient(r.id()))?;
        let out = if l1.id() == l2.id() {
            let mut scratch = vec![E::zero(); l2.len()];
            let grad_l = self.get_or_alloc_mut(l1);
            let out = f(grad_l, &mut scratch, &grad_r);
            for (g, s) in grad_l.iter_mut().zip(scratch) {
                *g += s;
            }
            out
        } else {
            let mut grad_l2 = self
                .gradient_by_id
                .remove(&l2.id())
                .unwrap_or_else(|| vec![E::zero(); l2.len()]);
            let out = f(self.get_or_alloc_mut(l1), &mut grad_l2, &grad_r);
            self.gradient_by_id.insert(l2.id(), grad_l2);
            out
        };
        self.gradient_by_id.insert(r.id(), grad_r);
        Ok(out)
    }
}

/// Contains a [Gradients] and list of backward operations.
pub struct OwnedTape<E> {
    /// A list of (Time, BackwardOp) pairs. The Time is used to ensure operations
    /// from merged tapes are executed in the correct order.
    pub(crate) operations: Vec<(UniqueId, BackwardOp<E>)>,
    pub(crate) gradients: Gradients<E>,
}

impl<E> Default for OwnedTape<E> {
    fn default() -> Self {
        Self {
            operations: Default::default(),
            gradients: Gradients::leaky(),
        }
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for OwnedTape<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedTape")
            .field("num_operations", &self.operations.len())
            .field("gradients", &self.gradients)
            .finish()
    }
}

impl<E> OwnedTape<E> {
    /// Compute the [Gradients]! This just runs all the operations on a new [Gradients] struct.
    ///
    /// Note that this method takes ownership of self, so it can't be called twice!
    pub(crate) fn execute(mut self) -> Result<Gradients<E>, Error> {
        // Merged tapes interleave operations, so restore recording order first.
        self.operations.sort_by_key(|(k, _)| *k);
        self.operations.dedup_by_key(|(k, _)| *k);
        for (_, operation) in self.operations.drain(..).rev() {
            (operation)(&mut self.gradients)?;
        }
        Ok(self.gradients)
    }

    /// Number of backward operations recorded so far.
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }
}

type BackwardOp<E> = Box<dyn FnOnce(&mut Gradients<E>) -> Result<(), Error>>;

/// Contains nothing. When [Tape::add_backward_op] is called, this struct does nothing.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoneTape;

/// Something that can track backward operations.
pub trait Tape<E: Dtype>: Default + Merge<Self> + Merge<NoneTape> {
    /// Whether this object is currently tracking gradients. This is known at compile time.
    const OWNS_TAPE: bool;
    fn add_backward_op<F>(&mut self, operation: F)
    where
        F: 'static + FnOnce(&mut Gradients<E>) -> Result<(), Error>;
    fn alloc_grad(&mut self, t: &impl Tensorlike);
}

impl<E: Dtype> Tape<E> for OwnedTape<E> {
    const OWNS_TAPE: bool = true;
    fn add_backward_op<F>(&mut self, operation: F)
    where
        F: 'static + FnOnce(&mut Gradients<E>) -> Result<(), Error>,
    {
        self.operations.push((unique_id(), Box::new(operation)));
    }
    fn alloc_grad(&mut self, t: &impl Tensorlike) {
        self.gradients.alloc_for(t);
    }
}

impl<E: Dtype> Tape<E> for NoneTape {
    const OWNS_TAPE: bool = false;
    fn add_backward_op<F>(&mut self, _: F)
    where
        F: 'static + FnOnce(&mut Gradients<E>) -> Result<(), Error>,
    {
    }
    fn alloc_grad(&mut self, _: &impl Tensorlike) {}
}

/// Combine two things
pub trait Merge<T: ?Sized> {
    /// Merges `T` into `self`
    fn merge(self, other: T) -> Self;
}

impl Merge<NoneTape> for NoneTape {
    fn merge(self, _: NoneTape) -> Self {
        self
    }
}

impl<E> Merge<NoneTape> for OwnedTape<E> {
    fn merge(self, _: NoneTape) -> Self {
        self
    }
}

impl<E> Merge<OwnedTape<E>> for OwnedTape<E> {
    fn merge(mut self, mut other: Self) -> Self {
        self.gradients
            .gradient_by_id
            .append(&mut other.gradients.gradient_by_id);
        self.operations.append(&mut other.operations);
        self
    }
}
