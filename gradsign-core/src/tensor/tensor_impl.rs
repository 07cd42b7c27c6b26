use std::sync::Arc;

use super::{Cpu, NoneTape, OwnedTape, UniqueId};
use crate::{dtypes::Dtype, shapes::Shape};

/// The single tensor struct that stores nd arrays and tapes.
///
/// See module level documentation on how to create and use tensors.
///
/// Generics:
/// 1. [Dtype] - the type of the datas stored in the array
/// 2. Tape - the tape the tensor has, [NoneTape] or [OwnedTape]
///
/// Cloning a tensor is cheap: the buffer is reference counted and only
/// copied when it is mutated.
#[derive(Debug, Clone)]
pub struct Tensor<E: Dtype, T = NoneTape> {
    pub(crate) id: UniqueId,
    pub(crate) data: Arc<Vec<E>>,
    pub(crate) shape: Shape,
    pub(crate) device: Cpu,
    pub(crate) tape: T,
}

impl<E: Dtype, T> Tensor<E, T> {
    pub fn id(&self) -> UniqueId {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn device(&self) -> &Cpu {
        &self.device
    }

    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Borrows the row-major buffer.
    pub fn as_slice(&self) -> &[E] {
        &self.data
    }

    /// Copies the row-major buffer out.
    pub fn as_vec(&self) -> Vec<E> {
        self.data.as_ref().clone()
    }

    /// Returns the single element of a one element tensor.
    pub fn scalar(&self) -> Option<E> {
        match self.data.as_slice() {
            [x] => Some(*x),
            _ => None,
        }
    }
}

impl<E: Dtype> Tensor<E, NoneTape> {
    /// Clone and put a new [OwnedTape] into the tensor. The clone keeps the
    /// [UniqueId], so gradients computed through it can be looked up with
    /// the original.
    pub fn leaky_trace(&self) -> Tensor<E, OwnedTape<E>> {
        self.clone().leaky_traced()
    }

    /// Put a new [OwnedTape] into the tensor.
    pub fn leaky_traced(self) -> Tensor<E, OwnedTape<E>> {
        self.put_tape(Default::default())
    }
}

/// Put a tape of type `T` into the tensor
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let a: Tensor<f32> = dev.zeros([2, 3]);
/// let a: Tensor<f32, OwnedTape<f32>> = a.put_tape(Default::default());
/// ```
pub trait PutTape<T> {
    type Output;
    fn put_tape(self, tape: T) -> Self::Output;
}

impl<E: Dtype, T> PutTape<T> for Tensor<E, NoneTape> {
    type Output = Tensor<E, T>;
    fn put_tape(self, tape: T) -> Self::Output {
        Tensor {
            id: self.id,
            data: self.data,
            shape: self.shape,
            device: self.device,
            tape,
        }
    }
}

/// Remove the tape from a tensor
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let a: Tensor<f32, OwnedTape<f32>> = dev.zeros([5]).leaky_traced();
/// let (a, tape): (Tensor<f32>, OwnedTape<f32>) = a.split_tape();
/// ```
pub trait SplitTape {
    /// The type of tape the tensor has now
    type Tape;
    /// The type of Self without the tape.
    type NoTape: Clone + PutTape<Self::Tape, Output = Self>;
    /// Splits tape off of self
    fn split_tape(self) -> (Self::NoTape, Self::Tape);
}

impl<E: Dtype, T> SplitTape for Tensor<E, T> {
    type Tape = T;
    type NoTape = Tensor<E, NoneTape>;
    fn split_tape(self) -> (Self::NoTape, Self::Tape) {
        (
            Tensor {
                id: self.id,
                data: self.data,
                shape: self.shape,
                device: self.device,
                tape: NoneTape,
            },
            self.tape,
        )
    }
}

/// Anything gradients can be allocated for: a [Tensor] or a [super::GhostTensor].
pub trait Tensorlike {
    fn id(&self) -> UniqueId;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Dtype, T> Tensorlike for Tensor<E, T> {
    fn id(&self) -> UniqueId {
        self.id
    }
    fn len(&self) -> usize {
        self.data.len()
    }
}
