//! Elementwise arithmetic between two tensors of the same shape.

use super::utilities::{try_binary_op, BinaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Merge, Tape, Tensor},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryAddKernelOp;

#[derive(Debug, Default, Clone, Copy)]
pub struct BinarySubKernelOp;

#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryMulKernelOp;

impl<E: Dtype> BinaryDerivative<E> for BinaryAddKernelOp {
    #[inline(always)]
    fn f(&self, x: &E, y: &E) -> E {
        *x + *y
    }
    #[inline(always)]
    fn dfdx(&self, _: &E, _: &E) -> E {
        E::one()
    }
    #[inline(always)]
    fn dfdy(&self, _: &E, _: &E) -> E {
        E::one()
    }
}

impl<E: Dtype> BinaryDerivative<E> for BinarySubKernelOp {
    #[inline(always)]
    fn f(&self, x: &E, y: &E) -> E {
        *x - *y
    }
    #[inline(always)]
    fn dfdx(&self, _: &E, _: &E) -> E {
        E::one()
    }
    #[inline(always)]
    fn dfdy(&self, _: &E, _: &E) -> E {
        -E::one()
    }
}

impl<E: Dtype> BinaryDerivative<E> for BinaryMulKernelOp {
    #[inline(always)]
    fn f(&self, x: &E, y: &E) -> E {
        *x * *y
    }
    #[inline(always)]
    fn dfdx(&self, _: &E, y: &E) -> E {
        *y
    }
    #[inline(always)]
    fn dfdy(&self, x: &E, _: &E) -> E {
        *x
    }
}

/// Element wise addition. `lhs + rhs`
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let a: Tensor<f32> = dev.tensor([[1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]]);
/// let r = a.clone() + a;
/// assert_eq!(r.as_vec(), [2.0, 4.0, 6.0, -2.0, -4.0, -6.0]);
/// ```
pub fn add<E: Dtype, L: Tape<E> + Merge<R>, R>(
    lhs: Tensor<E, L>,
    rhs: Tensor<E, R>,
) -> Tensor<E, L> {
    lhs.try_add(rhs).unwrap()
}

/// Element wise subtraction. `lhs - rhs`
pub fn sub<E: Dtype, L: Tape<E> + Merge<R>, R>(
    lhs: Tensor<E, L>,
    rhs: Tensor<E, R>,
) -> Tensor<E, L> {
    lhs.try_sub(rhs).unwrap()
}

/// Element wise multiplication. `lhs * rhs`
pub fn mul<E: Dtype, L: Tape<E> + Merge<R>, R>(
    lhs: Tensor<E, L>,
    rhs: Tensor<E, R>,
) -> Tensor<E, L> {
    lhs.try_mul(rhs).unwrap()
}

impl<E: Dtype, L: Tape<E>> Tensor<E, L> {
    /// See [add]. Returns [Error::ShapeMismatch] if the shapes differ.
    pub fn try_add<R>(self, rhs: Tensor<E, R>) -> Result<Self, Error>
    where
        L: Merge<R>,
    {
        try_binary_op(BinaryAddKernelOp, "add", self, rhs)
    }

    /// See [sub]. Returns [Error::ShapeMismatch] if the shapes differ.
    pub fn try_sub<R>(self, rhs: Tensor<E, R>) -> Result<Self, Error>
    where
        L: Merge<R>,
    {
        try_binary_op(BinarySubKernelOp, "sub", self, rhs)
    }

    /// See [mul]. Returns [Error::ShapeMismatch] if the shapes differ.
    pub fn try_mul<R>(self, rhs: Tensor<E, R>) -> Result<Self, Error>
    where
        L: Merge<R>,
    {
        try_binary_op(BinaryMulKernelOp, "mul", self, rhs)
    }
}

macro_rules! binary_operator {
    ($Trait:ident, $method:ident, $try_method:ident) => {
        impl<E: Dtype, L: Tape<E> + Merge<R>, R> std::ops::$Trait<Tensor<E, R>> for Tensor<E, L> {
            type Output = Tensor<E, L>;
            fn $method(self, rhs: Tensor<E, R>) -> Self::Output {
                self.$try_method(rhs).unwrap()
            }
        }
    };
}

binary_operator!(Add, add, try_add);
binary_operator!(Sub, sub, try_sub);
binary_operator!(Mul, mul, try_mul);
