//! Elementwise arithmetic with a scalar.

use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Clone, Copy)]
pub struct ScalarAddKernelOp<E> {
    pub scalar: E,
}

#[derive(Debug, Clone, Copy)]
pub struct ScalarMulKernelOp<E> {
    pub scalar: E,
}

impl<E: Dtype> UnaryDerivative<E> for ScalarAddKernelOp<E> {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        *x + self.scalar
    }
    #[inline(always)]
    fn df(&self, _: &E) -> E {
        E::one()
    }
}

impl<E: Dtype> UnaryDerivative<E> for ScalarMulKernelOp<E> {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        *x * self.scalar
    }
    #[inline(always)]
    fn df(&self, _: &E) -> E {
        self.scalar
    }
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// Adds `scalar` to every element.
    pub fn add_scalar(self, scalar: E) -> Self {
        self.try_add_scalar(scalar).unwrap()
    }
    pub fn try_add_scalar(self, scalar: E) -> Result<Self, Error> {
        try_unary_op(ScalarAddKernelOp { scalar }, self)
    }

    /// Multiplies every element by `scalar`.
    pub fn mul_scalar(self, scalar: E) -> Self {
        self.try_mul_scalar(scalar).unwrap()
    }
    pub fn try_mul_scalar(self, scalar: E) -> Result<Self, Error> {
        try_unary_op(ScalarMulKernelOp { scalar }, self)
    }
}
