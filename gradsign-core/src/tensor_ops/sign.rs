use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Default, Copy, Clone)]
pub struct SignKernelOp;

impl<E: Dtype> UnaryDerivative<E> for SignKernelOp {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        if x > &E::zero() {
            E::one()
        } else if x < &E::zero() {
            -E::one()
        } else {
            // zero (and NaN) map to zero
            E::zero()
        }
    }
    #[inline(always)]
    fn df(&self, _: &E) -> E {
        E::zero()
    }
}

/// Three valued sign: `1` for positive elements, `-1` for negative elements
/// and `0` for zero.
///
/// Unlike [num_traits::Float::signum], `sign(0) == 0` and `sign(-0) == 0`.
/// The derivative is zero everywhere.
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let t: Tensor<f32> = dev.tensor([-0.3, 0.0, 2.0]);
/// assert_eq!(t.sign().as_vec(), [-1.0, 0.0, 1.0]);
/// ```
pub fn sign<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.sign()
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [sign]
    pub fn sign(self) -> Self {
        self.try_sign().unwrap()
    }
    /// See [sign]
    pub fn try_sign(self) -> Result<Self, Error> {
        try_unary_op(SignKernelOp, self)
    }
}
