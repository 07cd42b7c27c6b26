use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Clone, Copy)]
pub struct ClampKernelOp<E> {
    pub min: E,
    pub max: E,
}

impl<E: Dtype> UnaryDerivative<E> for ClampKernelOp<E> {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        x.max(self.min).min(self.max)
    }
    #[inline(always)]
    fn df(&self, x: &E) -> E {
        if (self.min..=self.max).contains(x) {
            E::one()
        } else {
            E::zero()
        }
    }
}

/// Clamp all elements between the provided min and max values.
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let t: Tensor<f32> = dev.tensor([-1.0, -0.5, 0.0, 0.5, 1.0]);
/// let r = t.clamp(-0.5, 0.5);
/// assert_eq!(r.as_vec(), [-0.5, -0.5, 0.0, 0.5, 0.5]);
/// ```
pub fn clamp<E: Dtype, T: Tape<E>>(t: Tensor<E, T>, min: E, max: E) -> Tensor<E, T> {
    t.clamp(min, max)
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [clamp]
    pub fn clamp(self, min: E, max: E) -> Self {
        self.try_clamp(min, max).unwrap()
    }
    /// See [clamp]
    pub fn try_clamp(self, min: E, max: E) -> Result<Self, Error> {
        try_unary_op(ClampKernelOp { min, max }, self)
    }
}
