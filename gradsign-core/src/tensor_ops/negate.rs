use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Default, Copy, Clone)]
pub struct NegateKernelOp;

impl<E: Dtype> UnaryDerivative<E> for NegateKernelOp {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        -*x
    }
    #[inline(always)]
    fn df(&self, _: &E) -> E {
        -E::one()
    }
}

/// Replaces any [std::ops::Neg] with this function. `-t`
pub fn negate<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.negate()
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [negate]
    pub fn negate(self) -> Self {
        self.try_negate().unwrap()
    }
    /// See [negate]
    pub fn try_negate(self) -> Result<Self, Error> {
        try_unary_op(NegateKernelOp, self)
    }
}

impl<E: Dtype, T: Tape<E>> std::ops::Neg for Tensor<E, T> {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self.negate()
    }
}
