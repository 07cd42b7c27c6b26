use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Default, Copy, Clone)]
pub struct LnKernelOp;

impl<E: Dtype> UnaryDerivative<E> for LnKernelOp {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        x.ln()
    }
    #[inline(always)]
    fn df(&self, x: &E) -> E {
        x.recip()
    }
}

/// [Natural Logarithm (ln)](https://en.wikipedia.org/wiki/Natural_logarithm). `log_e(t)`.
///
/// It's derivative is `1 / t`.
pub fn ln<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.ln()
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [ln]
    pub fn ln(self) -> Self {
        self.try_ln().unwrap()
    }
    /// See [ln]
    pub fn try_ln(self) -> Result<Self, Error> {
        try_unary_op(LnKernelOp, self)
    }
}
