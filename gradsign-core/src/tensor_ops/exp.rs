use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Default, Copy, Clone)]
pub struct ExpKernelOp;

impl<E: Dtype> UnaryDerivative<E> for ExpKernelOp {
    const DF_USES_FX: bool = true;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        x.exp()
    }
    #[inline(always)]
    fn df(&self, fx: &E) -> E {
        *fx
    }
}

/// [Exponential function (exp)](https://en.wikipedia.org/wiki/Natural_logarithm). Applies `e^x` to all elements.
pub fn exp<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.exp()
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [exp]
    pub fn exp(self) -> Self {
        self.try_exp().unwrap()
    }
    /// See [exp]
    pub fn try_exp(self) -> Result<Self, Error> {
        try_unary_op(ExpKernelOp, self)
    }
}
