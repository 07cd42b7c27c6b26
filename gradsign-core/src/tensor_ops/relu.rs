use super::utilities::{try_unary_op, UnaryDerivative};
use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

#[derive(Debug, Default, Copy, Clone)]
pub struct ReLUKernelOp;

impl<E: Dtype> UnaryDerivative<E> for ReLUKernelOp {
    const DF_USES_FX: bool = false;
    #[inline(always)]
    fn f(&self, x: &E) -> E {
        x.max(E::zero())
    }
    #[inline(always)]
    fn df(&self, x: &E) -> E {
        if x > &E::zero() {
            E::one()
        } else {
            E::zero()
        }
    }
}

/// [Rectified Linear Unit (ReLU)](https://en.wikipedia.org/wiki/Rectifier_(neural_networks)). `max(0, t)`
///
/// The derivative is the [Heaviside](https://en.wikipedia.org/wiki/Heaviside_step_function) function.
///
/// Examples:
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let t: Tensor<f32> = dev.tensor([-1.0, 0.0, 1.0, 2.0]);
/// let r = t.relu();
/// assert_eq!(r.as_vec(), [0.0, 0.0, 1.0, 2.0]);
/// ```
pub fn relu<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.relu()
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [relu]
    pub fn relu(self) -> Self {
        self.try_relu().unwrap()
    }
    /// See [relu]
    pub fn try_relu(self) -> Result<Self, Error> {
        try_unary_op(ReLUKernelOp, self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{tensor::*, tensor_ops::*, tests::*};

    #[test]
    fn test_relu() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([-2.0, -1.0, 0.0, 1.0, 2.0]);
        let r = x.leaky_trace().relu();
        assert_eq!(r.as_vec(), [0.0, 0.0, 0.0, 1.0, 2.0]);
        // NOTE: call .exp() to make sure we cover cases where .relu() uses the result's gradient
        let g = r.exp().mean().backward();
        assert_close_to_literal!(
            g.get(&x).unwrap(),
            [0.0, 0.0, 0.0, 0.54365635, 1.4778112]
        );
    }
}
