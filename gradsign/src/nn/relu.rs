use gradsign_core::{
    dtypes::Dtype,
    nn_traits::Module,
    tensor::{Error, Tape, Tensor},
};

/// Calls [gradsign_core::tensor_ops::relu()].
#[derive(Default, Debug, Clone, Copy)]
pub struct ReLU;

impl<E: Dtype, T: Tape<E>> Module<Tensor<E, T>> for ReLU {
    type Output = Tensor<E, T>;
    fn try_forward(&self, x: Tensor<E, T>) -> Result<Self::Output, Error> {
        x.try_relu()
    }
}
