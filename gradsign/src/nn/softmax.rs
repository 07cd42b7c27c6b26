use gradsign_core::{
    dtypes::Dtype,
    nn_traits::Module,
    tensor::{Error, Tape, Tensor},
};

/// Calls [gradsign_core::tensor_ops::softmax()] over the last axis, turning
/// logits into class probabilities.
#[derive(Default, Debug, Clone, Copy)]
pub struct Softmax;

impl<E: Dtype, T: Tape<E>> Module<Tensor<E, T>> for Softmax {
    type Output = Tensor<E, T>;
    fn try_forward(&self, x: Tensor<E, T>) -> Result<Self::Output, Error> {
        x.try_softmax()
    }
}
