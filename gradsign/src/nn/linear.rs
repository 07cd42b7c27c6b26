use gradsign_core::{
    dtypes::Dtype,
    nn_traits::{join_key, LoadSafeTensors, Module, SafeTensorEntry, SaveSafeTensors},
    tensor::{Cpu, Error, SampleTensor, Tape, Tensor, ZerosTensor},
};

use super::{BuildOnDevice, ResetParams};

/// A linear transformation of the form `x * weight^T + bias`, where `weight`
/// is a `[out, inp]` matrix, `x` is a `[batch, inp]` matrix, and `bias` is a
/// vector of length `out`.
///
/// Example:
/// ```rust
/// # use gradsign::prelude::*;
/// # let dev: Cpu = Default::default();
/// let model: Linear<f32> = dev.build_module(LinearConfig::new(5, 2)).unwrap();
/// let y = model.forward(dev.zeros([10, 5]));
/// assert_eq!(y.shape().dims(), &[10, 2]);
/// ```
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearConfig {
    pub inp: usize,
    pub out: usize,
}

impl LinearConfig {
    pub fn new(inp: usize, out: usize) -> Self {
        Self { inp, out }
    }
}

impl<E: Dtype> BuildOnDevice<E> for LinearConfig {
    type Built = Linear<E>;
    fn try_build_on_device(&self, device: &Cpu) -> Result<Self::Built, Error> {
        Ok(Linear {
            weight: device.zeros([self.out, self.inp]),
            bias: device.zeros([self.out]),
        })
    }
}

/// See [LinearConfig]
#[derive(Clone, Debug)]
pub struct Linear<E: Dtype> {
    /// Transposed weight matrix, shape `[out, inp]`
    pub weight: Tensor<E>,
    /// Bias vector, shape `[out]`
    pub bias: Tensor<E>,
}

impl<E: Dtype> Linear<E> {
    /// Wraps existing parameters, checking that they fit together.
    pub fn from_params(weight: Tensor<E>, bias: Tensor<E>) -> Result<Self, Error> {
        match weight.shape().as_matrix() {
            Some((out, _)) if bias.shape().dims() == [out] => Ok(Self { weight, bias }),
            _ => Err(Error::shape_mismatch(
                "Linear::from_params",
                weight.shape(),
                bias.shape(),
            )),
        }
    }

    pub fn inp(&self) -> usize {
        self.weight.shape().dim(1).unwrap_or(0)
    }

    pub fn out(&self) -> usize {
        self.weight.shape().dim(0).unwrap_or(0)
    }
}

impl<E: Dtype> ResetParams<E> for Linear<E> {
    /// Samples both parameters from `U(-1/sqrt(inp), 1/sqrt(inp))`.
    fn try_reset_params(&mut self) -> Result<(), Error> {
        let inp = self.inp().max(1);
        let scale = E::from_f64_lossy(1.0 / (inp as f64).sqrt());
        let dev = self.weight.device().clone();
        self.weight = dev.sample_uniform(self.weight.shape(), -scale, scale);
        self.bias = dev.sample_uniform(self.bias.shape(), -scale, scale);
        Ok(())
    }
}

impl<E: Dtype, T: Tape<E>> Module<Tensor<E, T>> for Linear<E> {
    type Output = Tensor<E, T>;
    fn try_forward(&self, x: Tensor<E, T>) -> Result<Self::Output, Error> {
        let batch = x.num_rows();
        let bias = self.bias.clone().try_broadcast_rows(batch)?;
        x.try_matmul(self.weight.clone().try_permute()?)?.try_add(bias)
    }
}

impl<E: Dtype> SaveSafeTensors for Linear<E> {
    fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>) {
        self.weight
            .write_safetensors(&join_key(location, "weight"), tensors);
        self.bias.write_safetensors(&join_key(location, "bias"), tensors);
    }
}

impl<E: Dtype> LoadSafeTensors for Linear<E> {
    fn read_safetensors(
        &mut self,
        location: &str,
        tensors: &safetensors::SafeTensors<'_>,
    ) -> Result<(), Error> {
        self.weight
            .read_safetensors(&join_key(location, "weight"), tensors)?;
        self.bias.read_safetensors(&join_key(location, "bias"), tensors)
    }
}
