use gradsign_core::{
    dtypes::Dtype,
    nn_traits::{join_key, LoadSafeTensors, Module, SafeTensorEntry, SaveSafeTensors},
    tensor::{Cpu, Error, Tape, Tensor},
};

use super::{BuildOnDevice, Linear, LinearConfig, ReLU, ResetParams, Softmax};

/// A multilayer perceptron classifier: `hidden.len()` blocks of
/// [Linear] + [ReLU], then a [Linear] + [Softmax] output block producing
/// class probabilities.
///
/// ```rust
/// # use gradsign::prelude::*;
/// # let dev: Cpu = Default::default();
/// let cfg = MlpConfig::new(784, vec![128, 64], 10);
/// let mlp: Mlp<f32> = dev.build_module(cfg).unwrap();
/// assert_eq!(mlp.hidden.len(), 2);
/// let probs = mlp.forward(dev.zeros([3, 784]));
/// assert_eq!(probs.shape().dims(), &[3, 10]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlpConfig {
    /// Features per input row, e.g. `784` for flattened 28x28 images.
    pub input: usize,
    /// Width of each hidden layer, outermost first.
    pub hidden: Vec<usize>,
    /// Number of output classes.
    pub classes: usize,
}

impl MlpConfig {
    pub fn new(input: usize, hidden: Vec<usize>, classes: usize) -> Self {
        Self {
            input,
            hidden,
            classes,
        }
    }

    /// Flattened 28x28 digits with two hidden layers.
    pub fn mnist() -> Self {
        Self::new(784, vec![128, 64], 10)
    }

    fn linear_configs(&self) -> Vec<LinearConfig> {
        let mut sizes = Vec::with_capacity(self.hidden.len() + 2);
        sizes.push(self.input);
        sizes.extend(&self.hidden);
        sizes.push(self.classes);
        sizes.windows(2).map(|w| LinearConfig::new(w[0], w[1])).collect()
    }
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self::mnist()
    }
}

impl<E: Dtype> BuildOnDevice<E> for MlpConfig {
    type Built = Mlp<E>;
    fn try_build_on_device(&self, device: &Cpu) -> Result<Self::Built, Error> {
        let mut layers = self.linear_configs();
        // `linear_configs` always yields at least the output layer
        let output = layers.pop().unwrap_or(LinearConfig::new(self.input, self.classes));
        let hidden = layers
            .iter()
            .map(|cfg| Ok((BuildOnDevice::<E>::try_build_on_device(cfg, device)?, ReLU)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(Mlp {
            hidden,
            output: (BuildOnDevice::<E>::try_build_on_device(&output, device)?, Softmax),
        })
    }
}

/// See [MlpConfig]
#[derive(Debug, Clone)]
pub struct Mlp<E: Dtype> {
    pub hidden: Vec<(Linear<E>, ReLU)>,
    pub output: (Linear<E>, Softmax),
}

impl<E: Dtype> Mlp<E> {
    /// Number of input features.
    pub fn input_features(&self) -> usize {
        self.hidden
            .first()
            .map_or(self.output.0.inp(), |(linear, _)| linear.inp())
    }

    /// Number of output classes.
    pub fn num_classes(&self) -> usize {
        self.output.0.out()
    }

    /// The forward pass without the final [Softmax].
    pub fn try_logits<T: Tape<E>>(&self, x: Tensor<E, T>) -> Result<Tensor<E, T>, Error> {
        let x = self.hidden.try_forward(x)?;
        self.output.0.try_forward(x)
    }
}

impl<E: Dtype> ResetParams<E> for Mlp<E> {
    fn try_reset_params(&mut self) -> Result<(), Error> {
        for (linear, _) in self.hidden.iter_mut() {
            linear.try_reset_params()?;
        }
        self.output.0.try_reset_params()
    }
}

impl<E: Dtype, T: Tape<E>> Module<Tensor<E, T>> for Mlp<E> {
    type Output = Tensor<E, T>;
    fn try_forward(&self, x: Tensor<E, T>) -> Result<Self::Output, Error> {
        let logits = self.try_logits(x)?;
        self.output.1.try_forward(logits)
    }
}

impl<E: Dtype> SaveSafeTensors for Mlp<E> {
    fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>) {
        self.hidden
            .write_safetensors(&join_key(location, "hidden"), tensors);
        self.output
            .write_safetensors(&join_key(location, "output"), tensors);
    }
}

impl<E: Dtype> LoadSafeTensors for Mlp<E> {
    fn read_safetensors(
        &mut self,
        location: &str,
        tensors: &safetensors::SafeTensors<'_>,
    ) -> Result<(), Error> {
        self.hidden
            .read_safetensors(&join_key(location, "hidden"), tensors)?;
        self.output
            .read_safetensors(&join_key(location, "output"), tensors)
    }
}
