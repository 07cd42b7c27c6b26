//! High level neural network building blocks such as [Linear], activations,
//! and the [Mlp] classifier.
//!
//! # Initializing
//!
//! Every layer has a config struct describing its sizes. A config is built
//! into the layer by [BuildOnDevice], which allocates the parameters, and
//! [ResetParams], which fills them with their initial values. The
//! [BuildModuleExt::build_module] helper on [Cpu] does both:
//!
//! ```rust
//! # use gradsign::prelude::*;
//! let dev: Cpu = Default::default();
//! let linear: Linear<f32> = dev.build_module(LinearConfig::new(5, 2)).unwrap();
//! assert_eq!(linear.weight.shape().dims(), &[2, 5]);
//! ```
//!
//! # Sequential models
//!
//! Tuples and `Vec`s of modules are modules themselves
//! ([gradsign_core::nn_traits]), so `(Linear<E>, ReLU)` is a hidden layer and
//! `Vec<(Linear<E>, ReLU)>` is a stack of them.
//!
//! # Saving and loading
//!
//! Layers implement [SaveSafeTensors] and [LoadSafeTensors]. Keys are the
//! field path joined with `.`, e.g. `hidden.0.0.weight` for the weight of the
//! first hidden [Linear] in an [Mlp].

mod linear;
mod mlp;
mod relu;
mod softmax;

pub use linear::{Linear, LinearConfig};
pub use mlp::{Mlp, MlpConfig};
pub use relu::ReLU;
pub use softmax::Softmax;

use gradsign_core::{
    dtypes::Dtype,
    nn_traits::{LoadSafeTensors, SaveSafeTensors},
    tensor::{Cpu, Error},
};

/// Something that can be built on a device. The config types of every layer
/// implement this.
pub trait BuildOnDevice<E: Dtype> {
    type Built;
    fn build_on_device(&self, device: &Cpu) -> Self::Built {
        self.try_build_on_device(device).unwrap()
    }
    fn try_build_on_device(&self, device: &Cpu) -> Result<Self::Built, Error>;
}

/// Something that can reset its parameters.
pub trait ResetParams<E: Dtype> {
    /// Mutates parameters. Each implementor of this trait decides on
    /// their own how to reset their parameters.
    fn reset_params(&mut self) {
        self.try_reset_params().unwrap();
    }
    fn try_reset_params(&mut self) -> Result<(), Error>;
}

/// Builds a module from its config and resets its parameters in one call.
pub trait BuildModuleExt {
    fn build_module<E: Dtype, M: BuildOnDevice<E>>(&self, m: M) -> Result<M::Built, Error>
    where
        M::Built: ResetParams<E>;
}

impl BuildModuleExt for Cpu {
    fn build_module<E: Dtype, M: BuildOnDevice<E>>(&self, m: M) -> Result<M::Built, Error>
    where
        M::Built: ResetParams<E>,
    {
        let mut module = m.try_build_on_device(self)?;
        module.try_reset_params()?;
        Ok(module)
    }
}

/// Layers without parameters write and read nothing.
macro_rules! stateless_safetensors {
    ($Ty:ty) => {
        impl SaveSafeTensors for $Ty {
            fn write_safetensors(
                &self,
                _location: &str,
                _tensors: &mut Vec<gradsign_core::nn_traits::SafeTensorEntry>,
            ) {
            }
        }

        impl LoadSafeTensors for $Ty {
            fn read_safetensors(
                &mut self,
                _location: &str,
                _tensors: &safetensors::SafeTensors<'_>,
            ) -> Result<(), Error> {
                Ok(())
            }
        }

        impl<E: Dtype> ResetParams<E> for $Ty {
            fn try_reset_params(&mut self) -> Result<(), Error> {
                Ok(())
            }
        }
    };
}

stateless_safetensors!(ReLU);
stateless_safetensors!(Softmax);
