//! # gradsign
//!
//! gradsign crafts [Fast Gradient Sign Method](https://arxiv.org/abs/1412.6572)
//! adversarial examples against small differentiable classifiers and measures
//! how quickly their accuracy falls as the attack budget grows.
//!
//! It is built on [gradsign_core], which provides the tensors, gradient tape,
//! and losses; everything from that crate is re-exported here.
//!
//! # Classifiers
//!
//! *See [nn] and [attack::Classifier] for more information.*
//!
//! An attack only needs two capabilities from a model: a forward pass from an
//! image batch `[batch, features]` to a probability batch `[batch, classes]`,
//! and a forward pass that keeps recording on a gradient tape. [nn::Mlp]
//! provides both:
//!
//! ```rust
//! # use gradsign::prelude::*;
//! let dev: Cpu = Default::default();
//! let mlp: Mlp<f32> = dev.build_module(MlpConfig::new(4, vec![8], 3)).unwrap();
//! let images: Tensor<f32> = dev.sample_uniform([2, 4], 0.0, 1.0);
//! let probs = mlp.forward(images);
//! assert_eq!(probs.shape().dims(), &[2, 3]);
//! ```
//!
//! # Perturbations
//!
//! *See [attack] for more information.*
//!
//! [attack::perturb()] turns a gradient into the bounded perturbation
//! `sign(gradient) * epsilon` and the adversarial batch
//! `clamp(images + perturbation, 0, 1)`. [attack::build()] computes that
//! gradient for you, as the gradient of the classifier's loss with respect to
//! its input:
//!
//! ```rust
//! # use gradsign::prelude::*;
//! # let dev: Cpu = Default::default();
//! # let mlp: Mlp<f32> = dev.build_module(MlpConfig::new(4, vec![8], 3)).unwrap();
//! let images: Tensor<f32> = dev.sample_uniform([2, 4], 0.0, 1.0);
//! let labels = Labels::Classes(vec![0, 2]);
//! let batch = build(&mlp, &images, &labels, 0.1).unwrap();
//! assert!(batch.adversarial().as_slice().iter().all(|x| (0.0..=1.0).contains(x)));
//! assert!(batch.perturbation().as_slice().iter().all(|x| x.abs() <= 0.1));
//! ```
//!
//! # Robustness
//!
//! [attack::evaluate()] sweeps a list of epsilons over a dataset and reports
//! the clean and adversarial accuracy for each one. The `gradsign` binary
//! wraps it for `.safetensors` inputs.

pub mod attack;
pub mod nn;

pub use gradsign_core::*;

pub use safetensors;

pub mod prelude {
    pub use crate::attack::*;
    pub use crate::nn::*;
    pub use gradsign_core::prelude::*;
}
