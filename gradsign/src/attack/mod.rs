//! Gradient sign attacks and robustness evaluation.
//!
//! The pieces, from lowest to highest level:
//!
//! 1. [perturb()] takes images and a precomputed gradient and produces an
//!    [AdversarialBatch]. It knows nothing about models.
//! 2. [Fgsm] computes the gradient of a [Classifier]'s loss with respect to its
//!    input on a fresh tape, then calls [perturb()]. [build()] is the same with
//!    the default [FgsmConfig].
//! 3. [evaluate()] sweeps a list of epsilons over a dataset and summarizes the
//!    accuracy drop in a [RobustnessReport].
//!
//! Every input is borrowed and never modified. Gradients and tapes only live
//! for the duration of one call.
//!
//! # Classifiers without gradients
//!
//! A [Classifier] that only implements [Classifier::try_predict] can still be
//! evaluated on clean data, but any attack on it fails with
//! [AttackError::NonDifferentiable]. The same error is returned when a traced
//! forward pass does not actually depend on its input, instead of silently
//! attacking with a zero gradient.

mod classifier;
mod error;
mod evaluate;
mod fgsm;
mod perturb;

pub use classifier::{Classifier, Labels, ModuleClassifier};
pub use error::AttackError;
pub use evaluate::{build_in_batches, evaluate, EpsilonAccuracy, EvalConfig, RobustnessReport};
pub use fgsm::{build, Fgsm, FgsmConfig, PerturbationReport};
pub use perturb::{perturb, AdversarialBatch};
