use gradsign_core::{dtypes::Dtype, tensor::Tensor};
use tracing::debug;

use super::{
    classifier::{Classifier, Labels},
    error::check_epsilon,
    perturb::{perturb, AdversarialBatch},
    AttackError,
};

/// What [AdversarialBatch::perturbation()] holds after an attack.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PerturbationReport {
    /// `sign(gradient) * epsilon`, before clipping the adversarial images.
    #[default]
    Nominal,
    /// `adversarial - images`, the change that survived clipping.
    Effective,
}

/// Configuration of [Fgsm].
///
/// Reporting the clipped change instead of the nominal step:
/// ```rust
/// # use gradsign::prelude::*;
/// let cfg = FgsmConfig {
///     perturbation: PerturbationReport::Effective,
/// };
/// assert_eq!(cfg, FgsmConfig::effective());
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FgsmConfig {
    /// Defaults to [PerturbationReport::Nominal].
    pub perturbation: PerturbationReport,
}

impl FgsmConfig {
    pub fn nominal() -> Self {
        Self {
            perturbation: PerturbationReport::Nominal,
        }
    }

    pub fn effective() -> Self {
        Self {
            perturbation: PerturbationReport::Effective,
        }
    }
}

/// The Fast Gradient Sign Method.
///
/// Takes a single step of size `epsilon` in the direction of the sign of the
/// loss gradient with respect to the input:
///
/// ```text
/// adversarial = clamp(images + epsilon * sign(d loss / d images), 0, 1)
/// ```
///
/// The classifier is only borrowed; its parameters are never touched.
///
/// ```rust
/// # use gradsign::prelude::*;
/// # let dev: Cpu = Default::default();
/// let mlp: Mlp<f32> = dev.build_module(MlpConfig::new(6, vec![5], 4)).unwrap();
/// let images: Tensor<f32> = dev.sample_uniform([3, 6], 0.0, 1.0);
/// let labels = Labels::Classes(vec![0, 3, 1]);
/// let fgsm = Fgsm::new(FgsmConfig::effective());
/// let batch = fgsm.build(&mlp, &images, &labels, 0.05).unwrap();
/// assert_eq!(batch.adversarial().shape(), images.shape());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Fgsm {
    cfg: FgsmConfig,
}

impl Fgsm {
    pub fn new(cfg: FgsmConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &FgsmConfig {
        &self.cfg
    }

    /// Gradient of `classifier`'s loss on `(images, labels)` with respect to
    /// `images`, with the same shape as `images`.
    ///
    /// A fresh tape is started on `images` for this call only and is consumed
    /// by the backward pass before returning.
    pub fn input_gradient<E: Dtype, C: Classifier<E> + ?Sized>(
        &self,
        classifier: &C,
        images: &Tensor<E>,
        labels: &Labels<E>,
    ) -> Result<Tensor<E>, AttackError> {
        let batch = images.num_rows();
        if labels.len() != batch {
            return Err(AttackError::BatchMismatch {
                images: batch,
                labels: labels.len(),
            });
        }
        let targets = labels.try_one_hot(images.device(), classifier.num_classes())?;

        let loss = classifier.try_traced_loss(images.leaky_trace(), targets)?;
        debug!(
            batch,
            loss = ?loss.scalar(),
            "computed attack loss"
        );
        let grads = loss.try_backward()?;
        grads.get(images).ok_or(AttackError::NonDifferentiable(
            "loss does not depend on the input images",
        ))
    }

    /// Applies an already computed `gradient`. See [perturb()] for the
    /// validation performed.
    pub fn perturb_with_gradient<E: Dtype>(
        &self,
        images: &Tensor<E>,
        epsilon: f64,
        gradient: &Tensor<E>,
    ) -> Result<AdversarialBatch<E>, AttackError> {
        let mut batch = perturb(images, epsilon, gradient)?;
        if self.cfg.perturbation == PerturbationReport::Effective {
            batch.perturbation = batch.effective_perturbation(images)?;
        }
        Ok(batch)
    }

    /// Crafts adversarial examples for `images` against `classifier`.
    ///
    /// Errors:
    /// - [AttackError::InvalidEpsilon] before any forward pass is run
    /// - [AttackError::BatchMismatch] if `labels` and `images` disagree on the
    ///   batch size
    /// - [AttackError::NonDifferentiable] if the classifier has no traced
    ///   forward pass, or its loss did not reach `images`
    /// - anything [perturb()] rejects
    pub fn build<E: Dtype, C: Classifier<E> + ?Sized>(
        &self,
        classifier: &C,
        images: &Tensor<E>,
        labels: &Labels<E>,
        epsilon: f64,
    ) -> Result<AdversarialBatch<E>, AttackError> {
        check_epsilon(epsilon)?;
        let gradient = self.input_gradient(classifier, images, labels)?;
        self.perturb_with_gradient(images, epsilon, &gradient)
    }
}

/// [Fgsm::build] with the default [FgsmConfig].
pub fn build<E: Dtype, C: Classifier<E> + ?Sized>(
    classifier: &C,
    images: &Tensor<E>,
    labels: &Labels<E>,
    epsilon: f64,
) -> Result<AdversarialBatch<E>, AttackError> {
    Fgsm::default().build(classifier, images, labels, epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attack::ModuleClassifier,
        nn::{BuildModuleExt, Linear, Mlp, MlpConfig, Softmax},
        tensor::*,
        tests::*,
    };

    fn two_class() -> ModuleClassifier<(Linear<TestDtype>, Softmax)> {
        let dev: TestDevice = Default::default();
        let weight = dev.tensor([[1.0, -1.0, 0.0], [-1.0, 1.0, 0.0]]);
        let bias = dev.zeros([2]);
        let linear = Linear::from_params(weight, bias).unwrap();
        ModuleClassifier::new((linear, Softmax), 2)
    }

    #[test]
    fn test_gradient_direction() {
        let dev: TestDevice = Default::default();
        let classifier = two_class();
        let images: Tensor<TestDtype> = dev.tensor([[0.5, 0.5, 0.5]]);
        let labels = Labels::Classes(vec![0]);
        let gradient = Fgsm::default()
            .input_gradient(&classifier, &images, &labels)
            .unwrap();
        // p = [0.5, 0.5], so d loss / d x = (p - y) * W = [-1, 1, 0]
        let g = gradient.as_vec();
        assert!(g[0] < 0.0 && g[1] > 0.0 && g[2] == 0.0, "{g:?}");
        assert!((g[0] + 1.0).abs() < 1e-5);
        assert!((g[1] - 1.0).abs() < 1e-5);

        let batch = Fgsm::default()
            .build(&classifier, &images, &labels, 0.1)
            .unwrap();
        assert_eq!(batch.perturbation().as_vec(), [-0.1, 0.1, 0.0]);
    }

    #[test]
    fn test_saturated_classifier_still_has_gradient() {
        let dev: TestDevice = Default::default();
        let weight = dev.tensor([[10.0, -10.0, 0.0], [-10.0, 10.0, 0.0]]);
        let linear = Linear::from_params(weight, dev.zeros([2])).unwrap();
        let classifier = ModuleClassifier::new((linear, Softmax), 2);
        let images: Tensor<TestDtype> = dev.tensor([[1.0, 0.0, 0.5]]);
        let labels = Labels::Classes(vec![0]);
        assert_eq!(classifier.predict(images.clone()).argmax_last_axis(), vec![0]);

        let batch = build(&classifier, &images, &labels, 1.0).unwrap();
        assert_eq!(batch.perturbation().as_vec(), [-1.0, 1.0, 0.0]);
        assert_eq!(batch.adversarial().as_vec(), [0.0, 1.0, 0.5]);
        let attacked = classifier.predict(batch.adversarial().clone());
        assert_eq!(attacked.argmax_last_axis(), vec![1]);
    }

    #[test]
    fn test_default_loss_goes_through_predictions() {
        struct Probabilities(ModuleClassifier<(Linear<TestDtype>, Softmax)>);
        impl Classifier<TestDtype> for Probabilities {
            fn num_classes(&self) -> usize {
                2
            }
            fn try_predict(&self, images: Tensor<TestDtype>) -> Result<Tensor<TestDtype>, AttackError> {
                self.0.try_predict(images)
            }
            fn try_predict_traced(
                &self,
                images: Tensor<TestDtype, OwnedTape<TestDtype>>,
            ) -> Result<Tensor<TestDtype, OwnedTape<TestDtype>>, AttackError> {
                self.0.try_predict_traced(images)
            }
        }

        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.tensor([[0.7, 0.4, 0.1], [0.2, 0.6, 0.9]]);
        let labels = Labels::Classes(vec![0, 1]);
        let fgsm = Fgsm::default();
        let from_logits = fgsm.input_gradient(&two_class(), &images, &labels).unwrap();
        let from_probs = fgsm
            .input_gradient(&Probabilities(two_class()), &images, &labels)
            .unwrap();
        for (a, b) in from_probs.as_vec().iter().zip(from_logits.as_vec()) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn test_attack_lowers_true_class_probability() {
        let dev: TestDevice = Default::default();
        let classifier = two_class();
        let images: Tensor<TestDtype> = dev.tensor([[0.7, 0.4, 0.1], [0.2, 0.6, 0.9]]);
        let labels = Labels::Classes(vec![0, 1]);
        let clean = classifier.predict(images.clone());
        let batch = build(&classifier, &images, &labels, 0.1).unwrap();
        let attacked = classifier.predict(batch.adversarial().clone());
        assert!(attacked.as_vec()[0] < clean.as_vec()[0]);
        assert!(attacked.as_vec()[3] < clean.as_vec()[3]);
    }

    #[test]
    fn test_effective_report() {
        let dev: TestDevice = Default::default();
        let classifier = two_class();
        let images: Tensor<TestDtype> = dev.tensor([[0.05, 0.5, 0.5]]);
        let labels = Labels::Classes(vec![0]);
        let nominal = Fgsm::new(FgsmConfig::nominal())
            .build(&classifier, &images, &labels, 0.1)
            .unwrap();
        let effective = Fgsm::new(FgsmConfig::effective())
            .build(&classifier, &images, &labels, 0.1)
            .unwrap();
        assert_eq!(nominal.adversarial().as_vec(), effective.adversarial().as_vec());
        assert_eq!(nominal.perturbation().as_vec()[0], -0.1);
        assert!((effective.perturbation().as_vec()[0] + 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_errors_before_forward_pass() {
        let dev: TestDevice = Default::default();
        let classifier = two_class();
        let images: Tensor<TestDtype> = dev.zeros([2, 3]);
        assert!(matches!(
            build(&classifier, &images, &Labels::Classes(vec![0, 1]), f64::NAN),
            Err(AttackError::InvalidEpsilon(_))
        ));
        assert!(matches!(
            build(&classifier, &images, &Labels::Classes(vec![0]), 0.1),
            Err(AttackError::BatchMismatch {
                images: 2,
                labels: 1
            })
        ));
    }

    #[test]
    fn test_built_mlp_attack_is_bounded() {
        let dev: TestDevice = Cpu::seed_from_u64(3);
        let mlp: Mlp<TestDtype> = dev.build_module(MlpConfig::new(5, vec![4], 3)).unwrap();
        let images: Tensor<TestDtype> = dev.sample_uniform([4, 5], 0.0, 1.0);
        let labels = Labels::Classes(vec![0, 1, 2, 0]);
        let batch = build(&mlp, &images, &labels, 0.3).unwrap();
        for (p, (a, x)) in batch.perturbation().as_slice().iter().zip(
            batch
                .adversarial()
                .as_slice()
                .iter()
                .zip(images.as_slice()),
        ) {
            assert!(p.abs() <= 0.3);
            assert!((0.0..=1.0).contains(a));
            assert!((a - x).abs() <= 0.3 + 1e-6);
        }
    }
}
