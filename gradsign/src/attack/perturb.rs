use gradsign_core::{
    dtypes::Dtype,
    nn_traits::{join_key, SafeTensorEntry, SaveSafeTensors},
    tensor::{Error, Tensor},
};

use super::{error::check_epsilon, AttackError};

/// The result of one FGSM step on a batch.
#[derive(Debug, Clone)]
pub struct AdversarialBatch<E: Dtype> {
    pub(crate) adversarial: Tensor<E>,
    pub(crate) perturbation: Tensor<E>,
    pub(crate) epsilon: f64,
}

impl<E: Dtype> AdversarialBatch<E> {
    /// The perturbed images, every element in `[0, 1]`.
    pub fn adversarial(&self) -> &Tensor<E> {
        &self.adversarial
    }

    /// The perturbation that was applied. Every element lies in
    /// `[-epsilon, epsilon]`.
    pub fn perturbation(&self) -> &Tensor<E> {
        &self.perturbation
    }

    /// The attack strength the batch was crafted with.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Splits into `(adversarial, perturbation)`.
    pub fn into_parts(self) -> (Tensor<E>, Tensor<E>) {
        (self.adversarial, self.perturbation)
    }

    /// The change actually made to `original` after clipping:
    /// `adversarial - original`.
    pub fn effective_perturbation(&self, original: &Tensor<E>) -> Result<Tensor<E>, AttackError> {
        Ok(self.adversarial.clone().try_sub(original.clone())?)
    }

    /// Mean of `|perturbation|` over every element, `0` for an empty batch.
    pub fn mean_abs_perturbation(&self) -> f64 {
        let p = self.perturbation.as_slice();
        if p.is_empty() {
            return 0.0;
        }
        p.iter().map(|x| x.to_f64_lossy().abs()).sum::<f64>() / p.len() as f64
    }
}

impl<E: Dtype> SaveSafeTensors for AdversarialBatch<E> {
    fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>) {
        self.adversarial
            .write_safetensors(&join_key(location, "adversarial"), tensors);
        self.perturbation
            .write_safetensors(&join_key(location, "perturbation"), tensors);
    }
}

/// Moves every pixel of `images` by `epsilon` in the direction of the sign
/// of `gradient`, then clips to the valid pixel range:
///
/// - `perturbation = sign(gradient) * epsilon`, with `sign(0) = 0` and
///   `sign(NaN) = 0`
/// - `adversarial = clamp(images + perturbation, 0, 1)`
///
/// Errors, checked before any output is produced:
/// - [AttackError::InvalidEpsilon] if `epsilon` is negative or not finite
/// - [AttackError::Tensor] with [Error::ShapeMismatch] if the shapes differ
/// - [AttackError::PixelOutOfRange] if an image element is outside `[0, 1]`
///
/// ```rust
/// # use gradsign::prelude::*;
/// # let dev: Cpu = Default::default();
/// let images: Tensor<f32> = dev.tensor([[0.5, 0.5, 0.95]]);
/// let gradient: Tensor<f32> = dev.tensor([[2.0, 0.0, -3.0]]);
/// let batch = perturb(&images, 0.25, &gradient).unwrap();
/// assert_eq!(batch.perturbation().as_vec(), [0.25, 0.0, -0.25]);
/// assert_eq!(batch.adversarial().as_vec(), [0.75, 0.5, 0.7]);
/// ```
pub fn perturb<E: Dtype>(
    images: &Tensor<E>,
    epsilon: f64,
    gradient: &Tensor<E>,
) -> Result<AdversarialBatch<E>, AttackError> {
    check_epsilon(epsilon)?;
    if images.shape() != gradient.shape() {
        return Err(Error::shape_mismatch("perturb", images.shape(), gradient.shape()).into());
    }
    check_pixels(images)?;

    let eps = E::from_f64_lossy(epsilon);
    let perturbation = gradient.clone().try_sign()?.try_mul_scalar(eps)?;
    let adversarial = images
        .clone()
        .try_add(perturbation.clone())?
        .try_clamp(E::zero(), E::one())?;
    Ok(AdversarialBatch {
        adversarial,
        perturbation,
        epsilon,
    })
}

pub(crate) fn check_pixels<E: Dtype>(images: &Tensor<E>) -> Result<(), AttackError> {
    let valid = E::zero()..=E::one();
    match images.as_slice().iter().position(|x| !valid.contains(x)) {
        Some(index) => Err(AttackError::PixelOutOfRange {
            index,
            value: images.as_slice()[index].to_f64_lossy(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tensor::*, tests::*};

    #[test]
    fn test_zero_images_positive_gradient() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.zeros([10, 784]);
        let gradient: Tensor<TestDtype> = dev.ones([10, 784]);
        for epsilon in [0.0, 0.1, 0.3, 1.0, 1.5] {
            let batch = perturb(&images, epsilon, &gradient).unwrap();
            let expected = (epsilon as TestDtype).min(1.0);
            assert!(batch.adversarial().as_slice().iter().all(|x| *x == expected));
            assert!(batch
                .perturbation()
                .as_slice()
                .iter()
                .all(|x| *x == epsilon as TestDtype));
            assert_eq!(batch.adversarial().shape(), images.shape());
        }
    }

    #[test]
    fn test_zero_epsilon_is_identity() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.sample_uniform([4, 6], 0.0, 1.0);
        let gradient: Tensor<TestDtype> = dev.sample_normal([4, 6]);
        let batch = perturb(&images, 0.0, &gradient).unwrap();
        assert_eq!(batch.adversarial().as_vec(), images.as_vec());
        assert!(batch.perturbation().as_slice().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_mixed_sign_positions() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.tensor([[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]]);
        let gradient: Tensor<TestDtype> = dev.tensor([[1e-8, -4.0, 0.0], [0.0, 2.5, -1e-8]]);
        let batch = perturb(&images, 0.2, &gradient).unwrap();
        assert_eq!(batch.perturbation().as_vec(), [0.2, -0.2, 0.0, 0.0, 0.2, -0.2]);
        let expected = [0.7, 0.3, 0.5, 0.5, 0.7, 0.3];
        for (a, b) in batch.adversarial().as_vec().iter().zip(expected) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn test_nominal_vs_effective() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.tensor([[0.95, 0.05]]);
        let gradient: Tensor<TestDtype> = dev.tensor([[1.0, -1.0]]);
        let batch = perturb(&images, 0.2, &gradient).unwrap();
        assert_eq!(batch.adversarial().as_vec(), [1.0, 0.0]);
        assert_eq!(batch.perturbation().as_vec(), [0.2, -0.2]);
        let effective = batch.effective_perturbation(&images).unwrap();
        for (a, b) in effective.as_vec().iter().zip([0.05, -0.05]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_errors() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.zeros([2, 3]);
        let gradient: Tensor<TestDtype> = dev.ones([2, 3]);
        assert!(matches!(
            perturb(&images, -0.1, &gradient),
            Err(AttackError::InvalidEpsilon(_))
        ));
        let wrong: Tensor<TestDtype> = dev.ones([3, 2]);
        assert!(matches!(
            perturb(&images, 0.1, &wrong),
            Err(AttackError::Tensor(Error::ShapeMismatch { op: "perturb", .. }))
        ));
        let bright: Tensor<TestDtype> = dev.tensor([[0.0, 1.5, 0.0]]);
        let g: Tensor<TestDtype> = dev.ones([1, 3]);
        assert!(matches!(
            perturb(&bright, 0.1, &g),
            Err(AttackError::PixelOutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn test_nan_gradient_leaves_pixel_unchanged() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.tensor([[0.2, 0.4, 0.6]]);
        let gradient: Tensor<TestDtype> = dev.tensor([[1.0, TestDtype::NAN, -1.0]]);
        let batch = perturb(&images, 0.1, &gradient).unwrap();
        assert_eq!(batch.perturbation().as_vec(), [0.1, 0.0, -0.1]);
        assert_eq!(batch.adversarial().as_slice()[1], 0.4);
        assert_eq!(batch.epsilon(), 0.1);
    }

    #[test]
    fn test_mean_abs_perturbation() {
        let dev: TestDevice = Default::default();
        let images: Tensor<TestDtype> = dev.zeros([1, 4]);
        let gradient: Tensor<TestDtype> = dev.tensor([[1.0, -1.0, 0.0, 0.0]]);
        let batch = perturb(&images, 0.5, &gradient).unwrap();
        assert!((batch.mean_abs_perturbation() - 0.25).abs() < 1e-9);
    }
}
