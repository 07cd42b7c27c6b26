use std::ops::Range;

use gradsign_core::{
    data::OneHotEncode,
    dtypes::Dtype,
    losses::{try_categorical_cross_entropy, try_cross_entropy_with_logits_loss},
    nn_traits::Module,
    shapes::Shape,
    tensor::{Cpu, Error, OwnedTape, Tensor},
};

use super::AttackError;
use crate::nn::{Mlp, Softmax};

/// A model that maps an image batch `[batch, features]` to class
/// probabilities `[batch, classes]`.
///
/// Only [Classifier::num_classes] and [Classifier::try_predict] are required.
/// A classifier that can also run its forward pass on a traced input
/// overrides [Classifier::try_predict_traced]; without it every gradient based
/// attack fails with [AttackError::NonDifferentiable].
pub trait Classifier<E: Dtype> {
    /// Width of the probability rows this classifier produces.
    fn num_classes(&self) -> usize;

    /// Forward pass without gradient tracking.
    fn try_predict(&self, images: Tensor<E>) -> Result<Tensor<E>, AttackError>;

    /// Forward pass that keeps recording on the tape carried by `images`.
    fn try_predict_traced(
        &self,
        images: Tensor<E, OwnedTape<E>>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        let _ = images;
        Err(AttackError::NonDifferentiable(
            "classifier has no traced forward pass",
        ))
    }

    /// Scalar loss between `predictions` and one-hot `targets`. Defaults to
    /// [gradsign_core::losses::categorical_cross_entropy()] averaged over the
    /// batch.
    fn try_loss(
        &self,
        predictions: Tensor<E, OwnedTape<E>>,
        targets: Tensor<E>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        Ok(try_categorical_cross_entropy(predictions, targets)?)
    }

    /// Runs a traced forward pass on `images` and reduces it to the scalar
    /// loss against `targets`. This is the quantity attacks differentiate.
    ///
    /// Defaults to [Classifier::try_loss] of [Classifier::try_predict_traced].
    /// Classifiers ending in a softmax override it to compute the loss from
    /// their logits, so a saturated true class probability still yields a
    /// nonzero gradient.
    fn try_traced_loss(
        &self,
        images: Tensor<E, OwnedTape<E>>,
        targets: Tensor<E>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        let predictions = self.try_predict_traced(images)?;
        self.try_loss(predictions, targets)
    }

    fn predict(&self, images: Tensor<E>) -> Tensor<E> {
        self.try_predict(images).unwrap()
    }
}

impl<E: Dtype> Classifier<E> for Mlp<E> {
    fn num_classes(&self) -> usize {
        Mlp::num_classes(self)
    }

    fn try_predict(&self, images: Tensor<E>) -> Result<Tensor<E>, AttackError> {
        Ok(self.try_forward(images)?)
    }

    fn try_predict_traced(
        &self,
        images: Tensor<E, OwnedTape<E>>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        Ok(self.try_forward(images)?)
    }

    fn try_traced_loss(
        &self,
        images: Tensor<E, OwnedTape<E>>,
        targets: Tensor<E>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        let logits = self.try_logits(images)?;
        Ok(try_cross_entropy_with_logits_loss(logits, targets)?)
    }
}

/// Adapts a `(logits, Softmax)` [Module] into a [Classifier].
///
/// Predictions are the softmax output. Attack losses are computed from the
/// logits of the first element.
///
/// ```rust
/// # use gradsign::prelude::*;
/// # let dev: Cpu = Default::default();
/// let linear: Linear<f32> = dev.build_module(LinearConfig::new(4, 3)).unwrap();
/// let classifier = ModuleClassifier::new((linear, Softmax), 3);
/// let images: Tensor<f32> = dev.zeros([2, 4]);
/// let probs = classifier.predict(images);
/// assert_eq!(probs.shape().dims(), &[2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct ModuleClassifier<M> {
    pub module: M,
    pub num_classes: usize,
}

impl<M> ModuleClassifier<M> {
    pub fn new(module: M, num_classes: usize) -> Self {
        Self {
            module,
            num_classes,
        }
    }
}

impl<E: Dtype, M> Classifier<E> for ModuleClassifier<(M, Softmax)>
where
    M: Module<Tensor<E>, Output = Tensor<E>>
        + Module<Tensor<E, OwnedTape<E>>, Output = Tensor<E, OwnedTape<E>>>,
{
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn try_predict(&self, images: Tensor<E>) -> Result<Tensor<E>, AttackError> {
        Ok(self.module.try_forward(images)?)
    }

    fn try_predict_traced(
        &self,
        images: Tensor<E, OwnedTape<E>>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        Ok(self.module.try_forward(images)?)
    }

    fn try_traced_loss(
        &self,
        images: Tensor<E, OwnedTape<E>>,
        targets: Tensor<E>,
    ) -> Result<Tensor<E, OwnedTape<E>>, AttackError> {
        let logits = self.module.0.try_forward(images)?;
        Ok(try_cross_entropy_with_logits_loss(logits, targets)?)
    }
}

/// Targets for a batch of images: one per image, either as class indices or
/// as one-hot probability rows.
#[derive(Debug, Clone)]
pub enum Labels<E: Dtype> {
    /// `[batch, classes]` probability rows.
    OneHot(Tensor<E>),
    /// One class index per image.
    Classes(Vec<usize>),
}

impl<E: Dtype> Labels<E> {
    /// Number of labelled samples.
    pub fn len(&self) -> usize {
        match self {
            Self::OneHot(t) => t.num_rows(),
            Self::Classes(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class index of every sample. One-hot rows resolve to their largest
    /// entry.
    pub fn class_indices(&self) -> Vec<usize> {
        match self {
            Self::OneHot(t) => t.argmax_last_axis(),
            Self::Classes(c) => c.clone(),
        }
    }

    /// The labels as `[batch, num_classes]` probability rows.
    pub fn try_one_hot(&self, dev: &Cpu, num_classes: usize) -> Result<Tensor<E>, AttackError> {
        match self {
            Self::OneHot(t) => {
                let expected = Shape::from([t.num_rows(), num_classes]);
                if t.shape() != &expected {
                    return Err(Error::shape_mismatch("Labels::try_one_hot", t.shape(), &expected).into());
                }
                Ok(t.clone())
            }
            Self::Classes(c) => Ok(dev.one_hot_encode(num_classes, c)?),
        }
    }

    /// The labels of samples `range`.
    pub fn try_slice(&self, range: Range<usize>) -> Result<Self, AttackError> {
        match self {
            Self::OneHot(t) => Ok(Self::OneHot(t.clone().try_slice_rows(range)?)),
            Self::Classes(c) => {
                let part = c.get(range.clone()).ok_or_else(|| AttackError::BatchMismatch {
                    images: range.end,
                    labels: c.len(),
                })?;
                Ok(Self::Classes(part.to_vec()))
            }
        }
    }
}

impl<E: Dtype> From<Vec<usize>> for Labels<E> {
    fn from(classes: Vec<usize>) -> Self {
        Self::Classes(classes)
    }
}

impl<E: Dtype> From<Tensor<E>> for Labels<E> {
    fn from(one_hot: Tensor<E>) -> Self {
        Self::OneHot(one_hot)
    }
}
