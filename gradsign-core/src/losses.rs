//! Standard loss functions [cross_entropy_with_logits_loss()] and
//! [categorical_cross_entropy()].
//!
//! Every loss reduces to a scalar tensor averaged over the batch, so the
//! result can be passed straight to `backward()`.

use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

/// Probabilities below this are raised to it before taking their logarithm in
/// [categorical_cross_entropy()].
pub const PROB_EPSILON: f64 = 1e-7;

/// [Cross entropy loss](https://en.wikipedia.org/wiki/Cross_entropy#Cross-entropy_loss_function_and_logistic_regression).
/// This computes: `-(logits.log_softmax() * target_probs).sum(-1).mean()`
///
/// **Pytorch equivalent**: `F.cross_entropy(logits, target_probs.argmax(-1))`
///
/// Arguments:
///
/// - `logits`: The un-normalized output from a model. [log_softmax()] is called **in** this function
/// - `target_probs`: Target containing probability vectors **NOT** class indices.
///
/// [log_softmax()]: crate::tensor_ops::log_softmax
pub fn cross_entropy_with_logits_loss<E: Dtype, T: Tape<E>>(
    logits: Tensor<E, T>,
    target_probs: Tensor<E>,
) -> Tensor<E, T> {
    try_cross_entropy_with_logits_loss(logits, target_probs).unwrap()
}

/// See [cross_entropy_with_logits_loss]
pub fn try_cross_entropy_with_logits_loss<E: Dtype, T: Tape<E>>(
    logits: Tensor<E, T>,
    target_probs: Tensor<E>,
) -> Result<Tensor<E, T>, Error> {
    negated_mean_row_dot(logits.try_log_softmax()?, target_probs)
}

/// Cross entropy of probability vectors, as computed by frameworks whose
/// classifiers end in a softmax layer:
/// `-(probs.max(eps).ln() * target_probs).sum(-1).mean()`
/// with `eps` = [PROB_EPSILON].
///
/// The lower bound keeps the loss finite when a probability underflows to
/// zero, and the gradient of such an entry is zero. There is no upper bound,
/// so a true class probability of exactly `1` still has gradient `-1`.
///
/// Gradients flowing back through a softmax from here lose precision once the
/// true class saturates. Prefer [cross_entropy_with_logits_loss()] when the
/// logits are available.
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let probs: Tensor<f64> = dev.tensor([[0.25, 0.75]]);
/// let target: Tensor<f64> = dev.tensor([[0.0, 1.0]]);
/// let loss = categorical_cross_entropy(probs, target);
/// assert!((loss.scalar().unwrap() - 0.75f64.ln().abs()).abs() < 1e-12);
/// ```
pub fn categorical_cross_entropy<E: Dtype, T: Tape<E>>(
    probs: Tensor<E, T>,
    target_probs: Tensor<E>,
) -> Tensor<E, T> {
    try_categorical_cross_entropy(probs, target_probs).unwrap()
}

/// See [categorical_cross_entropy]
pub fn try_categorical_cross_entropy<E: Dtype, T: Tape<E>>(
    probs: Tensor<E, T>,
    target_probs: Tensor<E>,
) -> Result<Tensor<E, T>, Error> {
    let eps = E::from_f64_lossy(PROB_EPSILON);
    let log_probs = probs.try_clamp(eps, E::infinity())?.try_ln()?;
    negated_mean_row_dot(log_probs, target_probs)
}

/// `-(lhs * rhs).sum(-1).mean()`
fn negated_mean_row_dot<E: Dtype, T: Tape<E>>(
    lhs: Tensor<E, T>,
    rhs: Tensor<E>,
) -> Result<Tensor<E, T>, Error> {
    lhs.try_mul(rhs)?
        .try_sum_last_axis()?
        .try_mean()?
        .try_negate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tensor::*, tests::*};

    #[test]
    fn test_cross_entropy_with_logits() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([[0.01, -0.01, 0.02], [1.0, 2.0, 3.0]]);
        let y: Tensor<TestDtype> = dev.tensor([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let loss = cross_entropy_with_logits_loss(x.leaky_trace(), y);
        assert_close_to_literal!(loss, [0.7514813]);
        let g = loss.backward();
        assert_close_to_literal!(
            g.get(&x).unwrap(),
            [-0.33278984, 0.16389918, 0.16889065, 0.04501529, 0.12236424, -0.16737952]
        );
    }

    #[test]
    fn test_categorical_cross_entropy_matches_logits_form() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([[0.01, -0.01, 0.02], [1.0, 2.0, 3.0]]);
        let y: Tensor<TestDtype> = dev.tensor([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let g1 = cross_entropy_with_logits_loss(x.leaky_trace(), y.clone()).backward();
        let g2 = categorical_cross_entropy(x.leaky_trace().softmax(), y).backward();
        assert_close_to_literal!(g2.get(&x).unwrap(), g1.get(&x).unwrap().as_vec(), 1e-5);
    }

    #[test]
    fn test_categorical_cross_entropy_clips_zero_probability() {
        let dev: TestDevice = Default::default();
        let p: Tensor<TestDtype> = dev.tensor([[1.0, 0.0]]);
        let y: Tensor<TestDtype> = dev.tensor([[0.0, 1.0]]);
        let loss = categorical_cross_entropy(p.leaky_trace(), y);
        let value = loss.scalar().unwrap();
        assert!(value.is_finite());
        assert_close_to_literal!(loss, [16.118095], 1e-3);
        let g = loss.backward();
        // the zero is raised to the bound, and the other entry has no target
        assert_eq!(g.get(&p).unwrap().as_vec(), [0.0, 0.0]);
    }

    #[test]
    fn test_categorical_cross_entropy_saturated_true_class() {
        let dev: TestDevice = Default::default();
        let p: Tensor<TestDtype> = dev.tensor([[1.0, 0.0]]);
        let y: Tensor<TestDtype> = dev.tensor([[1.0, 0.0]]);
        let loss = categorical_cross_entropy(p.leaky_trace(), y);
        assert_eq!(loss.scalar(), Some(0.0));
        let g = loss.backward();
        assert_eq!(g.get(&p).unwrap().as_vec(), [-1.0, 0.0]);
    }

    #[test]
    fn test_cross_entropy_with_logits_large_margin() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([[40.0, -40.0]]);
        let y: Tensor<TestDtype> = dev.tensor([[1.0, 0.0]]);
        let g = cross_entropy_with_logits_loss(x.leaky_trace(), y).backward();
        let g = g.get(&x).unwrap().as_vec();
        // softmax(x) - y, with the wrong class still visible after underflow of 1 - p
        assert!(g[0] <= 0.0, "{g:?}");
        assert!(g[1] > 0.0, "{g:?}");
    }
}
