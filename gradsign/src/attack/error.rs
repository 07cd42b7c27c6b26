/// Everything that can go wrong while crafting adversarial examples or
/// evaluating robustness.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum AttackError {
    /// Epsilon was negative, NaN, or infinite.
    #[error("epsilon must be finite and non-negative, got {0}")]
    InvalidEpsilon(f64),

    /// The classifier cannot provide a gradient with respect to its input.
    #[error("classifier is not differentiable with respect to its input: {0}")]
    NonDifferentiable(&'static str),

    /// Images and labels disagree on the number of samples.
    #[error("{labels} labels for a batch of {images} images")]
    BatchMismatch { images: usize, labels: usize },

    /// An input pixel lies outside `[0, 1]` (or is NaN).
    #[error("pixel {index} has value {value}, outside [0, 1]")]
    PixelOutOfRange { index: usize, value: f64 },

    /// Evaluation was asked to process batches of zero samples.
    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    /// Evaluation was given no samples at all.
    #[error("cannot evaluate an empty dataset")]
    EmptyDataset,

    #[error(transparent)]
    Tensor(#[from] gradsign_core::tensor::Error),
}

/// Checks that `epsilon` is a usable attack strength.
pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), AttackError> {
    if epsilon.is_finite() && epsilon >= 0.0 {
        Ok(())
    } else {
        Err(AttackError::InvalidEpsilon(epsilon))
    }
}
