use crate::shapes::Shape;

use super::UniqueId;

/// Represents a number of different errors that can occur from creating tensors
/// or launching tensor operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not enough elements were provided when creating a tensor
    #[error("expected {expected} elements for shape {shape}, found {found}")]
    WrongNumElements {
        shape: Shape,
        expected: usize,
        found: usize,
    },

    /// Operands of an operation have incompatible shapes.
    #[error("shape mismatch in `{op}`: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// `backward()` was called on a tensor with more than one element.
    #[error("backward() requires a scalar, found shape {0}")]
    NonScalarBackward(Shape),

    /// A backward operation referenced a gradient that was never allocated.
    #[error("no gradient allocated for tensor {0:?}")]
    MissingGradient(UniqueId),

    /// A class label does not fit in the requested number of classes.
    #[error("class label {label} out of range for {num_classes} classes")]
    LabelOutOfRange { label: usize, num_classes: usize },

    /// A stored class id is negative.
    #[error("negative class label {0}")]
    NegativeLabel(i64),

    /// A safetensors entry has a dtype that cannot be converted.
    #[error("unsupported safetensors dtype {dtype:?} for `{key}`")]
    UnsupportedDtype {
        key: String,
        dtype: safetensors::Dtype,
    },

    #[error(transparent)]
    SafeTensors(#[from] safetensors::SafeTensorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn shape_mismatch(op: &'static str, lhs: &Shape, rhs: &Shape) -> Self {
        Self::ShapeMismatch {
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        }
    }
}
