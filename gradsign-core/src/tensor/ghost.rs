use crate::{dtypes::Dtype, shapes::Shape};

use super::{Tensor, Tensorlike, UniqueId};

/// Holds all the information a [Tensor] does, except without
/// holding a reference to the data storage.
///
/// Backward closures that only need to know *where* a gradient lives capture
/// a ghost instead of the tensor, so the forward buffers can be freed early.
#[derive(Debug, Clone)]
pub struct GhostTensor {
    pub(crate) id: UniqueId,
    pub(crate) len: usize,
    pub(crate) shape: Shape,
}

impl<E: Dtype, T> Tensor<E, T> {
    /// Creates a ghost tensor that doesn't hold a reference
    /// to the tensor's data.
    pub fn ghost(&self) -> GhostTensor {
        GhostTensor {
            id: self.id,
            len: self.data.len(),
            shape: self.shape.clone(),
        }
    }
}

impl GhostTensor {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

impl Tensorlike for GhostTensor {
    fn id(&self) -> UniqueId {
        self.id
    }
    fn len(&self) -> usize {
        self.len
    }
}
