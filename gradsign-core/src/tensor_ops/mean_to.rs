use crate::{
    dtypes::Dtype,
    tensor::{Error, Tape, Tensor},
};

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// Average of all values, as a scalar tensor. The mean of an empty
    /// tensor is NaN.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let t: Tensor<f32> = dev.tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    /// assert_eq!(t.mean().scalar(), Some(3.5));
    /// ```
    pub fn mean(self) -> Self {
        self.try_mean().unwrap()
    }

    /// See [Tensor::mean]
    pub fn try_mean(self) -> Result<Self, Error> {
        let num_elements = self.num_elements();
        let scale = E::from_usize(num_elements).map_or(E::nan(), E::recip);
        self.try_sum()?.try_mul_scalar(scale)
    }

    /// Averages along the last axis: `[.., n]` becomes `[..]`.
    pub fn mean_last_axis(self) -> Self {
        self.try_mean_last_axis().unwrap()
    }

    /// See [Tensor::mean_last_axis]
    pub fn try_mean_last_axis(self) -> Result<Self, Error> {
        let cols = self.shape.last_dim();
        let scale = E::from_usize(cols).map_or(E::nan(), E::recip);
        self.try_sum_last_axis()?.try_mul_scalar(scale)
    }
}
