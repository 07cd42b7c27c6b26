use crate::{
    dtypes::Dtype,
    tensor::{Cpu, Error, Tensor, TensorFromVec},
};

/// One hot encodes an array of class labels into a 2d tensor of probability
/// vectors. This can be used in tandem with [crate::losses::cross_entropy_with_logits_loss()].
pub trait OneHotEncode<E: Dtype>: TensorFromVec<E> {
    /// One hot encodes a slice of class labels into a `[labels.len(), n]`
    /// tensor.
    ///
    /// Returns [Error::LabelOutOfRange] if any label is `>= n`.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let class_labels = [0, 1, 2, 1, 1];
    /// let probs: Tensor<f32> = dev.one_hot_encode(3, &class_labels).unwrap();
    /// assert_eq!(probs.shape().dims(), &[5, 3]);
    /// assert_eq!(&probs.as_vec(), &[
    ///     1.0, 0.0, 0.0,
    ///     0.0, 1.0, 0.0,
    ///     0.0, 0.0, 1.0,
    ///     0.0, 1.0, 0.0,
    ///     0.0, 1.0, 0.0,
    /// ]);
    /// ```
    fn one_hot_encode(&self, n: usize, labels: &[usize]) -> Result<Tensor<E>, Error> {
        let mut data = Vec::with_capacity(labels.len() * n);
        for &l in labels {
            if l >= n {
                return Err(Error::LabelOutOfRange {
                    label: l,
                    num_classes: n,
                });
            }
            data.extend((0..n).map(|i| if i == l { E::one() } else { E::zero() }));
        }
        self.tensor_from_vec(data, [labels.len(), n])
    }
}

impl<E: Dtype> OneHotEncode<E> for Cpu {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn test_one_hot_out_of_range() {
        let dev: TestDevice = Default::default();
        let r: Result<Tensor<TestDtype>, _> = dev.one_hot_encode(2, &[0, 2]);
        assert!(matches!(
            r,
            Err(Error::LabelOutOfRange {
                label: 2,
                num_classes: 2
            })
        ));
    }

    #[test]
    fn test_one_hot_empty() {
        let dev: TestDevice = Default::default();
        let t: Tensor<TestDtype> = dev.one_hot_encode(4, &[]).unwrap();
        assert_eq!(t.shape().dims(), &[0, 4]);
    }
}
