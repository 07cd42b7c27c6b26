use std::sync::{Arc, Mutex};

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal, Uniform};

use super::{unique_id, Error, NoneTape, Tensor};
use crate::{dtypes::Dtype, shapes::Shape};

/// A device that stores tensors on the heap and runs every operation on
/// the calling thread.
///
/// The device owns the random number generator used by [SampleTensor], so
/// two devices created with the same seed sample identical tensors.
#[derive(Clone, Debug)]
pub struct Cpu {
    pub(crate) rng: Arc<Mutex<StdRng>>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::seed_from_u64(0)
    }
}

impl Cpu {
    /// Constructs rng with the given seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    pub fn random_u64(&self) -> u64 {
        self.rng.lock().unwrap_or_else(|e| e.into_inner()).gen()
    }

    /// Wraps an already-validated buffer in a fresh tensor.
    pub(crate) fn upgrade<E: Dtype>(&self, data: Vec<E>, shape: Shape) -> Tensor<E> {
        debug_assert_eq!(data.len(), shape.num_elements());
        Tensor {
            id: unique_id(),
            data: Arc::new(data),
            shape,
            device: self.clone(),
            tape: NoneTape,
        }
    }
}

/// Construct tensors filled with zeros.
pub trait ZerosTensor<E: Dtype> {
    /// Creates a tensor filled with zeros.
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let a: Tensor<f32> = dev.zeros([2, 3]);
    /// ```
    fn zeros(&self, shape: impl Into<Shape>) -> Tensor<E>;

    /// Creates a tensor filled with zeros with the same shape as `src`.
    fn zeros_like<T>(&self, src: &Tensor<E, T>) -> Tensor<E> {
        self.zeros(src.shape())
    }
}

impl<E: Dtype> ZerosTensor<E> for Cpu {
    fn zeros(&self, shape: impl Into<Shape>) -> Tensor<E> {
        let shape = shape.into();
        self.upgrade(vec![E::zero(); shape.num_elements()], shape)
    }
}

/// Construct tensors filled with ones.
pub trait OnesTensor<E: Dtype> {
    fn ones(&self, shape: impl Into<Shape>) -> Tensor<E>;
}

impl<E: Dtype> OnesTensor<E> for Cpu {
    fn ones(&self, shape: impl Into<Shape>) -> Tensor<E> {
        let shape = shape.into();
        self.upgrade(vec![E::one(); shape.num_elements()], shape)
    }
}

/// Construct tensors from a flat row-major [Vec].
pub trait TensorFromVec<E: Dtype> {
    fn tensor_from_vec(&self, src: Vec<E>, shape: impl Into<Shape>) -> Result<Tensor<E>, Error>;
}

impl<E: Dtype> TensorFromVec<E> for Cpu {
    fn tensor_from_vec(&self, src: Vec<E>, shape: impl Into<Shape>) -> Result<Tensor<E>, Error> {
        let shape = shape.into();
        let expected = shape.num_elements();
        if src.len() != expected {
            return Err(Error::WrongNumElements {
                shape,
                expected,
                found: src.len(),
            });
        }
        Ok(self.upgrade(src, shape))
    }
}

/// Construct tensors from rust scalars and arrays, inferring the shape.
pub trait TensorFrom<Src, E: Dtype> {
    fn tensor(&self, src: Src) -> Tensor<E>;
}

impl<E: Dtype> TensorFrom<E, E> for Cpu {
    fn tensor(&self, src: E) -> Tensor<E> {
        self.upgrade(vec![src], Shape::scalar())
    }
}

impl<E: Dtype, const N: usize> TensorFrom<[E; N], E> for Cpu {
    fn tensor(&self, src: [E; N]) -> Tensor<E> {
        self.upgrade(src.to_vec(), Shape::from([N]))
    }
}

impl<E: Dtype, const M: usize, const N: usize> TensorFrom<[[E; N]; M], E> for Cpu {
    fn tensor(&self, src: [[E; N]; M]) -> Tensor<E> {
        let data = src.iter().flat_map(|row| row.iter().copied()).collect();
        self.upgrade(data, Shape::from([M, N]))
    }
}

/// Construct tensors with random data.
pub trait SampleTensor<E: Dtype> {
    /// Samples every element independently from `distr`.
    fn sample<D: Distribution<E>>(&self, shape: impl Into<Shape>, distr: D) -> Tensor<E>;

    /// Samples uniformly from `[low, high]`.
    ///
    /// **Panics** if `low > high`.
    fn sample_uniform(&self, shape: impl Into<Shape>, low: E, high: E) -> Tensor<E> {
        self.sample(shape, Uniform::new_inclusive(low, high))
    }

    /// Samples from the standard normal distribution.
    fn sample_normal(&self, shape: impl Into<Shape>) -> Tensor<E>
    where
        StandardNormal: Distribution<E>,
    {
        self.sample(shape, StandardNormal)
    }
}

impl<E: Dtype> SampleTensor<E> for Cpu {
    fn sample<D: Distribution<E>>(&self, shape: impl Into<Shape>, distr: D) -> Tensor<E> {
        let shape = shape.into();
        let data = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            (0..shape.num_elements())
                .map(|_| distr.sample(&mut *rng))
                .collect()
        };
        self.upgrade(data, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn test_zeros_and_ones() {
        let dev: TestDevice = Default::default();
        let z: Tensor<TestDtype> = dev.zeros([2, 3]);
        assert_eq!(z.as_vec(), vec![0.0; 6]);
        assert_eq!(z.shape().dims(), &[2, 3]);
        let o: Tensor<TestDtype> = dev.ones([4]);
        assert_eq!(o.as_vec(), vec![1.0; 4]);
    }

    #[test]
    fn test_tensor_from_vec_wrong_len() {
        let dev: TestDevice = Default::default();
        let r: Result<Tensor<TestDtype>, _> = dev.tensor_from_vec(vec![0.0; 5], [2, 3]);
        assert!(matches!(
            r,
            Err(Error::WrongNumElements {
                expected: 6,
                found: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_tensor_from_nested_array() {
        let dev: TestDevice = Default::default();
        let t: Tensor<TestDtype> = dev.tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(t.shape().dims(), &[2, 3]);
        assert_eq!(t.as_vec(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_same_seed_same_samples() {
        let a: Tensor<TestDtype> = Cpu::seed_from_u64(7).sample_normal([16]);
        let b: Tensor<TestDtype> = Cpu::seed_from_u64(7).sample_normal([16]);
        assert_eq!(a.as_vec(), b.as_vec());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_sample_uniform_bounds() {
        let dev: TestDevice = Default::default();
        let t: Tensor<TestDtype> = dev.sample_uniform([1000], -0.5, 0.25);
        assert!(t.as_vec().iter().all(|&x| (-0.5..=0.25).contains(&x)));
    }
}
