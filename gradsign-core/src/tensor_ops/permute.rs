use crate::{
    dtypes::Dtype,
    shapes::Shape,
    tensor::{Error, PutTape, SplitTape, Tape, Tensor},
};

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// Swaps the two axes of a matrix: `[m, n]` becomes `[n, m]`.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let a: Tensor<f32> = dev.tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    /// let b = a.permute();
    /// assert_eq!(b.shape().dims(), &[3, 2]);
    /// assert_eq!(b.as_vec(), [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    /// ```
    pub fn permute(self) -> Self {
        self.try_permute().unwrap()
    }

    /// See [Tensor::permute]. Returns [Error::ShapeMismatch] if `self` is
    /// not a matrix.
    pub fn try_permute(self) -> Result<Self, Error> {
        let (m, n) = self.shape.as_matrix().ok_or_else(|| {
            Error::shape_mismatch("permute", &self.shape, &Shape::from([0, 0]))
        })?;
        let (inp, mut tape) = self.split_tape();
        let mut out_data = Vec::with_capacity(m * n);
        for j in 0..n {
            for i in 0..m {
                out_data.push(inp.data[i * n + j]);
            }
        }
        let out = inp.device.upgrade(out_data, Shape::from([n, m]));
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    for i in 0..m {
                        for j in 0..n {
                            grad_inp[i * n + j] += grad_out[j * m + i];
                        }
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }
}

#[cfg(test)]
mod tests {
    use crate::{tensor::*, tensor_ops::*, tests::*};

    #[test]
    fn test_permute_backward() {
        let dev: TestDevice = Default::default();
        let a: Tensor<TestDtype> = dev.tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let w: Tensor<TestDtype> = dev.tensor([[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let r = a.leaky_trace().permute();
        assert_eq!(r.shape().dims(), &[3, 2]);
        let g = (r * w).sum().backward();
        assert_eq!(g.get(&a).unwrap().as_vec(), [1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_permute_non_matrix() {
        let dev: TestDevice = Default::default();
        let a: Tensor<TestDtype> = dev.zeros([3]);
        assert!(a.try_permute().is_err());
    }
}
