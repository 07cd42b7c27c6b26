use crate::{
    dtypes::Dtype,
    shapes::Shape,
    tensor::{Error, Merge, PutTape, SplitTape, Tape, Tensor},
};

fn matrix_dims(op: &'static str, lhs: &Shape, rhs: &Shape) -> Result<(usize, usize, usize), Error> {
    match (lhs.as_matrix(), rhs.as_matrix()) {
        (Some((m, k)), Some((k2, n))) if k == k2 => Ok((m, k, n)),
        _ => Err(Error::shape_mismatch(op, lhs, rhs)),
    }
}

/// Row-major `c += a * b` for `a: [m, k]`, `b: [k, n]`, `c: [m, n]`.
fn gemm<E: Dtype>((m, k, n): (usize, usize, usize), a: &[E], b: &[E], c: &mut [E]) {
    for i in 0..m {
        let c_row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            for (c_ij, b_pj) in c_row.iter_mut().zip(&b[p * n..(p + 1) * n]) {
                *c_ij += a_ip * *b_pj;
            }
        }
    }
}

/// Matrix * Matrix. `lhs` must be `[m, k]` and `rhs` must be `[k, n]`; the
/// result is `[m, n]`.
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let x: Tensor<f32> = dev.tensor([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
/// let y: Tensor<f32> = dev.tensor([[1.0, 0.0, 2.0, 0.0], [0.0, 1.0, 0.0, 2.0]]);
/// let z = x.matmul(y);
/// assert_eq!(z.shape().dims(), &[3, 4]);
/// ```
pub fn matmul<E: Dtype, L: Tape<E> + Merge<R>, R>(
    lhs: Tensor<E, L>,
    rhs: Tensor<E, R>,
) -> Tensor<E, L> {
    lhs.matmul(rhs)
}

impl<E: Dtype, L: Tape<E>> Tensor<E, L> {
    /// See [matmul]
    pub fn matmul<R>(self, rhs: Tensor<E, R>) -> Self
    where
        L: Merge<R>,
    {
        self.try_matmul(rhs).unwrap()
    }

    /// See [matmul]. Returns [Error::ShapeMismatch] unless the inner
    /// dimensions agree.
    pub fn try_matmul<R>(self, rhs: Tensor<E, R>) -> Result<Self, Error>
    where
        L: Merge<R>,
    {
        let dims @ (m, k, n) = matrix_dims("matmul", &self.shape, &rhs.shape)?;
        let (lhs, ltape) = self.split_tape();
        let (rhs, rtape) = rhs.split_tape();
        let mut tape = ltape.merge(rtape);

        let mut out_data = vec![E::zero(); m * n];
        gemm(dims, &lhs.data, &rhs.data, &mut out_data);
        let out = lhs.device.upgrade(out_data, Shape::from([m, n]));

        if L::OWNS_TAPE {
            let out_ghost = out.ghost();
            tape.alloc_grad(&lhs);
            tape.alloc_grad(&rhs);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.muts_and_ref(&lhs, &rhs, &out_ghost, |grad_lhs, grad_rhs, grad_out| {
                    // grad_lhs += grad_out * rhs^T
                    for i in 0..m {
                        for p in 0..k {
                            let mut acc = E::zero();
                            for j in 0..n {
                                acc += grad_out[i * n + j] * rhs.data[p * n + j];
                            }
                            grad_lhs[i * k + p] += acc;
                        }
                    }
                    // grad_rhs += lhs^T * grad_out
                    for i in 0..m {
                        for p in 0..k {
                            let a_ip = lhs.data[i * k + p];
                            for j in 0..n {
                                grad_rhs[p * n + j] += a_ip * grad_out[i * n + j];
                            }
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
    fn test_matmul_forward() {
        let dev: TestDevice = Default::default();
        let a: Tensor<TestDtype> = dev.tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let b: Tensor<TestDtype> = dev.tensor([[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let c = a.matmul(b);
        assert_eq!(c.shape().dims(), &[2, 2]);
        assert_eq!(c.as_vec(), [4.0, 5.0, 10.0, 11.0]);
    }

    #[test]
    fn test_matmul_backward() {
        let dev: TestDevice = Default::default();
        let a: Tensor<TestDtype> = dev.tensor([[0.5, -1.0], [2.0, 0.0]]);
        let b: Tensor<TestDtype> = dev.tensor([[1.0, 2.0, 3.0], [-1.0, 0.5, 0.0]]);
        let g = a.leaky_trace().matmul(b.leaky_trace()).sum().backward();
        // d(sum(a b))/da[i, p] = sum_j b[p, j]
        assert_close_to_literal!(g.get(&a).unwrap(), [6.0, -0.5, 6.0, -0.5]);
        // d(sum(a b))/db[p, j] = sum_i a[i, p]
        assert_close_to_literal!(g.get(&b).unwrap(), [2.5, 2.5, 2.5, -1.0, -1.0, -1.0]);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let dev: TestDevice = Default::default();
        let a: Tensor<TestDtype> = dev.zeros([2, 3]);
        let b: Tensor<TestDtype> = dev.zeros([2, 3]);
        assert!(matches!(
            a.try_matmul(b),
            Err(Error::ShapeMismatch { op: "matmul", .. })
        ));
        let v: Tensor<TestDtype> = dev.zeros([3]);
        let w: Tensor<TestDtype> = dev.zeros([3, 1]);
        assert!(v.try_matmul(w).is_err());
    }
}
