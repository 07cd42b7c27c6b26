use std::ops::Range;

use crate::{
    dtypes::Dtype,
    tensor::{Cpu, Error, NoneTape, PutTape, SplitTape, Tape, Tensor, TensorFromVec},
};

impl<E: Dtype, T> Tensor<E, T> {
    /// Number of entries along the leading axis. A scalar has one row.
    pub fn num_rows(&self) -> usize {
        self.shape.dim(0).unwrap_or(1)
    }
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// Selects the rows `range` along the leading axis.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let t: Tensor<f32> = dev.tensor([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    /// let r = t.slice_rows(1..3);
    /// assert_eq!(r.shape().dims(), &[2, 2]);
    /// assert_eq!(r.as_vec(), [3.0, 4.0, 5.0, 6.0]);
    /// ```
    pub fn slice_rows(self, range: Range<usize>) -> Self {
        self.try_slice_rows(range).unwrap()
    }

    /// See [Tensor::slice_rows]. Returns [Error::ShapeMismatch] if the range
    /// is out of bounds or `self` is a scalar.
    pub fn try_slice_rows(self, range: Range<usize>) -> Result<Self, Error> {
        let rows = match self.shape.dim(0) {
            Some(rows) if range.start <= range.end && range.end <= rows => rows,
            _ => {
                return Err(Error::shape_mismatch(
                    "slice_rows",
                    &self.shape,
                    &self.shape.with_leading(range.end),
                ))
            }
        };
        let row_len = if rows == 0 { 0 } else { self.num_elements() / rows };
        let offset = range.start * row_len;
        let len = range.len() * row_len;
        let (inp, mut tape) = self.split_tape();
        let out_data = inp.data[offset..offset + len].to_vec();
        let out = inp
            .device
            .upgrade(out_data, inp.shape.with_leading(range.len()));
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    for (gi, go) in grad_inp[offset..offset + len].iter_mut().zip(grad_out) {
                        *gi += *go;
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }
}

impl<E: Dtype> Tensor<E, NoneTape> {
    /// Stacks tensors along the leading axis. Every part must agree on the
    /// trailing dimensions.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let a: Tensor<f32> = dev.tensor([[1.0, 2.0]]);
    /// let b: Tensor<f32> = dev.tensor([[3.0, 4.0], [5.0, 6.0]]);
    /// let c = Tensor::try_concat_rows(&dev, &[a, b]).unwrap();
    /// assert_eq!(c.shape().dims(), &[3, 2]);
    /// ```
    pub fn try_concat_rows(dev: &Cpu, parts: &[Self]) -> Result<Self, Error> {
        let Some(first) = parts.first() else {
            return dev.tensor_from_vec(Vec::new(), [0]);
        };
        let trailing = &first.shape.dims()[first.shape.num_dims().min(1)..];
        let mut rows = 0;
        let mut data = Vec::new();
        for part in parts {
            let dims = part.shape.dims();
            if dims.is_empty() || &dims[1..] != trailing {
                return Err(Error::shape_mismatch("concat_rows", &first.shape, &part.shape));
            }
            rows += dims[0];
            data.extend_from_slice(&part.data);
        }
        dev.tensor_from_vec(data, first.shape.with_leading(rows))
    }
}

#[cfg(test)]
mod tests {
    use crate::{tensor::*, tensor_ops::*, tests::*};

    #[test]
    fn test_slice_rows_backward() {
        let dev: TestDevice = Default::default();
        let t: Tensor<TestDtype> = dev.tensor([[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let r = t.leaky_trace().slice_rows(1..2);
        assert_eq!(r.as_vec(), [3.0, 4.0]);
        let g = r.sum().backward();
        assert_eq!(g.get(&t).unwrap().as_vec(), [0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_slice_rows_out_of_bounds() {
        let dev: TestDevice = Default::default();
        let t: Tensor<TestDtype> = dev.zeros([3, 2]);
        assert!(t.clone().try_slice_rows(2..4).is_err());
        assert_eq!(t.try_slice_rows(3..3).unwrap().shape().dims(), &[0, 2]);
    }

    #[test]
    fn test_concat_rows() {
        let dev: TestDevice = Default::default();
        let a: Tensor<TestDtype> = dev.tensor([[1.0, 2.0]]);
        let b: Tensor<TestDtype> = dev.tensor([[3.0, 4.0], [5.0, 6.0]]);
        let c = Tensor::try_concat_rows(&dev, &[a.clone(), b]).unwrap();
        assert_eq!(c.as_vec(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let d: Tensor<TestDtype> = dev.zeros([1, 3]);
        assert!(matches!(
            Tensor::try_concat_rows(&dev, &[a, d]),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
