use crate::{
    dtypes::Dtype,
    shapes::Shape,
    tensor::{Error, PutTape, SplitTape, Tape, Tensor},
};

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// Repeats a vector `[n]` as each of `rows` rows, giving `[rows, n]`.
    ///
    /// The gradient of the input is the sum of the output's gradient over
    /// the new axis.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let b: Tensor<f32> = dev.tensor([1.0, 2.0]);
    /// let r = b.broadcast_rows(3);
    /// assert_eq!(r.as_vec(), [1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
    /// ```
    pub fn broadcast_rows(self, rows: usize) -> Self {
        self.try_broadcast_rows(rows).unwrap()
    }

    /// See [Tensor::broadcast_rows]
    pub fn try_broadcast_rows(self, rows: usize) -> Result<Self, Error> {
        let n = match self.shape.dims() {
            &[n] => n,
            _ => {
                return Err(Error::shape_mismatch(
                    "broadcast_rows",
                    &self.shape,
                    &Shape::from([rows, self.num_elements()]),
                ))
            }
        };
        let (inp, mut tape) = self.split_tape();
        let mut out_data = Vec::with_capacity(rows * n);
        for _ in 0..rows {
            out_data.extend_from_slice(&inp.data);
        }
        let out = inp.device.upgrade(out_data, Shape::from([rows, n]));
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    for row in grad_out.chunks_exact(n.max(1)) {
                        for (gi, go) in grad_inp.iter_mut().zip(row) {
                            *gi += *go;
                        }
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }
}
