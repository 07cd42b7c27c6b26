use crate::{
    dtypes::Dtype,
    shapes::Shape,
    tensor::{Error, PutTape, SplitTape, Tape, Tensor},
};

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// Sum of all values, as a scalar tensor.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let t: Tensor<f32> = dev.tensor([[1.0, 2.0, 3.0], [-1.0, -2.0, -3.0]]);
    /// assert_eq!(t.sum().scalar(), Some(0.0));
    /// ```
    pub fn sum(self) -> Self {
        self.try_sum().unwrap()
    }

    /// See [Tensor::sum]
    pub fn try_sum(self) -> Result<Self, Error> {
        let (inp, mut tape) = self.split_tape();
        let total = inp.data.iter().fold(E::zero(), |acc, x| acc + *x);
        let out = inp.device.upgrade(vec![total], Shape::scalar());
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    for gi in grad_inp.iter_mut() {
                        *gi += grad_out[0];
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }

    /// Sums along the last axis: `[.., n]` becomes `[..]`.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let t: Tensor<f32> = dev.tensor([[1.0, 2.0, 3.0], [-1.0, -2.0, -4.0]]);
    /// assert_eq!(t.sum_last_axis().as_vec(), [6.0, -7.0]);
    /// ```
    pub fn sum_last_axis(self) -> Self {
        self.try_sum_last_axis().unwrap()
    }

    /// See [Tensor::sum_last_axis]
    pub fn try_sum_last_axis(self) -> Result<Self, Error> {
        let cols = self.shape.last_dim();
        let out_shape = self.shape.without_last();
        let rows = out_shape.num_elements();
        let (inp, mut tape) = self.split_tape();
        let out_data = (0..rows)
            .map(|r| {
                inp.data[r * cols..(r + 1) * cols]
                    .iter()
                    .fold(E::zero(), |acc, x| acc + *x)
            })
            .collect();
        let out = inp.device.upgrade(out_data, out_shape);
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    for (r, go) in grad_out.iter().enumerate() {
                        for gi in grad_inp[r * cols..(r + 1) * cols].iter_mut() {
                            *gi += *go;
                        }
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }
}
