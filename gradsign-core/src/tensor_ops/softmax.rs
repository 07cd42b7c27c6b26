use crate::{
    dtypes::Dtype,
    tensor::{Error, PutTape, SplitTape, Tape, Tensor},
};

/// `x - logsumexp(x)` for one row, shifting by the row max first.
fn log_softmax_row<E: Dtype>(row: &[E], out: &mut [E]) {
    let shift = row_shift(row);
    let sum_exp = row.iter().fold(E::zero(), |acc, x| acc + (*x - shift).exp());
    let lse = sum_exp.ln() + shift;
    for (o, x) in out.iter_mut().zip(row) {
        *o = *x - lse;
    }
}

/// `exp(x - max) / sum(exp(x - max))` for one row.
fn softmax_row<E: Dtype>(row: &[E], out: &mut [E]) {
    let shift = row_shift(row);
    let mut sum_exp = E::zero();
    for (o, x) in out.iter_mut().zip(row) {
        *o = (*x - shift).exp();
        sum_exp += *o;
    }
    for o in out.iter_mut() {
        *o = *o / sum_exp;
    }
}

fn row_shift<E: Dtype>(row: &[E]) -> E {
    let max = row.iter().fold(E::neg_infinity(), |m, x| m.max(*x));
    if max.is_finite() {
        max
    } else {
        E::zero()
    }
}

/// Computes the [softmax function](https://en.wikipedia.org/wiki/Softmax_function)
/// across the last axis.
///
/// Equivalent to `exp(log_softmax(t))`.
///
/// ```rust
/// # use gradsign_core::prelude::*;
/// # let dev: Cpu = Default::default();
/// let t: Tensor<f32> = dev.tensor([[0.0, 0.0], [1000.0, 1000.0]]);
/// assert_eq!(t.softmax().as_vec(), [0.5; 4]);
/// ```
pub fn softmax<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.softmax()
}

/// `log(softmax(t))` in numerically stable way across the last axis. Does
/// `t - logsumexp(t)` under the hood.
pub fn log_softmax<E: Dtype, T: Tape<E>>(t: Tensor<E, T>) -> Tensor<E, T> {
    t.log_softmax()
}

impl<E: Dtype, T: Tape<E>> Tensor<E, T> {
    /// See [softmax]
    pub fn softmax(self) -> Self {
        self.try_softmax().unwrap()
    }

    /// See [softmax]
    pub fn try_softmax(self) -> Result<Self, Error> {
        let cols = self.shape.last_dim();
        let (inp, mut tape) = self.split_tape();
        let mut out_data = vec![E::zero(); inp.data.len()];
        if cols > 0 {
            for (row, out) in inp.data.chunks_exact(cols).zip(out_data.chunks_exact_mut(cols)) {
                softmax_row(row, out);
            }
        }
        let out = inp.device.upgrade(out_data, inp.shape.clone());
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            let probs = out.data.clone();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    if cols == 0 {
                        return;
                    }
                    // dx_i = p_i * (dy_i - sum_j dy_j p_j)
                    let rows = grad_inp
                        .chunks_exact_mut(cols)
                        .zip(grad_out.chunks_exact(cols))
                        .zip(probs.chunks_exact(cols));
                    for ((gi, go), p) in rows {
                        let dot = go.iter().zip(p).fold(E::zero(), |acc, (g, p)| acc + *g * *p);
                        for ((gi, go), p) in gi.iter_mut().zip(go).zip(p) {
                            *gi += *p * (*go - dot);
                        }
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }

    /// See [log_softmax]
    pub fn log_softmax(self) -> Self {
        self.try_log_softmax().unwrap()
    }

    /// See [log_softmax]
    pub fn try_log_softmax(self) -> Result<Self, Error> {
        let cols = self.shape.last_dim();
        let (inp, mut tape) = self.split_tape();
        let mut out_data = vec![E::zero(); inp.data.len()];
        if cols > 0 {
            for (row, out) in inp.data.chunks_exact(cols).zip(out_data.chunks_exact_mut(cols)) {
                log_softmax_row(row, out);
            }
        }
        let out = inp.device.upgrade(out_data, inp.shape.clone());
        if T::OWNS_TAPE {
            let inp_ghost = inp.ghost();
            let out_ghost = out.ghost();
            let log_probs = out.data.clone();
            tape.alloc_grad(&inp_ghost);
            tape.alloc_grad(&out_ghost);
            tape.add_backward_op(move |grads| {
                grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                    if cols == 0 {
                        return;
                    }
                    // dx_i = dy_i - p_i * sum_j dy_j
                    let rows = grad_inp
                        .chunks_exact_mut(cols)
                        .zip(grad_out.chunks_exact(cols))
                        .zip(log_probs.chunks_exact(cols));
                    for ((gi, go), lp) in rows {
                        let total = go.iter().fold(E::zero(), |acc, g| acc + *g);
                        for ((gi, go), lp) in gi.iter_mut().zip(go).zip(lp) {
                            *gi += *go - lp.exp() * total;
                        }
                    }
                })
            });
        }
        Ok(out.put_tape(tape))
    }
}
