use crate::{
    dtypes::Dtype,
    tensor::{Error, Merge, PutTape, SplitTape, Tape, Tensor},
};

/// An elementwise function and its derivative.
pub(crate) trait UnaryDerivative<E>: 'static + Clone {
    /// Whether the [UnaryDerivative::df] function can re-use the output
    /// from [UnaryDerivative::f].
    const DF_USES_FX: bool;

    fn f(&self, x: &E) -> E;

    /// Receives `f(x)` if [UnaryDerivative::DF_USES_FX] is true,
    /// otherwise `x`.
    fn df(&self, x: &E) -> E;
}

/// An elementwise function of two arguments and its partial derivatives.
pub(crate) trait BinaryDerivative<E>: 'static + Copy {
    fn f(&self, x: &E, y: &E) -> E;
    fn dfdx(&self, x: &E, y: &E) -> E;
    fn dfdy(&self, x: &E, y: &E) -> E;
}

pub(crate) fn try_unary_op<E: Dtype, Op: UnaryDerivative<E>, T: Tape<E>>(
    op: Op,
    inp: Tensor<E, T>,
) -> Result<Tensor<E, T>, Error> {
    let (inp, mut tape) = inp.split_tape();
    let out_data = inp.data.iter().map(|x| op.f(x)).collect();
    let out = inp.device.upgrade(out_data, inp.shape.clone());
    if T::OWNS_TAPE {
        let inp_ghost = inp.ghost();
        let out_ghost = out.ghost();
        tape.alloc_grad(&inp_ghost);
        tape.alloc_grad(&out_ghost);
        let saved = if Op::DF_USES_FX {
            out.data.clone()
        } else {
            inp.data.clone()
        };
        tape.add_backward_op(move |grads| {
            grads.mut_and_ref(&inp_ghost, &out_ghost, |grad_inp, grad_out| {
                for ((gi, go), x) in grad_inp.iter_mut().zip(grad_out).zip(saved.iter()) {
                    *gi += op.df(x) * *go;
                }
            })
        });
    }
    Ok(out.put_tape(tape))
}

pub(crate) fn try_binary_op<
    E: Dtype,
    Op: BinaryDerivative<E>,
    RhsTape,
    LhsTape: Tape<E> + Merge<RhsTape>,
>(
    op: Op,
    name: &'static str,
    lhs: Tensor<E, LhsTape>,
    rhs: Tensor<E, RhsTape>,
) -> Result<Tensor<E, LhsTape>, Error> {
    if lhs.shape != rhs.shape {
        return Err(Error::shape_mismatch(name, &lhs.shape, &rhs.shape));
    }
    let (lhs, ltape) = lhs.split_tape();
    let (rhs, rtape) = rhs.split_tape();
    let mut tape = ltape.merge(rtape);
    let out_data = lhs
        .data
        .iter()
        .zip(rhs.data.iter())
        .map(|(x, y)| op.f(x, y))
        .collect();
    let out = lhs.device.upgrade(out_data, lhs.shape.clone());
    if LhsTape::OWNS_TAPE {
        let out_ghost = out.ghost();
        tape.alloc_grad(&lhs);
        tape.alloc_grad(&rhs);
        tape.alloc_grad(&out_ghost);
        tape.add_backward_op(move |grads| {
            grads.muts_and_ref(&lhs, &rhs, &out_ghost, |grad_lhs, grad_rhs, grad_out| {
                for (i, go) in grad_out.iter().enumerate() {
                    let (x, y) = (&lhs.data[i], &rhs.data[i]);
                    grad_lhs[i] += op.dfdx(x, y) * *go;
                    grad_rhs[i] += op.dfdy(x, y) * *go;
                }
            })
        });
    }
    Ok(out.put_tape(tape))
}
