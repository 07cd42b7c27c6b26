use crate::{
    dtypes::Dtype,
    tensor::{Error, Gradients, OwnedTape, SplitTape, Tape, Tensor},
};

impl<E: Dtype> Tensor<E, OwnedTape<E>> {
    /// Runs backprop algorithm with all operations contained in the tape that `self` has.
    ///
    /// This function takes ownership of `self` and returns [Gradients].
    ///
    /// Panics if `self` does not hold exactly one element.
    pub fn backward(self) -> Gradients<E> {
        self.try_backward().unwrap()
    }

    /// Fallible version of [Tensor::backward]. Returns
    /// [Error::NonScalarBackward] if `self` does not hold exactly one element.
    pub fn try_backward(self) -> Result<Gradients<E>, Error> {
        if self.num_elements() != 1 {
            return Err(Error::NonScalarBackward(self.shape.clone()));
        }
        let (t, mut tape) = self.split_tape();
        let t_ghost = t.ghost();
        tape.alloc_grad(&t_ghost);
        tape.add_backward_op(move |grads| {
            grads.get_or_alloc_mut(&t_ghost).fill(E::one());
            Ok(())
        });
        tape.execute()
    }
}

#[cfg(test)]
mod tests {
    use crate::{tensor::*, tensor_ops::*, tests::*};

    #[test]
    fn test_backward_on_non_scalar() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([1.0, 2.0]);
        let r = x.leaky_trace().relu().try_backward();
        assert!(matches!(r, Err(Error::NonScalarBackward(_))));
    }

    #[test]
    fn test_backward_of_traced_leaf() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([5.0]);
        let g = x.leaky_trace().backward();
        assert_eq!(g.get(&x).unwrap().as_vec(), [1.0]);
    }

    #[test]
    fn test_untouched_tensor_has_no_gradient() {
        let dev: TestDevice = Default::default();
        let x: Tensor<TestDtype> = dev.tensor([1.0, 2.0]);
        let y: Tensor<TestDtype> = dev.tensor([3.0, 4.0]);
        let g = x.leaky_trace().sum().backward();
        assert!(g.get(&y).is_none());
        assert!(g.get(&x).is_some());
    }
}
