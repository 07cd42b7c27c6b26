//! Operations on tensors like [relu()], [matmul()], [softmax()], and more.
//!
//! # Generic function and struct methods
//!
//! All functionality is provided in two ways.
//! 1. The generic standalone function that takes a generic parameter. e.g. [relu()].
//! 2. The struct method for tensor structs. e.g. [crate::tensor::Tensor::relu()].
//!
//! The struct methods are all just pass throughs to the generic function.
//!
//! # Fallibility
//!
//! Every operation has a `try_*` form returning [crate::tensor::Error]. The
//! plain form unwraps it, which only panics on shape errors the caller
//! could have ruled out up front.
//!
//! # Axes
//!
//! Shapes are only known at runtime, so reductions come in two fixed
//! flavours: over everything ([crate::tensor::Tensor::sum()],
//! [crate::tensor::Tensor::mean()]) and over the last axis
//! ([crate::tensor::Tensor::sum_last_axis()], [softmax()],
//! [log_softmax()], [crate::tensor::Tensor::argmax_last_axis()]).
//!
//! # Backprop
//!
//! Every differentiable operation records a backward closure on the tape
//! of its (first) input when that tape is an [crate::tensor::OwnedTape].
//! Binary operations merge the tapes of both inputs, so the left hand side
//! must be the traced one:
//!
//! ```rust
//! # use gradsign_core::prelude::*;
//! # let dev: Cpu = Default::default();
//! let w: Tensor<f32> = dev.tensor([[1.0, -1.0], [0.5, 2.0]]);
//! let x: Tensor<f32> = dev.tensor([[3.0, 4.0]]);
//! let loss = x.leaky_trace().matmul(w).relu().sum();
//! let grads = loss.backward();
//! assert_eq!(grads.get(&x).unwrap().as_vec(), [0.0, 2.5]);
//! ```

mod argmax;
mod backward;
mod binary_ops;
mod broadcast;
mod clamp;
mod exp;
mod ln;
mod matmul;
mod mean_to;
mod negate;
mod permute;
mod relu;
mod scalar_ops;
mod select;
mod sign;
mod softmax;
mod sum_to;
pub(crate) mod utilities;

pub use binary_ops::{add, mul, sub};
pub use clamp::clamp;
pub use exp::exp;
pub use ln::ln;
pub use matmul::matmul;
pub use negate::negate;
pub use relu::relu;
pub use sign::sign;
pub use softmax::{log_softmax, softmax};
