//! # gradsign-core
//!
//! The tensor and gradient tape machinery underneath `gradsign`. It is small on
//! purpose: a row-major CPU tensor with a runtime [shapes::Shape], a tape that
//! records backward closures, and the handful of operations a dense classifier
//! and its loss need.
//!
//! # Tensors
//!
//! *See [tensor] for more information.*
//!
//! Tensors are allocated by a [tensor::Cpu] device:
//!
//! ```rust
//! # use gradsign_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let a: Tensor<f32> = dev.zeros([2, 3]);
//! let b: Tensor<f32> = dev.tensor([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
//! assert_eq!(b.shape().dims(), &[2, 3]);
//! assert_eq!(a.as_vec(), vec![0.0; 6]);
//! ```
//!
//! # Tapes & Gradients
//!
//! *See [tensor::Gradients] and [tensor::Tape] for more information.*
//!
//! A tensor carries a tape as its last generic parameter. By default that is
//! [tensor::NoneTape], which records nothing. Calling
//! [tensor::Tensor::leaky_trace()] gives the tensor an [tensor::OwnedTape];
//! every operation applied afterwards appends its backward closure to it, and
//! [tensor::Tensor::backward()] on a scalar result runs them in reverse:
//!
//! ```rust
//! # use gradsign_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let x: Tensor<f32> = dev.tensor([-1.0, 2.0]);
//! let y = x.leaky_trace().relu().sum();
//! let grads = y.backward();
//! assert_eq!(grads.get(&x).unwrap().as_vec(), vec![0.0, 1.0]);
//! ```
//!
//! The tape is the only differentiation context there is. It is created
//! explicitly, moves through the forward pass inside the tensors, and is
//! consumed by `backward()`.

pub mod data;
pub mod dtypes;
pub mod losses;
pub mod nn_traits;
pub mod shapes;
pub mod tensor;
pub mod tensor_ops;

pub mod prelude {
    pub use crate::data::OneHotEncode;
    pub use crate::dtypes::Dtype;
    pub use crate::losses::*;
    pub use crate::nn_traits::{LoadSafeTensors, Module, SafeTensorEntry, SaveSafeTensors};
    pub use crate::shapes::Shape;
    pub use crate::tensor::*;
    pub use crate::tensor_ops::*;
}
