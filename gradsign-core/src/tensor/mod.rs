//! The [Tensor] struct, the [Cpu] device that allocates it, and gradient tapes.
//!
//! At a high level a tensor consists of only four parts
//! 1. A [UniqueId] to track which gradients are associated with what tensors
//! 2. A row-major buffer stored in a [std::sync::Arc]
//! 3. A runtime [crate::shapes::Shape]
//! 4. A tape, which can either actually be a tape ([OwnedTape]) or be empty ([NoneTape]).
//!
//! # Creating tensors
//!
//! ```rust
//! # use gradsign_core::prelude::*;
//! let dev: Cpu = Default::default();
//! let a: Tensor<f32> = dev.zeros([3]);
//! let b: Tensor<f32> = dev.ones([2, 2]);
//! let c = dev.tensor([[1.0f32, 2.0], [3.0, 4.0]]);
//! let d: Tensor<f32> = dev.tensor_from_vec(vec![0.0; 6], [2, 3]).unwrap();
//! let e: Tensor<f32> = dev.sample_uniform([4, 3], -1.0, 1.0);
//! ```
//!
//! # Tracking gradients
//!
//! Use [Tensor::leaky_trace()] or [Tensor::leaky_traced()] to attach a fresh
//! [OwnedTape]. `.leaky_trace()` clones the tensor and `.leaky_traced()` takes
//! ownership. Both keep the [UniqueId], so the [Gradients] returned by
//! `backward()` can be queried with the untraced original.
//!
//! ```rust
//! # use gradsign_core::prelude::*;
//! # let dev: Cpu = Default::default();
//! let t: Tensor<f32> = dev.zeros([5]);
//! let t_traced: Tensor<f32, OwnedTape<f32>> = t.leaky_trace();
//! assert_eq!(t.id(), t_traced.id());
//! ```

mod cpu;
mod error;
mod ghost;
mod gradients;
mod safetensors;
mod tensor_impl;
mod unique_id;

pub use cpu::{Cpu, OnesTensor, SampleTensor, TensorFrom, TensorFromVec, ZerosTensor};
pub use error::Error;
pub use ghost::GhostTensor;
pub use gradients::{Gradients, Merge, NoneTape, OwnedTape, Tape};
pub use safetensors::{load_class_indices, load_tensor, SafeTensorsFile};
pub use tensor_impl::{PutTape, SplitTape, Tensor, Tensorlike};
pub use unique_id::{unique_id, UniqueId};
