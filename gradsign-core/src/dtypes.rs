//! Element types a [crate::tensor::Tensor] can hold.
//!
//! Only floating point types implement [Dtype]: every tensor in this crate
//! may end up on a gradient tape, and gradients of integer data are not a
//! thing.

/// Represents a floating point element type that tensors store and
/// differentiate.
pub trait Dtype:
    'static
    + Copy
    + Default
    + std::fmt::Debug
    + std::fmt::Display
    + PartialOrd
    + Send
    + Sync
    + std::ops::AddAssign
    + std::ops::SubAssign
    + std::ops::MulAssign
    + num_traits::Float
    + num_traits::FromPrimitive
    + rand_distr::uniform::SampleUniform
    + SafeTensorsDtype
{
    /// Lossy conversion from an `f64` literal or configuration value.
    fn from_f64_lossy(x: f64) -> Self;
    /// Lossy conversion to `f64`, for logging and reporting.
    fn to_f64_lossy(self) -> f64;
}

macro_rules! dtype {
    ($type:ty, $st:expr) => {
        impl Dtype for $type {
            #[inline(always)]
            fn from_f64_lossy(x: f64) -> Self {
                x as $type
            }
            #[inline(always)]
            fn to_f64_lossy(self) -> f64 {
                self as f64
            }
        }

        impl SafeTensorsDtype for $type {
            const DTYPE: safetensors::Dtype = $st;
            fn to_le_byte_vec(&self) -> Vec<u8> {
                <$type>::to_le_bytes(*self).to_vec()
            }
        }
    };
}

dtype!(f32, safetensors::Dtype::F32);
dtype!(f64, safetensors::Dtype::F64);

/// Conversion trait for SafeTensors dtype
pub trait SafeTensorsDtype {
    const DTYPE: safetensors::Dtype;
    fn to_le_byte_vec(&self) -> Vec<u8>;
}
