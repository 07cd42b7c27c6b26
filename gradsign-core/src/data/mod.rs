//! A collection of data utility classes such as [OneHotEncode].

mod one_hot_encode;

pub use one_hot_encode::OneHotEncode;
