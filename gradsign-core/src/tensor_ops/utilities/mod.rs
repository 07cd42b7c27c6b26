mod ops;

pub(crate) use ops::{try_binary_op, try_unary_op, BinaryDerivative, UnaryDerivative};
