//! Runtime shapes.
//!
//! A [Shape] is a list of dimensions, outermost first. Row-major strides are
//! implied; no tensor in this crate is ever a strided view.

/// The dimensions of a tensor, outermost first. `[]` is a scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    /// The unit shape `[]`, which holds exactly one element.
    pub fn scalar() -> Self {
        Self(Vec::new())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn num_dims(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements, `1` for a scalar.
    pub fn num_elements(&self) -> usize {
        self.0.iter().product()
    }

    /// Size of dimension `i`, if the shape has that many dimensions.
    pub fn dim(&self, i: usize) -> Option<usize> {
        self.0.get(i).copied()
    }

    /// Splits a rank 2 shape into `(rows, cols)`.
    pub fn as_matrix(&self) -> Option<(usize, usize)> {
        match self.0.as_slice() {
            &[m, n] => Some((m, n)),
            _ => None,
        }
    }

    pub fn concrete(&self) -> Vec<usize> {
        self.0.clone()
    }

    /// Size of the last dimension, `1` for a scalar.
    pub fn last_dim(&self) -> usize {
        self.0.last().copied().unwrap_or(1)
    }

    /// The shape with its last dimension removed. A scalar stays a scalar.
    pub fn without_last(&self) -> Self {
        let n = self.0.len().saturating_sub(1);
        Self(self.0[..n].to_vec())
    }

    /// The shape with the leading dimension replaced by `n`.
    pub fn with_leading(&self, n: usize) -> Self {
        let mut dims = self.0.clone();
        match dims.first_mut() {
            Some(d) => *d = n,
            None => dims.push(n),
        }
        Self(dims)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl From<&Shape> for Shape {
    fn from(shape: &Shape) -> Self {
        shape.clone()
    }
}
