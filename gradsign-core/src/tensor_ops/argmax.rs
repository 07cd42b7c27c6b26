use crate::{dtypes::Dtype, tensor::Tensor};

impl<E: Dtype, T> Tensor<E, T> {
    /// Index of the largest value along the last axis, one per row. Ties
    /// resolve to the lowest index and NaN never wins.
    ///
    /// Nothing is recorded on the tape.
    ///
    /// ```rust
    /// # use gradsign_core::prelude::*;
    /// # let dev: Cpu = Default::default();
    /// let t: Tensor<f32> = dev.tensor([[0.1, 0.7, 0.2], [0.5, 0.5, 0.0]]);
    /// assert_eq!(t.argmax_last_axis(), vec![1, 0]);
    /// ```
    pub fn argmax_last_axis(&self) -> Vec<usize> {
        let cols = self.shape.last_dim();
        if cols == 0 {
            return vec![0; self.shape.without_last().num_elements()];
        }
        self.data
            .chunks_exact(cols)
            .map(|row| {
                let mut best = 0;
                for (i, x) in row.iter().enumerate() {
                    if *x > row[best] || (row[best].is_nan() && !x.is_nan()) {
                        best = i;
                    }
                }
                best
            })
            .collect()
    }
}
