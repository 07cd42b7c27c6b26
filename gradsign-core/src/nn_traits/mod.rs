//! Traits shared by every network layer: [Module] for the forward pass and
//! [SaveSafeTensors]/[LoadSafeTensors] for parameter files.
//!
//! Tuples of modules run sequentially and vectors of modules run in order,
//! so a whole network is usually just nested tuples and vecs of layers.

mod tuples;
mod vecs;

use crate::{
    dtypes::{Dtype, SafeTensorsDtype},
    tensor::{Error, Tensor},
};

/// Mutable & Immutable forward of `Input` that produces [Module::Output].
pub trait Module<X> {
    /// The type that this unit produces given `Input`.
    type Output;

    fn try_forward(&self, x: X) -> Result<Self::Output, Error>;

    fn try_forward_mut(&mut self, x: X) -> Result<Self::Output, Error> {
        self.try_forward(x)
    }

    fn forward(&self, x: X) -> Self::Output {
        self.try_forward(x).unwrap()
    }

    fn forward_mut(&mut self, x: X) -> Self::Output {
        self.try_forward_mut(x).unwrap()
    }
}

/// One entry of a `.safetensors` file before serialization:
/// `(key, dtype, shape, little endian bytes)`.
pub type SafeTensorEntry = (String, safetensors::Dtype, Vec<usize>, Vec<u8>);

/// Something that can be written to a `.safetensors` file.
pub trait SaveSafeTensors {
    /// Writes every entry under its key to `path`.
    fn save_safetensors<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Error> {
        let mut tensors = Vec::new();
        self.write_safetensors("", &mut tensors);
        let data = tensors
            .iter()
            .map(|(k, dtype, shape, data)| {
                Ok((
                    k.clone(),
                    safetensors::tensor::TensorView::new(*dtype, shape.clone(), data)?,
                ))
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let data = data.iter().map(|i| (i.0.clone(), &i.1)).collect::<Vec<_>>();

        safetensors::serialize_to_file(data, &None, path.as_ref())?;
        Ok(())
    }

    /// Appends this object's entries to `tensors`, prefixing keys with
    /// `location`.
    fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>);
}

/// Something that can be filled in from a `.safetensors` file.
pub trait LoadSafeTensors {
    fn load_safetensors<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<(), Error> {
        let f = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before returning.
        let buffer = unsafe { memmap2::MmapOptions::new().map(&f)? };
        let tensors = safetensors::SafeTensors::deserialize(&buffer)?;
        self.read_safetensors("", &tensors)
    }

    fn read_safetensors(
        &mut self,
        location: &str,
        tensors: &safetensors::SafeTensors<'_>,
    ) -> Result<(), Error>;
}

/// Joins a parent key and a child name with a `.`, omitting the dot at the
/// root.
pub fn join_key(location: &str, name: &str) -> String {
    if location.is_empty() {
        name.to_string()
    } else {
        format!("{location}.{name}")
    }
}

impl<E: Dtype, T> LoadSafeTensors for Tensor<E, T> {
    fn read_safetensors(
        &mut self,
        location: &str,
        tensors: &safetensors::SafeTensors<'_>,
    ) -> Result<(), Error> {
        self.load_safetensor(tensors, location)
    }
}

impl<E: Dtype, T> SaveSafeTensors for Tensor<E, T> {
    fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>) {
        tensors.push((
            location.to_string(),
            <E as SafeTensorsDtype>::DTYPE,
            self.shape().concrete(),
            self.as_slice().iter().flat_map(|e| e.to_le_byte_vec()).collect(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tensor::*, tests::*};

    #[test]
    fn test_save_load_tuple_file() {
        let dev: TestDevice = Default::default();
        let w: Tensor<TestDtype> = dev.tensor([[1.0, 2.0, 3.0], [-4.0, 0.5, 0.0]]);
        let b: Tensor<TestDtype> = dev.tensor([0.25, -0.25]);
        let path = std::env::temp_dir().join(format!("gradsign-core-{}.safetensors", w.id().0));
        (w.clone(), b.clone()).save_safetensors(&path).unwrap();

        let mut loaded: (Tensor<TestDtype>, Tensor<TestDtype>) = (dev.zeros([2, 3]), dev.zeros([2]));
        loaded.load_safetensors(&path).unwrap();
        assert_eq!(loaded.0.as_vec(), w.as_vec());
        assert_eq!(loaded.1.as_vec(), b.as_vec());

        let mut wrong: (Tensor<TestDtype>, Tensor<TestDtype>) = (dev.zeros([3, 2]), dev.zeros([2]));
        assert!(matches!(
            wrong.load_safetensors(&path),
            Err(Error::ShapeMismatch { .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("", "weight"), "weight");
        assert_eq!(join_key("hidden.0", "weight"), "hidden.0.weight");
    }
}
