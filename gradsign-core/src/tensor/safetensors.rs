use std::{path::Path, sync::Arc};

use memmap2::{Mmap, MmapOptions};
use safetensors::{tensor::TensorView, Dtype as StDtype, SafeTensors};

use super::{Cpu, Error, Tensor, TensorFromVec};
use crate::dtypes::Dtype;

/// A memory mapped `.safetensors` file.
///
/// ```rust,no_run
/// # use gradsign_core::prelude::*;
/// let dev: Cpu = Default::default();
/// let file = SafeTensorsFile::open("batch.safetensors").unwrap();
/// let tensors = file.tensors().unwrap();
/// let images: Tensor<f32> = load_tensor(&dev, &tensors, "images").unwrap();
/// ```
pub struct SafeTensorsFile {
    buffer: Mmap,
}

impl SafeTensorsFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let f = std::fs::File::open(path)?;
        // SAFETY: the mapping is read-only and the file is not expected to be
        // modified while it is open.
        let buffer = unsafe { MmapOptions::new().map(&f)? };
        Ok(Self { buffer })
    }

    pub fn tensors(&self) -> Result<SafeTensors<'_>, Error> {
        Ok(SafeTensors::deserialize(&self.buffer)?)
    }
}

fn decode_floats<E: Dtype>(view: &TensorView<'_>, key: &str) -> Result<Vec<E>, Error> {
    let bytes = view.data();
    let data = match view.dtype() {
        StDtype::F32 => bytes
            .chunks_exact(4)
            .map(|b| E::from_f64_lossy(f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64))
            .collect(),
        StDtype::F64 => bytes
            .chunks_exact(8)
            .map(|b| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                E::from_f64_lossy(f64::from_le_bytes(raw))
            })
            .collect(),
        dtype => {
            return Err(Error::UnsupportedDtype {
                key: key.to_string(),
                dtype,
            })
        }
    };
    Ok(data)
}

impl<E: Dtype, T> Tensor<E, T> {
    /// Loads data from the [SafeTensors] entry `key` into this tensor.
    ///
    /// The stored shape must equal this tensor's shape. `F32` and `F64`
    /// entries are accepted and converted to `E`.
    pub fn load_safetensor(&mut self, tensors: &SafeTensors<'_>, key: &str) -> Result<(), Error> {
        let view = tensors.tensor(key)?;
        if view.shape() != self.shape.dims() {
            return Err(Error::shape_mismatch(
                "load_safetensor",
                &self.shape,
                &view.shape().into(),
            ));
        }
        let data = decode_floats(&view, key)?;
        Arc::make_mut(&mut self.data).copy_from_slice(&data);
        Ok(())
    }
}

/// Reads the [SafeTensors] entry `key` into a new tensor, taking the shape
/// from the file.
pub fn load_tensor<E: Dtype>(
    dev: &Cpu,
    tensors: &SafeTensors<'_>,
    key: &str,
) -> Result<Tensor<E>, Error> {
    let view = tensors.tensor(key)?;
    let data = decode_floats(&view, key)?;
    dev.tensor_from_vec(data, view.shape())
}

/// Reads a rank 1 integer entry of class ids.
pub fn load_class_indices(tensors: &SafeTensors<'_>, key: &str) -> Result<Vec<usize>, Error> {
    let view = tensors.tensor(key)?;
    let bytes = view.data();
    let signed = |v: i64| usize::try_from(v).map_err(|_| Error::NegativeLabel(v));
    match view.dtype() {
        StDtype::U8 => Ok(bytes.iter().map(|&b| b as usize).collect()),
        StDtype::U32 => Ok(bytes
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            .collect()),
        StDtype::I32 => bytes
            .chunks_exact(4)
            .map(|b| signed(i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64))
            .collect(),
        StDtype::U64 | StDtype::I64 => {
            let is_signed = view.dtype() == StDtype::I64;
            bytes
                .chunks_exact(8)
                .map(|b| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(b);
                    if is_signed {
                        signed(i64::from_le_bytes(raw))
                    } else {
                        Ok(u64::from_le_bytes(raw) as usize)
                    }
                })
                .collect()
        }
        dtype => Err(Error::UnsupportedDtype {
            key: key.to_string(),
            dtype,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tensor::*, tests::*};

    fn serialize(entries: Vec<(&str, StDtype, Vec<usize>, Vec<u8>)>) -> Vec<u8> {
        let views: Vec<(String, TensorView<'_>)> = entries
            .iter()
            .map(|(k, dtype, shape, data)| {
                (
                    k.to_string(),
                    TensorView::new(*dtype, shape.clone(), data).unwrap(),
                )
            })
            .collect();
        let views = views.iter().map(|(k, v)| (k.clone(), v));
        ::safetensors::serialize(views, &None).unwrap()
    }

    #[test]
    fn test_load_tensor_from_f64() {
        let bytes: Vec<u8> = [0.5f64, 1.0, 0.0, 0.25]
            .iter()
            .flat_map(|x| x.to_le_bytes())
            .collect();
        let buf = serialize(vec![("images", StDtype::F64, vec![2, 2], bytes)]);
        let tensors = SafeTensors::deserialize(&buf).unwrap();
        let dev: TestDevice = Default::default();
        let t: Tensor<TestDtype> = load_tensor(&dev, &tensors, "images").unwrap();
        assert_eq!(t.shape().dims(), &[2, 2]);
        assert_eq!(t.as_vec(), [0.5, 1.0, 0.0, 0.25]);
    }

    #[test]
    fn test_load_safetensor_shape_mismatch() {
        let bytes: Vec<u8> = [1.0f32; 3].iter().flat_map(|x| x.to_le_bytes()).collect();
        let buf = serialize(vec![("w", StDtype::F32, vec![3], bytes)]);
        let tensors = SafeTensors::deserialize(&buf).unwrap();
        let dev: TestDevice = Default::default();
        let mut t: Tensor<TestDtype> = dev.zeros([4]);
        assert!(matches!(
            t.load_safetensor(&tensors, "w"),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_class_indices() {
        let buf = serialize(vec![
            ("a", StDtype::U8, vec![3], vec![7, 0, 9]),
            (
                "b",
                StDtype::I64,
                vec![2],
                [3i64, -1].iter().flat_map(|x| x.to_le_bytes()).collect(),
            ),
        ]);
        let tensors = SafeTensors::deserialize(&buf).unwrap();
        assert_eq!(load_class_indices(&tensors, "a").unwrap(), vec![7, 0, 9]);
        assert!(matches!(
            load_class_indices(&tensors, "b"),
            Err(Error::NegativeLabel(-1))
        ));
    }

    #[test]
    fn test_unsupported_dtype() {
        let buf = serialize(vec![("a", StDtype::U8, vec![1], vec![1])]);
        let tensors = SafeTensors::deserialize(&buf).unwrap();
        let dev: TestDevice = Default::default();
        let r: Result<Tensor<TestDtype>, _> = load_tensor(&dev, &tensors, "a");
        assert!(matches!(r, Err(Error::UnsupportedDtype { .. })));
    }
}
