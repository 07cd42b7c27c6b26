use super::{join_key, LoadSafeTensors, Module, SafeTensorEntry, SaveSafeTensors};
use crate::tensor::Error;

impl<T: SaveSafeTensors> SaveSafeTensors for Vec<T> {
    fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>) {
        for (i, t) in self.iter().enumerate() {
            let name = &join_key(location, &i.to_string());
            t.write_safetensors(name, tensors);
        }
    }
}

impl<T: LoadSafeTensors> LoadSafeTensors for Vec<T> {
    fn read_safetensors(
        &mut self,
        location: &str,
        tensors: &safetensors::SafeTensors<'_>,
    ) -> Result<(), Error> {
        for (i, t) in self.iter_mut().enumerate() {
            let name = &join_key(location, &i.to_string());
            t.read_safetensors(name, tensors)?;
        }
        Ok(())
    }
}

/// Calls forward on each module in order. Every module must map `Input` to
/// `Input`.
impl<Input, T: Module<Input, Output = Input>> Module<Input> for Vec<T> {
    type Output = T::Output;

    fn try_forward(&self, mut x: Input) -> Result<Self::Output, Error> {
        for m_i in self.iter() {
            x = m_i.try_forward(x)?;
        }
        Ok(x)
    }

    fn try_forward_mut(&mut self, mut x: Input) -> Result<Self::Output, Error> {
        for m_i in self.iter_mut() {
            x = m_i.try_forward_mut(x)?;
        }
        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scale(i64);

    impl Module<i64> for Scale {
        type Output = i64;
        fn try_forward(&self, x: i64) -> Result<Self::Output, Error> {
            Ok(x * self.0)
        }
    }

    #[test]
    fn test_vec_forward() {
        let empty: Vec<Scale> = Vec::new();
        assert_eq!(empty.forward(5), 5);
        assert_eq!(vec![Scale(2), Scale(-3)].forward(5), -30);
    }
}
