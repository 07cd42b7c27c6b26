use super::{join_key, LoadSafeTensors, Module, SafeTensorEntry, SaveSafeTensors};
use crate::tensor::Error;

macro_rules! tuple_impls {
    ([$($name:ident),+] [$($idx:tt),+], $last:ident, [$($rev_tail:ident),*]) => {
        impl<$($name: SaveSafeTensors, )+> SaveSafeTensors for ($($name,)+) {
            fn write_safetensors(&self, location: &str, tensors: &mut Vec<SafeTensorEntry>) {
                $(
                    let name = &join_key(location, stringify!($idx));
                    self.$idx.write_safetensors(name, tensors);
                )+
            }
        }

        impl<$($name: LoadSafeTensors, )+> LoadSafeTensors for ($($name,)+) {
            fn read_safetensors(
                &mut self,
                location: &str,
                tensors: &safetensors::SafeTensors<'_>,
            ) -> Result<(), Error> {
                $(
                    let name = &join_key(location, stringify!($idx));
                    self.$idx.read_safetensors(name, tensors)?;
                )+
                Ok(())
            }
        }

        /*This macro expands like this for a 3-tuple:

        impl<
            Input,

            // `$last:`
            C:

            // `$(Module::<$rev_tail ::Output>, $rev_tail: )+`
            Module<B ::Output>, B:
            Module<A ::Output>, A:

            Module<Input>
        > Module<Input> for (A, B, C) {
            type Output = C::Output;
            fn try_forward(&self, x: Input) -> Result<Self::Output, Error> {
                let x = self.0.try_forward(x)?;
                let x = self.1.try_forward(x)?;
                let x = self.2.try_forward(x)?;
                Ok(x)
            }
        }
        */
        impl<
            Input,
            $last:
            $(Module::<$rev_tail ::Output>, $rev_tail: )*
            Module<Input>
        > Module<Input> for ($($name,)+) {
            type Output = $last ::Output;

            /// Calls forward sequentially on each module in the tuple.
            fn try_forward(&self, x: Input) -> Result<Self::Output, Error> {
                $(let x = self.$idx.try_forward(x)?;)+
                Ok(x)
            }

            /// Calls forward sequentially on each module in the tuple.
            fn try_forward_mut(&mut self, x: Input) -> Result<Self::Output, Error> {
                $(let x = self.$idx.try_forward_mut(x)?;)+
                Ok(x)
            }
        }
    };
}

tuple_impls!([M1][0], M1, []);
tuple_impls!([M1, M2] [0, 1], M2, [M1]);
tuple_impls!([M1, M2, M3] [0, 1, 2], M3, [M2, M1]);
tuple_impls!([M1, M2, M3, M4] [0, 1, 2, 3], M4, [M3, M2, M1]);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Add(usize);

    impl Module<usize> for Add {
        type Output = usize;
        fn try_forward(&self, x: usize) -> Result<Self::Output, Error> {
            Ok(x + self.0)
        }
    }

    #[derive(Debug, Default)]
    struct Double;

    impl Module<usize> for Double {
        type Output = usize;
        fn try_forward(&self, x: usize) -> Result<Self::Output, Error> {
            Ok(2 * x)
        }
    }

    #[test]
    fn test_tuple_runs_in_order() {
        assert_eq!((Add(1),).forward(1), 2);
        assert_eq!((Add(1), Double).forward(1), 4);
        assert_eq!((Double, Add(1)).forward(1), 3);
        assert_eq!((Double, Add(1), Double, Add(3)).forward(1), 9);
    }
}
