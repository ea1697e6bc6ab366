use serde::{Deserialize, Serialize};
use shrinkwraprs::Shrinkwrap;

macro_rules! impl_string_newtype {
    (pub struct $outer:ident(String)) => {
        #[derive(
            Debug,
            Clone,
            Serialize,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Deserialize,
            Shrinkwrap,
        )]
        #[serde(transparent)]
        pub struct $outer(pub String);

        impl $outer {
            pub fn new(value: impl ToString) -> Self {
                Self(value.to_string())
            }
        }

        impl std::fmt::Display for $outer {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $outer {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }
    };
}

impl_string_newtype!(pub struct NetworkName(String));
impl_string_newtype!(pub struct CompilerVersion(String));
