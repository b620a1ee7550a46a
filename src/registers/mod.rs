//! Register definitions for the SX1276 radio
//! Generated from the SX1276/77/78/79 datasheet, rev. 7

/// Implements the byte conversions for registers holding a single plain byte.
macro_rules! byte_register {
    ($($name:ident),* $(,)?) => {
        $(
            impl regiface::FromByteArray for $name {
                type Error = core::convert::Infallible;
                type Array = [u8; 1];

                fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
                    Ok(Self { value: bytes[0] })
                }
            }

            impl regiface::ToByteArray for $name {
                type Error = core::convert::Infallible;
                type Array = [u8; 1];

                fn to_bytes(self) -> Result<Self::Array, Self::Error> {
                    Ok([self.value])
                }
            }
        )*
    };
}

pub mod common;
pub mod lora;

pub use common::*;
pub use lora::*;
