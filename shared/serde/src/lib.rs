//! # Metavoxel Serde
//! Bit-packed serialization with support for differential (delta) encoding
//! against a previously agreed value.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod bit_counter;
mod bit_reader;
mod bit_writer;
mod constants;
mod delta;
mod error;
mod impls;
mod integer;
mod serde;
mod shared_object;
mod stream_writer;

pub use bit_counter::BitCounter;
pub use bit_reader::BitReader;
pub use bit_writer::{BitWrite, BitWriter};
pub use constants::{MTU_SIZE_BITS, MTU_SIZE_BYTES};
pub use delta::DeltaSerde;
pub use error::SerdeErr;
pub use integer::{IntegerRangeError, UnsignedInteger, UnsignedVariableInteger};
pub use serde::{ConstBitLength, Serde};
pub use shared_object::{SharedObjectReader, SharedObjectWriter};
pub use stream_writer::StreamWriter;
