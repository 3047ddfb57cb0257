//! Binary resource I/O (little-endian).

mod binary;

pub use binary::{BinaryReader, BinaryWriter};
