//! Binary encoding and decoding.
//!
//! - [`tags`]: tag byte layout and classification
//! - [`frame`]: block header and checksum
//! - [`Encoder`] / [`Decoder`]: framed, tagged value I/O
//!
//! Date and time encodings extend both in the `time` module.

mod decoder;
mod encoder;
pub mod frame;
pub mod tags;
mod time;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use frame::{checksum, BlockHeader};
