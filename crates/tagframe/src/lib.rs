//! tagframe: compact tagged binary object serialization.
//!
//! This crate writes graphs of records into a self-describing binary stream
//! and reads them back, tolerating added, removed and renamed fields between
//! the writing and reading versions of a type.
//!
//! # Overview
//!
//! - **Tagged values**: every value starts with a one-byte tag; small
//!   integers, booleans, null and short strings fit entirely in the tag
//! - **Framed blocks**: the stream is cut into blocks of at most 16 KiB,
//!   each with a magic number, length, checksum and format version
//! - **Class metadata**: the field list of each type is written once per
//!   stream, inline or as a signature resolved through a [`Registry`]
//!
//! # Quick Start
//!
//! ```rust
//! use tagframe::{record, Context};
//!
//! record! {
//!     #[derive(Debug, Clone, Default, PartialEq)]
//!     pub struct Person {
//!         pub name: String,
//!         pub age: i32,
//!         pub email: Option<String>,
//!     }
//! }
//!
//! let ctx = Context::new();
//! ctx.register::<Person>(100).unwrap();
//!
//! let alice = Person {
//!     name: "Alice".to_string(),
//!     age: 30,
//!     email: None,
//! };
//! let bytes = ctx.to_bytes(&alice).unwrap();
//! let decoded: Person = ctx.from_bytes(&bytes).unwrap();
//! assert_eq!(alice, decoded);
//! ```
//!
//! # Modules
//!
//! - [`model`]: data types, dynamic values and the record traits
//! - [`codec`]: tags, block framing and the value encoder/decoder
//! - [`metadata`]: class metadata, type identifiers and registries
//! - [`engine`]: the serialization context and per-stream sessions
//! - [`config`]: identifier window and decoding limits
//! - [`error`]: error types
//! - [`limits`]: wire constants and default limits
//!
//! # Security
//!
//! Decoding untrusted input is bounded: string, binary and collection
//! lengths are checked against [`Options`] before allocation, nesting depth
//! is capped, and every block is verified against its checksum.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod limits;
pub mod metadata;
pub mod model;

// Re-export commonly used types at crate root
pub use codec::{Decoder, Encoder};
pub use config::Options;
pub use engine::{Context, Deserializer, Serializer};
pub use error::{DecodeError, Error, ErrorCode, MetadataError, Result, SerializeError};
pub use metadata::{
    CachingRegistry, ClassInfo, FieldInfo, MemoryBackend, MemoryRegistry,
    NullRegistry, Registry, RegistryBackend,
};
pub use model::{
    BigDecimal, BigInteger, Blob, DataType, EnumValue, Enumeration, FieldDef, FieldValue, Period,
    Record, RecordType, Value, ZoneId, ZonedDateTime,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Wire format version written into every block header.
pub const FORMAT_VERSION: u8 = limits::FORMAT_VERSION;
