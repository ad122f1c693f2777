//! Wire constants and default decoding limits.
//!
//! The block constants define the framing format and must match between
//! writer and reader. The `DEFAULT_*` values seed [`crate::Options`].

use std::time::Duration;

/// Size of the in-memory chunk buffer, header included.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Size of a block header: 4 magic + 2 length + 4 checksum + 1 version.
pub const HEADER_LEN: usize = 11;

/// Largest payload carried by one block.
pub const MAX_PAYLOAD: usize = CHUNK_SIZE - HEADER_LEN;

/// Block signature.
pub const MAGIC: [u8; 4] = [0xA8, 0x75, 0xE7, 0x23];

/// Current format version written in every block header.
pub const FORMAT_VERSION: u8 = 1;

/// Oldest format version this crate can read.
pub const MIN_FORMAT_VERSION: u8 = 1;

/// Lowest valid type identifier (inclusive).
pub const DEFAULT_MIN_IDENTIFIER: i16 = 100;

/// Upper bound for type identifiers (exclusive).
pub const DEFAULT_MAX_IDENTIFIER: i16 = 20_000;

/// Maximum nesting of objects and collections.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Maximum UTF-8 length of a single string.
pub const DEFAULT_MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Maximum length of a binary blob.
pub const DEFAULT_MAX_BINARY_LEN: usize = 64 * 1024 * 1024;

/// Maximum element count of a collection or map.
pub const DEFAULT_MAX_COLLECTION_LEN: usize = 16 * 1024 * 1024;

/// How long a registry availability probe result is trusted.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5_000);
