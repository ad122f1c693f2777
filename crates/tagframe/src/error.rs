//! Error types for encoding, decoding, metadata and the serialization engine.

use thiserror::Error;

use crate::model::DataType;

/// Coarse error classes.
///
/// Every error in this crate maps to exactly one class. Callers that only
/// care whether a stream is trustworthy can match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed or unexpected tag, truncated frame, bad payload.
    Decoder,
    /// Block header or checksum mismatch; the stream cannot be trusted.
    Corruption,
    /// Type registration or field metadata problem.
    Metadata,
    /// Metadata registry could not produce the requested class information.
    MetadataUnavailable,
    /// Engine and metadata disagree (unhandled kind, bad field access).
    Serializer,
    /// Underlying sink or source failed.
    Io,
}

impl ErrorCode {
    /// Returns a short stable code string.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::Decoder => "D001",
            ErrorCode::Corruption => "D002",
            ErrorCode::Metadata => "M001",
            ErrorCode::MetadataUnavailable => "M002",
            ErrorCode::Serializer => "S001",
            ErrorCode::Io => "IO01",
        }
    }
}

/// Error while reading the wire format.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === Corruption ===
    #[error("[D002] invalid block signature: found {found:02x?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("[D002] short block: expected {expected} bytes, read {actual}")]
    ShortBlock { expected: usize, actual: usize },

    #[error("[D002] block checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: i32, computed: i32 },

    #[error("[D002] unsupported format version: {version}")]
    UnsupportedVersion { version: u8 },

    // === Decoder ===
    #[error("[D001] cannot decode {expected}, found tag {found}")]
    UnexpectedTag { expected: &'static str, found: String },

    #[error("[D001] value {value} does not fit in {target}")]
    Narrowing { value: String, target: &'static str },

    #[error("[D001] unexpected end of block while reading {needed} bytes ({available} left)")]
    UnexpectedEndOfBlock { needed: usize, available: usize },

    #[error("[D001] unexpected end of stream")]
    UnexpectedEof,

    #[error("[D001] invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("[D001] invalid character code point {code}")]
    InvalidChar { code: i32 },

    #[error("[D001] unknown data type id {id}")]
    UnknownDataType { id: u8 },

    #[error("[D001] negative length {len} for {field}")]
    NegativeLength { field: &'static str, len: i32 },

    #[error("[D001] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("[D001] nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },

    #[error("[D001] invalid {kind} value")]
    InvalidTime { kind: &'static str },
}

impl DecodeError {
    /// Returns the error class.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::InvalidMagic { .. }
            | DecodeError::ShortBlock { .. }
            | DecodeError::ChecksumMismatch { .. }
            | DecodeError::UnsupportedVersion { .. }
            | DecodeError::LengthExceedsLimit { field: "block", .. } => ErrorCode::Corruption,
            _ => ErrorCode::Decoder,
        }
    }
}

/// Error in type registration or class metadata.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetadataError {
    #[error("[M001] identifier {identifier} is outside [{min}, {max})")]
    IdentifierOutOfRange { identifier: i32, min: i16, max: i16 },

    #[error("[M001] identifier {identifier} already bound to '{existing}', cannot bind '{requested}'")]
    IdentifierConflict {
        identifier: i16,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("[M001] type '{name}' already registered with identifier {identifier}")]
    AlreadyRegistered { name: &'static str, identifier: i16 },

    #[error("[M001] type '{name}' is not registered")]
    UnregisteredType { name: String },

    #[error("[M001] identifier {identifier} is not registered")]
    UnknownIdentifier { identifier: i16 },

    #[error("[M001] identifier {identifier} is registered as '{name}', which is not {expected}")]
    WrongKind {
        identifier: i16,
        name: &'static str,
        expected: &'static str,
    },

    #[error("[M001] field '{field}' is declared twice in '{class}'")]
    DuplicateField { class: String, field: String },

    #[error("[M001] tag {tag} is declared twice in '{class}'")]
    DuplicateTag { class: String, tag: i16 },

    #[error("[M001] type '{name}' has no no-argument constructor")]
    MissingConstructor { name: &'static str },

    #[error("[M002] metadata not available from registry '{registry}': {reason}")]
    Unavailable { registry: String, reason: String },
}

impl MetadataError {
    /// Returns the error class.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetadataError::Unavailable { .. } => ErrorCode::MetadataUnavailable,
            _ => ErrorCode::Metadata,
        }
    }
}

/// Error raised when the engine cannot map values to or from fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SerializeError {
    #[error("[S001] unhandled data type {data_type:?}")]
    UnhandledDataType { data_type: DataType },

    #[error("[S001] field '{field}' is not accessible on '{class}'")]
    FieldAccess { class: String, field: String },

    #[error("[S001] expected {expected:?} value, found {found}")]
    TypeMismatch { expected: DataType, found: String },

    #[error("[S001] value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("[S001] ordinal {ordinal} is not a variant of '{name}'")]
    InvalidOrdinal { name: &'static str, ordinal: u32 },

    #[error("[S001] decoded '{found}' where '{expected}' was requested")]
    RootMismatch { expected: &'static str, found: String },

    #[error("[S001] object graph nesting exceeds maximum depth {max}")]
    DepthExceeded { max: usize },
}

/// Top-level error for serialize/deserialize calls.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error("[IO01] {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the error class.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Decode(e) => e.code(),
            Error::Metadata(e) => e.code(),
            Error::Serialize(_) => ErrorCode::Serializer,
            Error::Io(_) => ErrorCode::Io,
        }
    }

    /// Returns true if the stream itself is corrupt.
    pub fn is_corruption(&self) -> bool {
        self.code() == ErrorCode::Corruption
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: Error = DecodeError::ChecksumMismatch { stored: 1, computed: 2 }.into();
        assert_eq!(err.code(), ErrorCode::Corruption);
        assert!(err.is_corruption());

        let err: Error = DecodeError::UnexpectedEof.into();
        assert_eq!(err.code(), ErrorCode::Decoder);

        let err: Error = MetadataError::Unavailable {
            registry: "memory".to_string(),
            reason: "down".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::MetadataUnavailable);
        assert_eq!(err.code().code(), "M002");
    }

    #[test]
    fn test_display_contains_code() {
        let err = DecodeError::UnexpectedTag {
            expected: "boolean",
            found: "small positive integer".to_string(),
        };
        assert!(err.to_string().starts_with("[D001]"));
    }
}
