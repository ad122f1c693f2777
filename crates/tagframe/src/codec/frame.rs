//! Block header layout and checksum.
//!
//! ```text
//! [magic: 4][length: u16][checksum: i32][version: u8][payload: length]
//! ```
//!
//! All header integers are big-endian.

use crate::error::DecodeError;
use crate::limits::{FORMAT_VERSION, HEADER_LEN, MAGIC, MAX_PAYLOAD, MIN_FORMAT_VERSION};

/// Rolling multiplicative hash over the payload bytes.
///
/// Bytes are treated as signed, and arithmetic wraps.
pub fn checksum(payload: &[u8]) -> i32 {
    payload
        .iter()
        .fold(1i32, |h, b| h.wrapping_mul(31).wrapping_add(*b as i8 as i32))
}

/// A decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub length: u16,
    pub checksum: i32,
    pub version: u8,
}

impl BlockHeader {
    /// Builds the header for `payload`.
    pub fn for_payload(payload: &[u8]) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self {
            length: payload.len() as u16,
            checksum: checksum(payload),
            version: FORMAT_VERSION,
        }
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&MAGIC);
        out[4..6].copy_from_slice(&self.length.to_be_bytes());
        out[6..10].copy_from_slice(&self.checksum.to_be_bytes());
        out[10] = self.version;
        out
    }

    /// Parses and validates a header.
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Result<Self, DecodeError> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != MAGIC {
            return Err(DecodeError::InvalidMagic { found: magic });
        }
        let header = Self {
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            checksum: i32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            version: bytes[10],
        };
        if !(MIN_FORMAT_VERSION..=FORMAT_VERSION).contains(&header.version) {
            return Err(DecodeError::UnsupportedVersion {
                version: header.version,
            });
        }
        if header.length as usize > MAX_PAYLOAD {
            return Err(DecodeError::LengthExceedsLimit {
                field: "block",
                len: header.length as usize,
                max: MAX_PAYLOAD,
            });
        }
        Ok(header)
    }

    /// Verifies `payload` against the stored checksum.
    pub fn verify(&self, payload: &[u8]) -> Result<(), DecodeError> {
        let computed = checksum(payload);
        if computed != self.checksum {
            return Err(DecodeError::ChecksumMismatch {
                stored: self.checksum,
                computed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_values() {
        assert_eq!(checksum(&[]), 1);
        assert_eq!(checksum(&[1]), 32);
        // 0xFF is -1 as a signed byte.
        assert_eq!(checksum(&[0xFF]), 30);
        assert_eq!(checksum(&[1, 2]), 32 * 31 + 2);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = BlockHeader::for_payload(b"hello");
        let parsed = BlockHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        parsed.verify(b"hello").unwrap();
        assert!(matches!(
            parsed.verify(b"hellp"),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut bytes = BlockHeader::for_payload(b"x").to_bytes();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            BlockHeader::parse(&bytes),
            Err(DecodeError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_header_rejects_future_version() {
        let mut bytes = BlockHeader::for_payload(b"x").to_bytes();
        bytes[10] = FORMAT_VERSION + 1;
        assert_eq!(
            BlockHeader::parse(&bytes),
            Err(DecodeError::UnsupportedVersion {
                version: FORMAT_VERSION + 1
            })
        );
    }
}
