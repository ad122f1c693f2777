//! Framed reader.
//!
//! Mirrors [`Encoder`](super::Encoder): each block is read whole, its header
//! validated and its checksum verified before any payload byte is handed
//! out. Header and checksum failures are corruption errors.

use std::io::{self, Read};

use tracing::debug;

use crate::config::Options;
use crate::error::{DecodeError, Error, Result};
use crate::limits::{HEADER_LEN, MAX_PAYLOAD};
use crate::metadata::{ClassInfo, Registry};
use crate::model::{BigDecimal, BigInteger, DataType};

use super::frame::BlockHeader;
use super::tags::{self, sub, tag_to_string};

/// Reads tagged values from framed blocks.
pub struct Decoder<R: Read> {
    source: R,
    buf: Box<[u8]>,
    pos: usize,
    limit: usize,
    version: u8,
    blocks: usize,
    max_string_len: usize,
    max_binary_len: usize,
    max_collection_len: usize,
}

/// Fills `buf` from `source`, returning how many bytes were read before EOF.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn unexpected(expected: &'static str, tag: u8) -> Error {
    DecodeError::UnexpectedTag {
        expected,
        found: tag_to_string(tag),
    }
    .into()
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder with default limits.
    pub fn new(source: R) -> Self {
        Self::with_options(source, &Options::default())
    }

    /// Creates a decoder using the length limits of `options`.
    pub fn with_options(source: R, options: &Options) -> Self {
        Self {
            source,
            buf: vec![0u8; MAX_PAYLOAD].into_boxed_slice(),
            pos: 0,
            limit: 0,
            version: 0,
            blocks: 0,
            max_string_len: options.max_string_len,
            max_binary_len: options.max_binary_len,
            max_collection_len: options.max_collection_len,
        }
    }

    /// Format version of the most recently read block, 0 before the first.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the number of blocks read so far.
    pub fn blocks_read(&self) -> usize {
        self.blocks
    }

    /// Returns the source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Returns true if the stream holds no further values.
    pub fn at_end(&mut self) -> Result<bool> {
        while self.pos == self.limit {
            if !self.next_block()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Reads the next block. Returns false on a clean end of stream.
    fn next_block(&mut self) -> Result<bool> {
        let mut raw = [0u8; HEADER_LEN];
        let n = read_full(&mut self.source, &mut raw)?;
        if n == 0 {
            return Ok(false);
        }
        if n < HEADER_LEN {
            return Err(DecodeError::ShortBlock {
                expected: HEADER_LEN,
                actual: n,
            }
            .into());
        }
        let header = BlockHeader::parse(&raw)?;
        let len = header.length as usize;
        let n = read_full(&mut self.source, &mut self.buf[..len])?;
        if n < len {
            return Err(DecodeError::ShortBlock {
                expected: len,
                actual: n,
            }
            .into());
        }
        header.verify(&self.buf[..len])?;
        debug!(length = len, version = header.version, block = self.blocks, "read block");
        self.pos = 0;
        self.limit = len;
        self.version = header.version;
        self.blocks += 1;
        Ok(true)
    }

    /// Ensures `n` contiguous bytes are available, reading a block if the
    /// current one is exhausted.
    fn require(&mut self, n: usize) -> Result<()> {
        while self.pos == self.limit {
            if !self.next_block()? {
                return Err(DecodeError::UnexpectedEof.into());
            }
        }
        let available = self.limit - self.pos;
        if available < n {
            return Err(DecodeError::UnexpectedEndOfBlock {
                needed: n,
                available,
            }
            .into());
        }
        Ok(())
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.require(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Reads a raw byte run, spanning blocks as needed.
    fn take_run(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(MAX_PAYLOAD));
        while out.len() < len {
            self.require(1)?;
            let n = (len - out.len()).min(self.limit - self.pos);
            out.extend_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
        }
        Ok(out)
    }

    /// Returns the next tag without consuming it.
    pub fn peek_tag(&mut self) -> Result<u8> {
        self.require(1)?;
        Ok(self.buf[self.pos])
    }

    /// Consumes and returns the next tag.
    pub fn read_tag(&mut self) -> Result<u8> {
        let [tag] = self.take::<1>()?;
        Ok(tag)
    }

    /// Consumes a NULL tag if one is next.
    pub fn skip_null(&mut self) -> Result<bool> {
        if self.peek_tag()? == tags::NULL {
            self.pos += 1;
            return Ok(true);
        }
        Ok(false)
    }

    // =========================================================================
    // SCALARS
    // =========================================================================

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_tag()? {
            tags::TRUE => Ok(true),
            tags::FALSE => Ok(false),
            tag => Err(unexpected("boolean", tag)),
        }
    }

    /// Reads an integer whose tag is at most `widest` (an extended sub-type).
    fn read_integer(&mut self, widest: u8, target: &'static str) -> Result<i64> {
        let tag = self.read_tag()?;
        if let Some(v) = tags::small_int_value(tag) {
            return Ok(v);
        }
        let (width, value) = match tag {
            tags::INT16 => (sub::INT16, i16::from_be_bytes(self.take()?) as i64),
            tags::INT32 => (sub::INT32, i32::from_be_bytes(self.take()?) as i64),
            tags::INT64 => (sub::INT64, i64::from_be_bytes(self.take()?)),
            _ => return Err(unexpected(target, tag)),
        };
        if width > widest {
            return Err(DecodeError::Narrowing {
                value: value.to_string(),
                target,
            }
            .into());
        }
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        let v = self.read_integer(sub::INT16, "byte")?;
        i8::try_from(v).map_err(|_| {
            DecodeError::Narrowing {
                value: v.to_string(),
                target: "byte",
            }
            .into()
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_integer(sub::INT16, "short")? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_integer(sub::INT32, "integer")? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_integer(sub::INT64, "long")
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        match self.read_tag()? {
            tags::FLOAT32 => Ok(f32::from_bits(u32::from_be_bytes(self.take()?))),
            tags::FLOAT64 => {
                let v = f64::from_bits(u64::from_be_bytes(self.take()?));
                Err(DecodeError::Narrowing {
                    value: v.to_string(),
                    target: "float",
                }
                .into())
            }
            tag => Err(unexpected("float", tag)),
        }
    }

    /// Reads a double, widening FLOAT32.
    pub fn read_f64(&mut self) -> Result<f64> {
        match self.read_tag()? {
            tags::FLOAT32 => Ok(f32::from_bits(u32::from_be_bytes(self.take()?)) as f64),
            tags::FLOAT64 => Ok(f64::from_bits(u64::from_be_bytes(self.take()?))),
            tag => Err(unexpected("double", tag)),
        }
    }

    pub fn read_char(&mut self) -> Result<char> {
        let code = self.read_integer(sub::INT32, "character")? as i32;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| DecodeError::InvalidChar { code }.into())
    }

    /// Reads a non-negative length bounded by `max`.
    fn read_len(&mut self, field: &'static str, max: usize) -> Result<usize> {
        let len = self.read_integer(sub::INT32, field)? as i32;
        if len < 0 {
            return Err(DecodeError::NegativeLength { field, len }.into());
        }
        let len = len as usize;
        if len > max {
            return Err(DecodeError::LengthExceedsLimit { field, len, max }.into());
        }
        Ok(len)
    }

    /// Reads a string, or None for NULL.
    pub fn read_string(&mut self) -> Result<Option<String>> {
        let tag = self.read_tag()?;
        let len = match tag {
            tags::NULL => return Ok(None),
            tags::STRING => self.read_len("string", self.max_string_len)?,
            _ => match tags::short_string_len(tag) {
                Some(len) => len,
                None => return Err(unexpected("string", tag)),
            },
        };
        let bytes = self.take_run(len)?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| DecodeError::InvalidUtf8 { field: "string" }.into())
    }

    /// Reads a string that must be present.
    pub fn read_required_string(&mut self) -> Result<String> {
        match self.read_string()? {
            Some(s) => Ok(s),
            None => Err(unexpected("string", tags::NULL)),
        }
    }

    /// Reads a binary blob, or None for NULL.
    pub fn read_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        match self.read_tag()? {
            tags::NULL => Ok(None),
            tags::BINARY => {
                let len = self.read_len("binary", self.max_binary_len)?;
                self.take_run(len).map(Some)
            }
            tag => Err(unexpected("binary", tag)),
        }
    }

    pub fn read_big_integer(&mut self) -> Result<BigInteger> {
        match self.read_bytes()? {
            Some(bytes) => Ok(BigInteger::from_be_bytes(&bytes)),
            None => Err(unexpected("big integer", tags::NULL)),
        }
    }

    pub fn read_big_decimal(&mut self) -> Result<BigDecimal> {
        let scale = self.read_i32()?;
        let precision = self.read_i32()?;
        let unscaled = self.read_big_integer()?;
        Ok(BigDecimal {
            unscaled,
            scale,
            precision,
        })
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Reads an enumeration reference: type identifier and ordinal.
    pub fn read_enum(&mut self) -> Result<(i16, u32)> {
        match self.read_tag()? {
            tags::ENUM => {
                let identifier = i16::from_be_bytes(self.take()?);
                let ordinal = self.read_i64()?;
                let ordinal = u32::try_from(ordinal).map_err(|_| DecodeError::Narrowing {
                    value: ordinal.to_string(),
                    target: "ordinal",
                })?;
                Ok((identifier, ordinal))
            }
            tag => Err(unexpected("enum", tag)),
        }
    }

    /// Reads the `[OBJECT][identifier]` pair, returning the identifier.
    pub fn read_object_header(&mut self) -> Result<i16> {
        match self.read_tag()? {
            tags::OBJECT => Ok(i16::from_be_bytes(self.take()?)),
            tag => Err(unexpected("object", tag)),
        }
    }

    /// Reads a bare data type id.
    pub fn read_data_type(&mut self) -> Result<DataType> {
        let [id] = self.take::<1>()?;
        DataType::from_u8(id).ok_or_else(|| DecodeError::UnknownDataType { id }.into())
    }

    /// Reads a TYPED announcement, returning the boxed value's data type.
    pub fn read_typed(&mut self) -> Result<DataType> {
        match self.read_tag()? {
            tags::TYPED => self.read_data_type(),
            tag => Err(unexpected("typed value", tag)),
        }
    }

    /// Reads a collection header, returning the kind and element count.
    pub fn read_collection_header(&mut self) -> Result<(DataType, usize)> {
        match self.read_tag()? {
            tags::COLLECTION => {
                let kind = self.read_data_type()?;
                let count = self.read_len("collection", self.max_collection_len)?;
                Ok((kind, count))
            }
            tag => Err(unexpected("collection", tag)),
        }
    }

    /// Reads a map header, returning the kind and entry count.
    pub fn read_map_header(&mut self) -> Result<(DataType, usize)> {
        match self.read_tag()? {
            tags::MAP => {
                let kind = self.read_data_type()?;
                let count = self.read_len("map", self.max_collection_len)?;
                Ok((kind, count))
            }
            tag => Err(unexpected("map", tag)),
        }
    }

    /// Reads class metadata, either inline or by signature via `registry`.
    pub fn read_class(&mut self, registry: &dyn Registry) -> Result<ClassInfo> {
        match self.read_tag()? {
            tags::CLASS_INFO => ClassInfo::decode_from(self),
            tags::CLASS_SIGNATURE => {
                let signature = self.read_required_string()?;
                debug!(%signature, registry = registry.name(), "loading class by signature");
                Ok(registry.load(&signature)?)
            }
            tag => Err(unexpected("class header", tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encoder;
    use crate::error::ErrorCode;
    use crate::limits::CHUNK_SIZE;

    fn encode(f: impl FnOnce(&mut Encoder<Vec<u8>>)) -> Vec<u8> {
        let mut enc = Encoder::new(Vec::new());
        f(&mut enc);
        enc.finish().unwrap()
    }

    #[test]
    fn test_minus_one_then_int_max() {
        let bytes = encode(|e| {
            e.write_i32(-1).unwrap();
            e.write_i32(i32::MAX).unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_i32().unwrap(), -1);
        assert_eq!(dec.read_i32().unwrap(), i32::MAX);
        assert!(dec.at_end().unwrap());
        assert_eq!(dec.version(), 1);
    }

    #[test]
    fn test_widening_and_narrowing() {
        let bytes = encode(|e| {
            e.write_i16(300).unwrap();
            e.write_i64(i64::MAX).unwrap();
            e.write_i16(-100).unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_i64().unwrap(), 300);
        let err = dec.read_i32().unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Narrowing { target: "integer", .. })));
        assert_eq!(dec.read_i8().unwrap(), -100);
    }

    #[test]
    fn test_byte_range_checked() {
        let bytes = encode(|e| e.write_i16(200).unwrap());
        let mut dec = Decoder::new(bytes.as_slice());
        assert!(matches!(
            dec.read_i8(),
            Err(Error::Decode(DecodeError::Narrowing { target: "byte", .. }))
        ));
    }

    #[test]
    fn test_float_reads() {
        let bytes = encode(|e| {
            e.write_f32(2.5).unwrap();
            e.write_f64(0.1).unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_f64().unwrap(), 2.5);
        assert!(dec.read_f32().is_err());
    }

    #[test]
    fn test_strings_and_nulls() {
        let long = "é".repeat(100);
        let bytes = encode(|e| {
            e.write_str("").unwrap();
            e.write_null().unwrap();
            e.write_str(&long).unwrap();
            e.write_char('∑').unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_string().unwrap().as_deref(), Some(""));
        assert_eq!(dec.peek_tag().unwrap(), tags::NULL);
        assert_eq!(dec.read_string().unwrap(), None);
        assert_eq!(dec.read_string().unwrap(), Some(long));
        assert_eq!(dec.read_char().unwrap(), '∑');
    }

    #[test]
    fn test_wrong_tag() {
        let bytes = encode(|e| e.write_str("x").unwrap());
        let mut dec = Decoder::new(bytes.as_slice());
        let err = dec.read_bool().unwrap_err();
        assert_eq!(err.code(), ErrorCode::Decoder);
        assert!(err.to_string().contains("short string"));
    }

    #[test]
    fn test_blob_across_blocks() {
        let blob: Vec<u8> = (0..CHUNK_SIZE * 3).map(|i| i as u8).collect();
        let bytes = encode(|e| {
            e.write_bytes(&blob).unwrap();
            e.write_bool(true).unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_bytes().unwrap(), Some(blob));
        assert!(dec.read_bool().unwrap());
        assert_eq!(dec.blocks_read(), 4);
    }

    #[test]
    fn test_flipped_payload_byte_is_corruption() {
        let mut bytes = encode(|e| e.write_str("hello world").unwrap());
        bytes[HEADER_LEN + 3] ^= 0x01;
        let mut dec = Decoder::new(bytes.as_slice());
        let err = dec.read_string().unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = encode(|e| e.write_str("hello world").unwrap());
        let mut dec = Decoder::new(&bytes[..bytes.len() - 2]);
        assert!(matches!(
            dec.read_string(),
            Err(Error::Decode(DecodeError::ShortBlock { .. }))
        ));

        let mut dec = Decoder::new(&bytes[..5]);
        assert!(matches!(
            dec.peek_tag(),
            Err(Error::Decode(DecodeError::ShortBlock { expected: HEADER_LEN, actual: 5 }))
        ));

        let mut dec = Decoder::new(&[0u8; 0][..]);
        assert!(matches!(dec.read_tag(), Err(Error::Decode(DecodeError::UnexpectedEof))));
    }

    #[test]
    fn test_length_limit() {
        let bytes = encode(|e| e.write_str(&"x".repeat(64)).unwrap());
        let options = Options::default().max_string_len(10);
        let mut dec = Decoder::with_options(bytes.as_slice(), &options);
        assert!(matches!(
            dec.read_string(),
            Err(Error::Decode(DecodeError::LengthExceedsLimit { field: "string", len: 64, max: 10 }))
        ));
    }

    #[test]
    fn test_structure_headers() {
        let bytes = encode(|e| {
            e.write_enum(150, 2).unwrap();
            e.write_object_header(101).unwrap();
            e.write_typed(DataType::Long).unwrap();
            e.write_collection_header(DataType::SortedSet, 3).unwrap();
            e.write_map_header(DataType::Map, 0).unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_enum().unwrap(), (150, 2));
        assert_eq!(dec.read_object_header().unwrap(), 101);
        assert_eq!(dec.read_typed().unwrap(), DataType::Long);
        assert_eq!(dec.read_collection_header().unwrap(), (DataType::SortedSet, 3));
        assert_eq!(dec.read_map_header().unwrap(), (DataType::Map, 0));
    }

    #[test]
    fn test_unassigned_collection_kind() {
        let payload = [tags::COLLECTION, 23, 0x00];
        let mut bytes = BlockHeader::for_payload(&payload).to_bytes().to_vec();
        bytes.extend_from_slice(&payload);
        let mut dec = Decoder::new(bytes.as_slice());
        let err = dec.read_collection_header().unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnknownDataType { id: 23 })
        ));
    }

    #[test]
    fn test_big_numbers() {
        let big = BigInteger::from(i128::MIN);
        let dec_value = BigDecimal::new(-123_456_789i64, 4);
        let bytes = encode(|e| {
            e.write_big_integer(&big).unwrap();
            e.write_big_decimal(&dec_value).unwrap();
        });
        let mut dec = Decoder::new(bytes.as_slice());
        assert_eq!(dec.read_big_integer().unwrap(), big);
        assert_eq!(dec.read_big_decimal().unwrap(), dec_value);
    }
}
