//! Framed writer.
//!
//! Bytes accumulate in a fixed-size chunk whose first [`HEADER_LEN`] bytes
//! are reserved for the block header. When a write does not fit in the
//! remaining space the chunk is sealed and handed to the sink.
//!
//! Fixed-width values (a tag with its payload) never straddle two blocks.
//! Raw byte runs from strings and blobs do.

use std::io::{self, Write};

use tracing::debug;

use crate::limits::{CHUNK_SIZE, HEADER_LEN};
use crate::metadata::{ClassInfo, Registry};
use crate::model::{BigDecimal, BigInteger, DataType};

use super::frame::BlockHeader;
use super::tags;

/// Writes tagged values into framed blocks.
pub struct Encoder<W: Write> {
    sink: W,
    buf: Box<[u8]>,
    pos: usize,
    blocks: usize,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder writing to `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buf: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            pos: HEADER_LEN,
            blocks: 0,
        }
    }

    /// Returns the number of blocks handed to the sink so far.
    pub fn blocks_written(&self) -> usize {
        self.blocks
    }

    /// Returns the number of payload bytes waiting in the current chunk.
    pub fn pending(&self) -> usize {
        self.pos - HEADER_LEN
    }

    /// Seals the current chunk, if it holds any payload, and flushes the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.seal()?;
        self.sink.flush()
    }

    /// Flushes pending data and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    fn seal(&mut self) -> io::Result<()> {
        if self.pos == HEADER_LEN {
            return Ok(());
        }
        let header = BlockHeader::for_payload(&self.buf[HEADER_LEN..self.pos]);
        self.buf[..HEADER_LEN].copy_from_slice(&header.to_bytes());
        self.sink.write_all(&self.buf[..self.pos])?;
        debug!(
            length = header.length,
            checksum = header.checksum,
            block = self.blocks,
            "sealed block"
        );
        self.blocks += 1;
        self.pos = HEADER_LEN;
        Ok(())
    }

    /// Ensures `n` contiguous bytes are free in the current chunk.
    #[inline]
    fn require(&mut self, n: usize) -> io::Result<()> {
        if self.pos + n > CHUNK_SIZE {
            self.seal()?;
        }
        Ok(())
    }

    #[inline]
    fn put(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Writes a tag followed by a fixed-width payload in the same block.
    fn put_tagged(&mut self, tag: u8, payload: &[u8]) -> io::Result<()> {
        self.require(1 + payload.len())?;
        self.put(&[tag]);
        self.put(payload);
        Ok(())
    }

    /// Writes a raw byte run, spanning blocks as needed.
    fn put_run(&mut self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            if self.pos == CHUNK_SIZE {
                self.seal()?;
            }
            let n = bytes.len().min(CHUNK_SIZE - self.pos);
            self.put(&bytes[..n]);
            bytes = &bytes[n..];
        }
        Ok(())
    }

    // =========================================================================
    // SCALARS
    // =========================================================================

    pub fn write_null(&mut self) -> io::Result<()> {
        self.put_tagged(tags::NULL, &[])
    }

    pub fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.put_tagged(if value { tags::TRUE } else { tags::FALSE }, &[])
    }

    /// Writes an integer with the narrowest tag that holds it.
    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        if let Some(tag) = tags::small_int(value) {
            self.put_tagged(tag, &[])
        } else if let Ok(v) = i16::try_from(value) {
            self.put_tagged(tags::INT16, &v.to_be_bytes())
        } else if let Ok(v) = i32::try_from(value) {
            self.put_tagged(tags::INT32, &v.to_be_bytes())
        } else {
            self.put_tagged(tags::INT64, &value.to_be_bytes())
        }
    }

    pub fn write_i8(&mut self, value: i8) -> io::Result<()> {
        self.write_i64(value as i64)
    }

    pub fn write_i16(&mut self, value: i16) -> io::Result<()> {
        self.write_i64(value as i64)
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.write_i64(value as i64)
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.put_tagged(tags::FLOAT32, &value.to_bits().to_be_bytes())
    }

    /// Writes a double, as FLOAT32 when that is lossless.
    pub fn write_f64(&mut self, value: f64) -> io::Result<()> {
        let narrow = value as f32;
        if (narrow as f64).to_bits() == value.to_bits() {
            self.write_f32(narrow)
        } else {
            self.put_tagged(tags::FLOAT64, &value.to_bits().to_be_bytes())
        }
    }

    /// Writes a character as the integer of its code point.
    pub fn write_char(&mut self, value: char) -> io::Result<()> {
        self.write_i64(value as u32 as i64)
    }

    /// Writes a string with its UTF-8 byte length.
    pub fn write_str(&mut self, value: &str) -> io::Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() < tags::SHORT_STRING_LIMIT {
            self.put_tagged(tags::SHORT_STRING | bytes.len() as u8, &[])?;
        } else {
            self.put_tagged(tags::STRING, &[])?;
            self.write_i64(bytes.len() as i64)?;
        }
        self.put_run(bytes)
    }

    /// Writes a length-prefixed binary blob.
    pub fn write_bytes(&mut self, value: &[u8]) -> io::Result<()> {
        self.put_tagged(tags::BINARY, &[])?;
        self.write_i64(value.len() as i64)?;
        self.put_run(value)
    }

    pub fn write_big_integer(&mut self, value: &BigInteger) -> io::Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Writes scale, precision, then the unscaled value.
    pub fn write_big_decimal(&mut self, value: &BigDecimal) -> io::Result<()> {
        self.write_i32(value.scale)?;
        self.write_i32(value.precision)?;
        self.write_big_integer(&value.unscaled)
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Writes an enumeration reference: type identifier then ordinal.
    pub fn write_enum(&mut self, identifier: i16, ordinal: u32) -> io::Result<()> {
        self.put_tagged(tags::ENUM, &identifier.to_be_bytes())?;
        self.write_i64(ordinal as i64)
    }

    /// Writes the `[OBJECT][identifier]` pair preceding a record's fields.
    pub fn write_object_header(&mut self, identifier: i16) -> io::Result<()> {
        self.put_tagged(tags::OBJECT, &identifier.to_be_bytes())
    }

    /// Announces the data type of the boxed value that follows.
    pub fn write_typed(&mut self, data_type: DataType) -> io::Result<()> {
        self.put_tagged(tags::TYPED, &[data_type.id()])
    }

    /// Writes a collection header; `count` tagged elements must follow.
    pub fn write_collection_header(&mut self, kind: DataType, count: usize) -> io::Result<()> {
        self.put_tagged(tags::COLLECTION, &[kind.id()])?;
        self.write_i64(count as i64)
    }

    /// Writes a map header; `count` tagged key/value pairs must follow.
    pub fn write_map_header(&mut self, kind: DataType, count: usize) -> io::Result<()> {
        self.put_tagged(tags::MAP, &[kind.id()])?;
        self.write_i64(count as i64)
    }

    /// Writes class metadata, by signature when `registry` accepts it and
    /// inline otherwise.
    pub fn write_class(&mut self, class: &ClassInfo, registry: &dyn Registry) -> io::Result<()> {
        match registry.store(class) {
            Some(signature) => {
                debug!(class = class.name(), %signature, "class header by signature");
                self.put_tagged(tags::CLASS_SIGNATURE, &[])?;
                self.write_str(&signature)
            }
            None => {
                debug!(class = class.name(), registry = registry.name(), "class header inline");
                self.put_tagged(tags::CLASS_INFO, &[])?;
                class.encode_into(self)
            }
        }
    }
}
