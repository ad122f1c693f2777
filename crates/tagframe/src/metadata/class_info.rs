//! Per-type metadata and its signature.

use std::io::{self, Read, Write};

use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};

use crate::codec::{Decoder, Encoder};
use crate::error::{DecodeError, MetadataError, Result};
use crate::model::DataType;

use super::field_info::FieldInfo;

/// Number of digest bytes kept in a signature.
const SIGNATURE_DIGEST_LEN: usize = 8;

/// Metadata for one serialized type.
///
/// Fields keep their discovery order. Two ClassInfo values are equal when
/// their signatures are equal.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    identifier: i16,
    name: String,
    fields: Vec<FieldInfo>,
    by_name: FxHashMap<String, usize>,
    by_tag: FxHashMap<i16, usize>,
    signature: String,
}

impl ClassInfo {
    /// Creates metadata from an ordered field list.
    ///
    /// Field names must be unique ignoring case; tags must be unique.
    pub fn new(
        identifier: i16,
        name: impl Into<String>,
        fields: Vec<FieldInfo>,
    ) -> std::result::Result<Self, MetadataError> {
        let name = name.into();
        let mut by_name = FxHashMap::with_capacity_and_hasher(fields.len(), Default::default());
        let mut by_tag = FxHashMap::default();
        for (index, field) in fields.iter().enumerate() {
            if by_name.insert(field.name().to_lowercase(), index).is_some() {
                return Err(MetadataError::DuplicateField {
                    class: name,
                    field: field.name().to_string(),
                });
            }
            if let Some(tag) = field.tag() {
                if by_tag.insert(tag, index).is_some() {
                    return Err(MetadataError::DuplicateTag { class: name, tag });
                }
            }
        }
        let signature = compute_signature(identifier, &fields);
        Ok(Self {
            identifier,
            name,
            fields,
            by_name,
            by_tag,
            signature,
        })
    }

    pub fn identifier(&self) -> i16 {
        self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&FieldInfo> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Content-derived identity of this field layout.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Finds a field index by case-insensitive name.
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Finds a field index by tag.
    pub fn find_by_tag(&self, tag: i16) -> Option<usize> {
        self.by_tag.get(&tag).copied()
    }

    // =========================================================================
    // WIRE FORM
    // =========================================================================

    /// Writes the inline metadata body (without the CLASS_INFO tag).
    pub fn encode_into<W: Write>(&self, enc: &mut Encoder<W>) -> io::Result<()> {
        enc.write_i16(self.identifier)?;
        enc.write_str(&self.name)?;
        enc.write_i16(self.fields.len() as i16)?;
        for field in &self.fields {
            enc.write_str(field.name())?;
            enc.write_i16(field.data_type().id() as i16)?;
            enc.write_bool(field.is_primitive())?;
            enc.write_i16(field.class_identifier())?;
            match field.tag() {
                Some(tag) => enc.write_i16(tag)?,
                None => enc.write_null()?,
            }
        }
        Ok(())
    }

    /// Reads an inline metadata body written by [`encode_into`](Self::encode_into).
    pub fn decode_from<R: Read>(dec: &mut Decoder<R>) -> Result<Self> {
        let identifier = dec.read_i16()?;
        let name = dec.read_required_string()?;
        let count = dec.read_i16()?;
        if count < 0 {
            return Err(DecodeError::NegativeLength {
                field: "class fields",
                len: count as i32,
            }
            .into());
        }
        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let field_name = dec.read_required_string()?;
            let id = dec.read_i16()?;
            let data_type = u8::try_from(id)
                .ok()
                .and_then(DataType::from_u8)
                .ok_or(DecodeError::UnknownDataType { id: id as u8 })?;
            let primitive = dec.read_bool()?;
            let class_identifier = dec.read_i16()?;
            let tag = if dec.skip_null()? {
                None
            } else {
                Some(dec.read_i16()?)
            };
            fields.push(FieldInfo::new(field_name, data_type, primitive, class_identifier, tag));
        }
        Ok(Self::new(identifier, name, fields)?)
    }

    /// Serializes this metadata into a standalone framed buffer.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut enc = Encoder::new(Vec::new());
        self.encode_into(&mut enc)?;
        enc.finish()
    }

    /// Parses metadata produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::decode_from(&mut Decoder::new(bytes))
    }
}

impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for ClassInfo {}

/// Computes `{identifier:04x}-{digest}`.
///
/// The digest covers every field sorted by name: name bytes, data type id,
/// then the class identifier low byte and high byte.
fn compute_signature(identifier: i16, fields: &[FieldInfo]) -> String {
    let mut sorted: Vec<&FieldInfo> = fields.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut hasher = Sha256::new();
    for field in sorted {
        let class = field.class_identifier();
        hasher.update(field.name().as_bytes());
        hasher.update([field.data_type().id()]);
        hasher.update([(class & 0xFF) as u8, ((class >> 8) & 0xFF) as u8]);
    }
    let digest = hasher.finalize();

    let mut s = String::with_capacity(5 + SIGNATURE_DIGEST_LEN * 2);
    s.push_str(&format!("{:04x}-", identifier as u16));
    for byte in &digest[..SIGNATURE_DIGEST_LEN] {
        s.push_str(&format!("{:02x}", byte));
    }
    s
}
