//! Tag byte layout.
//!
//! ```text
//! 0x00-0x7F  small positive integer 0..127
//! 0x80       NULL
//! 0x81-0x8F  small negative integer -1..-15
//! 0x90/0x91  FALSE / TRUE
//! 0xA0-0xBF  short string, UTF-8 length 0..31 in the low 5 bits
//! 0xC0       OBJECT header, followed by a raw i16 identifier
//! 0xC1       TYPED value, followed by a data type id byte
//! 0xE0-0xEF  extended tag, sub-type in the low nibble
//! ```

/// Marks the absence of a value.
pub const NULL: u8 = 0x80;

pub const FALSE: u8 = 0x90;
pub const TRUE: u8 = 0x91;

pub const OBJECT: u8 = 0xC0;
pub const TYPED: u8 = 0xC1;

pub const SHORT_STRING: u8 = 0xA0;
/// Strings shorter than this use a short-string tag.
pub const SHORT_STRING_LIMIT: usize = 32;

pub const SMALL_INT_MIN: i64 = -15;
pub const SMALL_INT_MAX: i64 = 127;

const EXTENDED: u8 = 0xE0;

/// Extended sub-types.
pub mod sub {
    pub const INT16: u8 = 0x0;
    pub const INT32: u8 = 0x1;
    pub const INT64: u8 = 0x2;
    pub const FLOAT32: u8 = 0x3;
    pub const FLOAT64: u8 = 0x4;
    pub const ENUM: u8 = 0x5;
    pub const STRING: u8 = 0x6;
    pub const COLLECTION: u8 = 0x7;
    pub const MAP: u8 = 0x8;
    pub const BINARY: u8 = 0x9;
    pub const CLASS_INFO: u8 = 0xE;
    pub const CLASS_SIGNATURE: u8 = 0xF;
}

pub const INT16: u8 = EXTENDED | sub::INT16;
pub const INT32: u8 = EXTENDED | sub::INT32;
pub const INT64: u8 = EXTENDED | sub::INT64;
pub const FLOAT32: u8 = EXTENDED | sub::FLOAT32;
pub const FLOAT64: u8 = EXTENDED | sub::FLOAT64;
pub const ENUM: u8 = EXTENDED | sub::ENUM;
pub const STRING: u8 = EXTENDED | sub::STRING;
pub const COLLECTION: u8 = EXTENDED | sub::COLLECTION;
pub const MAP: u8 = EXTENDED | sub::MAP;
pub const BINARY: u8 = EXTENDED | sub::BINARY;
pub const CLASS_INFO: u8 = EXTENDED | sub::CLASS_INFO;
pub const CLASS_SIGNATURE: u8 = EXTENDED | sub::CLASS_SIGNATURE;

/// Returns the tag for a small integer, if `value` is in the small range.
#[inline]
pub fn small_int(value: i64) -> Option<u8> {
    match value {
        0..=SMALL_INT_MAX => Some(value as u8),
        SMALL_INT_MIN..=-1 => Some(NULL + (-value) as u8),
        _ => None,
    }
}

/// Returns the value of a small integer tag.
#[inline]
pub fn small_int_value(tag: u8) -> Option<i64> {
    match tag {
        0x00..=0x7F => Some(tag as i64),
        0x81..=0x8F => Some(-((tag - NULL) as i64)),
        _ => None,
    }
}

/// Returns the length carried by a short-string tag.
#[inline]
pub fn short_string_len(tag: u8) -> Option<usize> {
    match tag {
        0xA0..=0xBF => Some((tag & 0x1F) as usize),
        _ => None,
    }
}

/// Returns the sub-type of an extended tag.
#[inline]
pub fn extended_sub(tag: u8) -> Option<u8> {
    if tag & 0xF0 == EXTENDED {
        Some(tag & 0x0F)
    } else {
        None
    }
}

/// Returns true if `tag` starts class metadata (inline or by signature).
#[inline]
pub fn is_class_header(tag: u8) -> bool {
    tag == CLASS_INFO || tag == CLASS_SIGNATURE
}

/// Describes a tag for error messages.
pub fn tag_to_string(tag: u8) -> String {
    if let Some(v) = small_int_value(tag) {
        return format!("small integer {v}");
    }
    if let Some(len) = short_string_len(tag) {
        return format!("short string of {len} bytes");
    }
    let name = match tag {
        NULL => "null",
        FALSE => "false",
        TRUE => "true",
        OBJECT => "object",
        TYPED => "typed",
        INT16 => "int16",
        INT32 => "int32",
        INT64 => "int64",
        FLOAT32 => "float32",
        FLOAT64 => "float64",
        ENUM => "enum",
        STRING => "string",
        COLLECTION => "collection",
        MAP => "map",
        BINARY => "binary",
        CLASS_INFO => "class info",
        CLASS_SIGNATURE => "class signature",
        _ => return format!("unknown 0x{tag:02x}"),
    };
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_int_range() {
        for v in SMALL_INT_MIN..=SMALL_INT_MAX {
            let tag = small_int(v).unwrap();
            assert_eq!(small_int_value(tag), Some(v));
        }
        assert_eq!(small_int(128), None);
        assert_eq!(small_int(-16), None);
        assert_eq!(small_int(-1), Some(0x81));
        assert_eq!(small_int_value(NULL), None);
    }

    #[test]
    fn test_tag_spaces_disjoint() {
        for tag in 0..=u8::MAX {
            let kinds = [
                small_int_value(tag).is_some(),
                short_string_len(tag).is_some(),
                extended_sub(tag).is_some(),
                matches!(tag, NULL | FALSE | TRUE | OBJECT | TYPED),
            ];
            assert!(kinds.iter().filter(|k| **k).count() <= 1, "tag {tag:#x}");
        }
    }

    #[test]
    fn test_tag_to_string() {
        assert_eq!(tag_to_string(NULL), "null");
        assert_eq!(tag_to_string(INT32), "int32");
        assert_eq!(tag_to_string(0x05), "small integer 5");
        assert_eq!(tag_to_string(0xA3), "short string of 3 bytes");
        assert_eq!(tag_to_string(0xD0), "unknown 0xd0");
    }
}
