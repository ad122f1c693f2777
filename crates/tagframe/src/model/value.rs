//! Dynamic values exchanged between records and the codec.

use std::any::TypeId;
use std::fmt;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc,
};

use super::data_type::DataType;
use super::record::{Enumeration, Record};

// =============================================================================
// ARBITRARY PRECISION NUMBERS
// =============================================================================

/// Arbitrary-precision integer.
///
/// Stored as big-endian two's complement bytes, minimal-length. Zero is a
/// single `0x00` byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInteger {
    bytes: Vec<u8>,
}

impl BigInteger {
    /// Creates a BigInteger from big-endian two's complement bytes.
    ///
    /// Redundant sign bytes are stripped; an empty slice is zero.
    pub fn from_be_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self { bytes: vec![0] };
        }
        let mut start = 0;
        while start + 1 < bytes.len() {
            let (b, next) = (bytes[start], bytes[start + 1]);
            let redundant = (b == 0x00 && next & 0x80 == 0) || (b == 0xFF && next & 0x80 != 0);
            if !redundant {
                break;
            }
            start += 1;
        }
        Self {
            bytes: bytes[start..].to_vec(),
        }
    }

    /// Returns the big-endian two's complement bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns true if this is zero.
    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// Returns true if this is negative.
    pub fn is_negative(&self) -> bool {
        self.bytes[0] & 0x80 != 0
    }

    /// Returns the value as `i128` if it fits.
    pub fn to_i128(&self) -> Option<i128> {
        if self.bytes.len() > 16 {
            return None;
        }
        let fill = if self.is_negative() { 0xFF } else { 0x00 };
        let mut buf = [fill; 16];
        buf[16 - self.bytes.len()..].copy_from_slice(&self.bytes);
        Some(i128::from_be_bytes(buf))
    }

    /// Returns the value as `i64` if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Returns the unsigned magnitude as big-endian bytes.
    fn magnitude(&self) -> Vec<u8> {
        if !self.is_negative() {
            return self.bytes.clone();
        }
        // Two's complement negation: invert and add one.
        let mut out: Vec<u8> = self.bytes.iter().map(|b| !b).collect();
        for b in out.iter_mut().rev() {
            let (sum, carry) = b.overflowing_add(1);
            *b = sum;
            if !carry {
                break;
            }
        }
        out
    }

    /// Returns the decimal digits of the magnitude, most significant first.
    fn decimal_digits(&self) -> Vec<u8> {
        let mut mag = self.magnitude();
        let mut digits = Vec::new();
        loop {
            while mag.first() == Some(&0) {
                mag.remove(0);
            }
            if mag.is_empty() {
                break;
            }
            let mut rem: u32 = 0;
            for b in mag.iter_mut() {
                let cur = (rem << 8) | *b as u32;
                *b = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(rem as u8);
        }
        if digits.is_empty() {
            digits.push(0);
        }
        digits.reverse();
        digits
    }
}

impl From<i64> for BigInteger {
    fn from(v: i64) -> Self {
        Self::from_be_bytes(&v.to_be_bytes())
    }
}

impl From<i128> for BigInteger {
    fn from(v: i128) -> Self {
        Self::from_be_bytes(&v.to_be_bytes())
    }
}

impl fmt::Display for BigInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        for d in self.decimal_digits() {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Arbitrary-precision decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigDecimal {
    pub unscaled: BigInteger,
    pub scale: i32,
    /// Number of decimal digits in `unscaled`.
    pub precision: i32,
}

impl BigDecimal {
    /// Creates a decimal, deriving the precision from the unscaled value.
    pub fn new(unscaled: impl Into<BigInteger>, scale: i32) -> Self {
        let unscaled = unscaled.into();
        let precision = unscaled.decimal_digits().len() as i32;
        Self {
            unscaled,
            scale,
            precision,
        }
    }
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits: String = self
            .unscaled
            .decimal_digits()
            .iter()
            .map(|d| char::from(b'0' + d))
            .collect();
        let sign = if self.unscaled.is_negative() { "-" } else { "" };
        if self.scale <= 0 {
            let zeros = "0".repeat(self.scale.unsigned_abs() as usize);
            return write!(f, "{sign}{digits}{zeros}");
        }
        let scale = self.scale as usize;
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int}.{frac}")
        } else {
            write!(f, "{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

/// Opaque binary blob.
///
/// Distinct from `Vec<u8>`, which is a list of bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Blob(pub Vec<u8>);

// =============================================================================
// TIME
// =============================================================================

/// A date-based amount of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Period {
    pub years: i32,
    pub months: i32,
    pub days: i32,
}

impl Period {
    pub fn new(years: i32, months: i32, days: i32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }
}

/// A region-based time-zone id, e.g. `Europe/Paris`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(pub String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A local date-time qualified by a zone id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZonedDateTime {
    pub local: NaiveDateTime,
    pub zone: ZoneId,
}

impl ZonedDateTime {
    pub fn new(local: NaiveDateTime, zone: ZoneId) -> Self {
        Self { local, zone }
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A reference to one variant of a registered enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_id: TypeId,
    pub ordinal: u32,
}

impl EnumValue {
    /// Creates the value for `variant`.
    pub fn of<E: Enumeration>(variant: E) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            ordinal: variant.ordinal(),
        }
    }
}

/// A dynamically typed field value.
#[derive(Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Character(char),
    Byte(i8),
    Short(i16),
    Integer(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    BigInteger(BigInteger),
    BigDecimal(BigDecimal),
    Binary(Vec<u8>),
    Enum(EnumValue),

    /// Elements of a collection, with the collection kind.
    Collection(DataType, Vec<Value>),
    /// Key/value pairs of a map, with the map kind.
    Map(DataType, Vec<(Value, Value)>),

    Duration(TimeDelta),
    Instant(DateTime<Utc>),
    LocalDate(NaiveDate),
    LocalTime(NaiveTime),
    LocalDateTime(NaiveDateTime),
    OffsetDateTime(DateTime<FixedOffset>),
    ZonedDateTime(ZonedDateTime),
    Period(Period),
    ZoneId(ZoneId),
    ZoneOffset(FixedOffset),

    /// Nested record.
    Object(Box<dyn Record>),
}

impl Value {
    /// Returns the data type of this value, or None for null.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => DataType::Boolean,
            Value::Character(_) => DataType::Character,
            Value::Byte(_) => DataType::Byte,
            Value::Short(_) => DataType::Short,
            Value::Integer(_) => DataType::Integer,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::BigInteger(_) => DataType::BigInteger,
            Value::BigDecimal(_) => DataType::BigDecimal,
            Value::Binary(_) => DataType::Binary,
            Value::Enum(_) => DataType::Enum,
            Value::Collection(dt, _) | Value::Map(dt, _) => *dt,
            Value::Duration(_) => DataType::Duration,
            Value::Instant(_) => DataType::Instant,
            Value::LocalDate(_) => DataType::LocalDate,
            Value::LocalTime(_) => DataType::LocalTime,
            Value::LocalDateTime(_) => DataType::LocalDateTime,
            Value::OffsetDateTime(_) => DataType::OffsetDateTime,
            Value::ZonedDateTime(_) => DataType::ZonedDateTime,
            Value::Period(_) => DataType::Period,
            Value::ZoneId(_) => DataType::ZoneId,
            Value::ZoneOffset(_) => DataType::ZoneOffset,
            Value::Object(_) => DataType::Object,
        })
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Object(record) => record.record_name().to_string(),
            other => match other.data_type() {
                Some(dt) => format!("{dt:?}"),
                None => "null".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_integer_minimal_bytes() {
        assert_eq!(BigInteger::from(0i64).as_bytes(), &[0x00]);
        assert_eq!(BigInteger::from(127i64).as_bytes(), &[0x7F]);
        assert_eq!(BigInteger::from(128i64).as_bytes(), &[0x00, 0x80]);
        assert_eq!(BigInteger::from(-1i64).as_bytes(), &[0xFF]);
        assert_eq!(BigInteger::from(-128i64).as_bytes(), &[0x80]);
        assert_eq!(BigInteger::from(-129i64).as_bytes(), &[0xFF, 0x7F]);
    }

    #[test]
    fn test_big_integer_conversions() {
        for v in [0i128, 1, -1, i64::MAX as i128, i64::MIN as i128, i128::MAX, i128::MIN] {
            assert_eq!(BigInteger::from(v).to_i128(), Some(v));
        }
        assert_eq!(BigInteger::from(i128::MAX).to_i64(), None);

        let mut wide = vec![0x01];
        wide.extend_from_slice(&[0u8; 16]);
        assert_eq!(BigInteger::from_be_bytes(&wide).to_i128(), None);
    }

    #[test]
    fn test_big_integer_display() {
        assert_eq!(BigInteger::from(0i64).to_string(), "0");
        assert_eq!(BigInteger::from(-12345i64).to_string(), "-12345");
        assert_eq!(BigInteger::from(i128::MAX).to_string(), i128::MAX.to_string());
        assert_eq!(BigInteger::from(i128::MIN).to_string(), i128::MIN.to_string());
    }

    #[test]
    fn test_big_decimal() {
        let d = BigDecimal::new(-12345i64, 2);
        assert_eq!(d.precision, 5);
        assert_eq!(d.to_string(), "-123.45");
        assert_eq!(BigDecimal::new(5i64, 3).to_string(), "0.005");
        assert_eq!(BigDecimal::new(12i64, -2).to_string(), "1200");
        assert_eq!(BigDecimal::new(0i64, 0).precision, 1);
    }

    #[test]
    fn test_value_data_type() {
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::Integer(3).data_type(), Some(DataType::Integer));
        assert_eq!(
            Value::Collection(DataType::SortedSet, Vec::new()).data_type(),
            Some(DataType::SortedSet)
        );
        assert_eq!(Value::Long(1).describe(), "Long");
    }
}
