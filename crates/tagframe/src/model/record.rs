//! Field access capability for serializable types.
//!
//! The engine never inspects Rust types directly. A type takes part in
//! serialization by implementing [`Record`] (dynamic field get/set) and
//! [`RecordType`] (static field list and construction). Field types
//! implement [`FieldValue`], which converts them to and from [`Value`].
//!
//! The [`record!`](crate::record) and [`enumeration!`](crate::enumeration)
//! macros generate all of these.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};

use crate::error::SerializeError;

use super::data_type::DataType;
use super::value::{BigDecimal, BigInteger, Blob, EnumValue, Period, Value, ZoneId, ZonedDateTime};

// =============================================================================
// TRAITS
// =============================================================================

/// Object-safe field access on a record instance.
pub trait Record: Any + Debug {
    /// Name of the concrete type.
    fn record_name(&self) -> &'static str;

    /// Returns the value of `name`, or None if there is no such field.
    fn get_field(&self, name: &str) -> Option<Value>;

    /// Assigns `value` to the field `name`.
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), SerializeError>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Static description of a record type.
pub trait RecordType: Record + Sized {
    /// Name written into class metadata.
    fn type_name() -> &'static str;

    /// Own fields in declaration order.
    fn fields() -> Vec<FieldDef>;

    /// Inherited fields, nearest ancestor first.
    fn parent_fields() -> Vec<FieldDef> {
        Vec::new()
    }

    /// Creates a zero-valued instance, or None if the type cannot be built
    /// without arguments.
    fn construct() -> Option<Self>;
}

/// A C-like enumeration addressable by ordinal.
pub trait Enumeration: Any + Copy + Debug {
    fn type_name() -> &'static str;

    /// Variant names in ordinal order.
    fn variants() -> &'static [&'static str];

    fn ordinal(self) -> u32;

    fn from_ordinal(ordinal: u32) -> Option<Self>;
}

/// Declaration of one record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub data_type: DataType,
    pub primitive: bool,
    /// Nested record or enumeration type, if any.
    pub class: Option<TypeId>,
    /// Name-independent matching tag.
    pub tag: Option<i16>,
    /// Excluded from serialization.
    pub skip: bool,
}

impl FieldDef {
    /// Creates a field declaration inferred from the field's Rust type.
    pub fn of<T: FieldValue>(name: &'static str) -> Self {
        Self {
            name,
            data_type: T::data_type(),
            primitive: T::primitive(),
            class: T::class(),
            tag: None,
            skip: false,
        }
    }

    pub fn with_tag(mut self, tag: i16) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }
}

/// Conversion between a field type and [`Value`].
pub trait FieldValue: Sized {
    fn data_type() -> DataType;

    /// True for non-nullable scalars.
    fn primitive() -> bool {
        false
    }

    /// Nested record or enumeration type.
    fn class() -> Option<TypeId> {
        None
    }

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, SerializeError>;
}

fn mismatch<T>(expected: DataType, found: &Value) -> Result<T, SerializeError> {
    Err(SerializeError::TypeMismatch {
        expected,
        found: found.describe(),
    })
}

fn out_of_range<T>(value: impl ToString, target: &'static str) -> Result<T, SerializeError> {
    Err(SerializeError::OutOfRange {
        value: value.to_string(),
        target,
    })
}

// =============================================================================
// SCALARS
// =============================================================================

impl FieldValue for bool {
    fn data_type() -> DataType {
        DataType::Boolean
    }
    fn primitive() -> bool {
        true
    }
    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => mismatch(DataType::Boolean, &other),
        }
    }
}

impl FieldValue for char {
    fn data_type() -> DataType {
        DataType::Character
    }
    fn primitive() -> bool {
        true
    }
    fn to_value(&self) -> Value {
        Value::Character(*self)
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::Character(c) => Ok(c),
            other => mismatch(DataType::Character, &other),
        }
    }
}

/// Widens any integer value to i64.
fn integer_of(value: &Value) -> Option<i64> {
    match *value {
        Value::Byte(v) => Some(v as i64),
        Value::Short(v) => Some(v as i64),
        Value::Integer(v) => Some(v as i64),
        Value::Long(v) => Some(v),
        _ => None,
    }
}

macro_rules! integer_field {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FieldValue for $ty {
            fn data_type() -> DataType {
                DataType::$variant
            }
            fn primitive() -> bool {
                true
            }
            fn to_value(&self) -> Value {
                Value::$variant(*self)
            }
            fn from_value(value: Value) -> Result<Self, SerializeError> {
                match integer_of(&value) {
                    Some(v) => <$ty>::try_from(v).or_else(|_| out_of_range(v, $name)),
                    None => mismatch(DataType::$variant, &value),
                }
            }
        }
    };
}

integer_field!(i8, Byte, "byte");
integer_field!(i16, Short, "short");
integer_field!(i32, Integer, "integer");
integer_field!(i64, Long, "long");

impl FieldValue for f32 {
    fn data_type() -> DataType {
        DataType::Float
    }
    fn primitive() -> bool {
        true
    }
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::Float(v) => Ok(v),
            other => mismatch(DataType::Float, &other),
        }
    }
}

impl FieldValue for f64 {
    fn data_type() -> DataType {
        DataType::Double
    }
    fn primitive() -> bool {
        true
    }
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Float(v) => Ok(v as f64),
            other => mismatch(DataType::Double, &other),
        }
    }
}

impl FieldValue for String {
    fn data_type() -> DataType {
        DataType::String
    }
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::String(s) => Ok(s),
            other => mismatch(DataType::String, &other),
        }
    }
}

impl FieldValue for BigInteger {
    fn data_type() -> DataType {
        DataType::BigInteger
    }
    fn to_value(&self) -> Value {
        Value::BigInteger(self.clone())
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::BigInteger(v) => Ok(v),
            other => match integer_of(&other) {
                Some(v) => Ok(BigInteger::from(v)),
                None => mismatch(DataType::BigInteger, &other),
            },
        }
    }
}

impl FieldValue for BigDecimal {
    fn data_type() -> DataType {
        DataType::BigDecimal
    }
    fn to_value(&self) -> Value {
        Value::BigDecimal(self.clone())
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::BigDecimal(v) => Ok(v),
            other => mismatch(DataType::BigDecimal, &other),
        }
    }
}

impl FieldValue for Blob {
    fn data_type() -> DataType {
        DataType::Binary
    }
    fn to_value(&self) -> Value {
        Value::Binary(self.0.clone())
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::Binary(bytes) => Ok(Blob(bytes)),
            other => mismatch(DataType::Binary, &other),
        }
    }
}

// =============================================================================
// WRAPPERS
// =============================================================================

impl<T: FieldValue> FieldValue for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }
    fn class() -> Option<TypeId> {
        T::class()
    }
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    fn data_type() -> DataType {
        T::data_type()
    }
    fn primitive() -> bool {
        T::primitive()
    }
    fn class() -> Option<TypeId> {
        T::class()
    }
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        T::from_value(value).map(Box::new)
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

fn elements<T: FieldValue>(
    expected: DataType,
    value: Value,
) -> Result<impl Iterator<Item = Result<T, SerializeError>>, SerializeError> {
    match value {
        Value::Collection(_, items) => Ok(items.into_iter().map(T::from_value)),
        other => mismatch(expected, &other),
    }
}

fn entries<K: FieldValue, V: FieldValue>(
    expected: DataType,
    value: Value,
) -> Result<impl Iterator<Item = Result<(K, V), SerializeError>>, SerializeError> {
    match value {
        Value::Map(_, pairs) => Ok(pairs
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))),
        other => mismatch(expected, &other),
    }
}

macro_rules! collection_field {
    ($ty:ident, $variant:ident $(, $bound:path)*) => {
        impl<T: FieldValue $(+ $bound)*> FieldValue for $ty<T> {
            fn data_type() -> DataType {
                DataType::$variant
            }
            fn to_value(&self) -> Value {
                Value::Collection(
                    DataType::$variant,
                    self.iter().map(FieldValue::to_value).collect(),
                )
            }
            fn from_value(value: Value) -> Result<Self, SerializeError> {
                elements(DataType::$variant, value)?.collect()
            }
        }
    };
}

collection_field!(Vec, List);
collection_field!(VecDeque, Deque);
collection_field!(HashSet, Set, Eq, Hash);
collection_field!(BTreeSet, SortedSet, Ord);

impl<K: FieldValue + Eq + Hash, V: FieldValue> FieldValue for HashMap<K, V> {
    fn data_type() -> DataType {
        DataType::Map
    }
    fn to_value(&self) -> Value {
        Value::Map(
            DataType::Map,
            self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect(),
        )
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        entries(DataType::Map, value)?.collect()
    }
}

impl<K: FieldValue + Ord, V: FieldValue> FieldValue for BTreeMap<K, V> {
    fn data_type() -> DataType {
        DataType::SortedMap
    }
    fn to_value(&self) -> Value {
        Value::Map(
            DataType::SortedMap,
            self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect(),
        )
    }
    fn from_value(value: Value) -> Result<Self, SerializeError> {
        entries(DataType::SortedMap, value)?.collect()
    }
}

// =============================================================================
// TIME
// =============================================================================

macro_rules! time_field {
    ($ty:ty, $variant:ident) => {
        impl FieldValue for $ty {
            fn data_type() -> DataType {
                DataType::$variant
            }
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
            fn from_value(value: Value) -> Result<Self, SerializeError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => mismatch(DataType::$variant, &other),
                }
            }
        }
    };
}

time_field!(TimeDelta, Duration);
time_field!(DateTime<Utc>, Instant);
time_field!(NaiveDate, LocalDate);
time_field!(NaiveTime, LocalTime);
time_field!(NaiveDateTime, LocalDateTime);
time_field!(DateTime<FixedOffset>, OffsetDateTime);
time_field!(ZonedDateTime, ZonedDateTime);
time_field!(Period, Period);
time_field!(ZoneId, ZoneId);
time_field!(FixedOffset, ZoneOffset);

// =============================================================================
// RECORD AND ENUM HELPERS
// =============================================================================

/// Converts a value into an enumeration variant of `E`.
pub fn enum_from_value<E: Enumeration>(value: Value) -> Result<E, SerializeError> {
    match value {
        Value::Enum(EnumValue { type_id, ordinal }) if type_id == TypeId::of::<E>() => {
            E::from_ordinal(ordinal).ok_or(SerializeError::InvalidOrdinal {
                name: E::type_name(),
                ordinal,
            })
        }
        other => mismatch(DataType::Enum, &other),
    }
}

/// Converts a value into a nested record of type `R`.
pub fn record_from_value<R: RecordType>(value: Value) -> Result<R, SerializeError> {
    match value {
        Value::Object(record) => {
            let found = record.record_name();
            record
                .into_any()
                .downcast::<R>()
                .map(|r| *r)
                .map_err(|_| SerializeError::TypeMismatch {
                    expected: DataType::Object,
                    found: found.to_string(),
                })
        }
        other => mismatch(DataType::Object, &other),
    }
}
