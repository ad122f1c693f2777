//! Data model: data kinds, dynamic values and the record traits.
//!
//! - [`DataType`]: the kind of a field, as written in class metadata
//! - [`Value`]: a dynamically typed field value
//! - [`Record`] / [`RecordType`]: field access on user types
//! - [`FieldValue`]: conversion between Rust field types and [`Value`]

mod data_type;
mod macros;
mod record;
mod value;

pub use data_type::{Category, DataType};
pub use record::{
    enum_from_value, record_from_value, Enumeration, FieldDef, FieldValue, Record, RecordType,
};
pub use value::{
    BigDecimal, BigInteger, Blob, EnumValue, Period, Value, ZoneId, ZonedDateTime,
};
