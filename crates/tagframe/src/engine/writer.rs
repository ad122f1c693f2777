//! Write-side tree walk.

use std::any::Any;
use std::io::Write;

use rustc_hash::FxHashSet;

use crate::codec::Encoder;
use crate::error::{MetadataError, Result, SerializeError};
use crate::metadata::FieldInfo;
use crate::model::{Category, DataType, Record, Value};

use super::Context;

fn mismatch(expected: DataType, value: &Value) -> SerializeError {
    SerializeError::TypeMismatch {
        expected,
        found: value.describe(),
    }
}

/// Writes records to one stream.
///
/// Class metadata for a type is written at most once per serializer, before
/// its first instance.
pub struct Serializer<'a, W: Write> {
    ctx: &'a Context,
    encoder: Encoder<W>,
    written: FxHashSet<i16>,
    depth: usize,
}

impl<'a, W: Write> Serializer<'a, W> {
    pub(crate) fn new(ctx: &'a Context, sink: W) -> Self {
        Self {
            ctx,
            encoder: Encoder::new(sink),
            written: FxHashSet::default(),
            depth: 0,
        }
    }

    /// Writes one root record.
    pub fn write<T: Record>(&mut self, value: &T) -> Result<()> {
        self.write_record(value)
    }

    /// Number of distinct types whose metadata has been written.
    pub fn classes_written(&self) -> usize {
        self.written.len()
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.encoder.flush()?)
    }

    /// Flushes pending data and returns the sink.
    pub fn finish(self) -> Result<W> {
        Ok(self.encoder.finish()?)
    }

    fn enter(&mut self) -> Result<()> {
        let max = self.ctx.options().max_depth;
        if self.depth >= max {
            return Err(SerializeError::DepthExceeded { max }.into());
        }
        self.depth += 1;
        Ok(())
    }

    /// Writes the class header, then every field in metadata order.
    pub fn write_record(&mut self, record: &dyn Record) -> Result<()> {
        let ctx = self.ctx;
        let identifier = ctx
            .types()
            .identifier(Any::type_id(record.as_any()))
            .ok_or_else(|| MetadataError::UnregisteredType {
                name: record.record_name().to_string(),
            })?;
        let class = ctx.class_info_by_id(identifier)?;

        self.enter()?;
        if self.written.insert(identifier) {
            self.encoder.write_class(&class, ctx.registry())?;
        }
        self.encoder.write_object_header(identifier)?;
        for field in class.fields() {
            let value = record
                .get_field(field.name())
                .ok_or_else(|| SerializeError::FieldAccess {
                    class: class.name().to_string(),
                    field: field.name().to_string(),
                })?;
            self.write_field(field, value)?;
        }
        self.depth -= 1;
        Ok(())
    }

    fn write_field(&mut self, field: &FieldInfo, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(self.encoder.write_null()?);
        }
        self.write_value(field.data_type(), value)
    }

    /// Dispatches a non-null value on the category of `data_type`.
    fn write_value(&mut self, data_type: DataType, value: Value) -> Result<()> {
        match data_type.category() {
            Category::Number => self.write_number(data_type, value),
            Category::Collection => self.write_collection(data_type, value),
            Category::Time => self.write_time(data_type, value),
            Category::Other => self.write_other(data_type, value),
        }
    }

    /// Writes a collection element or map entry part as a boxed value.
    fn write_element(&mut self, value: Value) -> Result<()> {
        match value.data_type() {
            None => Ok(self.encoder.write_null()?),
            Some(data_type) => {
                self.encoder.write_typed(data_type)?;
                self.write_value(data_type, value)
            }
        }
    }

    fn write_number(&mut self, data_type: DataType, value: Value) -> Result<()> {
        let enc = &mut self.encoder;
        match value {
            Value::Byte(v) => enc.write_i8(v)?,
            Value::Short(v) => enc.write_i16(v)?,
            Value::Integer(v) => enc.write_i32(v)?,
            Value::Long(v) => enc.write_i64(v)?,
            Value::Float(v) => enc.write_f32(v)?,
            Value::Double(v) => enc.write_f64(v)?,
            Value::BigInteger(v) => enc.write_big_integer(&v)?,
            Value::BigDecimal(v) => enc.write_big_decimal(&v)?,
            other => return Err(mismatch(data_type, &other).into()),
        }
        Ok(())
    }

    fn write_other(&mut self, data_type: DataType, value: Value) -> Result<()> {
        match value {
            Value::Boolean(v) => self.encoder.write_bool(v)?,
            Value::Character(v) => self.encoder.write_char(v)?,
            Value::String(v) => self.encoder.write_str(&v)?,
            Value::Binary(v) => self.encoder.write_bytes(&v)?,
            Value::Enum(v) => {
                let identifier = self.ctx.types().identifier(v.type_id).ok_or_else(|| {
                    MetadataError::UnregisteredType {
                        name: format!("enumeration {:?}", v.type_id),
                    }
                })?;
                self.encoder.write_enum(identifier, v.ordinal)?;
            }
            Value::Object(record) => self.write_record(&*record)?,
            other => return Err(mismatch(data_type, &other).into()),
        }
        Ok(())
    }

    fn write_collection(&mut self, data_type: DataType, value: Value) -> Result<()> {
        self.enter()?;
        match value {
            Value::Collection(kind, items) if !data_type.is_map() && !kind.is_map() => {
                self.encoder.write_collection_header(kind, items.len())?;
                for item in items {
                    self.write_element(item)?;
                }
            }
            Value::Map(kind, entries) if data_type.is_map() && kind.is_map() => {
                self.encoder.write_map_header(kind, entries.len())?;
                for (key, value) in entries {
                    self.write_element(key)?;
                    self.write_element(value)?;
                }
            }
            other => return Err(mismatch(data_type, &other).into()),
        }
        self.depth -= 1;
        Ok(())
    }

    fn write_time(&mut self, data_type: DataType, value: Value) -> Result<()> {
        let enc = &mut self.encoder;
        match value {
            Value::Duration(v) => enc.write_duration(&v)?,
            Value::Instant(v) => enc.write_instant(&v)?,
            Value::LocalDate(v) => enc.write_local_date(&v)?,
            Value::LocalTime(v) => enc.write_local_time(&v)?,
            Value::LocalDateTime(v) => enc.write_local_date_time(&v)?,
            Value::OffsetDateTime(v) => enc.write_offset_date_time(&v)?,
            Value::ZonedDateTime(v) => enc.write_zoned_date_time(&v)?,
            Value::Period(v) => enc.write_period(&v)?,
            Value::ZoneId(v) => enc.write_zone_id(&v)?,
            Value::ZoneOffset(v) => enc.write_zone_offset(&v)?,
            other => return Err(mismatch(data_type, &other).into()),
        }
        Ok(())
    }
}
