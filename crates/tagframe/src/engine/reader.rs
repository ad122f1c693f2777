//! Read-side tree walk.

use std::io::Read;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::codec::{tags, Decoder};
use crate::error::{DecodeError, Error, MetadataError, Result, SerializeError};
use crate::model::{Category, DataType, EnumValue, Record, RecordType, Value};

use super::mapping::FieldMapping;
use super::Context;

/// Reads records from one stream.
///
/// Field mappings are cached per stream signature, so a class seen again
/// in another stream of this deserializer is not resolved twice.
pub struct Deserializer<'a, R: Read> {
    ctx: &'a Context,
    decoder: Decoder<R>,
    mappings: FxHashMap<String, Arc<FieldMapping>>,
    active: FxHashMap<i16, Arc<FieldMapping>>,
    depth: usize,
}

impl<'a, R: Read> Deserializer<'a, R> {
    pub(crate) fn new(ctx: &'a Context, source: R) -> Self {
        Self {
            decoder: Decoder::with_options(source, ctx.options()),
            ctx,
            mappings: FxHashMap::default(),
            active: FxHashMap::default(),
            depth: 0,
        }
    }

    /// Reads one root record of type `T`.
    pub fn read<T: RecordType>(&mut self) -> Result<T> {
        let record = self.read_tree()?;
        let found = record.record_name();
        record
            .into_any()
            .downcast::<T>()
            .map(|r| *r)
            .map_err(|_| {
                Error::from(SerializeError::RootMismatch {
                    expected: T::type_name(),
                    found: found.to_string(),
                })
            })
    }

    /// Returns true when the stream has no more values.
    pub fn at_end(&mut self) -> Result<bool> {
        self.decoder.at_end()
    }

    pub fn into_inner(self) -> R {
        self.decoder.into_inner()
    }

    fn enter(&mut self) -> Result<()> {
        let max = self.ctx.options().max_depth;
        if self.depth >= max {
            return Err(DecodeError::DepthExceeded { max }.into());
        }
        self.depth += 1;
        Ok(())
    }

    /// Reads one record of whatever registered type the stream announces.
    pub fn read_tree(&mut self) -> Result<Box<dyn Record>> {
        self.enter()?;
        if tags::is_class_header(self.decoder.peek_tag()?) {
            self.read_class_header()?;
        }
        let identifier = self.decoder.read_object_header()?;
        let mapping = self
            .active
            .get(&identifier)
            .cloned()
            .ok_or(MetadataError::UnknownIdentifier { identifier })?;

        let entry = self.ctx.types().entry(identifier)?;
        let construct = entry.record()?.construct;
        let mut record = construct().ok_or(MetadataError::MissingConstructor { name: entry.name })?;

        for slot in mapping.slots() {
            if self.decoder.skip_null()? {
                continue;
            }
            let value = self.read_value(slot.stream_type)?;
            if let Some(name) = &slot.local {
                record.set_field(name, value)?;
            }
        }
        self.depth -= 1;
        Ok(record)
    }

    fn read_class_header(&mut self) -> Result<()> {
        let stream = self.decoder.read_class(self.ctx.registry())?;
        let mapping = match self.mappings.get(stream.signature()) {
            Some(mapping) => mapping.clone(),
            None => {
                let local = self.ctx.class_info_by_id(stream.identifier())?;
                let mapping = Arc::new(FieldMapping::new(&stream, &local));
                self.mappings
                    .insert(stream.signature().to_string(), mapping.clone());
                mapping
            }
        };
        debug!(
            identifier = stream.identifier(),
            class = stream.name(),
            "activated class"
        );
        self.active.insert(stream.identifier(), mapping);
        Ok(())
    }

    /// Reads a non-null value whose stream type is `data_type`.
    fn read_value(&mut self, data_type: DataType) -> Result<Value> {
        match data_type.category() {
            Category::Number => self.read_number(data_type),
            Category::Collection => self.read_collection(data_type),
            Category::Time => self.read_time(data_type),
            Category::Other => self.read_other(data_type),
        }
    }

    fn read_element(&mut self) -> Result<Value> {
        if self.decoder.skip_null()? {
            return Ok(Value::Null);
        }
        let data_type = self.decoder.read_typed()?;
        self.read_value(data_type)
    }

    fn read_number(&mut self, data_type: DataType) -> Result<Value> {
        let dec = &mut self.decoder;
        Ok(match data_type {
            DataType::Byte => Value::Byte(dec.read_i8()?),
            DataType::Short => Value::Short(dec.read_i16()?),
            DataType::Integer => Value::Integer(dec.read_i32()?),
            DataType::Long => Value::Long(dec.read_i64()?),
            DataType::Float => Value::Float(dec.read_f32()?),
            DataType::Double => Value::Double(dec.read_f64()?),
            DataType::BigInteger => Value::BigInteger(dec.read_big_integer()?),
            DataType::BigDecimal => Value::BigDecimal(dec.read_big_decimal()?),
            _ => return Err(SerializeError::UnhandledDataType { data_type }.into()),
        })
    }

    fn read_other(&mut self, data_type: DataType) -> Result<Value> {
        Ok(match data_type {
            DataType::Boolean => Value::Boolean(self.decoder.read_bool()?),
            DataType::Character => Value::Character(self.decoder.read_char()?),
            DataType::String => self
                .decoder
                .read_string()?
                .map_or(Value::Null, Value::String),
            DataType::Binary => self
                .decoder
                .read_bytes()?
                .map_or(Value::Null, Value::Binary),
            DataType::Enum => {
                let (identifier, ordinal) = self.decoder.read_enum()?;
                let entry = self.ctx.types().entry(identifier)?;
                if ordinal as usize >= entry.variants()?.len() {
                    return Err(SerializeError::InvalidOrdinal {
                        name: entry.name,
                        ordinal,
                    }
                    .into());
                }
                Value::Enum(EnumValue {
                    type_id: entry.type_id,
                    ordinal,
                })
            }
            DataType::Object => Value::Object(self.read_tree()?),
            _ => return Err(SerializeError::UnhandledDataType { data_type }.into()),
        })
    }

    fn read_collection(&mut self, data_type: DataType) -> Result<Value> {
        self.enter()?;
        let value = if data_type.is_map() {
            let (kind, count) = self.decoder.read_map_header()?;
            let mut entries = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let key = self.read_element()?;
                let value = self.read_element()?;
                entries.push((key, value));
            }
            Value::Map(kind, entries)
        } else {
            let (kind, count) = self.decoder.read_collection_header()?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(self.read_element()?);
            }
            Value::Collection(kind, items)
        };
        self.depth -= 1;
        Ok(value)
    }

    fn read_time(&mut self, data_type: DataType) -> Result<Value> {
        let dec = &mut self.decoder;
        Ok(match data_type {
            DataType::Duration => Value::Duration(dec.read_duration()?),
            DataType::Instant => Value::Instant(dec.read_instant()?),
            DataType::LocalDate => Value::LocalDate(dec.read_local_date()?),
            DataType::LocalTime => Value::LocalTime(dec.read_local_time()?),
            DataType::LocalDateTime => Value::LocalDateTime(dec.read_local_date_time()?),
            DataType::OffsetDateTime => Value::OffsetDateTime(dec.read_offset_date_time()?),
            DataType::ZonedDateTime => Value::ZonedDateTime(dec.read_zoned_date_time()?),
            DataType::Period => Value::Period(dec.read_period()?),
            DataType::ZoneId => Value::ZoneId(dec.read_zone_id()?),
            DataType::ZoneOffset => Value::ZoneOffset(dec.read_zone_offset()?),
            _ => return Err(SerializeError::UnhandledDataType { data_type }.into()),
        })
    }
}
