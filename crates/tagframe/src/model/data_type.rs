//! Data kinds understood by the engine.
//!
//! A data type id travels on the wire in three places: in inline class
//! metadata (one per field), after a TYPED tag for boxed collection
//! elements, and after a COLLECTION/MAP tag as the container kind.

/// The kind of a field or value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataType {
    /// Nested record, written through the tree walk.
    Object = 0,
    Boolean = 1,
    Character = 2,
    Enum = 3,
    Byte = 4,
    Short = 5,
    Integer = 6,
    Long = 7,
    Float = 8,
    Double = 9,
    String = 10,
    BigInteger = 11,
    BigDecimal = 12,
    Binary = 13,

    List = 20,
    Set = 21,
    SortedSet = 22,
    // 23 is unassigned.
    Deque = 24,
    Map = 25,
    SortedMap = 26,

    Duration = 30,
    Instant = 31,
    LocalDate = 32,
    LocalTime = 33,
    LocalDateTime = 34,
    OffsetDateTime = 35,
    ZonedDateTime = 36,
    Period = 37,
    ZoneId = 38,
    ZoneOffset = 39,
}

/// Dispatch family of a [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Integers, floats and arbitrary-precision numbers.
    Number,
    /// Collections and maps.
    Collection,
    /// Date and time kinds.
    Time,
    /// Booleans, characters, strings, binary, enums and nested records.
    Other,
}

impl DataType {
    /// Returns the wire id.
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Creates a DataType from its wire representation.
    pub fn from_u8(v: u8) -> Option<DataType> {
        Some(match v {
            0 => DataType::Object,
            1 => DataType::Boolean,
            2 => DataType::Character,
            3 => DataType::Enum,
            4 => DataType::Byte,
            5 => DataType::Short,
            6 => DataType::Integer,
            7 => DataType::Long,
            8 => DataType::Float,
            9 => DataType::Double,
            10 => DataType::String,
            11 => DataType::BigInteger,
            12 => DataType::BigDecimal,
            13 => DataType::Binary,
            20 => DataType::List,
            21 => DataType::Set,
            22 => DataType::SortedSet,
            24 => DataType::Deque,
            25 => DataType::Map,
            26 => DataType::SortedMap,
            30 => DataType::Duration,
            31 => DataType::Instant,
            32 => DataType::LocalDate,
            33 => DataType::LocalTime,
            34 => DataType::LocalDateTime,
            35 => DataType::OffsetDateTime,
            36 => DataType::ZonedDateTime,
            37 => DataType::Period,
            38 => DataType::ZoneId,
            39 => DataType::ZoneOffset,
            _ => return None,
        })
    }

    /// Returns the dispatch family.
    pub fn category(self) -> Category {
        match self as u8 {
            4..=9 | 11 | 12 => Category::Number,
            20..=26 => Category::Collection,
            30..=39 => Category::Time,
            _ => Category::Other,
        }
    }

    /// Returns true for the two map kinds.
    pub fn is_map(self) -> bool {
        matches!(self, DataType::Map | DataType::SortedMap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        for id in 0..=u8::MAX {
            if let Some(dt) = DataType::from_u8(id) {
                assert_eq!(dt.id(), id);
            }
        }
        assert_eq!(DataType::from_u8(14), None);
        assert_eq!(DataType::from_u8(23), None);
        assert_eq!(DataType::from_u8(40), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(DataType::Integer.category(), Category::Number);
        assert_eq!(DataType::BigDecimal.category(), Category::Number);
        assert_eq!(DataType::String.category(), Category::Other);
        assert_eq!(DataType::Enum.category(), Category::Other);
        assert_eq!(DataType::SortedMap.category(), Category::Collection);
        assert_eq!(DataType::ZoneOffset.category(), Category::Time);
        assert_eq!(DataType::Object.category(), Category::Other);
    }
}
