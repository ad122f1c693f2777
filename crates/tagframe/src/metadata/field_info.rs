//! Per-field metadata.

use crate::model::DataType;

/// Class identifier value meaning "no nested type".
pub const NO_CLASS: i16 = -1;

/// Describes one field of a serialized type.
///
/// Two FieldInfo values are equal when every attribute matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    name: String,
    data_type: DataType,
    primitive: bool,
    class_identifier: i16,
    tag: Option<i16>,
}

impl FieldInfo {
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        primitive: bool,
        class_identifier: i16,
        tag: Option<i16>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            primitive,
            class_identifier,
            tag,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive
    }

    /// Identifier of the nested record or enum type, [`NO_CLASS`] if none.
    pub fn class_identifier(&self) -> i16 {
        self.class_identifier
    }

    pub fn tag(&self) -> Option<i16> {
        self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_covers_all_attributes() {
        let base = FieldInfo::new("a", DataType::Integer, true, NO_CLASS, None);
        assert_eq!(base, FieldInfo::new("a", DataType::Integer, true, NO_CLASS, None));
        assert_ne!(base, FieldInfo::new("b", DataType::Integer, true, NO_CLASS, None));
        assert_ne!(base, FieldInfo::new("a", DataType::Long, true, NO_CLASS, None));
        assert_ne!(base, FieldInfo::new("a", DataType::Integer, false, NO_CLASS, None));
        assert_ne!(base, FieldInfo::new("a", DataType::Integer, true, 100, None));
        assert_ne!(base, FieldInfo::new("a", DataType::Integer, true, NO_CLASS, Some(1)));
    }
}
