//! Stream-to-local field resolution.

use tracing::{debug, trace};

use crate::metadata::ClassInfo;
use crate::model::DataType;

/// Where one stream field goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Data type declared by the stream.
    pub stream_type: DataType,
    /// Name of the local field receiving the value; None discards it.
    pub local: Option<String>,
}

/// Resolution of every field of a stream-side class against the local class.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    signature: String,
    slots: Vec<Slot>,
}

impl FieldMapping {
    /// Resolves each stream field by tag when it has one, otherwise by
    /// case-insensitive name.
    pub fn new(stream: &ClassInfo, local: &ClassInfo) -> Self {
        let mut resolved = 0;
        let slots: Vec<Slot> = stream
            .fields()
            .iter()
            .map(|field| {
                let index = match field.tag() {
                    Some(tag) => local.find_by_tag(tag),
                    None => local.find_field(field.name()),
                };
                let local = index.and_then(|i| local.field(i)).map(|f| f.name().to_string());
                match &local {
                    Some(_) => resolved += 1,
                    None => trace!(
                        class = stream.name(),
                        field = field.name(),
                        tag = ?field.tag(),
                        "stream field has no local counterpart"
                    ),
                }
                Slot {
                    stream_type: field.data_type(),
                    local,
                }
            })
            .collect();
        debug!(
            class = stream.name(),
            signature = stream.signature(),
            resolved,
            unresolved = slots.len() - resolved,
            "built field mapping"
        );
        Self {
            signature: stream.signature().to_string(),
            slots,
        }
    }

    /// Signature of the stream-side class.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FieldInfo, NO_CLASS};

    fn class(fields: Vec<FieldInfo>) -> ClassInfo {
        ClassInfo::new(100, "Person", fields).unwrap()
    }

    fn field(name: &str, tag: Option<i16>) -> FieldInfo {
        FieldInfo::new(name, DataType::String, false, NO_CLASS, tag)
    }

    #[test]
    fn test_resolution_by_name_and_tag() {
        let stream = class(vec![
            field("Name", None),
            field("legacy", None),
            field("surname", Some(7)),
        ]);
        let local = class(vec![field("name", None), field("familyName", Some(7))]);
        let mapping = FieldMapping::new(&stream, &local);
        let targets: Vec<_> = mapping.slots().iter().map(|s| s.local.as_deref()).collect();
        assert_eq!(targets, vec![Some("name"), None, Some("familyName")]);
        assert_eq!(mapping.signature(), stream.signature());
    }

    #[test]
    fn test_tagged_field_does_not_fall_back_to_name() {
        let stream = class(vec![field("code", Some(3))]);
        let local = class(vec![field("code", Some(4))]);
        let mapping = FieldMapping::new(&stream, &local);
        assert_eq!(mapping.slots()[0].local, None);
    }
}
