//! Type identifier table.
//!
//! Binds each record and enumeration type to a short identifier. Lookups
//! take a read lock; registration takes the write lock, so two threads
//! registering the same identifier cannot both succeed.

use std::any::TypeId;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::Options;
use crate::error::MetadataError;
use crate::model::{DataType, Enumeration, FieldDef, Record, RecordType};

use super::class_info::ClassInfo;
use super::field_info::{FieldInfo, NO_CLASS};

/// Type-erased accessors for a registered record type.
#[derive(Clone, Copy)]
pub struct RecordFns {
    pub fields: fn() -> Vec<FieldDef>,
    pub parent_fields: fn() -> Vec<FieldDef>,
    pub construct: fn() -> Option<Box<dyn Record>>,
}

fn construct_boxed<T: RecordType>() -> Option<Box<dyn Record>> {
    T::construct().map(|r| Box::new(r) as Box<dyn Record>)
}

/// What a registered identifier refers to.
#[derive(Clone, Copy)]
pub enum TypeKind {
    Record(RecordFns),
    Enumeration { variants: &'static [&'static str] },
}

/// One registered type.
#[derive(Clone)]
pub struct TypeEntry {
    pub identifier: i16,
    pub name: &'static str,
    pub type_id: TypeId,
    pub kind: TypeKind,
}

impl std::fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeEntry")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .finish()
    }
}

impl TypeEntry {
    /// Returns the record accessors, or an error if this is an enumeration.
    pub fn record(&self) -> Result<&RecordFns, MetadataError> {
        match &self.kind {
            TypeKind::Record(fns) => Ok(fns),
            TypeKind::Enumeration { .. } => Err(MetadataError::WrongKind {
                identifier: self.identifier,
                name: self.name,
                expected: "a record",
            }),
        }
    }

    /// Returns the variant names, or an error if this is a record.
    pub fn variants(&self) -> Result<&'static [&'static str], MetadataError> {
        match self.kind {
            TypeKind::Enumeration { variants } => Ok(variants),
            TypeKind::Record(_) => Err(MetadataError::WrongKind {
                identifier: self.identifier,
                name: self.name,
                expected: "an enumeration",
            }),
        }
    }
}

#[derive(Default)]
struct Tables {
    by_id: FxHashMap<i16, Arc<TypeEntry>>,
    by_type: FxHashMap<TypeId, i16>,
}

/// Registry of type identifiers.
pub struct TypeTable {
    min_identifier: i16,
    max_identifier: i16,
    tables: RwLock<Tables>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new(&Options::default())
    }
}

impl TypeTable {
    /// Creates an empty table accepting the identifier window of `options`.
    pub fn new(options: &Options) -> Self {
        Self {
            min_identifier: options.min_identifier,
            max_identifier: options.max_identifier,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Binds record type `T` to `identifier`.
    ///
    /// Registering the same type under the same identifier again is a no-op.
    pub fn register<T: RecordType>(&self, identifier: i32) -> Result<i16, MetadataError> {
        let fns = RecordFns {
            fields: T::fields,
            parent_fields: T::parent_fields,
            construct: construct_boxed::<T>,
        };
        self.insert(
            identifier,
            T::type_name(),
            TypeId::of::<T>(),
            TypeKind::Record(fns),
        )
    }

    /// Binds enumeration `E` to `identifier`.
    pub fn register_enum<E: Enumeration>(&self, identifier: i32) -> Result<i16, MetadataError> {
        self.insert(
            identifier,
            E::type_name(),
            TypeId::of::<E>(),
            TypeKind::Enumeration {
                variants: E::variants(),
            },
        )
    }

    fn insert(
        &self,
        identifier: i32,
        name: &'static str,
        type_id: TypeId,
        kind: TypeKind,
    ) -> Result<i16, MetadataError> {
        if identifier < self.min_identifier as i32 || identifier >= self.max_identifier as i32 {
            return Err(MetadataError::IdentifierOutOfRange {
                identifier,
                min: self.min_identifier,
                max: self.max_identifier,
            });
        }
        let identifier = identifier as i16;

        let mut tables = self.tables.write();
        if let Some(existing) = tables.by_id.get(&identifier) {
            if existing.type_id == type_id {
                return Ok(identifier);
            }
            return Err(MetadataError::IdentifierConflict {
                identifier,
                existing: existing.name,
                requested: name,
            });
        }
        if let Some(&bound) = tables.by_type.get(&type_id) {
            return Err(MetadataError::AlreadyRegistered {
                name,
                identifier: bound,
            });
        }
        tables.by_id.insert(
            identifier,
            Arc::new(TypeEntry {
                identifier,
                name,
                type_id,
                kind,
            }),
        );
        tables.by_type.insert(type_id, identifier);
        debug!(identifier, name, "registered type");
        Ok(identifier)
    }

    /// Returns the identifier bound to `type_id`.
    pub fn identifier(&self, type_id: TypeId) -> Option<i16> {
        self.tables.read().by_type.get(&type_id).copied()
    }

    /// Returns the identifier bound to `T`.
    pub fn identifier_of<T: 'static>(&self) -> Option<i16> {
        self.identifier(TypeId::of::<T>())
    }

    /// Returns the entry bound to `identifier`.
    pub fn entry(&self, identifier: i16) -> Result<Arc<TypeEntry>, MetadataError> {
        self.tables
            .read()
            .by_id
            .get(&identifier)
            .cloned()
            .ok_or(MetadataError::UnknownIdentifier { identifier })
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().by_id.is_empty()
    }

    /// Builds class metadata for the record registered under `identifier`.
    ///
    /// Own fields come first, then inherited fields nearest ancestor first.
    /// Skipped fields are left out.
    pub fn build_class_info(&self, identifier: i16) -> Result<ClassInfo, MetadataError> {
        let entry = self.entry(identifier)?;
        let fns = entry.record()?;
        let defs = (fns.fields)()
            .into_iter()
            .chain((fns.parent_fields)())
            .filter(|def| !def.skip);

        let mut fields = Vec::new();
        for def in defs {
            let class_identifier = match (def.data_type, def.class) {
                (DataType::Object | DataType::Enum, Some(type_id)) => self
                    .identifier(type_id)
                    .ok_or_else(|| MetadataError::UnregisteredType {
                        name: format!("{}.{}", entry.name, def.name),
                    })?,
                _ => NO_CLASS,
            };
            fields.push(FieldInfo::new(
                def.name,
                def.data_type,
                def.primitive,
                class_identifier,
                def.tag,
            ));
        }
        ClassInfo::new(identifier, entry.name, fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{enumeration, record};

    enumeration! {
        enum Shade { Light, Dark }
    }

    record! {
        #[derive(Debug, Clone, Default)]
        struct Leaf {
            shade: Shade,
            label: String,
        }
    }

    record! {
        #[derive(Debug, Clone, Default)]
        struct Branch {
            leaf: Option<Leaf>,
            weight: f64,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let table = TypeTable::default();
        assert_eq!(table.register::<Leaf>(100).unwrap(), 100);
        assert_eq!(table.register_enum::<Shade>(101).unwrap(), 101);
        assert_eq!(table.identifier_of::<Leaf>(), Some(100));
        assert_eq!(table.entry(101).unwrap().name, "Shade");
        assert_eq!(table.entry(101).unwrap().variants().unwrap(), &["Light", "Dark"]);
        assert!(table.entry(100).unwrap().variants().is_err());
        assert!(matches!(
            table.entry(102),
            Err(MetadataError::UnknownIdentifier { identifier: 102 })
        ));
    }

    #[test]
    fn test_register_rules() {
        let table = TypeTable::default();
        table.register::<Leaf>(100).unwrap();
        // Same binding again is fine.
        table.register::<Leaf>(100).unwrap();
        assert!(matches!(
            table.register::<Branch>(100),
            Err(MetadataError::IdentifierConflict { existing: "Leaf", .. })
        ));
        assert!(matches!(
            table.register::<Leaf>(105),
            Err(MetadataError::AlreadyRegistered { identifier: 100, .. })
        ));
        assert!(matches!(
            table.register::<Branch>(99),
            Err(MetadataError::IdentifierOutOfRange { .. })
        ));
        assert!(matches!(
            table.register::<Branch>(20_000),
            Err(MetadataError::IdentifierOutOfRange { .. })
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_build_class_info() {
        let table = TypeTable::default();
        table.register::<Leaf>(100).unwrap();
        table.register::<Branch>(200).unwrap();
        assert!(matches!(
            table.build_class_info(100),
            Err(MetadataError::UnregisteredType { .. })
        ));

        table.register_enum::<Shade>(101).unwrap();
        let leaf = table.build_class_info(100).unwrap();
        assert_eq!(leaf.fields()[0].class_identifier(), 101);
        assert_eq!(leaf.fields()[1].class_identifier(), NO_CLASS);

        let branch = table.build_class_info(200).unwrap();
        assert_eq!(branch.name(), "Branch");
        assert_eq!(branch.fields()[0].class_identifier(), 100);
        assert!(!branch.fields()[0].is_primitive());
        assert!(branch.fields()[1].is_primitive());

        assert!(matches!(
            table.build_class_info(101),
            Err(MetadataError::WrongKind { .. })
        ));
    }
}
