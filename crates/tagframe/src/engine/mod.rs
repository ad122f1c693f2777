//! Serialization engine.
//!
//! A [`Context`] owns the type table, the per-type class metadata cache and
//! the metadata registry. It is shared by reference between any number of
//! [`Serializer`] and [`Deserializer`] sessions, each of which owns the
//! per-stream state for one sink or source.

mod mapping;
mod reader;
mod writer;

use std::io::{Read, Write};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::Options;
use crate::error::Result;
use crate::metadata::{ClassInfo, NullRegistry, Registry, TypeTable};
use crate::model::{Enumeration, Record, RecordType};

pub use mapping::{FieldMapping, Slot};
pub use reader::Deserializer;
pub use writer::Serializer;

/// Shared serialization state.
pub struct Context {
    options: Options,
    types: TypeTable,
    classes: RwLock<FxHashMap<i16, Arc<ClassInfo>>>,
    registry: Arc<dyn Registry>,
}

impl Default for Context {
    fn default() -> Self {
        Self::with_options(Options::default())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("options", &self.options)
            .field("types", &self.types.len())
            .field("registry", &self.registry.name())
            .finish()
    }
}

impl Context {
    /// Creates a context with default options and no metadata registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            types: TypeTable::new(&options),
            options,
            classes: RwLock::new(FxHashMap::default()),
            registry: Arc::new(NullRegistry::new()),
        }
    }

    /// Replaces the metadata registry.
    pub fn with_registry(mut self, registry: Arc<dyn Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn registry(&self) -> &dyn Registry {
        &*self.registry
    }

    /// Binds record type `T` to `identifier`.
    pub fn register<T: RecordType>(&self, identifier: i32) -> Result<i16> {
        Ok(self.types.register::<T>(identifier)?)
    }

    /// Binds enumeration `E` to `identifier`.
    pub fn register_enum<E: Enumeration>(&self, identifier: i32) -> Result<i16> {
        Ok(self.types.register_enum::<E>(identifier)?)
    }

    /// Returns the class metadata of registered type `T`.
    pub fn class_info<T: RecordType>(&self) -> Result<Arc<ClassInfo>> {
        let identifier = self.types.identifier_of::<T>().ok_or_else(|| {
            crate::error::MetadataError::UnregisteredType {
                name: T::type_name().to_string(),
            }
        })?;
        self.class_info_by_id(identifier)
    }

    /// Returns the class metadata of the record registered under
    /// `identifier`, building it on first use.
    pub fn class_info_by_id(&self, identifier: i16) -> Result<Arc<ClassInfo>> {
        if let Some(class) = self.classes.read().get(&identifier) {
            return Ok(class.clone());
        }
        let built = Arc::new(self.types.build_class_info(identifier)?);
        // Two threads may build concurrently; the first insert wins.
        let mut classes = self.classes.write();
        Ok(classes.entry(identifier).or_insert(built).clone())
    }

    /// Opens a write session on `sink`.
    pub fn serializer<W: Write>(&self, sink: W) -> Serializer<'_, W> {
        Serializer::new(self, sink)
    }

    /// Opens a read session on `source`.
    pub fn deserializer<R: Read>(&self, source: R) -> Deserializer<'_, R> {
        Deserializer::new(self, source)
    }

    /// Writes `value` as a complete stream and returns the sink.
    pub fn serialize<T: Record, W: Write>(&self, value: &T, sink: W) -> Result<W> {
        let mut ser = self.serializer(sink);
        ser.write(value)?;
        ser.finish()
    }

    pub fn to_bytes<T: Record>(&self, value: &T) -> Result<Vec<u8>> {
        self.serialize(value, Vec::new())
    }

    /// Reads one record of type `T` from `source`.
    pub fn deserialize<T: RecordType, R: Read>(&self, source: R) -> Result<T> {
        self.deserializer(source).read()
    }

    pub fn from_bytes<T: RecordType>(&self, bytes: &[u8]) -> Result<T> {
        self.deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tags;
    use crate::error::{DecodeError, Error, MetadataError, SerializeError};
    use crate::{enumeration, record};

    enumeration! {
        enum Level { Low, Mid, High }
    }

    record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Node {
            label: String,
            level: Level,
            children: Vec<Node>,
        }
    }

    record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Pair {
            left: Option<Node>,
            right: Option<Node>,
        }
    }

    fn context() -> Context {
        let ctx = Context::new();
        ctx.register::<Node>(100).unwrap();
        ctx.register::<Pair>(101).unwrap();
        ctx.register_enum::<Level>(102).unwrap();
        ctx
    }

    fn leaf(label: &str) -> Node {
        Node {
            label: label.to_string(),
            level: Level::Mid,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_round_trip_nested() {
        let ctx = context();
        let tree = Node {
            label: "root".to_string(),
            level: Level::High,
            children: vec![leaf("a"), leaf("b")],
        };
        let bytes = ctx.to_bytes(&tree).unwrap();
        assert_eq!(ctx.from_bytes::<Node>(&bytes).unwrap(), tree);
    }

    #[test]
    fn test_class_info_cached() {
        let ctx = context();
        let first = ctx.class_info::<Node>().unwrap();
        let second = ctx.class_info_by_id(100).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_metadata_written_once_per_stream() {
        let ctx = context();
        let mut ser = ctx.serializer(Vec::new());
        for i in 0..5 {
            ser.write(&leaf(&i.to_string())).unwrap();
        }
        assert_eq!(ser.classes_written(), 1);
        let bytes = ser.finish().unwrap();

        let mut de = ctx.deserializer(bytes.as_slice());
        for i in 0..5 {
            assert_eq!(de.read::<Node>().unwrap().label, i.to_string());
        }
        assert!(de.at_end().unwrap());
    }

    #[test]
    fn test_null_fields() {
        let ctx = context();
        let pair = Pair {
            left: Some(leaf("x")),
            right: None,
        };
        let bytes = ctx.to_bytes(&pair).unwrap();
        assert_eq!(ctx.from_bytes::<Pair>(&bytes).unwrap(), pair);
    }

    #[test]
    fn test_root_mismatch() {
        let ctx = context();
        let bytes = ctx.to_bytes(&leaf("x")).unwrap();
        let err = ctx.from_bytes::<Pair>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Serialize(SerializeError::RootMismatch { expected: "Pair", .. })
        ));
    }

    #[test]
    fn test_unregistered_type() {
        let ctx = Context::new();
        let err = ctx.to_bytes(&leaf("x")).unwrap_err();
        assert!(matches!(
            err,
            Error::Metadata(MetadataError::UnregisteredType { .. })
        ));
    }

    #[test]
    fn test_depth_limits() {
        let ctx = Context::with_options(Options::new().max_depth(4));
        ctx.register::<Node>(100).unwrap();
        ctx.register_enum::<Level>(102).unwrap();

        let mut deep = leaf("bottom");
        for _ in 0..4 {
            deep = Node {
                label: "up".to_string(),
                level: Level::Low,
                children: vec![deep],
            };
        }
        let err = ctx.to_bytes(&deep).unwrap_err();
        assert!(matches!(
            err,
            Error::Serialize(SerializeError::DepthExceeded { max: 4 })
        ));

        let unlimited = context();
        let bytes = unlimited.to_bytes(&deep).unwrap();
        let err = ctx.from_bytes::<Node>(&bytes).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::DepthExceeded { max: 4 })));
    }

    #[test]
    fn test_default_registries_are_independent() {
        let a = context();
        let b = context();
        a.to_bytes(&leaf("x")).unwrap();
        assert!(a.registry().unavailable_count() > 0);
        assert_eq!(b.registry().unavailable_count(), 0);

        let before = a.registry().unavailable_count();
        b.to_bytes(&leaf("y")).unwrap();
        assert_eq!(a.registry().unavailable_count(), before);
    }

    #[test]
    fn test_stream_starts_with_class_info() {
        let ctx = context();
        let bytes = ctx.to_bytes(&leaf("x")).unwrap();
        assert_eq!(bytes[crate::limits::HEADER_LEN], tags::CLASS_INFO);
    }
}
