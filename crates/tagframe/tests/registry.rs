//! Class metadata across streams: inline headers, registry signatures and
//! per-stream de-duplication.

use std::sync::Arc;

use tagframe::codec::tags;
use tagframe::limits::HEADER_LEN;
use tagframe::metadata::NO_CLASS;
use tagframe::{
    record, CachingRegistry, ClassInfo, Context, DataType, ErrorCode, FieldInfo, MemoryBackend,
    MemoryRegistry, NullRegistry, Registry,
};

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Item {
        pub sku: String,
        pub quantity: i32,
    }
}

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Order {
        pub id: i64,
        pub items: Vec<Item>,
    }
}

fn context(registry: Arc<dyn Registry>) -> Context {
    let ctx = Context::new().with_registry(registry);
    ctx.register::<Item>(100).unwrap();
    ctx.register::<Order>(101).unwrap();
    ctx
}

fn order(count: usize) -> Order {
    Order {
        id: 42,
        items: vec![
            Item {
                sku: "A-1".to_string(),
                quantity: 3,
            };
            count
        ],
    }
}

#[test]
fn test_metadata_written_once_per_stream() {
    let ctx = context(Arc::new(NullRegistry::new()));
    let len = |n| ctx.to_bytes(&order(n)).unwrap().len();
    let one = len(1);
    let item = len(2) - one;
    // Four more identical items cost four item bodies and no metadata.
    assert_eq!(len(5) - one, 4 * item);

    let bytes = ctx.to_bytes(&order(5)).unwrap();
    assert_eq!(ctx.from_bytes::<Order>(&bytes).unwrap(), order(5));
}

#[test]
fn test_null_registry_writes_inline_metadata() {
    let registry = Arc::new(NullRegistry::new());
    let ctx = context(registry.clone());
    let bytes = ctx.to_bytes(&order(2)).unwrap();
    assert_eq!(bytes[HEADER_LEN], tags::CLASS_INFO);
    assert!(registry.unavailable_count() >= 2);

    // Inline metadata decodes without any registry.
    let reader = context(Arc::new(NullRegistry::new()));
    assert_eq!(reader.from_bytes::<Order>(&bytes).unwrap(), order(2));
}

#[test]
fn test_offline_registry_falls_back_to_inline() {
    let registry = Arc::new(MemoryRegistry::in_memory());
    registry.backend().set_online(false);
    let ctx = context(registry.clone());
    let bytes = ctx.to_bytes(&order(1)).unwrap();
    assert_eq!(bytes[HEADER_LEN], tags::CLASS_INFO);
    assert!(registry.unavailable_count() >= 1);
    assert!(registry.backend().is_empty());
    assert_eq!(ctx.from_bytes::<Order>(&bytes).unwrap(), order(1));
}

#[test]
fn test_signature_only_stream() {
    let backend = Arc::new(MemoryBackend::new());
    let writer = context(Arc::new(CachingRegistry::new("writer", backend.clone())));
    let reader_registry = Arc::new(CachingRegistry::new("reader", backend.clone()));
    let reader = context(reader_registry.clone());

    let bytes = writer.to_bytes(&order(3)).unwrap();
    assert_eq!(bytes[HEADER_LEN], tags::CLASS_SIGNATURE);
    assert_eq!(backend.len(), 2);

    assert_eq!(reader.from_bytes::<Order>(&bytes).unwrap(), order(3));
    assert_eq!(backend.load_calls(), 2);

    // Later streams hit the reader's cache.
    let again = writer.to_bytes(&order(1)).unwrap();
    assert_eq!(reader.from_bytes::<Order>(&again).unwrap(), order(1));
    assert_eq!(backend.load_calls(), 2);
    assert_eq!(backend.store_calls(), 2);
    assert_eq!(reader_registry.unavailable_count(), 0);
}

#[test]
fn test_signature_stream_without_registry_is_unavailable() {
    let writer = context(Arc::new(MemoryRegistry::in_memory()));
    let bytes = writer.to_bytes(&order(1)).unwrap();

    let reader = context(Arc::new(NullRegistry::new()));
    let err = reader.from_bytes::<Order>(&bytes).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MetadataUnavailable);
}

fn field(name: &str, data_type: DataType) -> FieldInfo {
    FieldInfo::new(name, data_type, false, NO_CLASS, None)
}

#[test]
fn test_signature_stability() {
    let a = ClassInfo::new(
        100,
        "Item",
        vec![field("sku", DataType::String), field("quantity", DataType::Integer)],
    )
    .unwrap();
    let reordered = ClassInfo::new(
        100,
        "Item",
        vec![field("quantity", DataType::Integer), field("sku", DataType::String)],
    )
    .unwrap();
    assert_eq!(a.signature(), reordered.signature());
    assert_eq!(a, reordered);

    let retyped = ClassInfo::new(
        100,
        "Item",
        vec![field("sku", DataType::String), field("quantity", DataType::Long)],
    )
    .unwrap();
    assert_ne!(a.signature(), retyped.signature());

    let extended = ClassInfo::new(
        100,
        "Item",
        vec![
            field("sku", DataType::String),
            field("quantity", DataType::Integer),
            field("note", DataType::String),
        ],
    )
    .unwrap();
    assert_ne!(a.signature(), extended.signature());

    let ctx = context(Arc::new(NullRegistry::new()));
    assert_eq!(ctx.class_info::<Item>().unwrap().signature(), a.signature());
    assert!(a.signature().starts_with("0064-"));
}
