//! Type metadata: field and class descriptions, identifier table and
//! external registries.

mod class_info;
mod field_info;
mod registry;
mod types;

pub use class_info::ClassInfo;
pub use field_info::{FieldInfo, NO_CLASS};
pub use registry::{
    BackendError, CachingRegistry, MemoryBackend, MemoryRegistry, NullRegistry,
    Registry, RegistryBackend,
};
pub use types::{RecordFns, TypeEntry, TypeKind, TypeTable};
