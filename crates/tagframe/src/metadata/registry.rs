//! External metadata registries.
//!
//! A registry maps class signatures to full class metadata. When it is
//! available only the signature is written to the stream; otherwise the
//! metadata is written inline. Registry failures never fail an encode.

use std::error::Error as StdError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::MetadataError;
use crate::limits::DEFAULT_REFRESH_INTERVAL;

use super::class_info::ClassInfo;

/// Error raised by a registry backend.
pub type BackendError = Box<dyn StdError + Send + Sync>;

/// Signature-keyed store for class metadata.
pub trait Registry: Send + Sync {
    fn name(&self) -> &str;

    /// Returns true if the registry can currently store and load metadata.
    fn is_available(&self) -> bool;

    /// Number of times the registry was found unavailable.
    fn unavailable_count(&self) -> u64;

    /// Persists `class` and returns its signature, or None if the metadata
    /// must be written inline instead.
    fn store(&self, class: &ClassInfo) -> Option<String>;

    /// Loads the metadata stored under `signature`.
    fn load(&self, signature: &str) -> Result<ClassInfo, MetadataError>;
}

/// Storage behind a [`CachingRegistry`].
pub trait RegistryBackend: Send + Sync {
    /// Checks whether the backend is reachable.
    fn probe(&self) -> Result<bool, BackendError>;

    /// Persists `class`, returning the signature it is stored under.
    fn store(&self, class: &ClassInfo) -> Result<String, BackendError>;

    /// Loads metadata by signature; Ok(None) if unknown.
    fn load(&self, signature: &str) -> Result<Option<ClassInfo>, BackendError>;
}

/// One backend shared by several caching registries.
impl<B: RegistryBackend> RegistryBackend for Arc<B> {
    fn probe(&self) -> Result<bool, BackendError> {
        (**self).probe()
    }

    fn store(&self, class: &ClassInfo) -> Result<String, BackendError> {
        (**self).store(class)
    }

    fn load(&self, signature: &str) -> Result<Option<ClassInfo>, BackendError> {
        (**self).load(signature)
    }
}

// =============================================================================
// CACHING REGISTRY
// =============================================================================

#[derive(Debug, Default)]
struct Availability {
    available: Option<bool>,
    checked_at: Option<Instant>,
}

#[derive(Default)]
struct Caches {
    by_signature: FxHashMap<String, ClassInfo>,
    /// Local signature to stored signature.
    by_class: FxHashMap<String, String>,
}

/// A [`Registry`] over a [`RegistryBackend`] that caches availability and
/// metadata.
///
/// Availability is probed at most once per refresh interval. A cache hit
/// never touches the backend.
pub struct CachingRegistry<B> {
    name: String,
    backend: B,
    refresh_interval: Duration,
    availability: Mutex<Availability>,
    unavailable: AtomicU64,
    caches: RwLock<Caches>,
}

impl<B: RegistryBackend> CachingRegistry<B> {
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        Self {
            name: name.into(),
            backend,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            availability: Mutex::new(Availability::default()),
            unavailable: AtomicU64::new(0),
            caches: RwLock::new(Caches::default()),
        }
    }

    /// Sets how long a probe result is trusted.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn mark(&self, available: bool) {
        let mut state = self.availability.lock();
        state.available = Some(available);
        if !available {
            self.unavailable.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn remember(&self, class: &ClassInfo, signature: &str) {
        let mut caches = self.caches.write();
        caches
            .by_signature
            .insert(signature.to_string(), class.clone());
        caches
            .by_class
            .insert(class.signature().to_string(), signature.to_string());
    }
}

impl<B: RegistryBackend> Registry for CachingRegistry<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        let mut state = self.availability.lock();
        if let (Some(available), Some(at)) = (state.available, state.checked_at) {
            if at.elapsed() < self.refresh_interval {
                return available;
            }
        }
        state.checked_at = Some(Instant::now());
        let available = match self.backend.probe() {
            Ok(available) => available,
            Err(e) => {
                warn!(registry = %self.name, error = %e, "registry probe failed");
                false
            }
        };
        if !available {
            self.unavailable.fetch_add(1, Ordering::Relaxed);
        }
        state.available = Some(available);
        available
    }

    fn unavailable_count(&self) -> u64 {
        self.unavailable.load(Ordering::Relaxed)
    }

    fn store(&self, class: &ClassInfo) -> Option<String> {
        if let Some(signature) = self.caches.read().by_class.get(class.signature()) {
            return Some(signature.clone());
        }
        if !self.is_available() {
            return None;
        }
        match self.backend.store(class) {
            Ok(signature) => {
                self.remember(class, &signature);
                self.mark(true);
                Some(signature)
            }
            Err(e) => {
                warn!(registry = %self.name, class = class.name(), error = %e, "registry store failed");
                self.mark(false);
                None
            }
        }
    }

    fn load(&self, signature: &str) -> Result<ClassInfo, MetadataError> {
        if let Some(class) = self.caches.read().by_signature.get(signature) {
            return Ok(class.clone());
        }
        if !self.is_available() {
            return Err(MetadataError::Unavailable {
                registry: self.name.clone(),
                reason: "registry is not available".to_string(),
            });
        }
        match self.backend.load(signature) {
            Ok(Some(class)) => {
                self.remember(&class, signature);
                Ok(class)
            }
            Ok(None) => Err(MetadataError::Unavailable {
                registry: self.name.clone(),
                reason: format!("no class information for signature '{signature}'"),
            }),
            Err(e) => {
                warn!(registry = %self.name, %signature, error = %e, "registry load failed");
                self.mark(false);
                Err(MetadataError::Unavailable {
                    registry: self.name.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

// =============================================================================
// NULL REGISTRY
// =============================================================================

/// A registry that is never available; metadata is always written inline.
#[derive(Debug, Default)]
pub struct NullRegistry {
    unavailable: AtomicU64,
}

impl NullRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for NullRegistry {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn unavailable_count(&self) -> u64 {
        self.unavailable.load(Ordering::Relaxed)
    }

    fn store(&self, _class: &ClassInfo) -> Option<String> {
        self.is_available();
        None
    }

    fn load(&self, signature: &str) -> Result<ClassInfo, MetadataError> {
        self.is_available();
        Err(MetadataError::Unavailable {
            registry: self.name().to_string(),
            reason: format!("cannot resolve signature '{signature}'"),
        })
    }
}

// =============================================================================
// MEMORY BACKEND
// =============================================================================

/// In-process backend keeping metadata in its framed binary form.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<FxHashMap<String, Vec<u8>>>,
    online: AtomicBool,
    stores: AtomicUsize,
    loads: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            online: AtomicBool::new(true),
            stores: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the backend on or off.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of store calls that reached this backend.
    pub fn store_calls(&self) -> usize {
        self.stores.load(Ordering::Relaxed)
    }

    /// Number of load calls that reached this backend.
    pub fn load_calls(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.online.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err("memory backend is offline".into())
        }
    }
}

impl RegistryBackend for MemoryBackend {
    fn probe(&self) -> Result<bool, BackendError> {
        Ok(self.online.load(Ordering::Relaxed))
    }

    fn store(&self, class: &ClassInfo) -> Result<String, BackendError> {
        self.stores.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let bytes = class.to_bytes()?;
        let signature = class.signature().to_string();
        self.entries.write().insert(signature.clone(), bytes);
        Ok(signature)
    }

    fn load(&self, signature: &str) -> Result<Option<ClassInfo>, BackendError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let entries = self.entries.read();
        match entries.get(signature) {
            Some(bytes) => Ok(Some(ClassInfo::from_bytes(bytes)?)),
            None => Ok(None),
        }
    }
}

/// A [`CachingRegistry`] over a [`MemoryBackend`].
pub type MemoryRegistry = CachingRegistry<MemoryBackend>;

impl MemoryRegistry {
    /// Creates an in-memory registry named `memory`.
    pub fn in_memory() -> Self {
        CachingRegistry::new("memory", MemoryBackend::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::field_info::{FieldInfo, NO_CLASS};
    use crate::model::DataType;

    fn sample(identifier: i16) -> ClassInfo {
        ClassInfo::new(
            identifier,
            "Sample",
            vec![FieldInfo::new("value", DataType::Integer, true, NO_CLASS, None)],
        )
        .unwrap()
    }

    #[test]
    fn test_store_and_load() {
        let registry = MemoryRegistry::in_memory();
        let class = sample(100);
        let signature = registry.store(&class).unwrap();
        assert_eq!(signature, class.signature());
        assert_eq!(registry.backend().len(), 1);

        // Served from cache.
        let loaded = registry.load(&signature).unwrap();
        assert_eq!(loaded, class);
        assert_eq!(registry.backend().load_calls(), 0);

        // A second store is a cache hit as well.
        registry.store(&class).unwrap();
        assert_eq!(registry.backend().store_calls(), 1);
    }

    #[test]
    fn test_load_from_backend_after_restart() {
        let backend = MemoryBackend::new();
        let class = sample(100);
        backend.store(&class).unwrap();

        let registry = CachingRegistry::new("memory", backend);
        let loaded = registry.load(class.signature()).unwrap();
        assert_eq!(loaded.fields(), class.fields());
        assert_eq!(registry.backend().load_calls(), 1);
        registry.load(class.signature()).unwrap();
        assert_eq!(registry.backend().load_calls(), 1);
    }

    #[test]
    fn test_unknown_signature() {
        let registry = MemoryRegistry::in_memory();
        let err = registry.load("0064-0000000000000000").unwrap_err();
        assert!(matches!(err, MetadataError::Unavailable { .. }));
        assert_eq!(registry.unavailable_count(), 0);
    }

    #[test]
    fn test_offline_backend_falls_back() {
        let registry = MemoryRegistry::in_memory().with_refresh_interval(Duration::ZERO);
        registry.backend().set_online(false);
        assert_eq!(registry.store(&sample(100)), None);
        assert!(registry.load("0064-0000000000000000").is_err());
        assert_eq!(registry.unavailable_count(), 2);

        registry.backend().set_online(true);
        assert!(registry.store(&sample(100)).is_some());
        assert_eq!(registry.unavailable_count(), 2);
    }

    #[test]
    fn test_availability_cached_within_interval() {
        let registry = MemoryRegistry::in_memory().with_refresh_interval(Duration::from_secs(3600));
        assert!(registry.is_available());
        registry.backend().set_online(false);
        // Still trusted from the first probe.
        assert!(registry.is_available());
        assert_eq!(registry.unavailable_count(), 0);

        // The store itself fails and flips availability.
        assert_eq!(registry.store(&sample(101)), None);
        assert_eq!(registry.unavailable_count(), 1);
        assert!(!registry.is_available());
    }

    #[test]
    fn test_null_registry() {
        let registry = NullRegistry::new();
        assert!(!registry.is_available());
        assert_eq!(registry.store(&sample(100)), None);
        assert!(matches!(
            registry.load("x"),
            Err(MetadataError::Unavailable { .. })
        ));
        assert_eq!(registry.unavailable_count(), 3);
    }
}
