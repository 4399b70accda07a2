// src/versioned_map.rs
//
// A map whose entries remember the logical version they were last written
// at, so a caller can ask "what changed since version V" (spec.md §3,
// "Versioned map"). Used for the goroutine peer's timespan change-feed.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

struct Entry<V> {
    value: V,
    version: u64,
}

struct Inner<K, V> {
    map: HashMap<K, Entry<V>>,
    version: u64,
}

/// Internally locked so callers don't need to hold an outer lock just to
/// read a consistent snapshot (spec.md §5: "readers see a consistent
/// snapshot at the version they queried").
pub struct VersionedMap<K, V> {
    inner: RwLock<Inner<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> VersionedMap<K, V> {
    pub fn new() -> Self {
        VersionedMap {
            inner: RwLock::new(Inner {
                map: HashMap::new(),
                version: 0,
            }),
        }
    }

    /// Associates `value` with `key` at the current version.
    pub fn set(&self, key: K, value: V) {
        let mut inner = self.inner.write().expect("versioned map lock poisoned");
        let version = inner.version;
        inner.map.insert(key, Entry { value, version });
    }

    /// Monotonically advances the version counter. Driven by logical time
    /// (e.g. a goroutine peer's logical tick index); a `v` not greater than
    /// the current version is a no-op.
    pub fn set_version(&self, v: u64) {
        let mut inner = self.inner.write().expect("versioned map lock poisoned");
        if v > inner.version {
            inner.version = v;
        }
    }

    pub fn current_version(&self) -> u64 {
        self.inner.read().expect("versioned map lock poisoned").version
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner
            .read()
            .expect("versioned map lock poisoned")
            .map
            .get(key)
            .map(|e| e.value.clone())
    }

    /// Returns every `(key, value)` whose most recent `set` had version
    /// strictly greater than `v0`.
    pub fn get_since_version(&self, v0: u64) -> Vec<(K, V)> {
        let inner = self.inner.read().expect("versioned map lock poisoned");
        inner
            .map
            .iter()
            .filter(|(_, e)| e.version > v0)
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner
            .write()
            .expect("versioned map lock poisoned")
            .map
            .remove(key)
            .map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("versioned map lock poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for VersionedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
