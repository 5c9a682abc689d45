//! Store implementation
//!
//! BTreeMap-based store with RwLock for concurrency.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::StoreMap;

/// Thread-safe key → ordered values mapping
///
/// ## Concurrency
/// - `get` and `read()` take the shared lock
/// - `set`, `delete` and `write()` take the exclusive lock
/// - All methods use `&self`
#[derive(Debug, Default)]
pub struct Store {
    data: RwLock<StoreMap>,
}

impl Store {
    /// Create a new empty Store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Store pre-populated with `map`
    pub fn from_map(map: StoreMap) -> Self {
        Self {
            data: RwLock::new(map),
        }
    }

    /// Current value of `key`, or an empty list if absent
    pub fn get(&self, key: &str) -> Vec<String> {
        self.read().get(key)
    }

    /// Replace the value of `key`
    pub fn set(&self, key: impl Into<String>, values: Vec<String>) {
        self.write().set(key, values);
    }

    /// Remove `key` if present
    pub fn delete(&self, key: &str) {
        self.write().delete(key);
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Deep copy of the current mapping
    pub fn to_map(&self) -> StoreMap {
        self.data.read().clone()
    }

    /// Acquire the shared lock
    pub fn read(&self) -> StoreReadGuard<'_> {
        StoreReadGuard {
            guard: self.data.read(),
        }
    }

    /// Acquire the exclusive lock
    pub fn write(&self) -> StoreWriteGuard<'_> {
        StoreWriteGuard {
            guard: self.data.write(),
        }
    }
}

/// Shared access to the Store for the lifetime of the guard
pub struct StoreReadGuard<'a> {
    guard: RwLockReadGuard<'a, StoreMap>,
}

impl StoreReadGuard<'_> {
    pub fn get(&self, key: &str) -> Vec<String> {
        self.guard.get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }

    /// The locked mapping
    pub fn map(&self) -> &StoreMap {
        &self.guard
    }
}

/// Exclusive access to the Store for the lifetime of the guard
pub struct StoreWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, StoreMap>,
}

impl StoreWriteGuard<'_> {
    pub fn get(&self, key: &str) -> Vec<String> {
        self.guard.get(key).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.guard.insert(key.into(), values);
    }

    /// Deleting an absent key is a no-op
    pub fn delete(&mut self, key: &str) {
        self.guard.remove(key);
    }

    /// Swap in a whole new mapping (snapshot load)
    pub fn replace_all(&mut self, map: StoreMap) {
        *self.guard = map;
    }

    pub fn clear(&mut self) {
        self.guard.clear();
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }

    /// The locked mapping
    pub fn map(&self) -> &StoreMap {
        &self.guard
    }
}
