use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Unbounded insert-once cache for small, rarely changing objects
/// (parsed resource files, compiled tables). Emptied only by `clear`.
pub struct SmallObjectCache<K, V> {
    entries: DashMap<K, Arc<V>>,
}

impl<K: Eq + Hash, V> fmt::Debug for SmallObjectCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmallObjectCache").field("len", &self.entries.len()).finish()
    }
}

impl<K: Eq + Hash, V> Default for SmallObjectCache<K, V> {
    fn default() -> Self {
        Self { entries: DashMap::new() }
    }
}

impl<K: Eq + Hash + Clone, V> SmallObjectCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|v| Arc::clone(&v))
    }

    /// The first writer wins. A losing caller gets its own value back as
    /// `Err`.
    pub fn put(&self, key: K, value: V) -> Result<Arc<V>, V> {
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(value),
            Entry::Vacant(slot) => Ok(Arc::clone(slot.insert(Arc::new(value)).value())),
        }
    }

    /// `load` runs outside the map lock; if two callers race, both load
    /// and the first insert is kept.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&self, key: K, load: F) -> Arc<V> {
        if let Some(hit) = self.get(&key) {
            return hit;
        }
        let value = load();
        match self.entries.entry(key) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => Arc::clone(slot.insert(Arc::new(value)).value()),
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
