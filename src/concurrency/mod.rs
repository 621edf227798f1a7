//! Thread-safe collections: a shared/exclusive-locked map and set, a
//! dedup-by-key work submission set, and a priority thread pool.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// A map guarded by a single shared/exclusive lock. Reads (lookup,
/// iteration) take a shared lock; inserts and erases take exclusive,
/// since reads dominate writes by an order of magnitude in practice.
#[derive(Debug)]
pub struct LockedMap<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V> Default for LockedMap<K, V> {
    fn default() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> LockedMap<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `false` (no-op) if `key` is already present.
    pub fn insert(&self, key: K, value: V) -> bool {
        let mut guard = self.inner.write();
        if guard.contains_key(&key) {
            return false;
        }
        guard.insert(key, value);
        true
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    pub fn keys_snapshot(&self) -> Vec<K> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        let guard = self.inner.read();
        for (k, v) in guard.iter() {
            f(k, v);
        }
    }
}

/// A set guarded the same way, used for the container's boundary index set.
#[derive(Debug)]
pub struct LockedSet<T> {
    inner: RwLock<HashSet<T>>,
}

impl<T: Eq + Hash + Clone> Default for LockedSet<T> {
    fn default() -> Self {
        Self { inner: RwLock::new(HashSet::new()) }
    }
}

impl<T: Eq + Hash + Clone> LockedSet<T> {
    pub fn contains(&self, value: &T) -> bool {
        self.inner.read().contains(value)
    }

    pub fn insert(&self, value: T) -> bool {
        self.inner.write().insert(value)
    }

    pub fn remove(&self, value: &T) -> bool {
        self.inner.write().remove(value)
    }

    pub fn snapshot(&self) -> HashSet<T> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Deduplicates task submissions by key: submitting a key that is already
/// queued or running is silently discarded. The scheduler in `pipeline`
/// tracks completions itself via channels, so this set only needs to track
/// which keys are currently claimed.
#[derive(Default)]
pub struct WorkSet<K> {
    pending: Arc<RwLock<HashSet<K>>>,
}

impl<K: Eq + Hash + Clone> WorkSet<K> {
    pub fn new() -> Self {
        Self { pending: Arc::new(RwLock::new(HashSet::new())) }
    }

    /// Attempts to claim `key`. Returns `true` if this caller won the race
    /// and should proceed to submit work; `false` if the key is already
    /// claimed.
    pub fn try_claim(&self, key: K) -> bool {
        self.pending.write().insert(key)
    }

    /// Releases `key`, to be called once the corresponding task completes
    /// (successfully, with an error, or because it was cancelled).
    pub fn release(&self, key: &K) {
        self.pending.write().remove(key);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.pending.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.pending.read().len()
    }
}

impl<K> Clone for WorkSet<K> {
    fn clone(&self) -> Self {
        Self { pending: Arc::clone(&self.pending) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_map_insert_is_noop_on_duplicate() {
        let map: LockedMap<i32, &str> = LockedMap::default();
        assert!(map.insert(1, "a"));
        assert!(!map.insert(1, "b"));
        assert_eq!(map.get(&1), Some("a"));
    }

    #[test]
    fn work_set_dedupes_concurrent_claims() {
        let set: WorkSet<i32> = WorkSet::new();
        assert!(set.try_claim(7));
        assert!(!set.try_claim(7));
        set.release(&7);
        assert!(set.try_claim(7));
    }
}
