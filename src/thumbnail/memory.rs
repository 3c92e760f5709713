/// Bounded in-memory cache for decoded images
///
/// Owned by whatever displays images. Holds at most `capacity` values and
/// evicts the least recently used one when full. A capacity of zero holds
/// nothing.
use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

#[derive(Debug)]
pub struct ImageCache<K: Hash + Eq, V> {
    entries: Option<LruCache<K, V>>,
}

impl<K: Hash + Eq, V> ImageCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |c| c.cap().get())
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.as_ref().is_some_and(|c| c.contains(key))
    }

    /// Look up `key` and mark it as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.entries.as_mut()?.get(key)
    }

    /// Insert or replace `key`, returning the evicted value if one was dropped
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let cache = self.entries.as_mut()?;
        if cache.contains(&key) {
            cache.put(key, value);
            return None;
        }
        cache.push(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.as_mut()?.pop(key)
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.entries.as_mut() {
            cache.clear();
        }
    }
}
