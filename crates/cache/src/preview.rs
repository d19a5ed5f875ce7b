//! Single-slot preview cache
//!
//! Holds the most recently built base image together with the key it was
//! built for. Only one preview is current at a time, so this is deliberately
//! not a map: any key change replaces the slot.

use std::sync::Mutex;

use crate::lock;

struct Slot<K, V> {
    key: K,
    value: V,
}

/// One-entry memo keyed by `K`
///
/// ```
/// use textbox_cache::PreviewCache;
///
/// let cache = PreviewCache::new();
/// let first = cache.get_or_build(("sherri", 1, 2), || 10);
/// let again = cache.get_or_build(("sherri", 1, 2), || 20);
/// assert_eq!((first, again), (10, 10));
///
/// cache.invalidate();
/// assert_eq!(cache.get_or_build(("sherri", 1, 2), || 30), 30);
/// ```
pub struct PreviewCache<K, V> {
    slot: Mutex<Option<Slot<K, V>>>,
}

impl<K, V> PreviewCache<K, V>
where
    K: PartialEq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Return the value if the slot currently holds `key`
    pub fn get(&self, key: &K) -> Option<V> {
        match lock(&self.slot).as_ref() {
            Some(slot) if slot.key == *key => Some(slot.value.clone()),
            _ => None,
        }
    }

    /// Return the cached value for `key`, or build and store a new one
    ///
    /// The builder runs without the lock held.
    pub fn get_or_build<F>(&self, key: K, build: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }

        let value = build();
        self.store(key, value.clone());
        value
    }

    /// Fallible variant of [`get_or_build`](Self::get_or_build); errors leave
    /// the slot untouched
    pub fn get_or_try_build<E, F>(&self, key: K, build: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = build()?;
        self.store(key, value.clone());
        Ok(value)
    }

    /// Replace the slot contents
    pub fn store(&self, key: K, value: V) {
        *lock(&self.slot) = Some(Slot { key, value });
    }

    /// Key of the resident entry, if any
    pub fn current_key(&self) -> Option<K> {
        lock(&self.slot).as_ref().map(|slot| slot.key.clone())
    }

    /// Value of the resident entry regardless of key
    pub fn current(&self) -> Option<V> {
        lock(&self.slot).as_ref().map(|slot| slot.value.clone())
    }

    /// Clear the slot so the next lookup rebuilds
    pub fn invalidate(&self) {
        *lock(&self.slot) = None;
    }
}

impl<K, V> Default for PreviewCache<K, V>
where
    K: PartialEq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
