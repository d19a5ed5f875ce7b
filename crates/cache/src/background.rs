//! Background cache
//!
//! Backgrounds form a small fixed set that is reused constantly, so they are
//! cached without a bound and survive character switches.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::{lock, Bitmap};

/// Unbounded cache of decoded backgrounds keyed by 1-based index
#[derive(Default)]
pub struct BackgroundCache {
    entries: Mutex<HashMap<u32, Bitmap>>,
}

impl BackgroundCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: u32) -> Option<Bitmap> {
        lock(&self.entries).get(&index).cloned()
    }

    pub fn insert(&self, index: u32, bitmap: Bitmap) {
        lock(&self.entries).insert(index, bitmap);
    }

    /// Return the cached background, decoding it with `load` on a miss
    ///
    /// `load` runs without the lock held. Failed loads are not cached, so a
    /// background that appears later on disk is picked up.
    pub fn get_or_try_load<E, F>(&self, index: u32, load: F) -> Result<Bitmap, E>
    where
        F: FnOnce() -> Result<Bitmap, E>,
    {
        if let Some(bitmap) = self.get(index) {
            return Ok(bitmap);
        }

        let bitmap = load()?;
        self.insert(index, bitmap.clone());
        Ok(bitmap)
    }

    pub fn contains(&self, index: u32) -> bool {
        lock(&self.entries).contains_key(&index)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.entries).clear();
    }
}
