//! Textbox Cache Library
//!
//! In-memory caches for decoded card artwork: an LRU cache of whole character
//! emotion sets, an unbounded background cache and a single-slot preview cache.

pub mod background;
pub mod config;
pub mod frames;
pub mod preview;

pub use background::BackgroundCache;
pub use config::{CacheConfig, ConfigError};
pub use frames::{CacheStats, CharacterFrameCache, EmotionSet};
pub use preview::PreviewCache;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A decoded RGBA bitmap shared between the caches and their readers.
///
/// Cached entries are only ever replaced wholesale, so a reader holding a
/// `Bitmap` never observes a partially written image.
pub type Bitmap = Arc<image::RgbaImage>;

/// Lock a cache mutex, recovering the state if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
