//! Character frame cache with LRU eviction
//!
//! Character artwork is cached one whole emotion set at a time. When more
//! characters are resident than the configured capacity, the least recently
//! used character is evicted together with every one of its frames.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::{lock, Bitmap, CacheConfig};

/// Every decoded emotion frame of one character.
///
/// Frames are stored in emotion order; emotion indices are 1-based.
#[derive(Debug, Clone)]
pub struct EmotionSet {
    /// Character identifier this set belongs to
    pub character: String,

    /// Decoded frames, `frames[0]` is emotion 1
    pub frames: Vec<Bitmap>,
}

impl EmotionSet {
    /// Create a new emotion set
    pub fn new(character: impl Into<String>, frames: Vec<Bitmap>) -> Self {
        Self {
            character: character.into(),
            frames,
        }
    }

    /// Get the frame for a 1-based emotion index
    pub fn frame(&self, emotion_index: u32) -> Option<Bitmap> {
        let slot = usize::try_from(emotion_index).ok()?.checked_sub(1)?;
        self.frames.get(slot).cloned()
    }

    /// Number of frames in the set
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the set holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Approximate memory used by the decoded pixels in bytes
    pub fn memory_size(&self) -> usize {
        self.frames.iter().map(|frame| frame.as_raw().len()).sum()
    }
}

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of characters currently resident
    pub character_count: usize,

    /// Number of frames across all resident characters
    pub frame_count: usize,

    /// Approximate pixel memory held by resident frames (bytes)
    pub memory_used: usize,

    /// Maximum number of resident characters
    pub capacity: usize,

    /// Number of frame lookups served from the cache
    pub hits: u64,

    /// Number of frame lookups that found no resident set
    pub misses: u64,

    /// Number of characters evicted (automatically or manually)
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct CacheState {
    sets: HashMap<String, Arc<EmotionSet>>,

    /// Most recently used at back, least recently used at front
    lru_queue: VecDeque<String>,

    capacity: usize,

    stats: CacheStats,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            sets: HashMap::new(),
            lru_queue: VecDeque::new(),
            capacity,
            stats: CacheStats {
                capacity,
                ..Default::default()
            },
        }
    }

    fn touch(&mut self, character: &str) {
        self.lru_queue.retain(|c| c != character);
        self.lru_queue.push_back(character.to_owned());
    }

    fn evict_lru(&mut self) -> Option<Arc<EmotionSet>> {
        while let Some(character) = self.lru_queue.pop_front() {
            if let Some(set) = self.sets.remove(&character) {
                self.stats.evictions += 1;
                self.refresh_stats();
                tracing::debug!(character = %character, "evicted character emotion set");
                return Some(set);
            }
        }
        None
    }

    fn evict_to_capacity(&mut self) {
        while self.sets.len() > self.capacity {
            if self.evict_lru().is_none() {
                break;
            }
        }
    }

    fn refresh_stats(&mut self) {
        self.stats.character_count = self.sets.len();
        self.stats.frame_count = self.sets.values().map(|set| set.len()).sum();
        self.stats.memory_used = self.sets.values().map(|set| set.memory_size()).sum();
    }
}

/// LRU cache of character emotion sets
///
/// Thread-safe: every mutation happens under one mutex, and resident sets are
/// handed out as `Arc`s so a concurrent `clear_all()` only turns later lookups
/// into misses. Decoding is never done while the lock is held; callers load a
/// set and then [`insert_set`](Self::insert_set) it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use textbox_cache::CharacterFrameCache;
///
/// let cache = CharacterFrameCache::new(3);
/// let frame = Arc::new(image::RgbaImage::new(4, 4));
/// cache.insert_set("sherri", vec![frame.clone(), frame]);
///
/// assert!(cache.get_frame("sherri", 2).is_some());
/// assert!(cache.get_frame("sherri", 3).is_none());
/// ```
pub struct CharacterFrameCache {
    state: Mutex<CacheState>,
}

impl CharacterFrameCache {
    /// Create a cache holding at most `capacity` characters (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::new(capacity.max(1))),
        }
    }

    /// Create a cache sized from a [`CacheConfig`]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.character_capacity)
    }

    /// Look up one emotion frame
    ///
    /// Returns `None` when the character is not resident or the emotion index
    /// is outside its set. A hit marks the character as most recently used.
    pub fn get_frame(&self, character: &str, emotion_index: u32) -> Option<Bitmap> {
        let mut state = lock(&self.state);

        match state.sets.get(character).cloned() {
            Some(set) => {
                state.touch(character);
                state.stats.hits += 1;
                set.frame(emotion_index)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Look up a character's whole emotion set, marking it as recently used
    pub fn get_set(&self, character: &str) -> Option<Arc<EmotionSet>> {
        let mut state = lock(&self.state);
        let set = state.sets.get(character).cloned()?;
        state.touch(character);
        Some(set)
    }

    /// Store a character's decoded emotion set
    ///
    /// Replaces any resident set for the same character. If the cache then
    /// holds more characters than its capacity, least recently used
    /// characters are evicted.
    pub fn insert_set(&self, character: &str, frames: Vec<Bitmap>) -> Arc<EmotionSet> {
        let set = Arc::new(EmotionSet::new(character, frames));
        let mut state = lock(&self.state);

        state.sets.insert(character.to_owned(), Arc::clone(&set));
        state.touch(character);
        state.evict_to_capacity();
        state.refresh_stats();

        set
    }

    /// Return a frame, loading the character's whole set on a miss
    ///
    /// `load` runs without the cache lock held. If two threads miss at the
    /// same time both may load; the later insert wins.
    pub fn get_or_load<F>(&self, character: &str, emotion_index: u32, load: F) -> Option<Bitmap>
    where
        F: FnOnce() -> Vec<Bitmap>,
    {
        if let Some(set) = self.get_set(character) {
            lock(&self.state).stats.hits += 1;
            return set.frame(emotion_index);
        }

        lock(&self.state).stats.misses += 1;
        let frames = load();
        self.insert_set(character, frames).frame(emotion_index)
    }

    /// Evict the least recently used character, returning its identifier
    pub fn evict_least_recently_used(&self) -> Option<String> {
        let mut state = lock(&self.state);
        state.evict_lru().map(|set| set.character.clone())
    }

    /// Remove one character's set
    pub fn remove(&self, character: &str) -> Option<Arc<EmotionSet>> {
        let mut state = lock(&self.state);
        let set = state.sets.remove(character)?;
        state.lru_queue.retain(|c| c != character);
        state.refresh_stats();
        Some(set)
    }

    /// Check residency without updating LRU order
    pub fn contains(&self, character: &str) -> bool {
        lock(&self.state).sets.contains_key(character)
    }

    /// Drop every resident character
    pub fn clear_all(&self) {
        let mut state = lock(&self.state);
        state.sets.clear();
        state.lru_queue.clear();
        state.refresh_stats();
    }

    /// Number of resident characters
    pub fn len(&self) -> usize {
        lock(&self.state).sets.len()
    }

    /// Whether no character is resident
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resident characters, least recently used first
    pub fn lru_order(&self) -> Vec<String> {
        lock(&self.state).lru_queue.iter().cloned().collect()
    }

    /// Get current cache statistics
    pub fn stats(&self) -> CacheStats {
        lock(&self.state).stats
    }

    /// Change the capacity, evicting immediately if now over it
    pub fn set_capacity(&self, capacity: usize) {
        let mut state = lock(&self.state);
        state.capacity = capacity.max(1);
        state.stats.capacity = state.capacity;
        state.evict_to_capacity();
        state.refresh_stats();
    }

    /// Get the configured capacity in characters
    pub fn capacity(&self) -> usize {
        lock(&self.state).capacity
    }
}

impl Default for CharacterFrameCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
