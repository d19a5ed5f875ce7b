//! Decoded image cache
//!
//! Wraps the cache crate's stores with asset decoding and placeholder
//! substitution. A character's whole emotion set is decoded on first access;
//! backgrounds are decoded one at a time and kept for the process lifetime.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use textbox_cache::{BackgroundCache, Bitmap, CacheConfig, CacheStats, CharacterFrameCache};

use crate::assets::{decode_image, AssetStore};
use crate::character::CharacterMetadata;
use crate::error::AssetError;

/// Size of substituted placeholder images
pub const PLACEHOLDER_SIZE: (u32, u32) = (800, 600);
/// Fill of the placeholder used for a missing background
pub const BACKGROUND_PLACEHOLDER: Rgba<u8> = Rgba([100, 100, 200, 255]);

pub fn background_placeholder() -> Bitmap {
    let (width, height) = PLACEHOLDER_SIZE;
    Arc::new(RgbaImage::from_pixel(width, height, BACKGROUND_PLACEHOLDER))
}

/// Fully transparent stand-in for a missing character frame
pub fn frame_placeholder() -> Bitmap {
    let (width, height) = PLACEHOLDER_SIZE;
    Arc::new(RgbaImage::new(width, height))
}

pub struct ImageCache {
    store: Arc<dyn AssetStore>,
    backgrounds: BackgroundCache,
    characters: CharacterFrameCache,
    background_count: u32,
}

impl ImageCache {
    pub fn new(store: Arc<dyn AssetStore>, config: &CacheConfig, background_count: u32) -> Self {
        Self {
            store,
            backgrounds: BackgroundCache::new(),
            characters: CharacterFrameCache::from_config(config),
            background_count,
        }
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    pub fn background_count(&self) -> u32 {
        self.background_count
    }

    /// Decoded background for a 1-based index
    ///
    /// Indices outside `1..=background_count` are reported as missing.
    pub fn get_background(&self, index: u32) -> Result<Bitmap, AssetError> {
        if !(1..=self.background_count).contains(&index) {
            return Err(AssetError::NotFound(format!("background {index}")));
        }
        self.backgrounds.get_or_try_load(index, || {
            let bytes = self.store.open_background(index)?;
            decode_image(&format!("background {index}"), &bytes).map(Arc::new)
        })
    }

    /// Background, or a solid placeholder when it cannot be loaded
    pub fn background_or_placeholder(&self, index: u32) -> Bitmap {
        self.get_background(index).unwrap_or_else(|err| {
            tracing::warn!(index, error = %err, "using placeholder background");
            background_placeholder()
        })
    }

    /// Decoded emotion frame, loading the character's whole set on a miss
    ///
    /// Frames missing from the store are replaced by transparent
    /// placeholders when the set is decoded. Only an emotion index outside
    /// the character's set is an error.
    pub fn get_character_frame(
        &self,
        character: &CharacterMetadata,
        emotion_index: u32,
    ) -> Result<Bitmap, AssetError> {
        self.characters
            .get_or_load(&character.id, emotion_index, || self.load_set(character))
            .ok_or_else(|| AssetError::NotFound(format!("{} emotion {emotion_index}", character.id)))
    }

    /// Emotion frame, or a transparent placeholder when it cannot be loaded
    pub fn character_frame_or_placeholder(&self, character: &CharacterMetadata, emotion_index: u32) -> Bitmap {
        self.get_character_frame(character, emotion_index)
            .unwrap_or_else(|err| {
                tracing::warn!(character = %character.id, emotion_index, error = %err, "using placeholder frame");
                frame_placeholder()
            })
    }

    /// Decode a character's emotion set ahead of use
    pub fn preload(&self, character: &CharacterMetadata) {
        if self.characters.contains(&character.id) {
            return;
        }
        let frames = self.load_set(character);
        self.characters.insert_set(&character.id, frames);
    }

    fn load_set(&self, character: &CharacterMetadata) -> Vec<Bitmap> {
        tracing::debug!(character = %character.id, count = character.emotion_count, "decoding emotion set");
        (1..=character.emotion_count)
            .map(|emotion| {
                self.store
                    .open_character_frame(&character.id, emotion)
                    .and_then(|bytes| decode_image(&format!("{} ({emotion})", character.id), &bytes))
                    .map(Arc::new)
                    .unwrap_or_else(|err| {
                        tracing::warn!(character = %character.id, emotion, error = %err, "using placeholder frame");
                        frame_placeholder()
                    })
            })
            .collect()
    }

    /// Drop the least recently used character's emotion set
    pub fn evict_least_recently_used(&self) -> Option<String> {
        self.characters.evict_least_recently_used()
    }

    /// Drop every character set; backgrounds stay cached
    pub fn clear_all(&self) {
        self.characters.clear_all();
    }

    pub fn is_character_cached(&self, character: &str) -> bool {
        self.characters.contains(character)
    }

    pub fn cached_backgrounds(&self) -> usize {
        self.backgrounds.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.characters.stats()
    }
}
