//! Emoji classification, segmentation and rendering
//!
//! Emoji are drawn through a separate path from ordinary glyphs: each emoji
//! cluster occupies one em square and is filled with an image supplied by an
//! [`EmojiRenderer`]. During the font-size search emoji are replaced with a
//! full-width placeholder ideograph so measurement only depends on the text
//! font.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use unicode_segmentation::UnicodeSegmentation;

/// Code point ranges treated as emoji
pub const EMOJI_RANGES: [(u32, u32); 8] = [
    (0x1F300, 0x1F9FF),
    (0x2600, 0x27BF),
    (0x1F000, 0x1F02F),
    (0xFE00, 0xFE0F),
    (0x1F200, 0x1F251),
    (0x1F600, 0x1F64F),
    (0x1FA00, 0x1FA6F),
    (0x2700, 0x27BF),
];

/// Full-width glyph substituted for emoji while searching for a font size
pub const MEASUREMENT_PLACEHOLDER: char = '田';

pub fn is_emoji(ch: char) -> bool {
    let code = ch as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&code))
}

pub fn contains_emoji(text: &str) -> bool {
    text.chars().any(is_emoji)
}

/// A grapheme cluster is an emoji if any of its code points is
pub fn is_emoji_cluster(cluster: &str) -> bool {
    contains_emoji(cluster)
}

/// Replace every emoji code point with [`MEASUREMENT_PLACEHOLDER`]
///
/// Borrowed unchanged when the text has no emoji.
pub fn measurement_text(text: &str) -> Cow<'_, str> {
    if !contains_emoji(text) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|ch| if is_emoji(ch) { MEASUREMENT_PLACEHOLDER } else { ch })
            .collect(),
    )
}

/// A stretch of text drawn either by the text font or the emoji renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Emoji(&'a str),
}

/// Split text into maximal plain runs and single emoji clusters
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut text_start = 0;

    for (index, cluster) in text.grapheme_indices(true) {
        if is_emoji_cluster(cluster) {
            if text_start < index {
                out.push(Segment::Text(&text[text_start..index]));
            }
            out.push(Segment::Emoji(cluster));
            text_start = index + cluster.len();
        }
    }
    if text_start < text.len() {
        out.push(Segment::Text(&text[text_start..]));
    }

    out
}

/// Supplies bitmaps for emoji clusters
pub trait EmojiRenderer: Send + Sync {
    /// Image for `cluster` scaled to `size`×`size`, or `None` to fall back to
    /// the text font
    fn render(&self, cluster: &str, size: u32) -> Option<Arc<RgbaImage>>;
}

/// Renderer with no emoji images; every cluster falls back to the text font
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEmojiImages;

impl EmojiRenderer for NoEmojiImages {
    fn render(&self, _cluster: &str, _size: u32) -> Option<Arc<RgbaImage>> {
        None
    }
}

/// Emoji images read from a directory using Twemoji file naming
///
/// `😀` is looked up as `1f600.png`, `👍🏽` as `1f44d-1f3fd.png`. U+FE0F is
/// dropped from file names. Decoded images and their per-size resamples are
/// kept for the lifetime of the renderer; missing files are remembered as
/// misses. Files are decoded and resized without holding a cache lock.
pub struct EmojiDirectory {
    root: PathBuf,
    decoded: Mutex<HashMap<String, Option<Arc<RgbaImage>>>>,
    scaled: Mutex<HashMap<(String, u32), Arc<RgbaImage>>>,
}

impl EmojiDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            decoded: Mutex::new(HashMap::new()),
            scaled: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name used for `cluster`
    pub fn file_name(cluster: &str) -> String {
        let codes: Vec<String> = cluster
            .chars()
            .filter(|&ch| ch != '\u{FE0F}')
            .map(|ch| format!("{:x}", ch as u32))
            .collect();
        format!("{}.png", codes.join("-"))
    }

    /// Number of `(cluster, size)` renderings held
    pub fn scaled_len(&self) -> usize {
        lock(&self.scaled).len()
    }

    /// Decoded source image; the file is read without holding the lock
    fn source(&self, name: &str) -> Option<Arc<RgbaImage>> {
        if let Some(entry) = lock(&self.decoded).get(name) {
            return entry.clone();
        }

        let path = self.root.join(name);
        let entry = match image::open(&path) {
            Ok(img) => Some(Arc::new(img.to_rgba8())),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "no emoji image");
                None
            }
        };
        lock(&self.decoded)
            .entry(name.to_string())
            .or_insert(entry)
            .clone()
    }
}

impl EmojiRenderer for EmojiDirectory {
    fn render(&self, cluster: &str, size: u32) -> Option<Arc<RgbaImage>> {
        let name = Self::file_name(cluster);
        let size = size.max(1);
        let key = (name, size);
        if let Some(image) = lock(&self.scaled).get(&key) {
            return Some(Arc::clone(image));
        }

        let source = self.source(&key.0)?;
        let image = Arc::new(imageops::resize(source.as_ref(), size, size, FilterType::Lanczos3));
        Some(Arc::clone(lock(&self.scaled).entry(key).or_insert(image)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
