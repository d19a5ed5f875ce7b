//! Font loading, metrics and glyph drawing
//!
//! Fonts are memoized per file and per `(file, pixel size)`; entries live
//! until [`FontCache::clear`] is called. The distinct sizes requested are
//! bounded by the layout engine's binary search, so nothing is evicted.
//!
//! When no font file can be loaded, callers fall back to the built-in face:
//! a metric-only font whose glyphs are drawn as filled boxes. It never fails.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Built-in face ascent as a fraction of the pixel size
const BUILTIN_ASCENT: f32 = 0.8;
/// Built-in face descent as a fraction of the pixel size
const BUILTIN_DESCENT: f32 = 0.2;

/// Errors raised while loading a font file.
#[derive(Debug, thiserror::Error)]
pub enum FontLoadError {
    #[error("font file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read font {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not a valid font file: {0}")]
    Invalid(PathBuf),
}

impl FontLoadError {
    /// Map an I/O error for `path`, keeping "not found" distinct
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            FontLoadError::NotFound(path.to_path_buf())
        } else {
            FontLoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// A parsed font face, independent of size
#[derive(Clone)]
pub enum FontFace {
    /// TrueType/OpenType outlines
    Outline(FontArc),
    /// Metric-only fallback face
    Builtin,
}

impl FontFace {
    /// Parse font bytes read from `path`
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self, FontLoadError> {
        FontArc::try_from_vec(data)
            .map(FontFace::Outline)
            .map_err(|_| FontLoadError::Invalid(path.to_path_buf()))
    }

    /// Instantiate the face at an integer pixel size (em size, minimum 1)
    pub fn at_size(&self, size: u32) -> SizedFont {
        let size = size.max(1);
        match self {
            FontFace::Outline(font) => {
                let units_per_em = font.units_per_em().unwrap_or(1000.0);
                let scale = PxScale::from(size as f32 * font.height_unscaled() / units_per_em);
                let scaled = font.as_scaled(scale);
                SizedFont {
                    face: self.clone(),
                    size,
                    scale,
                    ascent: scaled.ascent(),
                    descent: -scaled.descent(),
                }
            }
            FontFace::Builtin => SizedFont::builtin(size),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, FontFace::Builtin)
    }
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontFace::Outline(_) => f.write_str("FontFace::Outline"),
            FontFace::Builtin => f.write_str("FontFace::Builtin"),
        }
    }
}

/// A font face instantiated at one pixel size
#[derive(Debug, Clone)]
pub struct SizedFont {
    face: FontFace,
    size: u32,
    scale: PxScale,
    ascent: f32,
    descent: f32,
}

impl SizedFont {
    /// The built-in face at `size`
    pub fn builtin(size: u32) -> Self {
        let size = size.max(1);
        Self {
            face: FontFace::Builtin,
            size,
            scale: PxScale::from(size as f32),
            ascent: size as f32 * BUILTIN_ASCENT,
            descent: size as f32 * BUILTIN_DESCENT,
        }
    }

    /// Pixel (em) size
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    /// Distance from the top of the line to the baseline
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    /// Distance from the baseline to the bottom of the line, positive
    pub fn descent(&self) -> f32 {
        self.descent
    }

    /// Line advance for a given extra spacing fraction, truncated to pixels
    pub fn line_height(&self, line_spacing: f32) -> u32 {
        ((self.ascent + self.descent) * (1.0 + line_spacing)) as u32
    }

    /// Horizontal advance of `text` drawn with this font's own glyphs
    pub fn text_width(&self, text: &str) -> f32 {
        match &self.face {
            FontFace::Outline(font) => {
                let scaled = font.as_scaled(self.scale);
                let mut width = 0.0;
                let mut previous: Option<GlyphId> = None;
                for ch in text.chars() {
                    let id = scaled.glyph_id(ch);
                    if let Some(previous) = previous {
                        width += scaled.kern(previous, id);
                    }
                    width += scaled.h_advance(id);
                    previous = Some(id);
                }
                width
            }
            FontFace::Builtin => text
                .graphemes(true)
                .map(|cluster| self.builtin_advance(cluster))
                .sum(),
        }
    }

    /// Draw `text` with its top-left corner at `(x, y)`
    pub fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        match &self.face {
            FontFace::Outline(font) => draw_text_mut(canvas, color, x, y, self.scale, font, text),
            FontFace::Builtin => self.draw_builtin(canvas, x, y, text, color),
        }
    }

    fn builtin_advance(&self, cluster: &str) -> f32 {
        cluster.width() as f32 * self.size as f32 / 2.0
    }

    fn draw_builtin(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        let inset = (self.size as f32 * 0.1).round() as i32;
        let height = (self.size as i32 - 2 * inset).max(1) as u32;
        let mut pen = x as f32;

        for cluster in text.graphemes(true) {
            let advance = self.builtin_advance(cluster);
            let width = advance.round() as i32 - 2 * inset;
            if width > 0 && !cluster.trim().is_empty() {
                let rect = Rect::at(pen.round() as i32 + inset, y + inset).of_size(width as u32, height);
                draw_filled_rect_mut(canvas, rect, color);
            }
            pen += advance;
        }
    }
}

/// Where a font comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FontSource {
    File(PathBuf),
    Builtin,
}

/// Reads raw font bytes for a path
pub type FontLoader = Arc<dyn Fn(&Path) -> Result<Vec<u8>, FontLoadError> + Send + Sync>;

/// Memoizing font loader
///
/// ```
/// use textbox_render::{FontCache, FontSource};
///
/// let fonts = FontCache::new();
/// let source = fonts.resolve(["/no/such/font.ttf"]);
/// assert_eq!(source, FontSource::Builtin);
///
/// let font = fonts.sized_or_builtin(&source, 32);
/// assert_eq!(font.size(), 32);
/// ```
pub struct FontCache {
    loader: FontLoader,
    faces: Mutex<HashMap<PathBuf, FontFace>>,
    sized: Mutex<HashMap<(FontSource, u32), SizedFont>>,
}

impl FontCache {
    /// Create a cache that reads font files from the local filesystem
    pub fn new() -> Self {
        Self::with_loader(Arc::new(|path: &Path| -> Result<Vec<u8>, FontLoadError> {
            fs::read(path).map_err(|err| FontLoadError::from_io(path, err))
        }))
    }

    /// Create a cache that obtains font bytes through `loader`
    pub fn with_loader(loader: FontLoader) -> Self {
        Self {
            loader,
            faces: Mutex::new(HashMap::new()),
            sized: Mutex::new(HashMap::new()),
        }
    }

    /// Load the face stored at `path`, parsing it at most once
    pub fn face(&self, path: &Path) -> Result<FontFace, FontLoadError> {
        if let Some(face) = lock(&self.faces).get(path) {
            return Ok(face.clone());
        }

        let data = (self.loader)(path)?;
        let face = FontFace::from_bytes(path, data)?;
        lock(&self.faces).insert(path.to_path_buf(), face.clone());
        tracing::debug!(path = %path.display(), "loaded font face");
        Ok(face)
    }

    /// Font at `path` instantiated at `size` pixels
    pub fn get_font(&self, path: &Path, size: u32) -> Result<SizedFont, FontLoadError> {
        self.load(&FontSource::File(path.to_path_buf()), size)
    }

    /// Font from any source at `size` pixels
    pub fn load(&self, source: &FontSource, size: u32) -> Result<SizedFont, FontLoadError> {
        let key = (source.clone(), size);
        if let Some(font) = lock(&self.sized).get(&key) {
            return Ok(font.clone());
        }

        let face = match source {
            FontSource::File(path) => self.face(path)?,
            FontSource::Builtin => FontFace::Builtin,
        };
        let font = face.at_size(size);
        lock(&self.sized).insert(key, font.clone());
        Ok(font)
    }

    /// Like [`load`](Self::load) but substitutes the built-in face on failure
    pub fn sized_or_builtin(&self, source: &FontSource, size: u32) -> SizedFont {
        self.load(source, size).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "font unavailable, using built-in font");
            SizedFont::builtin(size)
        })
    }

    /// Walk a fallback chain and return the first loadable font
    ///
    /// Every failed candidate is logged; when all fail the built-in face is
    /// returned.
    pub fn resolve<I, P>(&self, candidates: I) -> FontSource
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for candidate in candidates {
            let path = candidate.as_ref();
            match self.face(path) {
                Ok(_) => return FontSource::File(path.to_path_buf()),
                Err(err) => tracing::warn!(error = %err, "font fallback"),
            }
        }
        FontSource::Builtin
    }

    /// Number of distinct `(source, size)` entries
    pub fn len(&self) -> usize {
        lock(&self.sized).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every memoized face and size
    pub fn clear(&self) {
        lock(&self.faces).clear();
        lock(&self.sized).clear();
    }
}

impl Default for FontCache {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_metrics() {
        let font = SizedFont::builtin(40);
        assert_eq!(font.size(), 40);
        assert_eq!(font.ascent(), 32.0);
        assert_eq!(font.descent(), 8.0);
        assert_eq!(font.line_height(0.15), 46);
    }

    #[test]
    fn test_builtin_widths() {
        let font = SizedFont::builtin(20);
        assert_eq!(font.text_width("你好"), 40.0);
        assert_eq!(font.text_width("ab"), 20.0);
        assert_eq!(font.text_width("a 你"), 40.0);
        assert_eq!(font.text_width(""), 0.0);
    }

    #[test]
    fn test_builtin_draws_boxes_only_for_visible_clusters() {
        let mut canvas = RgbaImage::new(60, 20);
        let font = SizedFont::builtin(20);
        font.draw(&mut canvas, 0, 0, "你 ", Rgba([255, 0, 0, 255]));

        assert_eq!(canvas.get_pixel(10, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(25, 10), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_zero_size_is_clamped() {
        assert_eq!(SizedFont::builtin(0).size(), 1);
        assert_eq!(FontFace::Builtin.at_size(0).size(), 1);
    }

    #[test]
    fn test_missing_font_is_not_found() {
        let fonts = FontCache::new();
        let err = fonts.get_font(Path::new("/definitely/missing.ttf"), 12).unwrap_err();
        assert!(matches!(err, FontLoadError::NotFound(_)));
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        fs::write(&path, b"not a font").unwrap();

        let fonts = FontCache::new();
        let err = fonts.get_font(&path, 12).unwrap_err();
        assert!(matches!(err, FontLoadError::Invalid(_)));
    }

    #[test]
    fn test_resolve_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.ttf");
        fs::write(&broken, b"junk").unwrap();

        let fonts = FontCache::new();
        let source = fonts.resolve([broken.as_path(), Path::new("/missing.otf")]);
        assert_eq!(source, FontSource::Builtin);
    }

    #[test]
    fn test_builtin_sizes_are_memoized() {
        let fonts = FontCache::new();
        let a = fonts.load(&FontSource::Builtin, 18).unwrap();
        let b = fonts.load(&FontSource::Builtin, 18).unwrap();
        assert_eq!(a.size(), b.size());
        assert_eq!(fonts.len(), 1);

        fonts.load(&FontSource::Builtin, 19).unwrap();
        assert_eq!(fonts.len(), 2);

        fonts.clear();
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_custom_loader_is_used() {
        let fonts = FontCache::with_loader(Arc::new(|path: &Path| -> Result<Vec<u8>, FontLoadError> {
            Err(FontLoadError::NotFound(path.to_path_buf()))
        }));
        assert_eq!(fonts.resolve(["anything.ttf"]), FontSource::Builtin);
    }
}
