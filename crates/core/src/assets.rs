//! Asset access
//!
//! Character art, backgrounds and fonts are read-only inputs. The
//! [`AssetStore`] trait hands out raw bytes; decoding happens in the image
//! cache so the store can be swapped for an archive or an in-memory table.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::error::AssetError;

/// Source of raw asset bytes
pub trait AssetStore: Send + Sync {
    /// Encoded image for 1-based background `index`
    fn open_background(&self, index: u32) -> Result<Vec<u8>, AssetError>;

    /// Encoded image for one of a character's 1-based emotion frames
    fn open_character_frame(&self, character: &str, emotion_index: u32) -> Result<Vec<u8>, AssetError>;

    /// Path a font file name resolves to
    fn font_path(&self, file: &str) -> PathBuf;

    /// Raw font bytes
    fn open_font(&self, path: &Path) -> Result<Vec<u8>, AssetError>;
}

/// Assets laid out in a directory tree
///
/// ```text
/// <root>/background/c{index}.png
/// <root>/chara/{id}/{id} ({emotion}).png
/// <root>/fonts/{file}
/// ```
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn background_path(&self, index: u32) -> PathBuf {
        self.root.join("background").join(format!("c{index}.png"))
    }

    pub fn character_frame_path(&self, character: &str, emotion_index: u32) -> PathBuf {
        self.root
            .join("chara")
            .join(character)
            .join(format!("{character} ({emotion_index}).png"))
    }

    fn read(path: PathBuf) -> Result<Vec<u8>, AssetError> {
        fs::read(&path).map_err(|err| AssetError::from_io(path, err))
    }
}

impl AssetStore for FsAssetStore {
    fn open_background(&self, index: u32) -> Result<Vec<u8>, AssetError> {
        Self::read(self.background_path(index))
    }

    fn open_character_frame(&self, character: &str, emotion_index: u32) -> Result<Vec<u8>, AssetError> {
        Self::read(self.character_frame_path(character, emotion_index))
    }

    /// Absolute file names are used as given
    fn font_path(&self, file: &str) -> PathBuf {
        self.root.join("fonts").join(file)
    }

    fn open_font(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        Self::read(path.to_path_buf())
    }
}

/// Decode an encoded image into RGBA
pub fn decode_image(name: &str, bytes: &[u8]) -> Result<RgbaImage, AssetError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Decode {
            name: name.to_string(),
            source,
        })
}

/// An image supplied by a caller in whatever form it had
///
/// Resolved to a decoded bitmap once, at the compositor boundary.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bitmap(Arc<RgbaImage>),
    Path(PathBuf),
    Encoded(Vec<u8>),
}

impl ImageSource {
    pub fn resolve(self) -> Result<Arc<RgbaImage>, AssetError> {
        match self {
            ImageSource::Bitmap(bitmap) => Ok(bitmap),
            ImageSource::Path(path) => {
                let bytes = fs::read(&path).map_err(|err| AssetError::from_io(path.clone(), err))?;
                decode_image(&path.display().to_string(), &bytes).map(Arc::new)
            }
            ImageSource::Encoded(bytes) => decode_image("<encoded image>", &bytes).map(Arc::new),
        }
    }
}

impl From<RgbaImage> for ImageSource {
    fn from(image: RgbaImage) -> Self {
        ImageSource::Bitmap(Arc::new(image))
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_layout_paths() {
        let store = FsAssetStore::new("/assets");
        assert_eq!(store.background_path(3), PathBuf::from("/assets/background/c3.png"));
        assert_eq!(
            store.character_frame_path("sherri", 7),
            PathBuf::from("/assets/chara/sherri/sherri (7).png")
        );
        assert_eq!(store.font_path("font3.ttf"), PathBuf::from("/assets/fonts/font3.ttf"));
        assert_eq!(store.font_path("/usr/share/fonts/a.ttf"), PathBuf::from("/usr/share/fonts/a.ttf"));
    }

    #[test]
    fn test_missing_asset_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());

        let err = store.open_background(1).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.open_character_frame("nobody", 1).unwrap_err().is_not_found());
    }

    #[test]
    fn test_reads_background_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsAssetStore::new(dir.path());
        fs::create_dir_all(dir.path().join("background")).unwrap();
        fs::write(store.background_path(2), b"bytes").unwrap();

        assert_eq!(store.open_background(2).unwrap(), b"bytes");
    }

    #[test]
    fn test_image_source_variants_resolve() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        let encoded = png_bytes(&image);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.png");
        fs::write(&path, &encoded).unwrap();

        for source in [
            ImageSource::from(image.clone()),
            ImageSource::from(path),
            ImageSource::Encoded(encoded),
        ] {
            let bitmap = source.resolve().unwrap();
            assert_eq!(bitmap.as_ref(), &image);
        }
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = ImageSource::Encoded(b"not an image".to_vec()).resolve().unwrap_err();
        assert!(matches!(err, AssetError::Decode { .. }));
    }
}
