//! Clipboard contract
//!
//! The session reads its input from and writes finished cards to a
//! [`ClipboardSource`]. OS clipboard access lives outside this crate.

use image::RgbaImage;

use crate::error::ClipboardError;

pub trait ClipboardSource {
    /// Current clipboard text, empty when there is none
    fn get_text(&mut self) -> String;

    /// Current clipboard image, if any
    fn get_image(&mut self) -> Option<RgbaImage>;

    /// Replace the clipboard contents with a PNG-encoded image
    fn set_image(&mut self, png: &[u8]) -> Result<(), ClipboardError>;
}

/// In-process clipboard
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: String,
    image: Option<RgbaImage>,
    written: Option<Vec<u8>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_image(image: RgbaImage) -> Self {
        Self {
            image: Some(image),
            ..Self::default()
        }
    }

    /// Last PNG written with [`ClipboardSource::set_image`]
    pub fn written_png(&self) -> Option<&[u8]> {
        self.written.as_deref()
    }
}

impl ClipboardSource for MemoryClipboard {
    fn get_text(&mut self) -> String {
        self.text.clone()
    }

    fn get_image(&mut self) -> Option<RgbaImage> {
        self.image.clone()
    }

    fn set_image(&mut self, png: &[u8]) -> Result<(), ClipboardError> {
        image::load_from_memory(png)?;
        self.written = Some(png.to_vec());
        Ok(())
    }
}
