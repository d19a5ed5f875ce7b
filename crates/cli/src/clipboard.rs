//! System clipboard backed by `arboard`
//!
//! Images cross the OS boundary as raw RGBA8 bitmaps.

use std::borrow::Cow;

use arboard::{Clipboard, ImageData};
use image::RgbaImage;
use textbox_core::{ClipboardError, ClipboardSource};

pub struct ArboardClipboard {
    inner: Clipboard,
}

impl ArboardClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        let inner = Clipboard::new().map_err(|err| ClipboardError::Unavailable(err.to_string()))?;
        Ok(Self { inner })
    }
}

impl ClipboardSource for ArboardClipboard {
    fn get_text(&mut self) -> String {
        self.inner.get_text().unwrap_or_default()
    }

    fn get_image(&mut self) -> Option<RgbaImage> {
        let image = self.inner.get_image().ok()?;
        RgbaImage::from_raw(image.width as u32, image.height as u32, image.bytes.into_owned())
    }

    fn set_image(&mut self, png: &[u8]) -> Result<(), ClipboardError> {
        let rgba = image::load_from_memory(png)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        let data = ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        };
        self.inner
            .set_image(data)
            .map_err(|err| ClipboardError::Write(err.to_string()))
    }
}
