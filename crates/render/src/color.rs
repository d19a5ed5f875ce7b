//! Colors used for dialogue text, highlights and shadows

use image::Rgba;
use serde::{Deserialize, Serialize};

/// Opaque RGB color
///
/// Serialized as a three element array, e.g. `[137, 177, 251]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    /// Default color for bracketed and quoted spans
    pub const HIGHLIGHT: Color = Color { r: 137, g: 177, b: 251 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fully opaque RGBA pixel of this color
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Color> for [u8; 3] {
    fn from(color: Color) -> Self {
        [color.r, color.g, color.b]
    }
}

/// Text color outside highlighted spans and the highlight color inside them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub text: Color,
    pub highlight: Color,
}

impl Palette {
    pub fn new(text: Color, highlight: Color) -> Self {
        Self { text, highlight }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Color::WHITE,
            highlight: Color::HIGHLIGHT,
        }
    }
}
