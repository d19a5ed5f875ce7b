//! Static per-character configuration

use serde::{Deserialize, Serialize};
use textbox_render::Color;

/// Fixed text drawn on every card of a character, such as its name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameLabel {
    pub text: String,
    pub position: (i32, i32),
    pub color: Color,
    pub font_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterMetadata {
    /// Directory and file stem of the character's artwork
    pub id: String,
    pub full_name: String,
    /// Font for this character's name labels; the default font when absent
    #[serde(default)]
    pub font_file: Option<String>,
    pub emotion_count: u32,
    #[serde(default)]
    pub name_labels: Vec<NameLabel>,
}

impl CharacterMetadata {
    pub fn new(id: impl Into<String>, full_name: impl Into<String>, emotion_count: u32) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            font_file: None,
            emotion_count,
            name_labels: Vec::new(),
        }
    }

    pub fn with_font(mut self, font_file: impl Into<String>) -> Self {
        self.font_file = Some(font_file.into());
        self
    }

    pub fn with_label(mut self, label: NameLabel) -> Self {
        self.name_labels.push(label);
        self
    }

    pub fn has_emotion(&self, emotion_index: u32) -> bool {
        (1..=self.emotion_count).contains(&emotion_index)
    }
}
