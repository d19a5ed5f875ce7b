//! Card configuration
//!
//! Loaded from a TOML file, then adjusted from the environment. Every field
//! has a default, so an empty file (or no file) is a valid configuration.
//!
//! ```toml
//! assets_dir = "/srv/textbox/assets"
//! default_font = "font3.ttf"
//!
//! [text_box]
//! top_left = [728, 355]
//! bottom_right = [2339, 800]
//!
//! [layout]
//! max_font_size = 145
//! align = "left"
//! valign = "top"
//!
//! [[characters]]
//! id = "sherri"
//! full_name = "Sherri"
//! emotion_count = 7
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use textbox_cache::CacheConfig;
use textbox_render::{Align, FitOptions, FittingRegion, LayoutError, LayoutOptions, Palette, VAlign};

use crate::character::CharacterMetadata;
use crate::compression::CompressionSettings;
use crate::error::ConfigError;

pub const ASSETS_DIR_ENV: &str = "TEXTBOX_ASSETS_DIR";
pub const MAX_FONT_SIZE_ENV: &str = "TEXTBOX_MAX_FONT_SIZE";
pub const PIXEL_REDUCTION_ENV: &str = "TEXTBOX_PIXEL_REDUCTION";

/// Dialogue rectangle, top-left inclusive to bottom-right exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBoxConfig {
    pub top_left: (i32, i32),
    pub bottom_right: (i32, i32),
}

impl Default for TextBoxConfig {
    fn default() -> Self {
        Self {
            top_left: (728, 355),
            bottom_right: (2339, 800),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueLayout {
    /// Largest font size tried; 0 means bounded only by the text box height
    pub max_font_size: u32,
    pub line_spacing: f32,
    pub align: Align,
    pub valign: VAlign,
}

impl Default for DialogueLayout {
    fn default() -> Self {
        Self {
            max_font_size: 145,
            line_spacing: textbox_render::layout::DEFAULT_LINE_SPACING,
            align: Align::Left,
            valign: VAlign::Top,
        }
    }
}

/// How pasted content images are placed in the text box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePaste {
    pub padding: u32,
    pub allow_upscale: bool,
    pub keep_alpha: bool,
    pub align: Align,
    pub valign: VAlign,
}

impl Default for ImagePaste {
    fn default() -> Self {
        Self {
            padding: 12,
            allow_upscale: true,
            keep_alpha: true,
            align: Align::Center,
            valign: VAlign::Middle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub assets_dir: PathBuf,
    pub text_box: TextBoxConfig,
    /// Where the character frame is pasted onto the background
    pub overlay_offset: (i64, i64),
    pub layout: DialogueLayout,
    pub colors: Palette,
    pub image: ImagePaste,
    pub compression: CompressionSettings,
    /// Font file under `<assets>/fonts` used when no other font is set
    pub default_font: String,
    /// Directory of Twemoji-named PNGs for drawing emoji
    pub emoji_dir: Option<PathBuf>,
    pub background_count: u32,
    pub cache: CacheConfig,
    pub characters: Vec<CharacterMetadata>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            text_box: TextBoxConfig::default(),
            overlay_offset: (0, 134),
            layout: DialogueLayout::default(),
            colors: Palette::default(),
            image: ImagePaste::default(),
            compression: CompressionSettings::default(),
            default_font: "font3.ttf".to_string(),
            emoji_dir: None,
            background_count: 16,
            cache: CacheConfig::default(),
            characters: Vec::new(),
        }
    }
}

impl CardConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<platform config dir>/textbox/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("textbox").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load `path`, or the default location if it exists, then apply the
    /// environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Ok(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply environment overrides
    ///
    /// - `TEXTBOX_ASSETS_DIR`: asset root
    /// - `TEXTBOX_MAX_FONT_SIZE`: largest dialogue font size
    /// - `TEXTBOX_PIXEL_REDUCTION`: percentage 0-100; 0 disables compression
    /// - `TEXTBOX_CHARACTER_CACHE`: resident character sets
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(dir) = std::env::var_os(ASSETS_DIR_ENV) {
            self.assets_dir = PathBuf::from(dir);
        }
        if let Ok(val) = std::env::var(MAX_FONT_SIZE_ENV) {
            self.layout.max_font_size = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(MAX_FONT_SIZE_ENV.to_string()))?;
        }
        if let Ok(val) = std::env::var(PIXEL_REDUCTION_ENV) {
            let ratio: u8 = val
                .trim()
                .parse()
                .ok()
                .filter(|ratio| *ratio <= 100)
                .ok_or_else(|| ConfigError::InvalidValue(PIXEL_REDUCTION_ENV.to_string()))?;
            self.compression.pixel_reduction_enabled = ratio > 0;
            self.compression.pixel_reduction_ratio = ratio;
        }
        self.cache.apply_env()?;
        Ok(())
    }

    pub fn text_region(&self) -> Result<FittingRegion, LayoutError> {
        FittingRegion::new(self.text_box.top_left, self.text_box.bottom_right)
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            max_font_size: Some(self.layout.max_font_size),
            line_spacing: self.layout.line_spacing,
        }
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            padding: self.image.padding,
            allow_upscale: self.image.allow_upscale,
            keep_alpha: self.image.keep_alpha,
            align: self.image.align,
            valign: self.image.valign,
            max_width: None,
            max_height: None,
        }
    }

    pub fn character(&self, id: &str) -> Option<&CharacterMetadata> {
        self.characters.iter().find(|character| character.id == id)
    }

    pub fn default_font_path(&self) -> PathBuf {
        self.assets_dir.join("fonts").join(&self.default_font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use textbox_render::Color;

    const ALL_ENV: [&str; 4] = [
        ASSETS_DIR_ENV,
        MAX_FONT_SIZE_ENV,
        PIXEL_REDUCTION_ENV,
        textbox_cache::config::CHARACTER_CACHE_ENV,
    ];

    #[test]
    fn test_defaults() {
        let config = CardConfig::default();
        let region = config.text_region().unwrap();
        assert_eq!((region.width(), region.height()), (1611, 445));
        assert_eq!(config.overlay_offset, (0, 134));
        assert_eq!(config.layout.max_font_size, 145);
        assert_eq!(config.colors.highlight, Color::rgb(137, 177, 251));
        assert_eq!(config.background_count, 16);
        assert_eq!(config.default_font_path(), PathBuf::from("assets/fonts/font3.ttf"));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(CardConfig::from_toml_str("").unwrap(), CardConfig::default());
    }

    #[test]
    fn test_parse_full_file() {
        let source = r#"
            assets_dir = "/srv/assets"
            overlay_offset = [0, 100]
            emoji_dir = "/srv/emoji"

            [text_box]
            top_left = [10, 20]
            bottom_right = [410, 220]

            [layout]
            max_font_size = 90
            align = "center"
            valign = "middle"

            [colors]
            text = [0, 0, 0]
            highlight = [0, 0, 255]

            [compression]
            pixel_reduction_enabled = true
            pixel_reduction_ratio = 30

            [cache]
            character_capacity = 5

            [[characters]]
            id = "sherri"
            full_name = "Sherri"
            emotion_count = 7
        "#;
        let config = CardConfig::from_toml_str(source).unwrap();

        assert_eq!(config.text_box.bottom_right, (410, 220));
        assert_eq!(config.layout.align, Align::Center);
        assert_eq!(config.layout.valign, VAlign::Middle);
        assert_eq!(config.layout.line_spacing, 0.15);
        assert_eq!(config.colors.text, Color::BLACK);
        assert_eq!(config.compression, CompressionSettings::reduce_by(30));
        assert_eq!(config.cache.character_capacity, 5);
        assert_eq!(config.character("sherri").map(|c| c.emotion_count), Some(7));
        assert!(config.character("nobody").is_none());
    }

    #[test]
    fn test_from_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(CardConfig::from_file(&missing), Err(ConfigError::Read { .. })));

        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "text_box = 3").unwrap();
        assert!(matches!(CardConfig::from_file(&broken), Err(ConfigError::Parse { .. })));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let _guard = EnvGuard::new(&ALL_ENV);
        env::set_var(ASSETS_DIR_ENV, "/env/assets");
        env::set_var(MAX_FONT_SIZE_ENV, "72");
        env::set_var(PIXEL_REDUCTION_ENV, "25");
        env::set_var(textbox_cache::config::CHARACTER_CACHE_ENV, "4");

        let mut config = CardConfig::default();
        config.apply_env().unwrap();

        assert_eq!(config.assets_dir, PathBuf::from("/env/assets"));
        assert_eq!(config.layout.max_font_size, 72);
        assert_eq!(config.compression, CompressionSettings::reduce_by(25));
        assert_eq!(config.cache.character_capacity, 4);
    }

    #[test]
    #[serial]
    fn test_env_invalid_values() {
        let _guard = EnvGuard::new(&ALL_ENV);
        for key in ALL_ENV {
            env::remove_var(key);
        }

        env::set_var(PIXEL_REDUCTION_ENV, "150");
        assert!(matches!(
            CardConfig::default().apply_env(),
            Err(ConfigError::InvalidValue(key)) if key == PIXEL_REDUCTION_ENV
        ));
        env::remove_var(PIXEL_REDUCTION_ENV);

        env::set_var(MAX_FONT_SIZE_ENV, "big");
        assert!(CardConfig::default().apply_env().is_err());
        env::remove_var(MAX_FONT_SIZE_ENV);

        env::set_var(textbox_cache::config::CHARACTER_CACHE_ENV, "0");
        assert!(matches!(
            CardConfig::default().apply_env(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    #[serial]
    fn test_load_explicit_path() {
        let _guard = EnvGuard::new(&ALL_ENV);
        for key in ALL_ENV {
            env::remove_var(key);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "background_count = 4").unwrap();

        let config = CardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.background_count, 4);
    }

    // Helper to save and restore environment variables
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(var_names: &[&str]) -> Self {
            let vars = var_names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
