//! Card compositor
//!
//! Builds the base image (background, character frame, name labels), then
//! overlays either a content image or auto-fitted dialogue text and encodes
//! the result as PNG.
//!
//! Missing artwork and fonts never fail a composition: backgrounds and
//! frames are replaced by placeholders and fonts fall back along the chain
//! request font → character font → default font → built-in font.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use textbox_cache::{Bitmap, PreviewCache};
use textbox_render::{
    draw_label, draw_text_block, fit_text, paste_fitted, EmojiDirectory, EmojiRenderer, FitOptions,
    FittingRegion, FontCache, FontLoadError, FontSource, LayoutOptions, NoEmojiImages, Palette, TextBlock,
    TextStyle,
};

use crate::assets::{AssetStore, FsAssetStore, ImageSource};
use crate::character::CharacterMetadata;
use crate::compression::CompressionSettings;
use crate::config::CardConfig;
use crate::error::{AssetError, ComposeError};
use crate::images::ImageCache;

/// `(character id, background, emotion)`
pub type PreviewKey = (String, u32, u32);

/// One card to produce
#[derive(Debug, Clone, Default)]
pub struct CardRequest {
    pub character: String,
    pub background: u32,
    pub emotion: u32,
    pub text: Option<String>,
    /// Takes precedence over `text` when both are set
    pub image: Option<ImageSource>,
    /// Dialogue font; overrides the character's font
    pub font: Option<PathBuf>,
    pub max_font_size: Option<u32>,
    pub palette: Option<Palette>,
    pub compression: Option<CompressionSettings>,
}

impl CardRequest {
    pub fn new(character: impl Into<String>, background: u32, emotion: u32) -> Self {
        Self {
            character: character.into(),
            background,
            emotion,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<ImageSource>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_font(mut self, font: impl Into<PathBuf>) -> Self {
        self.font = Some(font.into());
        self
    }

    pub fn with_max_font_size(mut self, size: u32) -> Self {
        self.max_font_size = Some(size);
        self
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_compression(mut self, compression: CompressionSettings) -> Self {
        self.compression = Some(compression);
        self
    }
}

pub struct Compositor {
    config: CardConfig,
    region: FittingRegion,
    images: ImageCache,
    fonts: FontCache,
    preview: PreviewCache<PreviewKey, Bitmap>,
    emoji: Box<dyn EmojiRenderer>,
}

impl Compositor {
    /// Compositor reading assets from `config.assets_dir`
    pub fn new(config: CardConfig) -> Result<Self, ComposeError> {
        let store = Arc::new(FsAssetStore::new(config.assets_dir.clone()));
        Self::with_store(config, store)
    }

    /// Compositor reading assets through `store`
    ///
    /// Fails when the configured text box is degenerate.
    pub fn with_store(config: CardConfig, store: Arc<dyn AssetStore>) -> Result<Self, ComposeError> {
        let region = config.text_region()?;
        let emoji: Box<dyn EmojiRenderer> = match &config.emoji_dir {
            Some(dir) => Box::new(EmojiDirectory::new(dir.clone())),
            None => Box::new(NoEmojiImages),
        };
        let font_store = Arc::clone(&store);
        let fonts = FontCache::with_loader(Arc::new(move |path: &Path| -> Result<Vec<u8>, FontLoadError> {
            font_store.open_font(path).map_err(|err| font_error(path, err))
        }));

        Ok(Self {
            images: ImageCache::new(store, &config.cache, config.background_count),
            region,
            fonts,
            preview: PreviewCache::new(),
            emoji,
            config,
        })
    }

    pub fn with_emoji_renderer(mut self, renderer: impl EmojiRenderer + 'static) -> Self {
        self.emoji = Box::new(renderer);
        self
    }

    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    pub fn region(&self) -> &FittingRegion {
        &self.region
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn fonts(&self) -> &FontCache {
        &self.fonts
    }

    pub fn characters(&self) -> &[CharacterMetadata] {
        &self.config.characters
    }

    pub fn character(&self, id: &str) -> Result<&CharacterMetadata, ComposeError> {
        self.config
            .character(id)
            .ok_or_else(|| ComposeError::UnknownCharacter(id.to_string()))
    }

    fn font_path(&self, file: &str) -> PathBuf {
        self.images.store().font_path(file)
    }

    /// First loadable font among `first`, the character's font and the
    /// default font
    fn resolve_font(&self, first: Option<&Path>, character: &CharacterMetadata) -> FontSource {
        let mut candidates: Vec<PathBuf> = Vec::with_capacity(3);
        candidates.extend(first.map(Path::to_path_buf));
        candidates.extend(character.font_file.as_deref().map(|file| self.font_path(file)));
        candidates.push(self.font_path(&self.config.default_font));
        self.fonts.resolve(candidates)
    }

    /// Background with the character frame and name labels drawn on it
    pub fn build_base(&self, character: &CharacterMetadata, background: u32, emotion: u32) -> RgbaImage {
        let mut base = self.images.background_or_placeholder(background).as_ref().clone();
        let frame = self.images.character_frame_or_placeholder(character, emotion);
        let (x, y) = self.config.overlay_offset;
        imageops::overlay(&mut base, frame.as_ref(), x, y);

        if !character.name_labels.is_empty() {
            let source = self.resolve_font(None, character);
            for label in &character.name_labels {
                let font = self.fonts.sized_or_builtin(&source, label.font_size);
                draw_label(&mut base, &font, &label.text, label.position, label.color);
            }
        }
        base
    }

    /// Cached base image for the triple, rebuilt when the key changes
    pub fn preview(&self, character: &str, background: u32, emotion: u32) -> Result<Bitmap, ComposeError> {
        let metadata = self.character(character)?;
        let key = (character.to_string(), background, emotion);
        Ok(self.preview.get_or_build(key, || {
            tracing::debug!(character, background, emotion, "building base image");
            Arc::new(self.build_base(metadata, background, emotion))
        }))
    }

    /// Key of the resident base image
    pub fn preview_key(&self) -> Option<PreviewKey> {
        self.preview.current_key()
    }

    /// Fit `text` into the text box with the dialogue font for `character`
    pub fn fit(&self, character: &CharacterMetadata, text: &str, font: Option<&Path>, max_font_size: Option<u32>) -> (TextBlock, FontSource) {
        let source = self.resolve_font(font, character);
        let options = LayoutOptions {
            max_font_size: max_font_size.or(Some(self.config.layout.max_font_size)),
            line_spacing: self.config.layout.line_spacing,
        };
        let block = fit_text(text, &self.region, &options, |size| self.fonts.sized_or_builtin(&source, size));
        tracing::debug!(
            font_size = block.font_size,
            lines = block.lines.len(),
            overflow = block.overflow,
            "fitted dialogue"
        );
        (block, source)
    }

    /// Compose a card and return the raster
    pub fn compose_image(&self, request: CardRequest) -> Result<RgbaImage, ComposeError> {
        let character = self.character(&request.character)?;
        let text = request.text.as_deref().filter(|text| !text.is_empty());
        if text.is_none() && request.image.is_none() {
            return Err(ComposeError::EmptyInput);
        }

        let base = self.preview(&request.character, request.background, request.emotion)?;
        let mut canvas = base.as_ref().clone();

        if let Some(source) = request.image {
            if text.is_some() {
                tracing::warn!("both text and image supplied; drawing the image and discarding the text");
            }
            let content = source.resolve().map_err(ComposeError::Content)?;
            let placement = paste_fitted(&mut canvas, &content, &self.region, &self.fit_options())?;
            tracing::debug!(?placement, "pasted content image");
        } else if let Some(text) = text {
            let (block, source) = self.fit(character, text, request.font.as_deref(), request.max_font_size);
            let font = self.fonts.sized_or_builtin(&source, block.font_size);
            let style = TextStyle {
                align: self.config.layout.align,
                valign: self.config.layout.valign,
                palette: request.palette.unwrap_or(self.config.colors),
                ..TextStyle::default()
            };
            draw_text_block(&mut canvas, &block, &self.region, &font, &style, self.emoji.as_ref());
        }

        let compression = request.compression.unwrap_or(self.config.compression);
        Ok(compression.apply(canvas))
    }

    /// Compose a card and encode it as an 8-bit RGB PNG
    pub fn compose(&self, request: CardRequest) -> Result<Vec<u8>, ComposeError> {
        let image = self.compose_image(request)?;
        encode_png(image)
    }

    fn fit_options(&self) -> FitOptions {
        self.config.fit_options()
    }

    /// Make `character` current: drop cached frames and the base image,
    /// then decode the new character's set if preloading is on
    pub fn switch_character(&self, character: &str) -> Result<(), ComposeError> {
        let metadata = self.character(character)?;
        self.images.clear_all();
        self.preview.invalidate();
        if self.config.cache.preload_on_switch {
            self.images.preload(metadata);
        }
        Ok(())
    }

    /// Drop cached character frames, the base image and fonts
    pub fn clear_caches(&self) {
        self.images.clear_all();
        self.preview.invalidate();
        self.fonts.clear();
    }
}

/// Encode as PNG with the alpha channel dropped
pub fn encode_png(image: RgbaImage) -> Result<Vec<u8>, ComposeError> {
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut bytes = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

fn font_error(path: &Path, err: AssetError) -> FontLoadError {
    match err {
        AssetError::NotFound(_) => FontLoadError::NotFound(path.to_path_buf()),
        AssetError::Io { path, source } => FontLoadError::Io { path, source },
        AssetError::Decode { .. } => FontLoadError::Invalid(path.to_path_buf()),
    }
}
