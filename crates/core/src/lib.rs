//! Textbox Core Library
//!
//! Asset loading, card configuration, the compositor that turns a character,
//! background and dialogue into a finished PNG, and the interactive session
//! that drives clipboard round trips.

pub mod assets;
pub mod character;
pub mod clipboard;
pub mod compositor;
pub mod compression;
pub mod config;
pub mod error;
pub mod images;
pub mod session;

pub use assets::{decode_image, AssetStore, FsAssetStore, ImageSource};
pub use character::{CharacterMetadata, NameLabel};
pub use clipboard::{ClipboardSource, MemoryClipboard};
pub use compositor::{encode_png, CardRequest, Compositor, PreviewKey};
pub use compression::CompressionSettings;
pub use config::{CardConfig, DialogueLayout, ImagePaste, TextBoxConfig};
pub use error::{AssetError, ClipboardError, ComposeError, ConfigError, GenerateError};
pub use images::ImageCache;
pub use session::{GenerationGuard, GenerationReport, GenerationTicket, Session};
