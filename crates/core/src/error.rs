//! Error types for asset loading, configuration, composition and generation

use std::io;
use std::path::PathBuf;

use textbox_render::LayoutError;

/// Failure to read or decode an asset
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image {name}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
}

impl AssetError {
    /// Map an I/O error for `path`, keeping "not found" distinct
    pub fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            AssetError::NotFound(path.display().to_string())
        } else {
            AssetError::Io { path, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("no configuration directory on this platform")]
    NoConfigDir,
}

impl From<LayoutError> for ComposeError {
    fn from(err: LayoutError) -> Self {
        match err {
            LayoutError::EmptyContent => ComposeError::EmptyImage,
            region => ComposeError::InvalidRegion(region),
        }
    }
}

impl From<textbox_cache::ConfigError> for ConfigError {
    fn from(err: textbox_cache::ConfigError) -> Self {
        match err {
            textbox_cache::ConfigError::InvalidValue(key) => ConfigError::InvalidValue(key),
        }
    }
}

/// Errors surfaced by the compositor
///
/// Missing assets and fonts never appear here; they are replaced with
/// placeholders or fallbacks. Only configuration and input problems
/// propagate.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("invalid text box")]
    InvalidRegion(#[source] LayoutError),
    #[error("nothing to draw: no text or image supplied")]
    EmptyInput,
    #[error("content image has zero width or height")]
    EmptyImage,
    #[error("unknown character: {0}")]
    UnknownCharacter(String),
    #[error("character index {index} out of range 1..={count}")]
    CharacterIndex { index: usize, count: usize },
    #[error("{what} {index} out of range 1..={count}")]
    SelectionRange { what: &'static str, index: u32, count: u32 },
    #[error("no characters configured")]
    EmptyRoster,
    #[error("cannot use content image")]
    Content(#[source] AssetError),
    #[error("failed to encode card")]
    Encode(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard rejected image: {0}")]
    Write(String),
    #[error("invalid image data")]
    InvalidImage(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("a card is already being generated")]
    Busy,
    #[error(transparent)]
    Compose(#[from] ComposeError),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn chain(err: &dyn Error) -> Vec<String> {
        let mut messages = vec![err.to_string()];
        let mut source = err.source();
        while let Some(inner) = source {
            messages.push(inner.to_string());
            source = inner.source();
        }
        messages
    }

    #[test]
    fn test_wrapped_errors_print_once_per_level() {
        let err = ComposeError::Content(AssetError::NotFound("c3.png".into()));
        assert_eq!(chain(&err), ["cannot use content image", "asset not found: c3.png"]);

        let err = ComposeError::from(LayoutError::InvalidRegion { width: 0, height: 40 });
        let messages = chain(&err);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "invalid text box");
        assert!(!messages[0].contains(&messages[1]));

        let err = GenerateError::from(ComposeError::Content(AssetError::NotFound("x".into())));
        assert_eq!(chain(&err), ["cannot use content image", "asset not found: x"]);
    }

    #[test]
    fn test_io_error_is_source_not_message() {
        let io = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err = AssetError::from_io(PathBuf::from("bg/c1.png"), io);
        assert_eq!(chain(&err), ["failed to read bg/c1.png", "denied"]);
    }
}
