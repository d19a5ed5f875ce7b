use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use textbox_core::{CardConfig, CardRequest, Compositor, ImageSource};
use textbox_render::{fit_text, FittingRegion, FontCache, FontSource, LayoutOptions, TextBlock};

#[cfg(feature = "clipboard")]
mod clipboard;

#[derive(Debug, Parser)]
#[command(name = "textbox")]
#[command(about = "Composite dialogue onto character cards")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Compose a card and write it as PNG.
    Compose(ComposeArgs),
    /// Print the layout chosen for a text in a region as JSON.
    Fit(FitArgs),
    /// Print the configured characters as JSON.
    Characters {
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
    /// Turn the clipboard text or image into a card on the clipboard.
    #[cfg(feature = "clipboard")]
    Clipboard(ClipboardArgs),
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("content").required(true).args(["text", "text_file", "image"])))]
struct ComposeArgs {
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Asset root; overrides the config file
    #[arg(long, value_name = "DIR")]
    assets: Option<PathBuf>,
    #[arg(long)]
    character: String,
    #[arg(long, default_value_t = 1)]
    emotion: u32,
    #[arg(long, default_value_t = 1)]
    background: u32,
    #[arg(long)]
    text: Option<String>,
    #[arg(long, value_name = "FILE")]
    text_file: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
    #[arg(long)]
    max_font_size: Option<u32>,
    #[arg(long, default_value = "card.png")]
    output: PathBuf,
}

#[derive(Debug, Args)]
struct FitArgs {
    #[arg(long)]
    text: String,
    #[arg(long)]
    width: i32,
    #[arg(long)]
    height: i32,
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
    #[arg(long)]
    max_font_size: Option<u32>,
    #[arg(long, default_value_t = textbox_render::layout::DEFAULT_LINE_SPACING)]
    line_spacing: f32,
}

#[cfg(feature = "clipboard")]
#[derive(Debug, Args)]
struct ClipboardArgs {
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 1-based roster index
    #[arg(long, default_value_t = 1)]
    character: usize,
    /// Fixed emotion; random when omitted
    #[arg(long)]
    emotion: Option<u32>,
    /// Fixed background; random when omitted
    #[arg(long)]
    background: Option<u32>,
}

#[derive(Debug, Serialize)]
struct FitOutput {
    font_size: u32,
    line_height: u32,
    block_width: u32,
    block_height: u32,
    overflow: bool,
    lines: Vec<LineOutput>,
}

#[derive(Debug, Serialize)]
struct LineOutput {
    text: String,
    width: u32,
}

impl From<TextBlock> for FitOutput {
    fn from(block: TextBlock) -> Self {
        Self {
            font_size: block.font_size,
            line_height: block.metrics.line_height,
            block_width: block.metrics.width,
            block_height: block.metrics.height,
            overflow: block.overflow,
            lines: block
                .lines
                .into_iter()
                .map(|line| LineOutput { text: line.text, width: line.pixel_width })
                .collect(),
        }
    }
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Compose(args) => run_compose(args),
        Commands::Fit(args) => run_fit(args),
        Commands::Characters { config } => run_characters(config.as_deref()),
        #[cfg(feature = "clipboard")]
        Commands::Clipboard(args) => run_clipboard(args),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<CardConfig> {
    CardConfig::load(path).context("failed to load configuration")
}

fn run_compose(args: ComposeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(assets) = args.assets {
        config.assets_dir = assets;
    }
    let compositor = Compositor::new(config)?;

    let mut request = CardRequest::new(args.character, args.background, args.emotion);
    if let Some(text) = args.text {
        request = request.with_text(text);
    }
    if let Some(path) = args.text_file {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read text from {}", path.display()))?;
        request = request.with_text(text);
    }
    if let Some(path) = args.image {
        ensure_file_exists(&path)?;
        request = request.with_image(ImageSource::from(path));
    }
    if let Some(font) = args.font {
        request = request.with_font(font);
    }
    if let Some(size) = args.max_font_size {
        request = request.with_max_font_size(size);
    }

    let png = compositor.compose(request).context("failed to compose card")?;

    if let Some(parent) = args.output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, &png)
        .with_context(|| format!("failed to write image to {}", args.output.display()))?;

    println!("{}", args.output.display());

    Ok(())
}

fn run_fit(args: FitArgs) -> Result<()> {
    let region = FittingRegion::new((0, 0), (args.width, args.height))?;
    let fonts = FontCache::new();
    let source = match &args.font {
        Some(font) => {
            ensure_file_exists(font)?;
            fonts.resolve([font])
        }
        None => FontSource::Builtin,
    };
    let options = LayoutOptions { max_font_size: args.max_font_size, line_spacing: args.line_spacing };

    let block = fit_text(&args.text, &region, &options, |size| fonts.sized_or_builtin(&source, size));

    let json = serde_json::to_string_pretty(&FitOutput::from(block))?;
    println!("{json}");

    Ok(())
}

fn run_characters(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let json = serde_json::to_string_pretty(&config.characters)?;
    println!("{json}");

    Ok(())
}

#[cfg(feature = "clipboard")]
fn run_clipboard(args: ClipboardArgs) -> Result<()> {
    use std::sync::Arc;
    use textbox_core::Session;

    let config = load_config(args.config.as_deref())?;
    let session = Session::new(Arc::new(Compositor::new(config)?))?;
    session.switch_character(args.character)?;
    session.set_emotion(args.emotion)?;
    session.set_background(args.background)?;

    let mut clipboard = clipboard::ArboardClipboard::new()?;
    let report = session.generate(&mut clipboard)?;

    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");

    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
