//! Textbox Render Library
//!
//! Auto-fit text layout, bracket/quote highlighting and raster drawing used
//! to composite dialogue onto character cards.

pub mod color;
pub mod draw;
pub mod emoji;
pub mod font;
pub mod highlight;
pub mod layout;
pub mod paste;

pub use color::{Color, Palette};
pub use draw::{draw_label, draw_text_block, TextStyle};
pub use emoji::{EmojiDirectory, EmojiRenderer, NoEmojiImages};
pub use font::{FontCache, FontFace, FontLoadError, FontSource, SizedFont};
pub use highlight::{colorize_lines, parse_line, BracketState, ColoredLine, GlyphRun};
pub use layout::{
    fit_text, measure_block, wrap_text, Align, BlockMetrics, FittingRegion, LayoutError,
    LayoutOptions, TextBlock, VAlign, WrappedLine,
};
pub use paste::{fitted_size, paste_fitted, FitOptions, Placement};
