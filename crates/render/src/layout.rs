//! Auto-fit layout
//!
//! Finds the largest integer font size at which a greedily wrapped block of
//! text fits a rectangle, then returns the wrapped lines at that size.
//!
//! Wrapping works per paragraph (explicit newline). A paragraph containing a
//! space is split into words joined by single spaces; otherwise it is split
//! into grapheme clusters with no joiner, which is the normal case for CJK
//! text. A word wider than the region on its own is broken by cluster.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::emoji::{measurement_text, segments, Segment};
use crate::font::SizedFont;

/// Extra leading between lines as a fraction of the font height
pub const DEFAULT_LINE_SPACING: f32 = 0.15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("invalid region: {width}x{height} (width and height must be positive)")]
    InvalidRegion { width: i64, height: i64 },
    #[error("content image has zero width or height")]
    EmptyContent,
}

/// Horizontal alignment of each line within the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Vertical alignment of the whole block within the region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    #[default]
    Top,
    Middle,
    Bottom,
}

/// Axis-aligned target rectangle with positive width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FittingRegion {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl FittingRegion {
    pub fn new(top_left: (i32, i32), bottom_right: (i32, i32)) -> Result<Self, LayoutError> {
        let width = i64::from(bottom_right.0) - i64::from(top_left.0);
        let height = i64::from(bottom_right.1) - i64::from(top_left.1);
        if width <= 0 || height <= 0 {
            return Err(LayoutError::InvalidRegion { width, height });
        }
        Ok(Self {
            left: top_left.0,
            top: top_left.1,
            right: bottom_right.0,
            bottom: bottom_right.1,
        })
    }

    pub fn left(&self) -> i32 {
        self.left
    }

    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn right(&self) -> i32 {
        self.right
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn width(&self) -> u32 {
        (i64::from(self.right) - i64::from(self.left)) as u32
    }

    pub fn height(&self) -> u32 {
        (i64::from(self.bottom) - i64::from(self.top)) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    /// Upper bound for the font-size search; `None` or 0 means region height
    pub max_font_size: Option<u32>,
    pub line_spacing: f32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            max_font_size: None,
            line_spacing: DEFAULT_LINE_SPACING,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrappedLine {
    pub text: String,
    pub pixel_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlockMetrics {
    pub width: u32,
    pub height: u32,
    pub line_height: u32,
}

impl BlockMetrics {
    pub fn fits(&self, region: &FittingRegion) -> bool {
        self.width <= region.width() && self.height <= region.height()
    }
}

/// Result of fitting text into a region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub font_size: u32,
    pub lines: Vec<WrappedLine>,
    pub metrics: BlockMetrics,
    /// Block is taller than the region even at the chosen size
    pub overflow: bool,
}

/// Horizontal advance of `text`, with each emoji cluster one em wide
pub fn advance(font: &SizedFont, text: &str) -> f32 {
    segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(run) => font.text_width(run),
            Segment::Emoji(_) => font.size() as f32,
        })
        .sum()
}

/// Greedy wrap of `text` to `max_width` using `measure` for widths
///
/// Every paragraph yields at least one line; an empty input yields one
/// empty line.
pub fn wrap_lines<F>(text: &str, max_width: u32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let fits = |candidate: &str| measure(candidate) <= max_width as f32;
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let first = lines.len();
        let has_space = paragraph.contains(' ');
        let units: Vec<&str> = if has_space {
            paragraph.split(' ').collect()
        } else {
            paragraph.graphemes(true).collect()
        };
        let joiner = if has_space { " " } else { "" };

        let mut current = String::new();
        for unit in units {
            let trial = if current.is_empty() {
                unit.to_string()
            } else {
                format!("{current}{joiner}{unit}")
            };
            if fits(&trial) {
                current = trial;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if fits(unit) {
                current = unit.to_string();
            } else if has_space && unit.graphemes(true).nth(1).is_some() {
                current = wrap_clusters(unit, &fits, &mut lines);
            } else {
                lines.push(unit.to_string());
            }
        }

        if !current.is_empty() || lines.len() == first {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Break one overlong word by cluster, returning the unfinished tail
fn wrap_clusters<F>(word: &str, fits: &F, lines: &mut Vec<String>) -> String
where
    F: Fn(&str) -> bool,
{
    let mut current = String::new();
    for cluster in word.graphemes(true) {
        let trial = format!("{current}{cluster}");
        if current.is_empty() || fits(&trial) {
            current = trial;
        } else {
            lines.push(std::mem::replace(&mut current, cluster.to_string()));
        }
    }
    current
}

/// Wrap `text` with `font` and record each line's pixel width
pub fn wrap_text(text: &str, max_width: u32, font: &SizedFont) -> Vec<WrappedLine> {
    wrap_lines(text, max_width, |candidate| advance(font, candidate))
        .into_iter()
        .map(|text| {
            let pixel_width = advance(font, &text) as u32;
            WrappedLine { text, pixel_width }
        })
        .collect()
}

/// Bounding size of a block of lines
pub fn measure_block(lines: &[WrappedLine], font: &SizedFont, line_spacing: f32) -> BlockMetrics {
    let line_height = font.line_height(line_spacing);
    let count = lines.len().max(1) as u32;
    BlockMetrics {
        width: lines.iter().map(|line| line.pixel_width).max().unwrap_or(0),
        height: line_height.saturating_mul(count).max(1),
        line_height,
    }
}

/// Fit `text` into `region` at the largest feasible font size
///
/// `font_at` supplies the dialogue font at a given pixel size. The search
/// measures with every emoji replaced by a full-width placeholder; the final
/// lines are wrapped from the real text at the chosen size, so emoji lines
/// may differ slightly from what was measured. When no size fits, size 1 is
/// used and `overflow` reports whether the block is still too tall.
pub fn fit_text<F>(
    text: &str,
    region: &FittingRegion,
    options: &LayoutOptions,
    mut font_at: F,
) -> TextBlock
where
    F: FnMut(u32) -> SizedFont,
{
    let probe = measurement_text(text);
    let region_width = region.width();
    let region_height = region.height();
    let upper = match options.max_font_size {
        Some(max) if max > 0 => max.min(region_height),
        _ => region_height,
    };

    let (mut lo, mut hi) = (1u32, upper);
    let mut best = None;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let font = font_at(mid);
        let lines = wrap_text(&probe, region_width, &font);
        let metrics = measure_block(&lines, &font, options.line_spacing);
        if metrics.fits(region) {
            best = Some(mid);
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    let font_size = best.unwrap_or(1);
    if best.is_none() {
        tracing::debug!(region_width, region_height, "no font size fits, using 1px");
    }
    let font = font_at(font_size);
    let lines = wrap_text(text, region_width, &font);
    let metrics = measure_block(&lines, &font, options.line_spacing);

    TextBlock {
        font_size,
        overflow: metrics.height > region_height,
        lines,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(w: i32, h: i32) -> FittingRegion {
        FittingRegion::new((0, 0), (w, h)).unwrap()
    }

    fn texts(lines: &[WrappedLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn test_degenerate_region_rejected() {
        assert_eq!(
            FittingRegion::new((10, 10), (10, 50)),
            Err(LayoutError::InvalidRegion { width: 0, height: 40 })
        );
        assert!(FittingRegion::new((10, 10), (5, 50)).is_err());
        assert!(FittingRegion::new((10, 10), (20, 9)).is_err());
    }

    #[test]
    fn test_short_text_fills_to_max_size() {
        let region = FittingRegion::new((728, 355), (2339, 800)).unwrap();
        assert_eq!((region.width(), region.height()), (1611, 445));

        let options = LayoutOptions {
            max_font_size: Some(145),
            ..Default::default()
        };
        let block = fit_text("你好", &region, &options, SizedFont::builtin);

        assert_eq!(block.font_size, 145);
        assert_eq!(texts(&block.lines), vec!["你好"]);
        assert_eq!(block.lines[0].pixel_width, 290);
        assert!(!block.overflow);
    }

    #[test]
    fn test_max_font_size_zero_means_unbounded() {
        let options = LayoutOptions {
            max_font_size: Some(0),
            ..Default::default()
        };
        let block = fit_text("a", &region(1000, 50), &options, SizedFont::builtin);
        // One line at size s is int(1.15 * s) tall, so 44 is the largest fit
        assert_eq!(block.font_size, 44);
    }

    #[test]
    fn test_long_cjk_text_wraps_by_character() {
        let text: String = "春眠不觉晓处处闻啼鸟夜来风雨声花落知多少".repeat(10);
        assert_eq!(text.chars().count(), 200);
        let region = region(300, 445);

        let block = fit_text(&text, &region, &LayoutOptions::default(), SizedFont::builtin);

        assert!(block.lines.len() > 1);
        assert!(!block.overflow);
        assert!(block.metrics.height <= 445);
        assert!(block.lines.iter().all(|line| line.pixel_width <= 300));
        assert_eq!(texts(&block.lines).concat(), text);
    }

    #[test]
    fn test_every_smaller_size_also_fits() {
        let text = ["The quick brown fox jumps over the lazy dog"; 4].join(" ");
        let region = region(420, 260);
        let options = LayoutOptions::default();

        let block = fit_text(&text, &region, &options, SizedFont::builtin);
        for size in 1..=block.font_size {
            let font = SizedFont::builtin(size);
            let lines = wrap_text(&text, region.width(), &font);
            let metrics = measure_block(&lines, &font, options.line_spacing);
            assert!(metrics.fits(&region), "size {size} should fit");
        }

        let larger = SizedFont::builtin(block.font_size + 1);
        let lines = wrap_text(&text, region.width(), &larger);
        assert!(!measure_block(&lines, &larger, options.line_spacing).fits(&region));
    }

    #[test]
    fn test_nothing_fits_falls_back_to_one_pixel() {
        let text = "字".repeat(400);
        let block = fit_text(&text, &region(10, 3), &LayoutOptions::default(), SizedFont::builtin);

        assert_eq!(block.font_size, 1);
        assert!(block.overflow);
    }

    #[test]
    fn test_word_wrapping() {
        let font = SizedFont::builtin(10);
        // "hello world" is 55px, "hello" 25px
        let lines = wrap_text("hello world again", 60, &font);
        assert_eq!(texts(&lines), vec!["hello world", "again"]);
    }

    #[test]
    fn test_long_word_is_broken_by_character() {
        let font = SizedFont::builtin(10);
        let lines = wrap_text("go abcdefghijkl end", 30, &font);
        assert_eq!(texts(&lines), vec!["go", "abcdef", "ghijkl", "end"]);
    }

    #[test]
    fn test_oversized_character_gets_own_line() {
        let font = SizedFont::builtin(50);
        let lines = wrap_text("你好", 30, &font);
        assert_eq!(texts(&lines), vec!["你", "好"]);
    }

    #[test]
    fn test_blank_lines_preserved() {
        let font = SizedFont::builtin(10);
        assert_eq!(texts(&wrap_text("a\n\nb", 100, &font)), vec!["a", "", "b"]);
        assert_eq!(texts(&wrap_text("a\n\n\nb", 100, &font)), vec!["a", "", "", "b"]);
        assert_eq!(texts(&wrap_text("", 100, &font)), vec![""]);
    }

    #[test]
    fn test_wrapping_is_idempotent() {
        let font = SizedFont::builtin(12);
        let text = "第一段文字比较长需要换行\nmixed words and 中文 together here\n\nsupercalifragilistic word";
        let first = wrap_text(text, 70, &font);
        let joined = first.iter().map(|line| line.text.as_str()).collect::<Vec<_>>().join("\n");
        let second = wrap_text(&joined, 70, &font);
        assert_eq!(first, second);
    }

    #[test]
    fn test_emoji_advance_is_one_em() {
        let font = SizedFont::builtin(20);
        assert_eq!(advance(&font, "😀"), 20.0);
        assert_eq!(advance(&font, "ab😀"), 40.0);
        assert_eq!(advance(&font, "👍🏽"), 20.0);
    }

    #[test]
    fn test_block_metrics() {
        let font = SizedFont::builtin(20);
        let lines = wrap_text("ab\n你好吗", 1000, &font);
        let metrics = measure_block(&lines, &font, 0.15);
        assert_eq!(metrics.line_height, 23);
        assert_eq!(metrics.height, 46);
        assert_eq!(metrics.width, 60);

        assert_eq!(measure_block(&[], &font, 0.15).height, 23);
    }

    #[test]
    fn test_tall_region_does_not_overflow_block_height() {
        let region = region(100, 2_000_000_000);
        let block = fit_text("a\nb\nc\nd", &region, &LayoutOptions::default(), SizedFont::builtin);

        // Width bound: a half-width glyph is size / 2 pixels wide
        assert!((200..=201).contains(&block.font_size));
        assert_eq!(block.lines.len(), 4);
        assert!(!block.overflow);

        let huge = SizedFont::builtin(1_900_000_000);
        let lines = wrap_text("a\nb\nc", u32::MAX, &huge);
        assert_eq!(measure_block(&lines, &huge, 0.15).height, u32::MAX);
    }

    #[test]
    fn test_emoji_text_fits_like_its_placeholder() {
        let text = "今天😀天气😎真的很好🎉我们出去玩吧";
        let region = region(300, 200);
        let options = LayoutOptions::default();

        let block = fit_text(text, &region, &options, SizedFont::builtin);
        let placeholder = fit_text(&measurement_text(text), &region, &options, SizedFont::builtin);

        assert_eq!(block.font_size, placeholder.font_size);
        assert_eq!(block.lines.len(), placeholder.lines.len());
        assert!(block.lines.iter().all(|line| line.pixel_width <= 300));
        assert!(block.metrics.height <= 200);
        assert!(!block.overflow);
        assert_eq!(texts(&block.lines).concat(), text);
    }
}
