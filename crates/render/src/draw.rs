//! Raster drawing of fitted text blocks and name labels

use image::{imageops, RgbaImage};

use crate::color::{Color, Palette};
use crate::emoji::{segments, EmojiRenderer, Segment};
use crate::font::SizedFont;
use crate::highlight::{colorize_lines, GlyphRun};
use crate::layout::{Align, FittingRegion, TextBlock, VAlign};

/// Shadow offset under name labels
pub const LABEL_SHADOW_OFFSET: (i32, i32) = (2, 2);

/// How a fitted block is placed and painted inside its region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub align: Align,
    pub valign: VAlign,
    pub palette: Palette,
    pub shadow_offset: (i32, i32),
    pub shadow_color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            align: Align::Left,
            valign: VAlign::Top,
            palette: Palette::default(),
            shadow_offset: (4, 4),
            shadow_color: Color::BLACK,
        }
    }
}

/// Draw `block` into `region` and return how many lines were painted
///
/// Lines starting more than the region height below the block's first line
/// are skipped, which truncates a block that overflowed at size 1.
pub fn draw_text_block(
    canvas: &mut RgbaImage,
    block: &TextBlock,
    region: &FittingRegion,
    font: &SizedFont,
    style: &TextStyle,
    emoji: &dyn EmojiRenderer,
) -> usize {
    let region_height = region.height() as i32;
    let block_height = block.metrics.height as i32;
    let y_start = match style.valign {
        VAlign::Top => region.top(),
        VAlign::Middle => region.top() + (region_height - block_height).div_euclid(2),
        VAlign::Bottom => region.bottom() - block_height,
    };

    let mut drawn = 0;
    let mut y = y_start;
    for line in colorize_lines(&block.lines, &style.palette) {
        if y - y_start > region_height {
            break;
        }
        let line_width = line.pixel_width as i32;
        let x = match style.align {
            Align::Left => region.left(),
            Align::Center => region.left() + (region.width() as i32 - line_width).div_euclid(2),
            Align::Right => region.right() - line_width,
        };
        draw_runs(canvas, &line.runs, x, y, font, style, emoji);
        y = y.saturating_add(i32::try_from(block.metrics.line_height).unwrap_or(i32::MAX));
        drawn += 1;
    }
    drawn
}

fn draw_runs(
    canvas: &mut RgbaImage,
    runs: &[GlyphRun],
    x: i32,
    y: i32,
    font: &SizedFont,
    style: &TextStyle,
    emoji: &dyn EmojiRenderer,
) {
    let (dx, dy) = style.shadow_offset;
    let shadow = style.shadow_color.to_rgba();
    let mut pen = x as f32;

    for run in runs {
        let color = run.color.to_rgba();
        for segment in segments(&run.text) {
            let left = pen.round() as i32;
            match segment {
                Segment::Text(text) => {
                    font.draw(canvas, left + dx, y + dy, text, shadow);
                    font.draw(canvas, left, y, text, color);
                    pen += font.text_width(text);
                }
                Segment::Emoji(cluster) => {
                    match emoji.render(cluster, font.size()) {
                        Some(image) => imageops::overlay(canvas, image.as_ref(), i64::from(left), i64::from(y)),
                        None => {
                            font.draw(canvas, left + dx, y + dy, cluster, shadow);
                            font.draw(canvas, left, y, cluster, color);
                        }
                    }
                    pen += font.size() as f32;
                }
            }
        }
    }
}

/// Draw a single-line label with a black shadow at (2, 2)
pub fn draw_label(canvas: &mut RgbaImage, font: &SizedFont, text: &str, position: (i32, i32), color: Color) {
    let (x, y) = position;
    let (dx, dy) = LABEL_SHADOW_OFFSET;
    font.draw(canvas, x + dx, y + dy, text, Color::BLACK.to_rgba());
    font.draw(canvas, x, y, text, color.to_rgba());
}
