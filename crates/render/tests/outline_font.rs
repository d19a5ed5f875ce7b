use ab_glyph::Font;
use image::{Rgba, RgbaImage};
use std::path::PathBuf;
use textbox_render::{
    draw_text_block, fit_text, Color, FittingRegion, FontCache, FontFace, FontSource, LayoutOptions,
    NoEmojiImages, Palette, SizedFont, TextStyle,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn dejavu(fonts: &FontCache, size: u32) -> SizedFont {
    fonts.get_font(&fixture("DejaVuSans.ttf"), size).expect("fixture font should load")
}

/// Bounding box `(min_x, min_y, max_x, max_y)` of non-transparent pixels
fn painted_bounds(canvas: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    canvas
        .enumerate_pixels()
        .filter(|(_, _, pixel)| pixel[3] > 0)
        .fold(None, |bounds, (x, y, _)| match bounds {
            None => Some((x, y, x, y)),
            Some((x0, y0, x1, y1)) => Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y))),
        })
}

#[test]
fn outline_metrics_scale_from_em_size() {
    let fonts = FontCache::new();
    let font = dejavu(&fonts, 36);
    assert!(!font.face().is_builtin());

    let FontFace::Outline(face) = font.face() else {
        panic!("fixture should load as an outline font");
    };
    let units_per_em = face.units_per_em().expect("fixture has units per em");
    let expected = 36.0 * face.height_unscaled() / units_per_em;

    // hhea ascent 1901, descent -483 on a 2048 em
    assert!((font.ascent() + font.descent() - expected).abs() < 0.01);
    assert!((font.ascent() - 33.42).abs() < 0.05, "ascent {}", font.ascent());
    assert!((font.descent() - 8.49).abs() < 0.05, "descent {}", font.descent());
    assert_eq!(font.line_height(0.15), 48);
}

#[test]
fn text_width_matches_drawn_extent() {
    let fonts = FontCache::new();
    let font = dejavu(&fonts, 36);
    let width = font.text_width("Hello");
    assert!(width > 36.0 && width < 5.0 * 36.0, "width {width}");

    let mut canvas = RgbaImage::new(300, 80);
    font.draw(&mut canvas, 10, 10, "Hello", Rgba([255, 255, 255, 255]));
    let (min_x, min_y, max_x, max_y) = painted_bounds(&canvas).expect("text should be painted");

    // Ink sits inside the advance box, short of it only by side bearings
    let right = 10.0 + width;
    assert!(min_x >= 10 && min_x <= 16, "min_x {min_x}");
    assert!((max_x as f32) <= right + 1.0, "max_x {max_x} right {right}");
    assert!((max_x as f32) >= right - 6.0, "max_x {max_x} right {right}");
    assert!(min_y >= 10);
    assert!((max_y as f32) <= 10.0 + font.ascent() + font.descent());
}

#[test]
fn fitted_block_paints_inside_region() {
    let fonts = FontCache::new();
    let source = fonts.resolve([fixture("DejaVuSans.ttf")]);
    assert!(matches!(source, FontSource::File(_)));

    let region = FittingRegion::new((20, 20), (320, 220)).unwrap();
    let text = "The quick brown fox leaps over the lazy dog and then runs all the way home";
    let block = fit_text(text, &region, &LayoutOptions::default(), |size| {
        fonts.sized_or_builtin(&source, size)
    });

    assert!(!block.overflow);
    assert!(block.lines.len() > 1);
    assert!(block.metrics.height <= region.height());
    assert!(block.lines.iter().all(|line| line.pixel_width <= region.width()));

    let font = fonts.sized_or_builtin(&source, block.font_size);
    let style = TextStyle {
        palette: Palette::new(Color::WHITE, Color::rgb(255, 0, 0)),
        shadow_offset: (0, 0),
        ..TextStyle::default()
    };
    let mut canvas = RgbaImage::new(400, 300);
    draw_text_block(&mut canvas, &block, &region, &font, &style, &NoEmojiImages);

    let (min_x, min_y, max_x, max_y) = painted_bounds(&canvas).expect("text should be painted");
    assert!(min_x >= 19 && min_y >= 20, "top-left ({min_x}, {min_y})");
    assert!(max_x <= 320 && max_y < 220, "bottom-right ({max_x}, {max_y})");
}
