//! Scaling and pasting content images into a region

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::layout::{Align, FittingRegion, LayoutError, VAlign};

/// How a content image is fitted into the dialogue region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitOptions {
    /// Inset applied on every side of the region
    pub padding: u32,
    pub allow_upscale: bool,
    /// Composite through the image's alpha channel instead of copying pixels
    pub keep_alpha: bool,
    pub align: Align,
    pub valign: VAlign,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding: 12,
            allow_upscale: true,
            keep_alpha: true,
            align: Align::Center,
            valign: VAlign::Middle,
            max_width: None,
            max_height: None,
        }
    }
}

/// Where a content image ended up on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

fn usable_extent(extent: u32, padding: u32) -> u32 {
    extent.saturating_sub(padding.saturating_mul(2)).max(1)
}

/// Size a `width`×`height` image takes when fitted into `region`
pub fn fitted_size(
    (width, height): (u32, u32),
    region: &FittingRegion,
    options: &FitOptions,
) -> Result<(u32, u32), LayoutError> {
    if width == 0 || height == 0 {
        return Err(LayoutError::EmptyContent);
    }

    let usable_w = usable_extent(region.width(), options.padding) as f64;
    let usable_h = usable_extent(region.height(), options.padding) as f64;
    let (w, h) = (width as f64, height as f64);

    let mut scale = (usable_w / w).min(usable_h / h);
    if !options.allow_upscale {
        scale = scale.min(1.0);
    }
    if let Some(max_width) = options.max_width {
        scale = scale.min(max_width as f64 / w);
    }
    if let Some(max_height) = options.max_height {
        scale = scale.min(max_height as f64 / h);
    }

    let scaled = |extent: f64| ((extent * scale).round() as u32).max(1);
    Ok((scaled(w), scaled(h)))
}

/// Scale `content` into `region` and composite it onto `canvas`
pub fn paste_fitted(
    canvas: &mut RgbaImage,
    content: &RgbaImage,
    region: &FittingRegion,
    options: &FitOptions,
) -> Result<Placement, LayoutError> {
    let (width, height) = fitted_size(content.dimensions(), region, options)?;

    let left = i64::from(region.left()) + i64::from(options.padding);
    let top = i64::from(region.top()) + i64::from(options.padding);
    let usable_w = i64::from(usable_extent(region.width(), options.padding));
    let usable_h = i64::from(usable_extent(region.height(), options.padding));
    let (w, h) = (i64::from(width), i64::from(height));

    let x = match options.align {
        Align::Left => left,
        Align::Center => left + (usable_w - w).div_euclid(2),
        Align::Right => left + usable_w - w,
    };
    let y = match options.valign {
        VAlign::Top => top,
        VAlign::Middle => top + (usable_h - h).div_euclid(2),
        VAlign::Bottom => top + usable_h - h,
    };

    let resized;
    let source = if (width, height) == content.dimensions() {
        content
    } else {
        resized = imageops::resize(content, width, height, FilterType::Lanczos3);
        &resized
    };

    if options.keep_alpha {
        imageops::overlay(canvas, source, x, y);
    } else {
        imageops::replace(canvas, source, x, y);
    }

    Ok(Placement { x, y, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn region() -> FittingRegion {
        FittingRegion::new((100, 50), (524, 274)).unwrap()
    }

    #[test]
    fn test_fits_limiting_axis() {
        // Usable area is 400x200 after 12px padding
        let options = FitOptions::default();
        assert_eq!(fitted_size((800, 200), &region(), &options), Ok((400, 100)));
        assert_eq!(fitted_size((100, 100), &region(), &options), Ok((200, 200)));
    }

    #[test]
    fn test_upscale_can_be_disabled() {
        let options = FitOptions {
            allow_upscale: false,
            ..Default::default()
        };
        assert_eq!(fitted_size((100, 50), &region(), &options), Ok((100, 50)));
        assert_eq!(fitted_size((1600, 400), &region(), &options), Ok((400, 100)));
    }

    #[test]
    fn test_max_dimensions_cap_scale() {
        let options = FitOptions {
            max_width: Some(150),
            ..Default::default()
        };
        assert_eq!(fitted_size((100, 100), &region(), &options), Ok((150, 150)));
    }

    #[test]
    fn test_tiny_results_keep_one_pixel() {
        let options = FitOptions::default();
        assert_eq!(fitted_size((100_000, 1), &region(), &options), Ok((400, 1)));
    }

    #[test]
    fn test_empty_content_rejected() {
        let options = FitOptions::default();
        assert_eq!(fitted_size((0, 10), &region(), &options), Err(LayoutError::EmptyContent));

        let mut canvas = RgbaImage::new(10, 10);
        let empty = RgbaImage::new(0, 0);
        assert!(paste_fitted(&mut canvas, &empty, &region(), &options).is_err());
    }

    #[test]
    fn test_centered_paste() {
        let mut canvas = RgbaImage::new(600, 300);
        let content = RgbaImage::from_pixel(50, 50, Rgba([0, 0, 255, 255]));

        let placement = paste_fitted(&mut canvas, &content, &region(), &FitOptions::default()).unwrap();

        assert_eq!(placement, Placement { x: 212, y: 62, width: 200, height: 200 });
        assert_eq!(canvas.get_pixel(212, 62), &Rgba([0, 0, 255, 255]));
        assert_eq!(canvas.get_pixel(211, 62), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_alpha_handling() {
        let background = Rgba([255, 0, 0, 255]);
        let content = RgbaImage::from_pixel(400, 200, Rgba([0, 0, 255, 0]));

        let mut kept = RgbaImage::from_pixel(600, 300, background);
        paste_fitted(&mut kept, &content, &region(), &FitOptions::default()).unwrap();
        assert_eq!(kept.get_pixel(300, 150), &background);

        let mut replaced = RgbaImage::from_pixel(600, 300, background);
        let options = FitOptions {
            keep_alpha: false,
            ..Default::default()
        };
        paste_fitted(&mut replaced, &content, &region(), &options).unwrap();
        assert_eq!(replaced.get_pixel(300, 150), &Rgba([0, 0, 255, 0]));
    }
}
