//! Optional post-compression of finished cards

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Smallest width a reduced card is shrunk to
pub const MIN_WIDTH: u32 = 300;
/// Smallest height a reduced card is shrunk to
pub const MIN_HEIGHT: u32 = 100;

/// Linear downscale applied after composition
///
/// `pixel_reduction_ratio` is the percentage removed from each dimension,
/// so 50 halves width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    pub pixel_reduction_enabled: bool,
    pub pixel_reduction_ratio: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            pixel_reduction_enabled: false,
            pixel_reduction_ratio: 50,
        }
    }
}

impl CompressionSettings {
    pub fn reduce_by(ratio: u8) -> Self {
        Self {
            pixel_reduction_enabled: true,
            pixel_reduction_ratio: ratio,
        }
    }

    /// Enabled with a ratio strictly between 0 and 100
    pub fn is_active(&self) -> bool {
        self.pixel_reduction_enabled && (1..100).contains(&self.pixel_reduction_ratio)
    }

    /// Output size for a `width`×`height` card, or `None` when unchanged
    ///
    /// Each dimension is floored at [`MIN_WIDTH`]/[`MIN_HEIGHT`] but never
    /// grows beyond its original size.
    pub fn target_size(&self, (width, height): (u32, u32)) -> Option<(u32, u32)> {
        if !self.is_active() {
            return None;
        }
        let keep = 100 - u64::from(self.pixel_reduction_ratio);
        let reduce = |extent: u32, floor: u32| {
            let reduced = (u64::from(extent) * keep / 100) as u32;
            reduced.max(floor).min(extent)
        };
        let target = (reduce(width, MIN_WIDTH), reduce(height, MIN_HEIGHT));
        (target != (width, height)).then_some(target)
    }

    /// Downscale `image` bilinearly when active
    pub fn apply(&self, image: RgbaImage) -> RgbaImage {
        match self.target_size(image.dimensions()) {
            Some((width, height)) => {
                tracing::debug!(from = ?image.dimensions(), to = ?(width, height), "compressing card");
                imageops::resize(&image, width, height, FilterType::Triangle)
            }
            None => image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_or_out_of_range_is_noop() {
        assert_eq!(CompressionSettings::default().target_size((2560, 834)), None);
        assert_eq!(CompressionSettings::reduce_by(0).target_size((2560, 834)), None);
        assert_eq!(CompressionSettings::reduce_by(100).target_size((2560, 834)), None);
    }

    #[test]
    fn test_linear_reduction() {
        let settings = CompressionSettings::reduce_by(50);
        assert_eq!(settings.target_size((2560, 834)), Some((1280, 417)));

        let settings = CompressionSettings::reduce_by(33);
        // floor(2560 * 0.67) and floor(834 * 0.67)
        assert_eq!(settings.target_size((2560, 834)), Some((1715, 558)));
    }

    #[test]
    fn test_floor_clamps_small_results() {
        let settings = CompressionSettings::reduce_by(95);
        assert_eq!(settings.target_size((2560, 834)), Some((300, 100)));

        // Never enlarges a card already under the floor
        assert_eq!(settings.target_size((200, 80)), None);
        assert_eq!(settings.target_size((800, 80)), Some((300, 80)));
    }

    #[test]
    fn test_apply_resizes() {
        let image = RgbaImage::new(1000, 400);
        let out = CompressionSettings::reduce_by(40).apply(image);
        assert_eq!(out.dimensions(), (600, 240));
    }

    #[test]
    fn test_deserialize_partial() {
        let settings: CompressionSettings = toml::from_str("pixel_reduction_enabled = true").unwrap();
        assert_eq!(settings, CompressionSettings::reduce_by(50));
    }
}
