//! Left / center / right partition of an image.
//!
//! Band widths use integer thirds: left `[0, W/3)`, center `[W/3, 2*(W/3))`,
//! right `[2*(W/3), W)`. Any remainder columns land in the right band.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Obstacle density in each third of the image, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskTriple {
    pub left: f32,
    pub center: f32,
    pub right: f32,
}

impl RiskTriple {
    pub const CLEAR: RiskTriple = RiskTriple {
        left: 0.0,
        center: 0.0,
        right: 0.0,
    };

    #[inline]
    pub const fn new(left: f32, center: f32, right: f32) -> Self {
        Self {
            left,
            center,
            right,
        }
    }

    /// Largest of the three densities
    #[inline]
    pub fn max(&self) -> f32 {
        self.left.max(self.center).max(self.right)
    }
}

/// Column ranges of the left, center and right bands.
///
/// For `width < 3` the left and center bands are empty.
pub fn band_bounds(width: u32) -> [Range<u32>; 3] {
    let third = width / 3;
    [0..third, third..2 * third, 2 * third..width]
}

/// Fraction of non-zero pixels per band. An empty band reports 0.0.
pub fn band_densities(image: &GrayImage) -> RiskTriple {
    let [left, center, right] = band_bounds(image.width());
    RiskTriple {
        left: band_density(image, left),
        center: band_density(image, center),
        right: band_density(image, right),
    }
}

fn band_density(image: &GrayImage, columns: Range<u32>) -> f32 {
    let total = columns.len() as u64 * image.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let width = image.width() as usize;
    let raw = image.as_raw();
    let mut hits = 0u64;
    for y in 0..image.height() as usize {
        let row = &raw[y * width..(y + 1) * width];
        hits += row[columns.start as usize..columns.end as usize]
            .iter()
            .filter(|&&v| v != 0)
            .count() as u64;
    }
    hits as f32 / total as f32
}
