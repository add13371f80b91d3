//! Hazard mask: filled silhouettes of large edge clusters.
//!
//! Pipeline: intensity → Canny → dilation (closes gaps between edge
//! fragments) → 8-connected components → each component filled including
//! its interior holes → components whose filled area is at or below
//! `min_area` are dropped.

use crate::bands::{RiskTriple, band_densities};
use crate::error::{PerceptionError, Result};
use crate::grayscale::to_gray;
use crate::risk::{ObstacleRisk, validate_thresholds};
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::morphology::dilate;
use imageproc::region_labelling::{Connectivity, connected_components};
use rover_bridge::Frame;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Mask value for hazard pixels
pub const HAZARD: u8 = 255;

/// Hazard mask parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardMaskConfig {
    #[serde(default = "default_canny_low")]
    pub canny_low: f32,

    #[serde(default = "default_canny_high")]
    pub canny_high: f32,

    /// Dilation radius in pixels (1 = 3x3 square)
    #[serde(default = "default_dilate_radius")]
    pub dilate_radius: u8,

    #[serde(default = "default_dilate_iterations")]
    pub dilate_iterations: u32,

    /// Components with filled area at or below this are noise (pixels)
    #[serde(default = "default_min_area")]
    pub min_area: u32,
}

fn default_canny_low() -> f32 {
    80.0
}

fn default_canny_high() -> f32 {
    160.0
}

fn default_dilate_radius() -> u8 {
    1
}

fn default_dilate_iterations() -> u32 {
    2
}

fn default_min_area() -> u32 {
    150
}

impl Default for HazardMaskConfig {
    fn default() -> Self {
        Self {
            canny_low: default_canny_low(),
            canny_high: default_canny_high(),
            dilate_radius: default_dilate_radius(),
            dilate_iterations: default_dilate_iterations(),
            min_area: default_min_area(),
        }
    }
}

impl HazardMaskConfig {
    pub fn validate(&self) -> Result<()> {
        validate_thresholds(self.canny_low, self.canny_high)?;
        if self.dilate_iterations > 0 && self.dilate_radius == 0 {
            return Err(PerceptionError::InvalidConfig(
                "dilate_radius must be > 0 when dilating".to_string(),
            ));
        }
        Ok(())
    }
}

/// Binary hazard mask for one frame
#[derive(Debug, Clone)]
pub struct HazardMask {
    mask: GrayImage,
    hazards: usize,
}

impl HazardMask {
    /// Mask image, [`HAZARD`] where an obstacle was found, 0 elsewhere
    pub fn image(&self) -> &GrayImage {
        &self.mask
    }

    /// Number of components that survived the area filter
    pub fn hazard_count(&self) -> usize {
        self.hazards
    }

    /// Per-third fraction of hazard pixels
    pub fn densities(&self) -> RiskTriple {
        band_densities(&self.mask)
    }

    pub fn into_image(self) -> GrayImage {
        self.mask
    }
}

/// Builds [`HazardMask`]es from camera frames
#[derive(Debug, Clone)]
pub struct HazardDetector {
    config: HazardMaskConfig,
}

impl HazardDetector {
    pub fn new(config: HazardMaskConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HazardMaskConfig {
        &self.config
    }

    pub fn detect(&self, frame: &Frame) -> HazardMask {
        self.detect_gray(&to_gray(frame))
    }

    /// Same as [`detect`](Self::detect) for an intensity image
    pub fn detect_gray(&self, gray: &GrayImage) -> HazardMask {
        let mut edges = canny(gray, self.config.canny_low, self.config.canny_high);
        for _ in 0..self.config.dilate_iterations {
            edges = dilate(&edges, Norm::LInf, self.config.dilate_radius);
        }
        fill_large_components(&edges, self.config.min_area)
    }
}

impl Default for HazardDetector {
    fn default() -> Self {
        Self {
            config: HazardMaskConfig::default(),
        }
    }
}

impl ObstacleRisk for HazardDetector {
    fn risk(&self, frame: &Frame) -> RiskTriple {
        self.detect(frame).densities()
    }
}

/// Axis-aligned bounds of one labelled component (inclusive)
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl Bounds {
    fn new(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Rasterize every component of `binary` with holes filled, keeping those
/// whose filled area exceeds `min_area`.
fn fill_large_components(binary: &GrayImage, min_area: u32) -> HazardMask {
    let (width, height) = binary.dimensions();
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));

    let mut bounds: Vec<Option<Bounds>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let id = label.0[0] as usize;
        if id == 0 {
            continue;
        }
        if bounds.len() <= id {
            bounds.resize(id + 1, None);
        }
        match &mut bounds[id] {
            Some(b) => b.include(x, y),
            slot => *slot = Some(Bounds::new(x, y)),
        }
    }

    let mut mask = GrayImage::new(width, height);
    let mut hazards = 0;
    for (id, b) in bounds.iter().enumerate() {
        let Some(b) = b else { continue };
        let filled = fill_component(&labels, id as u32, *b);
        let area = filled.iter().filter(|&&inside| inside).count();
        if area as u64 <= min_area as u64 {
            continue;
        }
        hazards += 1;

        let bw = (b.max_x - b.min_x + 1) as usize;
        for (i, _) in filled.iter().enumerate().filter(|(_, inside)| **inside) {
            let x = b.min_x + (i % bw) as u32;
            let y = b.min_y + (i / bw) as u32;
            mask.put_pixel(x, y, Luma([HAZARD]));
        }
    }

    log::trace!(
        "hazard mask: {} of {} components kept",
        hazards,
        bounds.len().saturating_sub(1)
    );
    HazardMask { mask, hazards }
}

/// Inside/outside flags over the component's bounding box.
///
/// Flood-fills from a one-pixel padding ring through every cell that is not
/// part of the component; whatever the flood cannot reach is inside the
/// outer contour. The flood is 4-connected so diagonal gaps in an
/// 8-connected outline do not leak.
fn fill_component(
    labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>,
    id: u32,
    b: Bounds,
) -> Vec<bool> {
    let bw = (b.max_x - b.min_x + 1) as usize;
    let bh = (b.max_y - b.min_y + 1) as usize;
    let (pw, ph) = (bw + 2, bh + 2);

    let member = |px: usize, py: usize| -> bool {
        if px == 0 || py == 0 || px > bw || py > bh {
            return false;
        }
        let x = b.min_x + (px - 1) as u32;
        let y = b.min_y + (py - 1) as u32;
        labels.get_pixel(x, y).0[0] == id
    };

    let mut outside = vec![false; pw * ph];
    let mut queue = VecDeque::new();
    outside[0] = true;
    queue.push_back((0usize, 0usize));

    while let Some((px, py)) = queue.pop_front() {
        let neighbors = [
            (px.wrapping_sub(1), py),
            (px + 1, py),
            (px, py.wrapping_sub(1)),
            (px, py + 1),
        ];
        for (nx, ny) in neighbors {
            if nx >= pw || ny >= ph {
                continue;
            }
            let idx = ny * pw + nx;
            if outside[idx] || member(nx, ny) {
                continue;
            }
            outside[idx] = true;
            queue.push_back((nx, ny));
        }
    }

    let mut inside = Vec::with_capacity(bw * bh);
    for py in 1..=bh {
        for px in 1..=bw {
            inside.push(!outside[py * pw + px]);
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(size: u32, thickness: u32) -> GrayImage {
        GrayImage::from_fn(size + 8, size + 8, |x, y| {
            let (x, y) = (x as i64 - 4, y as i64 - 4);
            let s = size as i64;
            let t = thickness as i64;
            let in_outer = (0..s).contains(&x) && (0..s).contains(&y);
            let in_inner = (t..s - t).contains(&x) && (t..s - t).contains(&y);
            Luma([if in_outer && !in_inner { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_hole_is_filled() {
        let outline = ring(20, 2);
        let mask = fill_large_components(&outline, 150);
        assert_eq!(mask.hazard_count(), 1);
        // Center of the ring is now hazard
        assert_eq!(mask.image().get_pixel(14, 14).0[0], HAZARD);
        let area = mask.image().pixels().filter(|p| p.0[0] == HAZARD).count();
        assert_eq!(area, 400);
    }

    #[test]
    fn test_small_components_dropped() {
        // 12x12 filled = 144 <= 150
        let outline = ring(12, 1);
        let mask = fill_large_components(&outline, 150);
        assert_eq!(mask.hazard_count(), 0);
        assert!(mask.image().pixels().all(|p| p.0[0] == 0));

        // 13x13 filled = 169 > 150
        let outline = ring(13, 1);
        assert_eq!(fill_large_components(&outline, 150).hazard_count(), 1);
    }

    #[test]
    fn test_diagonal_outline_does_not_leak() {
        // Diamond drawn with 8-connected single pixels
        let image = GrayImage::from_fn(40, 40, |x, y| {
            let d = (x as i64 - 20).abs() + (y as i64 - 20).abs();
            Luma([if d == 12 { 255 } else { 0 }])
        });
        let mask = fill_large_components(&image, 150);
        assert_eq!(mask.hazard_count(), 1);
        assert_eq!(mask.image().get_pixel(20, 20).0[0], HAZARD);
        assert_eq!(mask.image().get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn test_config_validation() {
        let bad = HazardMaskConfig {
            dilate_radius: 0,
            ..Default::default()
        };
        assert!(HazardDetector::new(bad).is_err());
        assert!(HazardDetector::new(HazardMaskConfig::default()).is_ok());
    }
}
