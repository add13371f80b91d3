//! Forward camera simulator with per-column ray casting
//!
//! Each image column casts one ray into the rock field. A hit rock is drawn
//! as a vertical band whose height follows pinhole projection; everything
//! else is sky above the horizon and terrain below it. Sky and terrain are
//! close in intensity so the horizon alone stays below edge thresholds.
//!
//! Rock surfaces carry a coarse checker texture so that nearer rocks fill a
//! larger share of the image with edges.

use super::scene::{RayHit, Scene};
use crate::config::CameraConfig;
use rover_bridge::protocol::MAX_FRAME_BYTES;
use rover_bridge::{BGR_CHANNELS, Frame};
use std::f32::consts::TAU;

/// Sky color, BGR
const SKY: [u8; 3] = [196, 178, 170];
/// Terrain color at the horizon, BGR
const TERRAIN: [u8; 3] = [130, 160, 186];

/// Texture cells around a rock's circumference
const SURFACE_SECTORS: f32 = 10.0;
/// Texture cells from rock base to top
const SURFACE_BANDS: f32 = 4.0;
/// Brightness swing of the texture (fraction of base color)
const TEXTURE_CONTRAST: f32 = 0.45;

/// Pinhole camera mounted on the rover
#[derive(Debug, Clone)]
pub struct CameraSimulator {
    config: CameraConfig,
    /// Focal length in pixels
    focal: f32,
}

impl CameraSimulator {
    pub fn new(config: &CameraConfig) -> Self {
        let half_fov = config.fov.to_radians() / 2.0;
        let focal = (config.width as f32 / 2.0) / half_fov.tan();
        Self {
            config: config.clone(),
            focal,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Render the view from pose `(x, y, theta)`
    pub fn render(
        &self,
        scene: &Scene,
        x: f32,
        y: f32,
        theta: f32,
    ) -> rover_bridge::Result<Frame> {
        let bytes = self.config.frame_bytes();
        if bytes > MAX_FRAME_BYTES as u64 {
            return Err(rover_bridge::Error::Backend(format!(
                "camera frame of {} bytes exceeds the {} byte limit",
                bytes, MAX_FRAME_BYTES
            )));
        }

        let (w, h) = (self.config.width, self.config.height);
        let horizon = h as f32 / 2.0;
        let half_fov = self.config.fov.to_radians() / 2.0;
        let row_len = w as usize * BGR_CHANNELS as usize;
        let mut data = vec![0u8; bytes as usize];

        for u in 0..w {
            // Column 0 looks left (counter-clockwise of heading)
            let offset = ((w as f32 / 2.0 - (u as f32 + 0.5)) / self.focal).atan();
            let angle = theta + offset.clamp(-half_fov, half_fov);
            let hit = scene.ray_cast(x, y, angle, self.config.range);

            for v in 0..h {
                let mut color = background(v as f32 + 0.5, horizon, h as f32);

                if let Some(hit) = hit {
                    // Perpendicular depth avoids fisheye warping
                    let depth = (hit.distance * offset.cos()).max(1e-3);
                    let rock = &scene.rocks()[hit.rock];
                    let bottom = horizon + self.focal * self.config.mount_height / depth;
                    let top = horizon
                        - self.focal * (2.0 * rock.radius - self.config.mount_height) / depth;
                    let row = v as f32 + 0.5;
                    if row >= top && row < bottom {
                        let height_frac = (bottom - row) / (bottom - top);
                        color =
                            shade_rock(rock.color, &hit, height_frac, depth, self.config.range);
                    }
                }

                let idx = v as usize * row_len + u as usize * BGR_CHANNELS as usize;
                data[idx..idx + 3].copy_from_slice(&color);
            }
        }

        Frame::new(h, w, BGR_CHANNELS, data)
    }
}

/// Sky or terrain color for an image row
fn background(row: f32, horizon: f32, height: f32) -> [u8; 3] {
    if row < horizon {
        return SKY;
    }
    // Terrain darkens slightly toward the bottom of the image
    let depth_frac = ((row - horizon) / (height - horizon)).clamp(0.0, 1.0);
    scale(TERRAIN, 1.0 - 0.15 * depth_frac)
}

fn shade_rock(
    base: [u8; 3],
    hit: &RayHit,
    height_frac: f32,
    depth: f32,
    range: f32,
) -> [u8; 3] {
    let sector = (hit.surface_angle.rem_euclid(TAU) / TAU * SURFACE_SECTORS) as i32;
    let band = (height_frac.clamp(0.0, 0.999) * SURFACE_BANDS) as i32;
    let texture = if (sector + band) % 2 == 0 {
        1.0 + TEXTURE_CONTRAST
    } else {
        1.0 - TEXTURE_CONTRAST
    };
    let lambert = 0.5 + 0.5 * hit.facing;
    let haze = 1.0 - 0.4 * (depth / range).clamp(0.0, 1.0);
    scale(base, texture * lambert * haze)
}

fn scale(color: [u8; 3], factor: f32) -> [u8; 3] {
    color.map(|c| (c as f32 * factor).round().clamp(0.0, 255.0) as u8)
}
