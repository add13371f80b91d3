//! Rock field the rover drives through.
//!
//! Rocks are vertical cylinders on flat ground. A seeded scatter places them
//! uniformly in a square arena, keeping a clear disc around the origin so the
//! rover never spawns inside one.

use crate::config::ScatterConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One rock: a cylinder of `radius` at `(x, y)`
#[derive(Debug, Clone, PartialEq)]
pub struct Rock {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Base color, BGR
    pub color: [u8; 3],
}

impl Rock {
    pub fn new(x: f32, y: f32, radius: f32, color: [u8; 3]) -> Self {
        Self {
            x,
            y,
            radius,
            color,
        }
    }
}

/// Nearest rock hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Index into [`Scene::rocks`]
    pub rock: usize,
    /// Distance from the ray origin (meters)
    pub distance: f32,
    /// Angle of the hit point around the rock center (radians)
    pub surface_angle: f32,
    /// Cosine between the ray and the surface normal, in (0, 1]
    pub facing: f32,
}

/// Static world geometry
#[derive(Debug, Clone)]
pub struct Scene {
    half_extent: f32,
    rocks: Vec<Rock>,
}

impl Scene {
    pub fn new(half_extent: f32, rocks: Vec<Rock>) -> Self {
        Self { half_extent, rocks }
    }

    /// Arena without rocks
    pub fn empty(half_extent: f32) -> Self {
        Self::new(half_extent, Vec::new())
    }

    /// Random rock field.
    ///
    /// A seed of 0 draws from OS entropy; any other seed is reproducible.
    pub fn scatter(config: &ScatterConfig, seed: u64) -> Self {
        let mut rng = if seed == 0 {
            StdRng::from_os_rng()
        } else {
            StdRng::seed_from_u64(seed)
        };

        let half = config.area / 2.0;
        let mut rocks = Vec::with_capacity(config.rock_count);
        for _ in 0..config.rock_count {
            // Rejection-sample outside the spawn clearing
            let (x, y) = loop {
                let x = rng.random_range(-half..=half);
                let y = rng.random_range(-half..=half);
                if x.hypot(y) > config.safe_radius {
                    break (x, y);
                }
            };
            let scale = rng.random_range(config.min_scale..=config.max_scale);
            let green = 0.35 + rng.random_range(-0.05f32..=0.05);
            let color = [to_byte(0.3), to_byte(green), to_byte(0.8)];
            rocks.push(Rock::new(x, y, config.base_radius * scale, color));
        }

        log::info!(
            "Scattered {} rocks over {:.1}m x {:.1}m (seed {})",
            rocks.len(),
            config.area,
            config.area,
            seed
        );
        Self::new(half, rocks)
    }

    pub fn rocks(&self) -> &[Rock] {
        &self.rocks
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    /// Whether a disc of `radius` at `(x, y)` overlaps any rock
    pub fn collides(&self, x: f32, y: f32, radius: f32) -> bool {
        self.rocks
            .iter()
            .any(|r| (r.x - x).hypot(r.y - y) < r.radius + radius)
    }

    /// Nearest rock along a ray, within `max_range`
    pub fn ray_cast(&self, x: f32, y: f32, angle: f32, max_range: f32) -> Option<RayHit> {
        let (dx, dy) = (angle.cos(), angle.sin());
        let mut best: Option<RayHit> = None;

        for (i, rock) in self.rocks.iter().enumerate() {
            // Solve |o + t*d - c|^2 = r^2 for the nearest t > 0
            let (ox, oy) = (x - rock.x, y - rock.y);
            let b = ox * dx + oy * dy;
            let c = ox * ox + oy * oy - rock.radius * rock.radius;
            let disc = b * b - c;
            if disc < 0.0 {
                continue;
            }
            let sqrt_disc = disc.sqrt();
            let t = if -b - sqrt_disc > 0.0 {
                -b - sqrt_disc
            } else {
                -b + sqrt_disc
            };
            if t <= 0.0 || t > max_range {
                continue;
            }
            if best.is_some_and(|h| h.distance <= t) {
                continue;
            }

            let hx = x + t * dx - rock.x;
            let hy = y + t * dy - rock.y;
            let facing = (-(hx * dx + hy * dy) / rock.radius).clamp(0.05, 1.0);
            best = Some(RayHit {
                rock: i,
                distance: t,
                surface_angle: hy.atan2(hx),
                facing,
            });
        }
        best
    }
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
