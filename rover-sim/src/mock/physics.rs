//! Planar kinematics of the skid-steer chassis
//!
//! The six wheels collapse to a left and right side velocity; the chassis is
//! a disc of `body_radius` that may not overlap a rock.
//!
//! ```text
//! v = r * (ω_right + ω_left) / 2
//! ω = r * (ω_right - ω_left) / track
//! ```

use super::scene::Scene;
use crate::config::RobotConfig;
use std::f32::consts::{PI, TAU};

/// What happens when a step would push the chassis into a rock
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionMode {
    /// Hold position, heading still follows the wheels
    Stop,
    /// Keep the part of the motion tangent to the rock, scaled by `1 - friction`
    Slide { friction: f32 },
    /// Ignore rocks entirely
    Passthrough,
}

impl CollisionMode {
    /// `"slide"`, `"passthrough"`, anything else stops
    pub fn from_config(mode: &str, friction: f32) -> Self {
        match mode {
            "slide" => CollisionMode::Slide { friction },
            "passthrough" => CollisionMode::Passthrough,
            _ => CollisionMode::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    x: f32,
    y: f32,
    theta: f32,
}

impl Pose {
    /// Exact integration of constant (v, ω) over `dt`
    fn integrate(self, linear: f32, angular: f32, dt: f32) -> Pose {
        let heading = self.theta + angular * dt;
        let (dx, dy) = if angular.abs() < 1e-6 {
            (linear * dt * self.theta.cos(), linear * dt * self.theta.sin())
        } else {
            let radius = linear / angular;
            (
                radius * (heading.sin() - self.theta.sin()),
                radius * (self.theta.cos() - heading.cos()),
            )
        };
        Pose {
            x: self.x + dx,
            y: self.y + dy,
            theta: normalize_angle(heading),
        }
    }
}

/// Chassis pose plus the geometry needed to move it
#[derive(Debug, Clone)]
pub struct PhysicsState {
    pose: Pose,
    body_radius: f32,
    wheel_radius: f32,
    track_width: f32,
    collision: CollisionMode,
}

impl PhysicsState {
    pub fn new(config: &RobotConfig) -> Self {
        Self {
            pose: Pose {
                x: config.start_x,
                y: config.start_y,
                theta: normalize_angle(config.start_theta),
            },
            body_radius: config.body_radius,
            wheel_radius: config.wheel_radius,
            track_width: config.track_width,
            collision: CollisionMode::from_config(&config.collision_mode, config.slide_friction),
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pose.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pose.y
    }

    /// Heading in `[-π, π)`, counter-clockwise from +X
    #[inline]
    pub fn theta(&self) -> f32 {
        self.pose.theta
    }

    #[inline]
    pub fn body_radius(&self) -> f32 {
        self.body_radius
    }

    /// Place the chassis without collision checks
    pub fn teleport(&mut self, x: f32, y: f32, theta: f32) {
        self.pose = Pose {
            x,
            y,
            theta: normalize_angle(theta),
        };
    }

    /// Chassis `(linear m/s, angular rad/s)` for side wheel rates in rad/s
    pub fn body_velocity(&self, left_wheel: f32, right_wheel: f32) -> (f32, f32) {
        let (left, right) = (left_wheel * self.wheel_radius, right_wheel * self.wheel_radius);
        ((left + right) / 2.0, (right - left) / self.track_width)
    }

    /// Move for `dt` seconds. Returns true when a rock blocked the motion.
    pub fn update(&mut self, dt: f32, left_wheel: f32, right_wheel: f32, scene: &Scene) -> bool {
        let (linear, angular) = self.body_velocity(left_wheel, right_wheel);
        let target = self.pose.integrate(linear, angular, dt);

        if self.collision == CollisionMode::Passthrough
            || !scene.collides(target.x, target.y, self.body_radius)
        {
            self.pose = target;
            return false;
        }

        let (x, y) = match self.collision {
            CollisionMode::Slide { friction } => self.slide(target, friction, scene),
            _ => (self.pose.x, self.pose.y),
        };
        self.pose = Pose {
            x,
            y,
            theta: target.theta,
        };
        true
    }

    /// Position after removing the motion component that points into the
    /// blocking rock. Falls back to the current position.
    fn slide(&self, target: Pose, friction: f32, scene: &Scene) -> (f32, f32) {
        let here = (self.pose.x, self.pose.y);
        let keep = (1.0 - friction).clamp(0.0, 1.0);
        let (mut dx, mut dy) = ((target.x - here.0) * keep, (target.y - here.1) * keep);

        let blocking = scene
            .rocks()
            .iter()
            .filter(|r| (r.x - target.x).hypot(r.y - target.y) < r.radius + self.body_radius)
            .min_by(|a, b| {
                let da = (a.x - here.0).hypot(a.y - here.1);
                let db = (b.x - here.0).hypot(b.y - here.1);
                da.total_cmp(&db)
            });
        let Some(rock) = blocking else {
            return here;
        };

        // Outward contact normal at the current position
        let (nx, ny) = (here.0 - rock.x, here.1 - rock.y);
        let len = nx.hypot(ny);
        if len < 1e-6 {
            return here;
        }
        let (nx, ny) = (nx / len, ny / len);
        let inward = dx * nx + dy * ny;
        if inward < 0.0 {
            dx -= inward * nx;
            dy -= inward * ny;
        }

        let (x, y) = (here.0 + dx, here.1 + dy);
        if scene.collides(x, y, self.body_radius) {
            here
        } else {
            (x, y)
        }
    }
}

/// Wrap an angle into `[-π, π)`
pub fn normalize_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::scene::Rock;
    use approx::assert_relative_eq;

    const GRAY: [u8; 3] = [90, 90, 90];

    fn physics(mode: &str) -> PhysicsState {
        PhysicsState::new(&RobotConfig {
            collision_mode: mode.to_string(),
            ..RobotConfig::default()
        })
    }

    #[test]
    fn test_body_velocity() {
        let config = RobotConfig::default();
        let physics = PhysicsState::new(&config);

        let (v, w) = physics.body_velocity(2.0, 2.0);
        assert_relative_eq!(v, 2.0 * config.wheel_radius);
        assert_relative_eq!(w, 0.0);

        // Left side backwards spins counter-clockwise
        let (v, w) = physics.body_velocity(-1.0, 1.0);
        assert_relative_eq!(v, 0.0);
        assert_relative_eq!(w, 2.0 * config.wheel_radius / config.track_width);
    }

    #[test]
    fn test_straight_and_arc() {
        let scene = Scene::empty(8.0);
        let mut straight = physics("stop");
        assert!(!straight.update(1.0, 3.0, 3.0, &scene));
        assert_relative_eq!(straight.x(), 0.39, epsilon = 1e-5);
        assert_relative_eq!(straight.y(), 0.0);

        // Quarter circle: the arc ends left of the start line
        let mut arc = physics("stop");
        let (_, w) = arc.body_velocity(1.0, 3.0);
        arc.update(std::f32::consts::FRAC_PI_2 / w, 1.0, 3.0, &scene);
        assert_relative_eq!(arc.theta(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);
        assert!(arc.y() > 0.0 && arc.x() > 0.0);
    }

    #[test]
    fn test_stop_keeps_position_but_turns() {
        let mut physics = physics("stop");
        let scene = Scene::new(8.0, vec![Rock::new(0.65, 0.0, 0.25, GRAY)]);

        assert!(physics.update(1.0, 2.0, 4.0, &scene));
        assert_eq!((physics.x(), physics.y()), (0.0, 0.0));
        assert!(physics.theta() > 0.0);
    }

    #[test]
    fn test_slide_moves_along_rock() {
        let mut physics = physics("slide");
        // Rock ahead and slightly to the left
        let scene = Scene::new(8.0, vec![Rock::new(0.7, 0.1, 0.25, GRAY)]);

        assert!(physics.update(0.25, 4.0, 4.0, &scene));
        assert!(physics.y() < 0.0, "y {}", physics.y());
        assert!(!scene.collides(physics.x(), physics.y(), physics.body_radius()));
    }

    #[test]
    fn test_passthrough_ignores_rocks() {
        let mut physics = physics("passthrough");
        let scene = Scene::new(8.0, vec![Rock::new(0.5, 0.0, 0.25, GRAY)]);
        assert!(!physics.update(1.0, 4.0, 4.0, &scene));
        assert!(physics.x() > 0.0);
    }

    #[test]
    fn test_normalize_angle() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
        assert_relative_eq!(normalize_angle(PI / 4.0), PI / 4.0);
        assert_relative_eq!(normalize_angle(5.0 * PI / 4.0), -3.0 * PI / 4.0, epsilon = 1e-5);
        assert_relative_eq!(normalize_angle(-PI), -PI, epsilon = 1e-5);
        assert!(normalize_angle(TAU).abs() < 1e-5);
        for a in [-20.0f32, -4.0, 3.2, 7.0, 100.0] {
            let n = normalize_angle(a);
            assert!((-PI..PI).contains(&n) || (n - PI).abs() < 1e-5, "{} -> {}", a, n);
        }
    }
}
