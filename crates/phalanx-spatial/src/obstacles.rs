//! Static obstacle queries: distance filtering and planar ray checks.
//!
//! Obstacles are vertical cylinders, treated as circles on the XZ plane.
//! This is deliberately simple: there is no pathfinding around geometry,
//! only "is something in front of me and which way is clear".

use serde::{Deserialize, Serialize};

use phalanx_core::types::{planar, DVec3};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: DVec3,
    pub radius: f64,
}

impl Obstacle {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Planar distance from `point` to the obstacle surface (negative inside).
    pub fn surface_distance(&self, point: DVec3) -> f64 {
        planar(point - self.center).length() - self.radius
    }
}

/// First obstacle struck by a planar ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub obstacle: Obstacle,
    /// Distance along the ray to the (padded) surface; 0 when starting inside.
    pub distance: f64,
    pub point: DVec3,
}

/// Obstacle lookup supplied by the host engine.
pub trait ObstacleQuery {
    /// Append every obstacle whose surface lies within `radius` of `point`.
    fn obstacles_near(&self, point: DVec3, radius: f64, out: &mut Vec<Obstacle>);

    /// Nearest obstacle hit by a ray from `origin` along `direction`, with
    /// obstacle radii grown by `padding`.
    fn raycast(&self, origin: DVec3, direction: DVec3, length: f64, padding: f64) -> Option<RayHit> {
        let mut near = Vec::new();
        self.obstacles_near(origin, length + padding, &mut near);
        nearest_hit(&near, origin, direction, length, padding)
    }
}

/// Empty world: nothing to avoid.
impl ObstacleQuery for () {
    fn obstacles_near(&self, _point: DVec3, _radius: f64, _out: &mut Vec<Obstacle>) {}
}

/// Flat list of obstacles, scanned linearly. Suitable for the handful of
/// static props a battlefield has.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleField {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleField {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn add(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    /// True if no obstacle (grown by `padding`) blocks the segment.
    pub fn has_clear_path(&self, from: DVec3, to: DVec3, padding: f64) -> bool {
        let delta = planar(to - from);
        let length = delta.length();
        if length < 1e-9 {
            return !self
                .obstacles
                .iter()
                .any(|o| o.surface_distance(from) < padding);
        }
        nearest_hit(&self.obstacles, from, delta / length, length, padding).is_none()
    }
}

impl ObstacleQuery for ObstacleField {
    fn obstacles_near(&self, point: DVec3, radius: f64, out: &mut Vec<Obstacle>) {
        out.extend(
            self.obstacles
                .iter()
                .filter(|o| o.surface_distance(point) <= radius)
                .copied(),
        );
    }

    fn raycast(&self, origin: DVec3, direction: DVec3, length: f64, padding: f64) -> Option<RayHit> {
        nearest_hit(&self.obstacles, origin, direction, length, padding)
    }
}

/// Closest ray/circle intersection among `obstacles`.
pub fn nearest_hit(
    obstacles: &[Obstacle],
    origin: DVec3,
    direction: DVec3,
    length: f64,
    padding: f64,
) -> Option<RayHit> {
    let dir = planar(direction).normalize_or_zero();
    if dir == DVec3::ZERO {
        return None;
    }
    let origin_flat = planar(origin);

    let mut best: Option<RayHit> = None;
    for obstacle in obstacles {
        let radius = obstacle.radius + padding;
        let m = origin_flat - planar(obstacle.center);
        let b = m.dot(dir);
        let c = m.length_squared() - radius * radius;
        // Outside and pointing away.
        if c > 0.0 && b > 0.0 {
            continue;
        }
        let disc = b * b - c;
        if disc < 0.0 {
            continue;
        }
        let t = (-b - disc.sqrt()).max(0.0);
        if t > length {
            continue;
        }
        if best.is_none_or(|hit| t < hit.distance) {
            best = Some(RayHit {
                obstacle: *obstacle,
                distance: t,
                point: origin + dir * t,
            });
        }
    }
    best
}
