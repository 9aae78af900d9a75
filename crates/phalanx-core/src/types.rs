//! Fundamental geometric and simulation types.
//!
//! Simulation space is right-handed with Y up. Agents move on the XZ plane;
//! the Y component is only touched by ground projection.

use std::fmt;

use serde::{Deserialize, Serialize};

pub use glam::{DQuat, DVec3};

/// Stable identifier of a simulated agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

/// Stable identifier of a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SquadId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "squad#{}", self.0)
    }
}

/// A formation slot address. Row-major: `index = row * cols + col`.
/// Row 0 is the rear-most rank (most negative local Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotCoord {
    pub row: u16,
    pub col: u16,
}

impl SlotCoord {
    pub fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// Row-major flat index for a grid with `cols` columns.
    pub fn index(&self, cols: u16) -> usize {
        self.row as usize * cols as usize + self.col as usize
    }

    /// Inverse of [`SlotCoord::index`].
    pub fn from_index(index: usize, cols: u16) -> Self {
        let cols = cols.max(1) as usize;
        Self {
            row: (index / cols) as u16,
            col: (index % cols) as u16,
        }
    }
}

impl fmt::Display for SlotCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Position + rotation of a squad anchor or agent, as exchanged with rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    /// Transform built from a position and a yaw angle (radians about +Y).
    pub fn from_yaw(position: DVec3, yaw: f64) -> Self {
        Self {
            position,
            rotation: DQuat::from_rotation_y(yaw),
        }
    }

    /// Local-to-world point transform.
    pub fn transform_point(&self, local: DVec3) -> DVec3 {
        self.position + self.rotation * local
    }

    /// Yaw that rotates local +Z onto `direction`, ignoring its Y component.
    pub fn yaw_towards(direction: DVec3) -> Option<f64> {
        let flat = planar(direction);
        if flat.length_squared() < 1e-12 {
            return None;
        }
        Some(flat.x.atan2(flat.z))
    }
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl SimTime {
    /// Advance by one tick of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_secs = self.tick as f64 * dt;
    }
}

/// Drop the vertical component of a vector.
#[inline]
pub fn planar(v: DVec3) -> DVec3 {
    DVec3::new(v.x, 0.0, v.z)
}

/// Horizontal distance between two points.
#[inline]
pub fn planar_distance(a: DVec3, b: DVec3) -> f64 {
    planar(b - a).length()
}
