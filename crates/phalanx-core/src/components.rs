//! ECS components for hecs entities.
//!
//! Components are plain data structs with few methods.
//! Game logic lives in systems, not components.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::types::{AgentId, DVec3, SlotCoord, SquadId};

/// Stable agent id carried by the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentTag(pub AgentId);

/// Side an agent fights for. Agents on different teams are enemies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team(pub u8);

/// Motion state and limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: DVec3,
    pub velocity: DVec3,
    /// Facing yaw in radians (about +Y, 0 = +Z).
    pub heading: f64,
    pub max_speed: f64,
    /// Per-behavior force cap.
    pub max_acceleration: f64,
    /// Scales `max_speed` (e.g. sprinting while fleeing).
    pub speed_multiplier: f64,
}

impl Kinematics {
    pub fn at(position: DVec3) -> Self {
        Self {
            position,
            velocity: DVec3::ZERO,
            heading: 0.0,
            max_speed: AGENT_MAX_SPEED,
            max_acceleration: AGENT_MAX_ACCELERATION,
            speed_multiplier: 1.0,
        }
    }

    /// Effective speed cap after the multiplier.
    pub fn speed_cap(&self) -> f64 {
        self.max_speed * self.speed_multiplier
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f64,
    pub max: f64,
}

impl Health {
    pub fn full(max: f64) -> Self {
        Self { current: max, max }
    }

    /// Remaining health in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }
}

/// Melee/ranged attack parameters plus the running cooldown.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Combat {
    pub attack_range: f64,
    pub damage: f64,
    pub cooldown_secs: f64,
    pub cooldown_remaining: f64,
    /// Impulse (m/s) applied to the victim; zero disables knockback.
    pub knockback: f64,
}

impl Default for Combat {
    fn default() -> Self {
        Self {
            attack_range: ATTACK_RANGE,
            damage: ATTACK_DAMAGE,
            cooldown_secs: ATTACK_COOLDOWN_SECS,
            cooldown_remaining: 0.0,
            knockback: 0.0,
        }
    }
}

/// Squad membership. `slot` is `None` for unassigned agents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadLink {
    pub squad: Option<SquadId>,
    pub slot: Option<SlotCoord>,
}

/// Physical presence for neighbor queries and separation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Collider {
    pub radius: f64,
    /// Dead agents are excluded from the spatial index.
    pub enabled: bool,
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            radius: AGENT_RADIUS,
            enabled: true,
        }
    }
}
