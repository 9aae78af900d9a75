//! Pull toward the agent's formation slot.

use serde::{Deserialize, Serialize};

use phalanx_core::constants::{FORMATION_DEADZONE, FORMATION_LINEAR_THRESHOLD, FORMATION_STRENGTH};
use phalanx_core::types::{planar, DVec3};

use super::SteeringBehavior;
use crate::context::SteeringContext;
use crate::context_map::ContextMap;
use crate::error::{SteeringError, SteeringResult};

/// Three-band response to slot offset `d`:
/// `d <= deadzone` → zero; `d <= linear_threshold` → `strength`;
/// beyond → `strength * d / linear_threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationKeep {
    pub deadzone: f64,
    pub linear_threshold: f64,
    pub strength: f64,
}

impl Default for FormationKeep {
    fn default() -> Self {
        Self {
            deadzone: FORMATION_DEADZONE,
            linear_threshold: FORMATION_LINEAR_THRESHOLD,
            strength: FORMATION_STRENGTH,
        }
    }
}

impl FormationKeep {
    /// Force magnitude for an offset of `distance`.
    pub fn magnitude(&self, distance: f64) -> f64 {
        if distance <= self.deadzone {
            0.0
        } else if distance <= self.linear_threshold || self.linear_threshold <= 0.0 {
            self.strength
        } else {
            self.strength * distance / self.linear_threshold
        }
    }

    fn urgency(&self, distance: f64) -> f64 {
        if distance <= self.deadzone {
            0.0
        } else if self.linear_threshold <= 0.0 {
            1.0
        } else {
            (distance / self.linear_threshold).min(1.0)
        }
    }
}

impl SteeringBehavior for FormationKeep {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        ctx.slot_position.is_some()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let slot = ctx.slot_position.ok_or(SteeringError::MissingInput {
            behavior: "formation_keep",
            input: "slot position",
        })?;
        let offset = planar(slot - ctx.position);
        let distance = offset.length();
        Ok(offset.normalize_or_zero() * self.magnitude(distance))
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        ctx.slot_position
            .map_or(0.0, |slot| self.urgency(planar(slot - ctx.position).length()))
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some(slot) = ctx.slot_position else {
            return Ok(());
        };
        let offset = planar(slot - ctx.position);
        map.add_interest(offset, self.urgency(offset.length()))
    }
}
