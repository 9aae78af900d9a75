//! Seek, Arrival and Flee.

use serde::{Deserialize, Serialize};

use phalanx_core::constants::{FLEE_RADIUS, SLOWING_RADIUS, STEERING_EPSILON};
use phalanx_core::types::{planar, DVec3};

use super::SteeringBehavior;
use crate::context::SteeringContext;
use crate::context_map::ContextMap;
use crate::error::{SteeringError, SteeringResult};

/// Which context field a goal-directed behavior steers toward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSource {
    /// `ctx.target` (enemy, order target).
    #[default]
    Target,
    /// `ctx.slot_position`.
    Slot,
}

impl TargetSource {
    pub fn resolve(self, ctx: &SteeringContext<'_>) -> Option<DVec3> {
        match self {
            TargetSource::Target => ctx.target,
            TargetSource::Slot => ctx.slot_position,
        }
    }
}

/// Full-speed pursuit of a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Seek {
    pub source: TargetSource,
}

impl SteeringBehavior for Seek {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        self.source.resolve(ctx).is_some()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let target = self.source.resolve(ctx).ok_or(SteeringError::MissingInput {
            behavior: "seek",
            input: "target",
        })?;
        let desired = planar(target - ctx.position).normalize_or_zero() * ctx.max_speed;
        Ok(desired - ctx.velocity)
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        match self.source.resolve(ctx) {
            Some(target) if planar(target - ctx.position).length() > STEERING_EPSILON => 1.0,
            _ => 0.0,
        }
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some(target) = self.source.resolve(ctx) else {
            return Ok(());
        };
        map.add_interest(planar(target - ctx.position), 1.0)
    }
}

/// Seek that slows down linearly inside `slowing_radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arrival {
    pub source: TargetSource,
    pub slowing_radius: f64,
}

impl Default for Arrival {
    fn default() -> Self {
        Self {
            source: TargetSource::Target,
            slowing_radius: SLOWING_RADIUS,
        }
    }
}

impl Arrival {
    pub fn to_slot() -> Self {
        Self {
            source: TargetSource::Slot,
            ..Self::default()
        }
    }

    fn ramp(&self, distance: f64) -> f64 {
        if self.slowing_radius <= 0.0 {
            return 1.0;
        }
        (distance / self.slowing_radius).min(1.0)
    }
}

impl SteeringBehavior for Arrival {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        self.source.resolve(ctx).is_some()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let target = self.source.resolve(ctx).ok_or(SteeringError::MissingInput {
            behavior: "arrival",
            input: "target",
        })?;
        let offset = planar(target - ctx.position);
        let distance = offset.length();
        let desired = offset.normalize_or_zero() * ctx.max_speed * self.ramp(distance);
        Ok(desired - ctx.velocity)
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        self.source
            .resolve(ctx)
            .map_or(0.0, |t| self.ramp(planar(t - ctx.position).length()))
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some(target) = self.source.resolve(ctx) else {
            return Ok(());
        };
        let offset = planar(target - ctx.position);
        map.add_interest(offset, self.ramp(offset.length()))
    }
}

/// Run from the threat, harder the closer it is. Zero outside `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flee {
    pub radius: f64,
}

impl Default for Flee {
    fn default() -> Self {
        Self {
            radius: FLEE_RADIUS,
        }
    }
}

impl Flee {
    fn threat(ctx: &SteeringContext<'_>) -> Option<DVec3> {
        ctx.threat.or_else(|| ctx.nearest_enemy().map(|n| n.position))
    }

    /// `(away direction, urgency)`; urgency is 0 outside the radius.
    fn away(&self, ctx: &SteeringContext<'_>, threat: DVec3) -> (DVec3, f64) {
        let offset = planar(ctx.position - threat);
        let distance = offset.length();
        if self.radius <= 0.0 || distance >= self.radius {
            return (DVec3::ZERO, 0.0);
        }
        let dir = if distance > STEERING_EPSILON {
            offset / distance
        } else {
            // On top of the threat: keep going the way we were, or pick +X.
            planar(ctx.velocity).try_normalize().unwrap_or(DVec3::X)
        };
        (dir, (self.radius - distance) / self.radius)
    }
}

impl SteeringBehavior for Flee {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        Self::threat(ctx).is_some()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let threat = Self::threat(ctx).ok_or(SteeringError::MissingInput {
            behavior: "flee",
            input: "threat",
        })?;
        let (dir, urgency) = self.away(ctx, threat);
        if urgency <= 0.0 {
            return Ok(DVec3::ZERO);
        }
        let desired = dir * ctx.max_speed;
        Ok((desired - ctx.velocity) * urgency)
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        Self::threat(ctx).map_or(0.0, |t| self.away(ctx, t).1)
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some(threat) = Self::threat(ctx) else {
            return Ok(());
        };
        let (dir, urgency) = self.away(ctx, threat);
        if urgency <= 0.0 {
            return Ok(());
        }
        map.add_danger(-dir, urgency)?;
        map.add_interest(dir, urgency)
    }
}
