//! Separation, Cohesion and Alignment.

use serde::{Deserialize, Serialize};

use phalanx_core::constants::{
    ALIGNMENT_RADIUS, COHESION_RADIUS, SEPARATION_RADIUS, SEPARATION_STRENGTH, STEERING_EPSILON,
};
use phalanx_core::types::{planar, DVec3};

use super::SteeringBehavior;
use crate::context::SteeringContext;
use crate::context_map::ContextMap;
use crate::error::SteeringResult;

/// Push away from every neighbor (ally or enemy) inside `radius`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Separation {
    pub radius: f64,
    /// Output magnitude whenever any neighbor qualifies.
    pub strength: f64,
}

impl Default for Separation {
    fn default() -> Self {
        Self {
            radius: SEPARATION_RADIUS,
            strength: SEPARATION_STRENGTH,
        }
    }
}

impl Separation {
    /// `(unit direction away from neighbor, (radius - d) / radius)` for a
    /// qualifying neighbor.
    fn repulsion(&self, ctx: &SteeringContext<'_>, neighbor: DVec3) -> Option<(DVec3, f64)> {
        let offset = planar(ctx.position - neighbor);
        let distance = offset.length();
        if distance <= STEERING_EPSILON || distance >= self.radius {
            return None;
        }
        Some((offset / distance, (self.radius - distance) / self.radius))
    }
}

impl SteeringBehavior for Separation {
    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let mut sum = DVec3::ZERO;
        let mut count = 0usize;
        for n in ctx.neighbors().filter(|n| n.id != ctx.agent) {
            if let Some((dir, falloff)) = self.repulsion(ctx, n.position) {
                sum += dir * falloff;
                count += 1;
            }
        }
        if count == 0 {
            return Ok(DVec3::ZERO);
        }
        let average = sum / count as f64;
        Ok(average.normalize_or_zero() * self.strength)
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        ctx.neighbors()
            .filter(|n| n.id != ctx.agent)
            .filter_map(|n| self.repulsion(ctx, n.position))
            .map(|(_, falloff)| falloff)
            .fold(0.0, f64::max)
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        for n in ctx.neighbors().filter(|n| n.id != ctx.agent) {
            if let Some((away, falloff)) = self.repulsion(ctx, n.position) {
                map.add_danger(-away, falloff)?;
            }
        }
        Ok(())
    }
}

/// Steer toward the centre of nearby allies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cohesion {
    pub radius: f64,
}

impl Default for Cohesion {
    fn default() -> Self {
        Self {
            radius: COHESION_RADIUS,
        }
    }
}

impl Cohesion {
    fn centre(&self, ctx: &SteeringContext<'_>) -> Option<DVec3> {
        let mut sum = DVec3::ZERO;
        let mut count = 0usize;
        for n in ctx.allies.iter().filter(|n| n.id != ctx.agent) {
            if planar(n.position - ctx.position).length() <= self.radius {
                sum += n.position;
                count += 1;
            }
        }
        (count > 0).then(|| sum / count as f64)
    }

    fn pull(&self, ctx: &SteeringContext<'_>, centre: DVec3) -> (DVec3, f64) {
        let offset = planar(centre - ctx.position);
        let strength = if self.radius > 0.0 {
            (offset.length() / self.radius).min(1.0)
        } else {
            0.0
        };
        (offset.normalize_or_zero(), strength)
    }
}

impl SteeringBehavior for Cohesion {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        !ctx.allies.is_empty()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let Some(centre) = self.centre(ctx) else {
            return Ok(DVec3::ZERO);
        };
        let (dir, strength) = self.pull(ctx, centre);
        Ok(dir * ctx.max_speed * strength - ctx.velocity)
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        self.centre(ctx).map_or(0.0, |c| self.pull(ctx, c).1)
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        match self.centre(ctx) {
            Some(centre) => {
                let (dir, strength) = self.pull(ctx, centre);
                map.add_interest(dir, strength)
            }
            None => Ok(()),
        }
    }
}

/// Match the average velocity of nearby allies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alignment {
    pub radius: f64,
}

impl Default for Alignment {
    fn default() -> Self {
        Self {
            radius: ALIGNMENT_RADIUS,
        }
    }
}

impl Alignment {
    fn average_velocity(&self, ctx: &SteeringContext<'_>) -> Option<DVec3> {
        let mut sum = DVec3::ZERO;
        let mut count = 0usize;
        for n in ctx.allies.iter().filter(|n| n.id != ctx.agent) {
            if planar(n.position - ctx.position).length() <= self.radius {
                sum += n.velocity;
                count += 1;
            }
        }
        (count > 0).then(|| planar(sum / count as f64))
    }
}

impl SteeringBehavior for Alignment {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        !ctx.allies.is_empty()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        Ok(self
            .average_velocity(ctx)
            .map_or(DVec3::ZERO, |avg| avg - planar(ctx.velocity)))
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        if ctx.max_speed <= 0.0 {
            return 0.0;
        }
        self.average_velocity(ctx)
            .map_or(0.0, |avg| ((avg - planar(ctx.velocity)).length() / ctx.max_speed).min(1.0))
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some(avg) = self.average_velocity(ctx) else {
            return Ok(());
        };
        if ctx.max_speed <= 0.0 {
            return Ok(());
        }
        map.add_interest(avg, (avg.length() / ctx.max_speed).min(1.0))
    }
}
