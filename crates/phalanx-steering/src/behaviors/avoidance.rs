//! Lookahead ray against static obstacles.

use serde::{Deserialize, Serialize};

use phalanx_core::constants::{AGENT_RADIUS, AVOIDANCE_LOOKAHEAD, AVOIDANCE_STRENGTH, STEERING_EPSILON};
use phalanx_core::types::{planar, DVec3};
use phalanx_spatial::RayHit;

use super::SteeringBehavior;
use crate::context::SteeringContext;
use crate::context_map::ContextMap;
use crate::error::SteeringResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleAvoidance {
    /// Ray length ahead of the agent.
    pub lookahead: f64,
    pub strength: f64,
    /// Minimum clearance added to obstacle radii. The agent's own radius is
    /// used instead when larger.
    pub padding: f64,
}

impl Default for ObstacleAvoidance {
    fn default() -> Self {
        Self {
            lookahead: AVOIDANCE_LOOKAHEAD,
            strength: AVOIDANCE_STRENGTH,
            padding: AGENT_RADIUS,
        }
    }
}

impl ObstacleAvoidance {
    fn clearance(&self, ctx: &SteeringContext<'_>) -> f64 {
        self.padding.max(ctx.radius)
    }

    fn look_ahead(&self, ctx: &SteeringContext<'_>) -> Option<(DVec3, RayHit)> {
        let heading = ctx.heading()?;
        let hit = ctx
            .obstacles
            .raycast(ctx.position, heading, self.lookahead, self.clearance(ctx))?;
        Some((heading, hit))
    }

    fn proximity(&self, hit: &RayHit) -> f64 {
        if self.lookahead <= 0.0 {
            return 1.0;
        }
        (1.0 - hit.distance / self.lookahead).clamp(0.0, 1.0)
    }

    /// Unit push direction for a hit.
    fn push(&self, ctx: &SteeringContext<'_>, heading: DVec3, hit: &RayHit) -> DVec3 {
        let centre = planar(hit.obstacle.center);
        let me = planar(ctx.position);
        // Inside the padded obstacle: straight out.
        if hit.obstacle.surface_distance(ctx.position) < self.clearance(ctx) {
            if let Some(out) = (me - centre).try_normalize() {
                return out;
            }
        }
        let along = (centre - me).dot(heading);
        let closest = me + heading * along;
        let lateral = closest - centre;
        if lateral.length() > STEERING_EPSILON {
            lateral.normalize()
        } else {
            // Dead-on: turn left.
            DVec3::new(-heading.z, 0.0, heading.x)
        }
    }
}

impl SteeringBehavior for ObstacleAvoidance {
    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let Some((heading, hit)) = self.look_ahead(ctx) else {
            return Ok(DVec3::ZERO);
        };
        Ok(self.push(ctx, heading, &hit) * self.strength * self.proximity(&hit))
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        self.look_ahead(ctx).map_or(0.0, |(_, hit)| self.proximity(&hit))
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some((_, hit)) = self.look_ahead(ctx) else {
            return Ok(());
        };
        map.add_danger(planar(hit.obstacle.center - ctx.position), self.proximity(&hit))
    }
}
