//! Follow a waypoint polyline with a carrot point `lookahead` ahead.

use serde::{Deserialize, Serialize};

use phalanx_core::constants::{PATH_LOOKAHEAD, SLOWING_RADIUS};
use phalanx_core::types::{planar, DVec3};

use super::SteeringBehavior;
use crate::context::SteeringContext;
use crate::context_map::ContextMap;
use crate::error::{SteeringError, SteeringResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFollowing {
    pub lookahead: f64,
    /// Arrival ramp applied on the final waypoint.
    pub slowing_radius: f64,
}

impl Default for PathFollowing {
    fn default() -> Self {
        Self {
            lookahead: PATH_LOOKAHEAD,
            slowing_radius: SLOWING_RADIUS,
        }
    }
}

/// Carrot point and whether it sits on the final waypoint.
fn carrot(path: &[DVec3], position: DVec3, lookahead: f64) -> Option<(DVec3, bool)> {
    let (&first, rest) = path.split_first()?;
    if rest.is_empty() {
        return Some((first, true));
    }

    // Closest projection over all segments.
    let me = planar(position);
    let mut best_segment = 0;
    let mut best_point = planar(first);
    let mut best_dist = f64::INFINITY;
    for (i, pair) in path.windows(2).enumerate() {
        let a = planar(pair[0]);
        let b = planar(pair[1]);
        let ab = b - a;
        let len_sq = ab.length_squared();
        let t = if len_sq > 0.0 {
            ((me - a).dot(ab) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let p = a + ab * t;
        let d = (p - me).length_squared();
        if d < best_dist {
            best_dist = d;
            best_segment = i;
            best_point = p;
        }
    }

    // Walk forward along the polyline.
    let mut remaining = lookahead.max(0.0);
    let mut cursor = best_point;
    for next in &path[best_segment + 1..] {
        let next = planar(*next);
        let leg = next - cursor;
        let leg_len = leg.length();
        if leg_len >= remaining {
            if leg_len > 0.0 {
                return Some((cursor + leg / leg_len * remaining, false));
            }
            return Some((cursor, false));
        }
        remaining -= leg_len;
        cursor = next;
    }
    Some((planar(path[path.len() - 1]), true))
}

impl PathFollowing {
    fn goal(&self, ctx: &SteeringContext<'_>) -> Option<(DVec3, f64)> {
        let (point, at_end) = carrot(ctx.path, ctx.position, self.lookahead)?;
        let distance = planar(point - ctx.position).length();
        let ramp = if at_end && self.slowing_radius > 0.0 {
            (distance / self.slowing_radius).min(1.0)
        } else {
            1.0
        };
        Some((point, ramp))
    }
}

impl SteeringBehavior for PathFollowing {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        !ctx.path.is_empty()
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        let (point, ramp) = self.goal(ctx).ok_or(SteeringError::MissingInput {
            behavior: "path_following",
            input: "path",
        })?;
        let desired = planar(point - ctx.position).normalize_or_zero() * ctx.max_speed * ramp;
        Ok(desired - ctx.velocity)
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        self.goal(ctx).map_or(0.0, |(_, ramp)| ramp)
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        let Some((point, ramp)) = self.goal(ctx) else {
            return Ok(());
        };
        map.add_interest(planar(point - ctx.position), ramp)
    }
}
