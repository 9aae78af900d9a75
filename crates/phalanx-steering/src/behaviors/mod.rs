//! Steering behaviors.
//!
//! Each behavior is a small struct of tunables implementing
//! [`SteeringBehavior`]. [`Behavior`] is the tagged enum the rest of the
//! engine stores and dispatches through; it is also the config format.

mod avoidance;
mod flocking;
mod formation;
mod path;
mod seek;

use serde::{Deserialize, Serialize};

use phalanx_core::types::DVec3;

use crate::context::SteeringContext;
use crate::context_map::ContextMap;
use crate::error::SteeringResult;

pub use avoidance::ObstacleAvoidance;
pub use flocking::{Alignment, Cohesion, Separation};
pub use formation::FormationKeep;
pub use path::PathFollowing;
pub use seek::{Arrival, Flee, Seek, TargetSource};

/// Capability interface shared by every behavior.
pub trait SteeringBehavior {
    /// Whether the behavior has the inputs it needs this tick.
    fn is_active(&self, _ctx: &SteeringContext<'_>) -> bool {
        true
    }

    /// Raw steering force. Composers clamp it to the agent's max acceleration.
    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3>;

    /// Urgency in `[0, 1]`, used by exclusive selection.
    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64;

    /// Vote into an interest/danger map.
    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Behavior {
    Seek(Seek),
    Arrival(Arrival),
    Flee(Flee),
    Separation(Separation),
    Cohesion(Cohesion),
    Alignment(Alignment),
    ObstacleAvoidance(ObstacleAvoidance),
    FormationKeep(FormationKeep),
    PathFollowing(PathFollowing),
}

macro_rules! dispatch {
    ($self:ident, $b:ident => $body:expr) => {
        match $self {
            Behavior::Seek($b) => $body,
            Behavior::Arrival($b) => $body,
            Behavior::Flee($b) => $body,
            Behavior::Separation($b) => $body,
            Behavior::Cohesion($b) => $body,
            Behavior::Alignment($b) => $body,
            Behavior::ObstacleAvoidance($b) => $body,
            Behavior::FormationKeep($b) => $body,
            Behavior::PathFollowing($b) => $body,
        }
    };
}

impl Behavior {
    /// Short static name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Behavior::Seek(_) => "seek",
            Behavior::Arrival(_) => "arrival",
            Behavior::Flee(_) => "flee",
            Behavior::Separation(_) => "separation",
            Behavior::Cohesion(_) => "cohesion",
            Behavior::Alignment(_) => "alignment",
            Behavior::ObstacleAvoidance(_) => "obstacle_avoidance",
            Behavior::FormationKeep(_) => "formation_keep",
            Behavior::PathFollowing(_) => "path_following",
        }
    }
}

impl SteeringBehavior for Behavior {
    fn is_active(&self, ctx: &SteeringContext<'_>) -> bool {
        dispatch!(self, b => b.is_active(ctx))
    }

    fn compute_force(&self, ctx: &SteeringContext<'_>) -> SteeringResult<DVec3> {
        dispatch!(self, b => b.compute_force(ctx))
    }

    fn desirability(&self, ctx: &SteeringContext<'_>) -> f64 {
        dispatch!(self, b => b.desirability(ctx))
    }

    fn write_context(&self, ctx: &SteeringContext<'_>, map: &mut ContextMap) -> SteeringResult<()> {
        dispatch!(self, b => b.write_context(ctx, map))
    }
}
