//! Per-agent steering input, rebuilt every tick.

use phalanx_core::enums::CommandKind;
use phalanx_core::types::{planar, AgentId, DVec3, SquadId, Transform};
use phalanx_spatial::ObstacleQuery;

/// Another agent as seen from the tick snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: AgentId,
    pub position: DVec3,
    pub velocity: DVec3,
}

/// What the agent knows about its squad this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquadState {
    pub id: SquadId,
    pub anchor: Transform,
    pub order: CommandKind,
}

/// Read-only snapshot handed to every behavior for one agent.
///
/// Neighbor slices borrow the engine's pooled buffers and are only valid for
/// the duration of the agent's update. Nothing here outlives the tick.
pub struct SteeringContext<'a> {
    pub agent: AgentId,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Effective speed cap (speed multiplier already applied).
    pub max_speed: f64,
    /// Per-behavior force cap.
    pub max_acceleration: f64,
    pub dt: f64,
    /// Collider radius; zero for a point agent.
    pub radius: f64,
    /// Generic goal (enemy being approached, order target).
    pub target: Option<DVec3>,
    /// World position of the agent's formation slot.
    pub slot_position: Option<DVec3>,
    /// Explicit threat to run from; Flee falls back to the nearest enemy.
    pub threat: Option<DVec3>,
    pub allies: &'a [Neighbor],
    pub enemies: &'a [Neighbor],
    pub obstacles: &'a dyn ObstacleQuery,
    /// Remaining waypoints, nearest first.
    pub path: &'a [DVec3],
    pub squad: Option<SquadState>,
}

impl<'a> SteeringContext<'a> {
    /// Context with no goals, neighbors or obstacles.
    pub fn new(
        agent: AgentId,
        position: DVec3,
        velocity: DVec3,
        max_speed: f64,
        max_acceleration: f64,
        dt: f64,
    ) -> Self {
        Self {
            agent,
            position,
            velocity,
            max_speed,
            max_acceleration,
            dt,
            radius: 0.0,
            target: None,
            slot_position: None,
            threat: None,
            allies: &[],
            enemies: &[],
            obstacles: &(),
            path: &[],
            squad: None,
        }
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_target(mut self, target: DVec3) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_slot(mut self, slot: DVec3) -> Self {
        self.slot_position = Some(slot);
        self
    }

    pub fn with_threat(mut self, threat: DVec3) -> Self {
        self.threat = Some(threat);
        self
    }

    pub fn with_allies(mut self, allies: &'a [Neighbor]) -> Self {
        self.allies = allies;
        self
    }

    pub fn with_enemies(mut self, enemies: &'a [Neighbor]) -> Self {
        self.enemies = enemies;
        self
    }

    pub fn with_obstacles(mut self, obstacles: &'a dyn ObstacleQuery) -> Self {
        self.obstacles = obstacles;
        self
    }

    pub fn with_path(mut self, path: &'a [DVec3]) -> Self {
        self.path = path;
        self
    }

    /// Allies then enemies.
    pub fn neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        self.allies.iter().chain(self.enemies.iter())
    }

    /// Closest enemy on the XZ plane.
    pub fn nearest_enemy(&self) -> Option<&Neighbor> {
        self.enemies.iter().min_by(|a, b| {
            let da = planar(a.position - self.position).length_squared();
            let db = planar(b.position - self.position).length_squared();
            da.total_cmp(&db)
        })
    }

    /// Direction of travel, falling back to the goal direction when standing still.
    pub fn heading(&self) -> Option<DVec3> {
        let moving = planar(self.velocity);
        if moving.length_squared() > 1e-8 {
            return Some(moving.normalize());
        }
        let goal = self.target.or(self.slot_position)?;
        let towards = planar(goal - self.position);
        (towards.length_squared() > 1e-8).then(|| towards.normalize())
    }
}
