//! Entity spawn factories.
//!
//! Agents are built from their archetype profile. Squads are not entities;
//! the engine keeps them in its own map.

use hecs::World;
use serde::{Deserialize, Serialize};

use phalanx_ai::{AgentStateMachine, ArchetypeProfile};
use phalanx_core::components::*;
use phalanx_core::enums::{Archetype, FormationShape};
use phalanx_core::types::{AgentId, DVec3, SquadId};

use crate::systems::ai::Intent;

/// Request to create one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentSpawn {
    pub archetype: Archetype,
    pub team: u8,
    pub position: DVec3,
    /// Squad to join right away. A full squad leaves the agent unassigned.
    #[serde(default)]
    pub squad: Option<SquadId>,
}

impl AgentSpawn {
    pub fn new(archetype: Archetype, team: u8, position: DVec3) -> Self {
        Self {
            archetype,
            team,
            position,
            squad: None,
        }
    }

    pub fn in_squad(mut self, squad: SquadId) -> Self {
        self.squad = Some(squad);
        self
    }
}

/// Request to create one squad.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SquadSpawn {
    pub team: u8,
    pub shape: FormationShape,
    pub rows: u16,
    pub cols: u16,
    /// Slot spacing; the configured default when absent.
    #[serde(default)]
    pub spacing: Option<f64>,
    pub anchor: DVec3,
    /// Initial facing (yaw, radians).
    #[serde(default)]
    pub facing: f64,
}

impl SquadSpawn {
    /// Squad shaped to hold `capacity` members.
    pub fn new(team: u8, shape: FormationShape, capacity: usize) -> Self {
        let (rows, cols) = shape.dimensions(capacity);
        Self {
            team,
            shape,
            rows,
            cols,
            spacing: None,
            anchor: DVec3::ZERO,
            facing: 0.0,
        }
    }

    /// Explicit `rows × cols` block.
    pub fn grid(team: u8, rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            ..Self::new(team, FormationShape::Grid, 1)
        }
    }

    pub fn at(mut self, anchor: DVec3) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn facing(mut self, yaw: f64) -> Self {
        self.facing = yaw;
        self
    }

    pub fn spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self
    }
}

/// Spawn an agent with components taken from its profile.
pub fn spawn_agent(
    world: &mut World,
    id: AgentId,
    spawn: &AgentSpawn,
    profile: &ArchetypeProfile,
) -> hecs::Entity {
    let kinematics = Kinematics {
        max_speed: profile.max_speed,
        max_acceleration: profile.max_acceleration,
        ..Kinematics::at(spawn.position)
    };
    let combat = Combat {
        attack_range: profile.combat.attack_range,
        damage: profile.combat.damage,
        cooldown_secs: profile.combat.cooldown_secs,
        cooldown_remaining: 0.0,
        knockback: profile.combat.knockback,
    };
    let collider = Collider {
        radius: profile.radius,
        enabled: true,
    };

    world.spawn((
        AgentTag(id),
        spawn.archetype,
        Team(spawn.team),
        kinematics,
        Health::full(profile.max_health),
        combat,
        SquadLink::default(),
        collider,
        AgentStateMachine::default(),
        Intent::default(),
    ))
}
