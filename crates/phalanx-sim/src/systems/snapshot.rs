//! Snapshot system: queries the ECS world and builds a complete `SimSnapshot`.
//!
//! This system is read-only; it never modifies the world.

use std::collections::BTreeMap;

use hecs::World;

use phalanx_ai::AgentStateMachine;
use phalanx_core::components::*;
use phalanx_core::enums::Archetype;
use phalanx_core::events::SimEvent;
use phalanx_core::state::{AgentView, SimSnapshot, SquadView};
use phalanx_core::types::{SimTime, SquadId};
use phalanx_squad::Squad;

/// Build a complete snapshot. Agents are sorted by id, squads by id.
pub fn build_snapshot(
    world: &World,
    squads: &BTreeMap<SquadId, Squad>,
    time: &SimTime,
    events: Vec<SimEvent>,
) -> SimSnapshot {
    SimSnapshot {
        time: *time,
        agents: build_agents(world),
        squads: build_squads(squads),
        events,
        tick_millis: 0.0,
    }
}

fn build_agents(world: &World) -> Vec<AgentView> {
    let mut agents: Vec<AgentView> = world
        .query::<(
            &AgentTag,
            &Archetype,
            &Team,
            &Kinematics,
            &AgentStateMachine,
            &Health,
            &SquadLink,
        )>()
        .iter()
        .map(|(_, (tag, archetype, team, kin, brain, health, link))| AgentView {
            id: tag.0,
            archetype: *archetype,
            team: team.0,
            position: kin.position,
            velocity: kin.velocity,
            heading: kin.heading,
            state: brain.state(),
            health: health.current,
            squad: link.squad,
            slot: link.slot,
        })
        .collect();
    agents.sort_by_key(|a| a.id);
    agents
}

fn build_squads(squads: &BTreeMap<SquadId, Squad>) -> Vec<SquadView> {
    squads
        .values()
        .map(|squad| {
            let (rows, cols) = squad.formation.dimensions();
            SquadView {
                id: squad.id(),
                anchor: squad.anchor(),
                shape: squad.formation.shape(),
                rows,
                cols,
                members: squad.formation.len(),
                order: squad.order(),
            }
        })
        .collect()
}
