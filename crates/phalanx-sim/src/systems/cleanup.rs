//! Cleanup system: release the formation slots of dead agents.
//!
//! Corpses stay in the world (they keep appearing in snapshots as Dead)
//! but no longer belong to a squad.

use std::collections::BTreeMap;

use hecs::World;
use tracing::debug;

use phalanx_ai::AgentStateMachine;
use phalanx_core::components::{AgentTag, SquadLink};
use phalanx_core::types::SquadId;
use phalanx_squad::Squad;

pub fn run(world: &mut World, squads: &mut BTreeMap<SquadId, Squad>) {
    for (_entity, (tag, brain, link)) in
        world.query_mut::<(&AgentTag, &AgentStateMachine, &mut SquadLink)>()
    {
        if !brain.state().is_terminal() {
            continue;
        }
        let Some(squad_id) = link.squad.take() else {
            continue;
        };
        link.slot = None;
        if let Some(squad) = squads.get_mut(&squad_id) {
            squad.formation.remove_member(tag.0);
        }
        debug!(agent = %tag.0, squad = %squad_id, "casualty left formation");
    }
}
