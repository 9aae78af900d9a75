//! Simulation snapshot: the externally visible state after each tick.

use serde::{Deserialize, Serialize};

use crate::enums::{Archetype, AgentState, CommandKind, FormationShape};
use crate::events::SimEvent;
use crate::types::{AgentId, DVec3, SimTime, SlotCoord, SquadId, Transform};

/// Complete visible state produced after each tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub time: SimTime,
    pub agents: Vec<AgentView>,
    pub squads: Vec<SquadView>,
    pub events: Vec<SimEvent>,
    /// Wall-clock duration of the tick that produced this snapshot (ms).
    /// Excluded from determinism comparisons.
    #[serde(skip)]
    pub tick_millis: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub archetype: Archetype,
    pub team: u8,
    pub position: DVec3,
    pub velocity: DVec3,
    pub heading: f64,
    pub state: AgentState,
    pub health: f64,
    pub squad: Option<SquadId>,
    pub slot: Option<SlotCoord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadView {
    pub id: SquadId,
    pub anchor: Transform,
    pub shape: FormationShape,
    pub rows: u16,
    pub cols: u16,
    pub members: usize,
    pub order: CommandKind,
}

impl SimSnapshot {
    pub fn agent(&self, id: AgentId) -> Option<&AgentView> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn squad(&self, id: SquadId) -> Option<&SquadView> {
        self.squads.iter().find(|s| s.id == id)
    }
}
