//! Events emitted by the simulation for UI and audio feedback.

use serde::{Deserialize, Serialize};

use crate::enums::{AgentState, CommandKind};
use crate::types::{AgentId, SlotCoord, SquadId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// Accepted state change.
    StateChanged {
        agent: AgentId,
        from: AgentState,
        to: AgentState,
    },
    /// A transition was requested but is not in the legal table.
    TransitionRejected {
        agent: AgentId,
        from: AgentState,
        to: AgentState,
    },
    /// An attack landed.
    Strike {
        attacker: AgentId,
        target: AgentId,
        damage: f64,
    },
    Died { agent: AgentId },
    /// An agent took a formation slot.
    SlotAssigned {
        agent: AgentId,
        squad: SquadId,
        slot: SlotCoord,
    },
    /// Squad join refused because every slot is taken.
    SquadFull { agent: AgentId, squad: SquadId },
    /// A squad received an order.
    OrderIssued { squad: SquadId, kind: CommandKind },
}
