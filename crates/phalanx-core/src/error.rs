use thiserror::Error;

use crate::enums::AgentState;
use crate::types::{AgentId, SlotCoord, SquadId};

#[derive(Debug, Error)]
pub enum SimError {
    /// Missing behavior registration or profile reference. Callers log this
    /// and continue with the affected feature disabled.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("illegal transition {from} -> {to}")]
    InvalidTransition { from: AgentState, to: AgentState },

    #[error("{squad} is full ({capacity} slots)")]
    CapacityExceeded { squad: SquadId, capacity: usize },

    #[error("slot {slot} is outside the {rows}x{cols} formation")]
    SlotOutOfBounds { slot: SlotCoord, rows: u16, cols: u16 },

    #[error("slot {slot} is already held by {holder}")]
    SlotOccupied { slot: SlotCoord, holder: AgentId },

    #[error("{agent} is not a member of {squad}")]
    NotAMember { agent: AgentId, squad: SquadId },

    #[error("unknown squad {0}")]
    UnknownSquad(SquadId),

    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
