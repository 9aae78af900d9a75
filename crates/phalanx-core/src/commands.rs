//! Squad commands sent from the outside world to the simulation.
//!
//! Commands are queued and processed at the next tick boundary.

use serde::{Deserialize, Serialize};

use crate::enums::CommandKind;
use crate::types::{DVec3, SquadId};

/// The command-dispatch entry point payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadCommand {
    pub squad_id: SquadId,
    pub kind: CommandKind,
    /// World-space target. Required for Move and Attack; Defend uses it as
    /// the position to hold when present.
    pub target: Option<DVec3>,
    /// Optional intermediate points for Move, visited in order before `target`.
    #[serde(default)]
    pub waypoints: Vec<DVec3>,
}

impl SquadCommand {
    pub fn move_to(squad_id: SquadId, target: DVec3) -> Self {
        Self {
            squad_id,
            kind: CommandKind::Move,
            target: Some(target),
            waypoints: Vec::new(),
        }
    }

    pub fn move_via(squad_id: SquadId, waypoints: Vec<DVec3>, target: DVec3) -> Self {
        Self {
            squad_id,
            kind: CommandKind::Move,
            target: Some(target),
            waypoints,
        }
    }

    pub fn attack(squad_id: SquadId, target: DVec3) -> Self {
        Self {
            squad_id,
            kind: CommandKind::Attack,
            target: Some(target),
            waypoints: Vec::new(),
        }
    }

    pub fn defend(squad_id: SquadId, position: Option<DVec3>) -> Self {
        Self {
            squad_id,
            kind: CommandKind::Defend,
            target: position,
            waypoints: Vec::new(),
        }
    }

    pub fn stop(squad_id: SquadId) -> Self {
        Self {
            squad_id,
            kind: CommandKind::Stop,
            target: None,
            waypoints: Vec::new(),
        }
    }
}
