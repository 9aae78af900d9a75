//! Squad orders and anchor travel.

use std::collections::VecDeque;

use tracing::debug;

use phalanx_core::commands::SquadCommand;
use phalanx_core::enums::CommandKind;
use phalanx_core::types::{planar, DQuat, DVec3, SquadId, Transform};

use crate::formation::FormationManager;

/// A squad: its formation plus the order it is carrying out.
#[derive(Debug, Clone)]
pub struct Squad {
    pub formation: FormationManager,
    pub team: u8,
    /// Anchor travel speed (m/s).
    pub speed: f64,
    order: CommandKind,
    target: Option<DVec3>,
    waypoints: VecDeque<DVec3>,
}

impl Squad {
    pub fn new(formation: FormationManager, team: u8, speed: f64) -> Self {
        Self {
            formation,
            team,
            speed,
            order: CommandKind::Stop,
            target: None,
            waypoints: VecDeque::new(),
        }
    }

    pub fn id(&self) -> SquadId {
        self.formation.squad()
    }

    pub fn order(&self) -> CommandKind {
        self.order
    }

    pub fn target(&self) -> Option<DVec3> {
        self.target
    }

    /// Waypoints still ahead of the anchor, nearest first.
    pub fn waypoints(&self) -> impl Iterator<Item = &DVec3> {
        self.waypoints.iter()
    }

    pub fn anchor(&self) -> Transform {
        self.formation.anchor()
    }

    /// Adopt a new order, replacing any previous one.
    pub fn issue(&mut self, command: &SquadCommand) {
        self.order = command.kind;
        match command.kind {
            CommandKind::Stop => {
                self.target = None;
                self.waypoints.clear();
            }
            CommandKind::Move | CommandKind::Attack | CommandKind::Defend => {
                self.target = command.target;
                self.waypoints = command.waypoints.iter().copied().collect();
            }
        }
        debug!(squad = %self.id(), kind = ?command.kind, target = ?command.target, "order issued");
    }

    /// Next point the anchor is heading for.
    pub fn destination(&self) -> Option<DVec3> {
        self.waypoints.front().copied().or(self.target)
    }

    /// Whether the anchor still has somewhere to go.
    pub fn is_travelling(&self, reached_distance: f64) -> bool {
        self.destination().is_some_and(|d| {
            planar(d - self.anchor().position).length() > reached_distance || !self.waypoints.is_empty()
        })
    }

    /// Move the anchor toward its destination by at most `speed * dt`,
    /// turning it to face the direction of travel. Waypoints closer than
    /// `reached_distance` are consumed. Returns whether the anchor moved.
    pub fn advance(&mut self, dt: f64, reached_distance: f64) -> bool {
        let anchor = self.anchor();
        let mut position = anchor.position;
        let mut rotation = anchor.rotation;
        let mut budget = (self.speed * dt).max(0.0);
        let mut moved = false;

        while budget > 0.0 {
            let Some(goal) = self.destination() else {
                break;
            };
            let offset = planar(goal - position);
            let distance = offset.length();
            let on_waypoint = !self.waypoints.is_empty();
            let final_leg = !on_waypoint || (self.waypoints.len() == 1 && self.target.is_none());
            let close_enough = if final_leg { 1e-9 } else { reached_distance };
            if distance <= close_enough {
                if !on_waypoint {
                    break;
                }
                self.waypoints.pop_front();
                continue;
            }
            let step = budget.min(distance);
            position += offset / distance * step;
            if let Some(yaw) = Transform::yaw_towards(offset) {
                rotation = DQuat::from_rotation_y(yaw);
            }
            budget -= step;
            moved = true;
            if !final_leg && planar(goal - position).length() <= reached_distance {
                self.waypoints.pop_front();
            }
        }

        if moved {
            self.formation.set_anchor(position, rotation);
        }
        moved
    }
}
