//! Enumeration types used throughout the simulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discrete per-agent behavioral state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Idle,
    Moving,
    Attacking,
    Defending,
    Fleeing,
    Stunned,
    Knockback,
    /// Terminal: no outgoing transitions.
    Dead,
}

impl AgentState {
    pub const ALL: [AgentState; 8] = [
        AgentState::Idle,
        AgentState::Moving,
        AgentState::Attacking,
        AgentState::Defending,
        AgentState::Fleeing,
        AgentState::Stunned,
        AgentState::Knockback,
        AgentState::Dead,
    ];

    pub fn is_terminal(self) -> bool {
        self == AgentState::Dead
    }

    /// Dense index, used for per-state tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Layout family of a squad formation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormationShape {
    /// Single rank, members side by side.
    Line,
    /// Single file.
    Column,
    /// Rows × cols block.
    #[default]
    Grid,
}

impl FormationShape {
    /// Grid dimensions `(rows, cols)` able to hold `capacity` members.
    /// `Grid` prefers a square-ish block, wider than deep.
    pub fn dimensions(self, capacity: usize) -> (u16, u16) {
        let capacity = capacity.max(1);
        match self {
            FormationShape::Line => (1, capacity as u16),
            FormationShape::Column => (capacity as u16, 1),
            FormationShape::Grid => {
                let cols = (capacity as f64).sqrt().ceil() as usize;
                let rows = capacity.div_ceil(cols);
                (rows as u16, cols as u16)
            }
        }
    }
}

/// Squad-level order kinds accepted by the command entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    Move,
    Attack,
    Defend,
    #[default]
    Stop,
}

/// Behavior composition strategy, chosen per archetype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComposerMode {
    /// Priority-ordered weighted sum with early exit.
    #[default]
    PriorityBlend,
    /// Only the single most desirable behavior runs.
    ExclusiveSelect,
    /// Interest/danger sector voting.
    ContextSteering,
}

/// Agent archetype. Selects movement limits, combat stats and behavior sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Archetype {
    #[default]
    Infantry,
    Pikeman,
    Skirmisher,
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
