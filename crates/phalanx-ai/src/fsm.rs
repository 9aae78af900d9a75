//! Per-agent behavioral state machine.
//!
//! The machine itself only stores the current state and how long it has
//! been held. [`AgentStateMachine::evaluate`] is a pure function of the
//! machine and an [`AiContext`]; it returns what the agent wants to do and
//! leaves applying the transition to the caller, which goes through
//! [`AgentStateMachine::request_transition`] and therefore the table.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use phalanx_core::enums::{AgentState, CommandKind};
use phalanx_core::error::{SimError, SimResult};
use phalanx_core::types::{planar_distance, AgentId, DVec3};

use crate::profiles::ArchetypeProfile;

use AgentState::*;

/// Legal next states, indexed by [`AgentState::index`].
pub const TRANSITIONS: [&[AgentState]; 8] = [
    // Idle
    &[Moving, Attacking, Defending, Fleeing, Stunned, Knockback, Dead],
    // Moving
    &[Idle, Attacking, Defending, Fleeing, Stunned, Knockback, Dead],
    // Attacking
    &[Idle, Moving, Defending, Fleeing, Stunned, Knockback, Dead],
    // Defending
    &[Idle, Moving, Attacking, Stunned, Knockback, Dead],
    // Fleeing
    &[Idle, Stunned, Knockback, Dead],
    // Stunned
    &[Idle, Knockback, Dead],
    // Knockback
    &[Idle, Stunned, Dead],
    // Dead
    &[],
];

/// Whether `from -> to` is in the table.
pub fn is_legal(from: AgentState, to: AgentState) -> bool {
    TRANSITIONS[from.index()].contains(&to)
}

/// An accepted transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AgentState,
    pub to: AgentState,
}

impl Transition {
    /// False for same-state no-ops.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Brain component: current state plus ticks spent in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStateMachine {
    state: AgentState,
    ticks_in_state: u32,
}

impl AgentStateMachine {
    pub fn new(state: AgentState) -> Self {
        Self {
            state,
            ticks_in_state: 0,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn ticks_in_state(&self) -> u32 {
        self.ticks_in_state
    }

    /// Seconds spent in the current state at a fixed `dt`.
    pub fn time_in_state(&self, dt: f64) -> f64 {
        self.ticks_in_state as f64 * dt
    }

    /// Count one tick in the current state. Called once per tick before
    /// evaluation.
    pub fn advance(&mut self) {
        self.ticks_in_state = self.ticks_in_state.saturating_add(1);
    }

    /// Move to `next` if the table allows it. Requesting the current state
    /// is an accepted no-op, except from Dead which accepts nothing.
    pub fn request_transition(&mut self, next: AgentState) -> SimResult<Transition> {
        let from = self.state;
        if from == next && !from.is_terminal() {
            return Ok(Transition { from, to: next });
        }
        if !is_legal(from, next) {
            warn!(%from, to = %next, "transition rejected");
            return Err(SimError::InvalidTransition { from, to: next });
        }
        debug!(%from, to = %next, "state transition");
        self.state = next;
        self.ticks_in_state = 0;
        Ok(Transition { from, to: next })
    }

    /// Decide this tick's intent. Pure apart from the flee roll, which only
    /// draws from `rng` while health is under the flee threshold.
    pub fn evaluate(&self, ctx: &AiContext<'_>, rng: &mut dyn RngCore) -> AgentDecision {
        let elapsed = self.time_in_state(ctx.dt);
        match self.state {
            Dead => AgentDecision::default(),
            Stunned => timed_exit(elapsed, ctx.profile.stun_duration_secs),
            Knockback => timed_exit(elapsed, ctx.profile.knockback_duration_secs),
            Fleeing => evaluate_fleeing(ctx, elapsed),
            Defending => evaluate_defending(ctx),
            Attacking => evaluate_attacking(ctx, rng),
            Idle | Moving => evaluate_positioning(self.state, ctx),
        }
    }
}

/// Nearest hostile as seen by one agent this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyContact {
    pub id: AgentId,
    pub position: DVec3,
    pub distance: f64,
}

/// Read-only input to [`AgentStateMachine::evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct AiContext<'a> {
    pub profile: &'a ArchetypeProfile,
    pub position: DVec3,
    pub health_fraction: f64,
    /// World position of the agent's formation slot, if it has one.
    pub slot_position: Option<DVec3>,
    /// Current order of the agent's squad; `Stop` when unassigned.
    pub order: CommandKind,
    pub nearest_enemy: Option<EnemyContact>,
    /// Reach of the agent's attack, from its combat component.
    pub attack_range: f64,
    pub cooldown_remaining: f64,
    pub dt: f64,
}

/// What the agent wants to do this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentDecision {
    pub next_state: Option<AgentState>,
    /// Strike this enemy (range and cooldown already checked).
    pub attack: Option<AgentId>,
    /// Steering goal (enemy being approached).
    pub target: Option<DVec3>,
    /// Point to run from.
    pub threat: Option<DVec3>,
}

impl AgentDecision {
    fn go(next: AgentState) -> Self {
        Self {
            next_state: Some(next),
            ..Self::default()
        }
    }
}

fn timed_exit(elapsed: f64, duration: f64) -> AgentDecision {
    if elapsed >= duration {
        AgentDecision::go(Idle)
    } else {
        AgentDecision::default()
    }
}

fn enemy_within(ctx: &AiContext<'_>, range: f64) -> Option<EnemyContact> {
    ctx.nearest_enemy.filter(|e| e.distance <= range)
}

fn can_strike(ctx: &AiContext<'_>, enemy: &EnemyContact) -> bool {
    enemy.distance <= ctx.attack_range && ctx.cooldown_remaining <= 0.0
}

fn evaluate_positioning(state: AgentState, ctx: &AiContext<'_>) -> AgentDecision {
    if ctx.order == CommandKind::Defend {
        return AgentDecision::go(Defending);
    }
    if let Some(enemy) = enemy_within(ctx, ctx.profile.combat.aggro_range) {
        return AgentDecision {
            next_state: Some(Attacking),
            target: Some(enemy.position),
            ..AgentDecision::default()
        };
    }

    let off_slot = ctx
        .slot_position
        .map(|slot| planar_distance(ctx.position, slot))
        .is_some_and(|d| d > ctx.profile.arrive_distance);
    match (state, off_slot) {
        (Idle, true) => AgentDecision::go(Moving),
        (Moving, false) => AgentDecision::go(Idle),
        _ => AgentDecision::default(),
    }
}

fn evaluate_attacking(ctx: &AiContext<'_>, rng: &mut dyn RngCore) -> AgentDecision {
    let profile = ctx.profile;
    if ctx.health_fraction < profile.flee_health_threshold
        && profile.flee_chance > 0.0
        && rng.gen_bool(profile.flee_chance.min(1.0))
    {
        return AgentDecision {
            next_state: Some(Fleeing),
            threat: ctx.nearest_enemy.map(|e| e.position),
            ..AgentDecision::default()
        };
    }

    let Some(enemy) = enemy_within(ctx, profile.combat.leash_range) else {
        return AgentDecision::go(Idle);
    };
    AgentDecision {
        next_state: None,
        attack: can_strike(ctx, &enemy).then_some(enemy.id),
        target: Some(enemy.position),
        threat: None,
    }
}

fn evaluate_defending(ctx: &AiContext<'_>) -> AgentDecision {
    if ctx.order != CommandKind::Defend {
        return AgentDecision::go(Idle);
    }
    let attack = enemy_within(ctx, ctx.attack_range)
        .filter(|e| can_strike(ctx, e))
        .map(|e| e.id);
    AgentDecision {
        attack,
        ..AgentDecision::default()
    }
}

fn evaluate_fleeing(ctx: &AiContext<'_>, elapsed: f64) -> AgentDecision {
    if elapsed >= ctx.profile.max_flee_duration_secs {
        return AgentDecision::go(Idle);
    }
    AgentDecision {
        threat: ctx.nearest_enemy.map(|e| e.position),
        ..AgentDecision::default()
    }
}
