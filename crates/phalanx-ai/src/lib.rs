//! Agent AI for PHALANX.
//!
//! Implements the per-agent state machine and the archetype profiles that
//! decide which steering behaviors run in each state.

pub mod fsm;
pub mod profiles;

pub use phalanx_core as core;

pub use fsm::{AgentDecision, AgentStateMachine, AiContext, EnemyContact, Transition, TRANSITIONS};
pub use profiles::{
    ArchetypeProfile, Archetypes, BehaviorLibrary, CombatTuning, ResolvedArchetype, StateBehaviors,
};
