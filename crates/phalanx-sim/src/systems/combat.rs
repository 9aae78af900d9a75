//! Combat resolution: apply the strikes buffered during the AI pass.

use std::collections::BTreeMap;

use hecs::{Entity, World};

use phalanx_ai::{AgentStateMachine, Archetypes};
use phalanx_core::components::{Collider, Health, Kinematics};
use phalanx_core::enums::{AgentState, Archetype};
use phalanx_core::events::SimEvent;
use phalanx_core::types::{planar, AgentId, DVec3};

use crate::systems::ai::apply_transition;

/// An attack decided this tick, applied after every agent has moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub attacker: AgentId,
    pub target: AgentId,
    pub damage: f64,
    /// Impulse (m/s) pushing the target away from `origin`.
    pub knockback: f64,
    pub origin: DVec3,
}

/// Drain `strikes` in order. Strikes on agents that are already dead,
/// including ones killed earlier in the same batch, are dropped.
pub fn run(
    world: &mut World,
    archetypes: &Archetypes,
    agents: &BTreeMap<AgentId, Entity>,
    strikes: &mut Vec<Strike>,
    events: &mut Vec<SimEvent>,
) {
    for strike in strikes.drain(..) {
        let Some(&entity) = agents.get(&strike.target) else {
            continue;
        };
        let Ok((archetype, brain, health, kin, collider)) = world.query_one_mut::<(
            &Archetype,
            &mut AgentStateMachine,
            &mut Health,
            &mut Kinematics,
            &mut Collider,
        )>(entity) else {
            continue;
        };
        if brain.state().is_terminal() {
            continue;
        }

        let profile = &archetypes.get(*archetype).profile;
        let damage = if brain.state() == AgentState::Defending {
            strike.damage * profile.combat.defend_damage_factor
        } else {
            strike.damage
        };
        health.current = (health.current - damage).max(0.0);
        events.push(SimEvent::Strike {
            attacker: strike.attacker,
            target: strike.target,
            damage,
        });

        if health.is_depleted() {
            let _ = apply_transition(strike.target, brain, kin, collider, profile, AgentState::Dead, events);
            continue;
        }
        if strike.knockback > 0.0 {
            let away = planar(kin.position - strike.origin).normalize_or_zero();
            if apply_transition(strike.target, brain, kin, collider, profile, AgentState::Knockback, events)
                .is_ok()
            {
                kin.velocity += away * strike.knockback;
            }
        }
    }
}
