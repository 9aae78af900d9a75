//! Agent AI system: advance every brain one tick and act on its decision.
//!
//! Decisions are made against the perception snapshot. Transitions only
//! touch the deciding agent's own components; strikes against other
//! agents are buffered for the combat system.

use std::collections::BTreeMap;

use hecs::World;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use phalanx_ai::{AgentStateMachine, AiContext, ArchetypeProfile, Archetypes, Transition};
use phalanx_core::components::{Collider, Combat, Health, Kinematics, SquadLink};
use phalanx_core::enums::{AgentState, Archetype, CommandKind};
use phalanx_core::error::{SimError, SimResult};
use phalanx_core::events::SimEvent;
use phalanx_core::types::{AgentId, DVec3, SquadId};
use phalanx_spatial::SpatialIndex;
use phalanx_squad::Squad;

use crate::systems::combat::Strike;
use crate::systems::perception::Perception;

/// Steering goals chosen by the last evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Point being approached (enemy under attack).
    pub target: Option<DVec3>,
    /// Point being run from.
    pub threat: Option<DVec3>,
}

/// Request a transition and apply the state's entry effects. Emits
/// `StateChanged` (and `Died`) on change and `TransitionRejected` on refusal.
pub(crate) fn apply_transition(
    agent: AgentId,
    brain: &mut AgentStateMachine,
    kin: &mut Kinematics,
    collider: &mut Collider,
    profile: &ArchetypeProfile,
    next: AgentState,
    events: &mut Vec<SimEvent>,
) -> SimResult<Transition> {
    let transition = match brain.request_transition(next) {
        Ok(t) => t,
        Err(err) => {
            if let SimError::InvalidTransition { from, to } = err {
                events.push(SimEvent::TransitionRejected { agent, from, to });
            }
            return Err(err);
        }
    };
    if !transition.changed() {
        return Ok(transition);
    }

    events.push(SimEvent::StateChanged {
        agent,
        from: transition.from,
        to: transition.to,
    });
    kin.speed_multiplier = match next {
        AgentState::Fleeing => profile.flee_speed_multiplier,
        _ => 1.0,
    };
    match next {
        AgentState::Stunned => kin.velocity = DVec3::ZERO,
        AgentState::Dead => {
            kin.velocity = DVec3::ZERO;
            collider.enabled = false;
            events.push(SimEvent::Died { agent });
        }
        _ => {}
    }
    Ok(transition)
}

type AiQuery<'a> = (
    &'a Archetype,
    &'a mut AgentStateMachine,
    &'a mut Combat,
    &'a Health,
    &'a SquadLink,
    &'a mut Intent,
    &'a mut Kinematics,
    &'a mut Collider,
);

#[allow(clippy::too_many_arguments)]
pub fn run(
    world: &mut World,
    archetypes: &Archetypes,
    squads: &BTreeMap<SquadId, Squad>,
    perception: &mut Perception,
    spatial: &SpatialIndex,
    rng: &mut dyn RngCore,
    dt: f64,
    strikes: &mut Vec<Strike>,
    events: &mut Vec<SimEvent>,
) {
    for i in 0..perception.len() {
        let me = perception.samples()[i];
        let Ok((archetype, brain, combat, health, link, intent, kin, collider)) =
            world.query_one_mut::<AiQuery>(me.entity)
        else {
            continue;
        };

        brain.advance();
        combat.cooldown_remaining = (combat.cooldown_remaining - dt).max(0.0);
        if brain.state().is_terminal() {
            *intent = Intent::default();
            continue;
        }

        let profile = &archetypes.get(*archetype).profile;
        let sight = profile.combat.aggro_range.max(profile.combat.leash_range);
        let nearest_enemy = perception.nearest_enemy(spatial, &me, sight);
        let squad = link.squad.and_then(|id| squads.get(&id));
        let ctx = AiContext {
            profile,
            position: me.position,
            health_fraction: health.fraction(),
            slot_position: squad.and_then(|s| s.formation.member_position(me.id)),
            order: squad.map_or(CommandKind::Stop, Squad::order),
            nearest_enemy,
            attack_range: combat.attack_range,
            cooldown_remaining: combat.cooldown_remaining,
            dt,
        };
        let decision = brain.evaluate(&ctx, rng);

        if let Some(next) = decision.next_state {
            // Rejections are already logged and reported as events.
            let _ = apply_transition(me.id, brain, kin, collider, profile, next, events);
        }
        *intent = Intent {
            target: decision.target,
            threat: decision.threat,
        };
        if let Some(target) = decision.attack {
            strikes.push(Strike {
                attacker: me.id,
                target,
                damage: combat.damage,
                knockback: combat.knockback,
                origin: me.position,
            });
            combat.cooldown_remaining = combat.cooldown_secs;
        }
    }
}
