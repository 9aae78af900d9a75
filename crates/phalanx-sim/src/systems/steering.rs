//! Steering and movement integration.
//!
//! Each living agent gets a fresh `SteeringContext` built from the
//! perception snapshot and the engine's pooled neighbor buffers, runs its
//! archetype's composer over the behavior set of its current state, and
//! integrates the resulting force.

use std::collections::BTreeMap;

use hecs::World;
use rand::RngCore;

use phalanx_ai::{AgentStateMachine, Archetypes};
use phalanx_core::components::{Collider, Kinematics, SquadLink};
use phalanx_core::enums::Archetype;
use phalanx_core::types::{planar, DVec3, SquadId, Transform};
use phalanx_spatial::{ObstacleQuery, SpatialIndex, SurfaceQuery};
use phalanx_squad::Squad;
use phalanx_steering::{
    BehaviorComposer, Composer, Neighbor, SquadState, SteeringContext, SteeringTuning,
};

use crate::systems::ai::Intent;
use crate::systems::perception::Perception;

/// Buffers reused across agents and ticks.
#[derive(Debug, Default)]
pub struct SteeringBuffers {
    allies: Vec<Neighbor>,
    enemies: Vec<Neighbor>,
    path: Vec<DVec3>,
}

/// Borrowed world collaborators for one steering pass.
pub struct Surroundings<'a> {
    pub spatial: &'a SpatialIndex,
    pub surface: &'a dyn SurfaceQuery,
    pub obstacles: &'a dyn ObstacleQuery,
    pub neighbor_radius: f64,
    pub ground_snap_distance: f64,
}

/// Squad waypoints and target, shifted by the member's slot offset so each
/// agent walks its own lane.
fn squad_path(squad: &Squad, slot: Option<DVec3>, path: &mut Vec<DVec3>) {
    path.clear();
    let shift = slot.map_or(DVec3::ZERO, |s| planar(s - squad.anchor().position));
    path.extend(squad.waypoints().copied().chain(squad.target()).map(|p| p + shift));
}

/// Integrate `force` over `dt`, capping speed and turning to face travel.
fn integrate(kin: &mut Kinematics, force: DVec3, dt: f64) {
    let velocity = planar(kin.velocity + force * dt);
    kin.velocity = velocity.clamp_length_max(kin.speed_cap());
    kin.position += kin.velocity * dt;
    if let Some(yaw) = Transform::yaw_towards(kin.velocity) {
        kin.heading = yaw;
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    world: &mut World,
    archetypes: &Archetypes,
    squads: &BTreeMap<SquadId, Squad>,
    perception: &mut Perception,
    around: &Surroundings<'_>,
    tuning: &SteeringTuning,
    buffers: &mut SteeringBuffers,
    rng: &mut dyn RngCore,
    dt: f64,
) {
    let SteeringBuffers {
        allies,
        enemies,
        path,
    } = buffers;

    for i in 0..perception.len() {
        let me = perception.samples()[i];
        if !me.is_alive() {
            continue;
        }
        let Ok((archetype, brain, intent, link, collider, kin)) = world.query_one_mut::<(
            &Archetype,
            &AgentStateMachine,
            &Intent,
            &SquadLink,
            &Collider,
            &mut Kinematics,
        )>(me.entity) else {
            continue;
        };

        let resolved = archetypes.get(*archetype);
        let behaviors = resolved.behaviors(brain.state());
        perception.gather(around.spatial, &me, around.neighbor_radius, allies, enemies);

        let squad = link.squad.and_then(|id| squads.get(&id));
        let slot_position = squad.and_then(|s| s.formation.member_position(me.id));
        match squad {
            Some(squad) => squad_path(squad, slot_position, path),
            None => path.clear(),
        }

        let force = {
            let mut ctx = SteeringContext::new(
                me.id,
                me.position,
                kin.velocity,
                kin.speed_cap(),
                kin.max_acceleration,
                dt,
            )
            .with_radius(collider.radius)
            .with_allies(allies.as_slice())
            .with_enemies(enemies.as_slice())
            .with_obstacles(around.obstacles)
            .with_path(path.as_slice());
            ctx.target = intent.target;
            ctx.slot_position = slot_position;
            ctx.threat = intent.threat;
            ctx.squad = squad.map(|s| SquadState {
                id: s.id(),
                anchor: s.anchor(),
                order: s.order(),
            });
            Composer::for_mode(resolved.profile.composer, tuning).compute_force(behaviors, &ctx, rng)
        };

        integrate(kin, force, dt);
        if let Some(ground) = around
            .surface
            .project_down(kin.position, around.ground_snap_distance)
        {
            kin.position.y = ground.y;
        }
    }
}
