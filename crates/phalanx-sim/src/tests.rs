//! Tests for the engine API, configuration and the per-tick systems.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hecs::World;

use phalanx_ai::{AgentStateMachine, ArchetypeProfile, Archetypes};
use phalanx_core::commands::SquadCommand;
use phalanx_core::components::AgentTag;
use phalanx_core::enums::{AgentState, Archetype, CommandKind, FormationShape};
use phalanx_core::error::SimError;
use phalanx_core::events::SimEvent;
use phalanx_core::state::SimSnapshot;
use phalanx_core::types::{AgentId, DVec3, SlotCoord, SquadId, Transform};
use phalanx_spatial::FlatGround;
use phalanx_steering::behaviors::Cohesion;
use phalanx_steering::{Behavior, BehaviorSlot};

use crate::config::SimConfig;
use crate::engine::SimulationEngine;
use crate::systems::perception::{self, Perception};
use crate::world_setup::{self, AgentSpawn, SquadSpawn};

fn engine() -> SimulationEngine {
    SimulationEngine::new(SimConfig::default())
}

fn infantry(team: u8, x: f64, z: f64) -> AgentSpawn {
    AgentSpawn::new(Archetype::Infantry, team, DVec3::new(x, 0.0, z))
}

fn events_of(snapshot: &SimSnapshot) -> &[SimEvent] {
    &snapshot.events
}

// ---- Configuration ----

#[test]
fn test_config_json_overrides_only_given_fields() {
    let config = SimConfig::from_json_str(r#"{ "seed": 7, "squad": { "speed": 5.0 } }"#).unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.squad.speed, 5.0);
    let defaults = SimConfig::default();
    assert_eq!(config.dt, defaults.dt);
    assert_eq!(config.squad.waypoint_reached_distance, defaults.squad.waypoint_reached_distance);
    assert_eq!(config.spatial, defaults.spatial);
}

#[test]
fn test_config_rejects_invalid_values() {
    let err = SimConfig::from_json_str(r#"{ "dt": -1.0 }"#).unwrap_err();
    assert!(matches!(err, SimError::Configuration(_)), "{err}");

    let err = SimConfig::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, SimError::Json(_)));

    let err = SimConfig::load("/definitely/not/here/phalanx.json").unwrap_err();
    assert!(matches!(err, SimError::Io(_)));
}

#[test]
fn test_sanitized_config_falls_back_to_defaults() {
    let config = SimConfig {
        dt: 0.0,
        frame_budget_ms: f64::NAN,
        ..SimConfig::default()
    }
    .sanitized();
    assert_eq!(config.dt, SimConfig::default().dt);
    assert_eq!(config.frame_budget_ms, SimConfig::default().frame_budget_ms);
    assert!(config.validate().is_ok());
}

#[test]
fn test_configured_behaviors_override_builtin() {
    let mut config = SimConfig::default();
    config
        .behaviors
        .push(BehaviorSlot::new("cohesion", Behavior::Cohesion(Cohesion::default())).weight(2.0));
    let library = config.behavior_library();
    assert_eq!(library.get("cohesion").unwrap().weight, 2.0);
    assert!(library.get("separation").is_some(), "builtins kept");
}

#[test]
fn test_config_file_round_trip() {
    let path = std::env::temp_dir().join(format!("phalanx-config-{}.json", std::process::id()));
    let config = SimConfig {
        seed: 99,
        ..SimConfig::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    let loaded = SimConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}

// ---- Perception ----

#[test]
fn test_perception_splits_teams_and_skips_the_dead() {
    let archetypes = Archetypes::builtin();
    let profile = &archetypes.get(Archetype::Infantry).profile;
    let mut world = World::new();
    let spawns = [
        infantry(0, 0.0, 0.0),
        infantry(0, 1.0, 0.0),
        infantry(1, 0.0, 2.0),
        infantry(1, 0.0, 20.0),
        infantry(1, -1.0, 0.0),
    ];
    for (i, spawn) in spawns.iter().enumerate() {
        world_setup::spawn_agent(&mut world, AgentId(i as u32), spawn, profile);
    }
    // Agent 4 is dead.
    for (_e, (tag, brain)) in world.query_mut::<(&AgentTag, &mut AgentStateMachine)>() {
        if tag.0 == AgentId(4) {
            brain.request_transition(AgentState::Dead).unwrap();
        }
    }

    let mut spatial = SimConfig::default().spatial.build_index();
    let mut perception = Perception::default();
    perception::rebuild(&world, &mut spatial, &mut perception);
    assert_eq!(perception.len(), 5);
    assert_eq!(spatial.len(), 4, "dead agents stay out of the index");

    let me = *perception.get(AgentId(0)).unwrap();
    let (mut allies, mut enemies) = (Vec::new(), Vec::new());
    perception.gather(&spatial, &me, 5.0, &mut allies, &mut enemies);
    assert_eq!(allies.iter().map(|n| n.id).collect::<Vec<_>>(), [AgentId(1)]);
    assert_eq!(enemies.iter().map(|n| n.id).collect::<Vec<_>>(), [AgentId(2)]);

    let nearest = perception.nearest_enemy(&spatial, &me, 50.0).unwrap();
    assert_eq!(nearest.id, AgentId(2));
    assert_eq!(nearest.distance, 2.0);
}

// ---- Spawning and squads ----

#[test]
fn test_spawned_agents_take_profile_stats() {
    let mut engine = engine();
    let pike = engine.spawn_agent(AgentSpawn::new(Archetype::Pikeman, 0, DVec3::ZERO));
    let snap = engine.tick();
    let view = snap.agent(pike).unwrap();
    assert_eq!(view.archetype, Archetype::Pikeman);
    assert_eq!(view.health, ArchetypeProfile::builtin(Archetype::Pikeman).max_health);
    assert_eq!(view.state, AgentState::Idle);
}

#[test]
fn test_join_full_squad_reports_and_reserves_nothing() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 1, 2));
    let a = engine.spawn_agent(infantry(0, 0.0, 0.0).in_squad(squad));
    let b = engine.spawn_agent(infantry(0, 1.0, 0.0).in_squad(squad));
    let c = engine.spawn_agent(infantry(0, 2.0, 0.0).in_squad(squad));

    let err = engine.join_squad(c, squad).unwrap_err();
    assert!(matches!(err, SimError::CapacityExceeded { capacity: 2, .. }));
    assert_eq!(engine.squad(squad).unwrap().formation.len(), 2);

    let snap = engine.tick();
    let full = events_of(&snap)
        .iter()
        .filter(|e| matches!(e, SimEvent::SquadFull { agent, .. } if *agent == c))
        .count();
    assert_eq!(full, 2, "spawn join and explicit join both refused");
    assert_eq!(snap.agent(a).unwrap().slot, Some(SlotCoord::new(0, 0)));
    assert_eq!(snap.agent(b).unwrap().slot, Some(SlotCoord::new(0, 1)));
    assert_eq!(snap.agent(c).unwrap().squad, None);
}

#[test]
fn test_switching_squads_frees_the_old_slot() {
    let mut engine = engine();
    let first = engine.create_squad(SquadSpawn::grid(0, 1, 1));
    let second = engine.create_squad(SquadSpawn::grid(0, 1, 1).at(DVec3::new(5.0, 0.0, 0.0)));
    let agent = engine.spawn_agent(infantry(0, 0.0, 0.0).in_squad(first));

    assert_eq!(engine.join_squad(agent, second).unwrap(), SlotCoord::new(0, 0));
    assert!(engine.squad(first).unwrap().formation.is_empty());
    assert!(engine.squad(second).unwrap().formation.contains(agent));

    assert!(engine.leave_squad(agent).unwrap());
    assert!(!engine.leave_squad(agent).unwrap());
    assert!(engine.squad(second).unwrap().formation.is_empty());
}

#[test]
fn test_unknown_ids_are_errors() {
    let mut engine = engine();
    let agent = engine.spawn_agent(infantry(0, 0.0, 0.0));
    assert!(matches!(
        engine.join_squad(agent, SquadId(7)),
        Err(SimError::UnknownSquad(SquadId(7)))
    ));
    assert!(matches!(
        engine.request_transition(AgentId(99), AgentState::Moving),
        Err(SimError::UnknownAgent(AgentId(99)))
    ));
    engine.despawn_agent(agent).unwrap();
    assert!(matches!(engine.despawn_agent(agent), Err(SimError::UnknownAgent(_))));
    assert_eq!(engine.agent_count(), 0);
}

#[test]
fn test_reshape_and_compact_update_agent_links() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 2, 2));
    let ids: Vec<AgentId> = (0..4)
        .map(|i| engine.spawn_agent(infantry(0, i as f64, 0.0).in_squad(squad)))
        .collect();

    engine.reshape_squad(squad, FormationShape::Line, 1, 4).unwrap();
    let snap = engine.tick();
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(snap.agent(*id).unwrap().slot, Some(SlotCoord::new(0, i as u16)));
    }
    assert!(matches!(
        engine.reshape_squad(squad, FormationShape::Grid, 1, 2),
        Err(SimError::CapacityExceeded { .. })
    ));

    // Back to 2x2; the front rank is row 1. Kill a front-rank member.
    engine.reshape_squad(squad, FormationShape::Grid, 2, 2).unwrap();
    engine.request_transition(ids[2], AgentState::Dead).unwrap();
    engine.tick();
    assert_eq!(engine.squad(squad).unwrap().formation.len(), 3);
    assert_eq!(engine.compact_squad(squad).unwrap(), 1);
    let snap = engine.tick();
    // The rear-most straggler fills the hole.
    assert_eq!(snap.agent(ids[1]).unwrap().slot, Some(SlotCoord::new(1, 0)));
    assert_eq!(snap.agent(ids[0]).unwrap().slot, Some(SlotCoord::new(0, 0)));
}

#[test]
fn test_set_member_slot() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 2, 2));
    let a = engine.spawn_agent(infantry(0, 0.0, 0.0).in_squad(squad));
    let b = engine.spawn_agent(infantry(0, 1.0, 0.0).in_squad(squad));

    engine.set_member_slot(a, 1, 1).unwrap();
    assert!(matches!(
        engine.set_member_slot(b, 1, 1),
        Err(SimError::SlotOccupied { holder, .. }) if holder == a
    ));
    assert!(matches!(
        engine.set_member_slot(b, 5, 0),
        Err(SimError::SlotOutOfBounds { .. })
    ));
    let snap = engine.tick();
    assert_eq!(snap.agent(a).unwrap().slot, Some(SlotCoord::new(1, 1)));
}

// ---- State changes ----

#[test]
fn test_death_disables_collider_and_frees_slot() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 1, 2));
    let agent = engine.spawn_agent(infantry(0, -0.75, 0.0).in_squad(squad));
    engine.tick();

    let t = engine.request_transition(agent, AgentState::Dead).unwrap();
    assert!(t.changed());
    let snap = engine.tick();
    assert!(events_of(&snap).contains(&SimEvent::Died { agent }));
    let view = snap.agent(agent).unwrap();
    assert_eq!(view.state, AgentState::Dead);
    assert_eq!(view.squad, None);
    assert_eq!(snap.squad(squad).unwrap().members, 0);

    let err = engine.request_transition(agent, AgentState::Idle).unwrap_err();
    assert!(matches!(err, SimError::InvalidTransition { from: AgentState::Dead, .. }));
    let snap = engine.tick();
    assert!(events_of(&snap).iter().any(|e| matches!(
        e,
        SimEvent::TransitionRejected { agent: a, from: AgentState::Dead, to: AgentState::Idle } if *a == agent
    )));
}

#[test]
fn test_stun_holds_agent_in_place() {
    let mut engine = engine();
    let agent = engine.spawn_agent(infantry(0, 0.0, 0.0));
    engine.apply_stun(agent).unwrap();
    let before = engine.tick().agent(agent).unwrap().position;
    for _ in 0..30 {
        let snap = engine.tick();
        assert_eq!(snap.agent(agent).unwrap().state, AgentState::Stunned);
        assert_eq!(snap.agent(agent).unwrap().position, before);
    }
    // Stun lasts 1.5 s; well past it the agent is back to Idle.
    for _ in 0..90 {
        engine.tick();
    }
    assert_eq!(engine.agent_state(agent), Some(AgentState::Idle));
}

#[test]
fn test_knockback_pushes_then_recovers() {
    let mut engine = engine();
    let agent = engine.spawn_agent(infantry(0, 0.0, 0.0));
    engine
        .apply_knockback(agent, DVec3::new(3.0, 5.0, 0.0))
        .unwrap();
    let snap = engine.tick();
    let view = snap.agent(agent).unwrap();
    assert_eq!(view.state, AgentState::Knockback);
    assert_eq!(view.velocity, DVec3::new(3.0, 0.0, 0.0), "vertical part dropped");
    assert!(view.position.x > 0.0);

    for _ in 0..60 {
        engine.tick();
    }
    assert_eq!(engine.agent_state(agent), Some(AgentState::Idle));
}

// ---- Combat ----

#[test]
fn test_adjacent_enemies_engage_and_strike() {
    let mut engine = engine();
    let a = engine.spawn_agent(infantry(0, 0.0, 0.0));
    let b = engine.spawn_agent(infantry(1, 1.0, 0.0));

    let snap = engine.tick();
    assert_eq!(snap.agent(a).unwrap().state, AgentState::Attacking);
    assert_eq!(snap.agent(b).unwrap().state, AgentState::Attacking);

    let snap = engine.tick();
    let strikes: Vec<_> = events_of(&snap)
        .iter()
        .filter(|e| matches!(e, SimEvent::Strike { .. }))
        .collect();
    assert_eq!(strikes.len(), 2);
    assert_eq!(snap.agent(a).unwrap().health, 88.0);
    assert_eq!(snap.agent(b).unwrap().health, 88.0);

    // Cooldown: no second strike a few ticks later.
    for _ in 0..5 {
        let snap = engine.tick();
        assert!(!events_of(&snap).iter().any(|e| matches!(e, SimEvent::Strike { .. })));
    }
}

#[test]
fn test_defenders_take_reduced_damage() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 1, 1));
    let defender = engine.spawn_agent(infantry(0, 0.0, 0.0).in_squad(squad));
    let attacker = engine.spawn_agent(infantry(1, 1.0, 0.0));
    engine.queue_command(SquadCommand::defend(squad, None));

    let snap = engine.tick();
    assert_eq!(snap.agent(defender).unwrap().state, AgentState::Defending);
    let snap = engine.tick();
    assert!(events_of(&snap).contains(&SimEvent::Strike {
        attacker,
        target: defender,
        damage: 6.0,
    }));
    assert_eq!(snap.agent(defender).unwrap().health, 94.0);
    assert_eq!(snap.agent(attacker).unwrap().health, 88.0, "defenders hit back");
}

// ---- Commands and outputs ----

#[test]
fn test_commands_reach_squad_and_bus() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 1, 1));
    let heard = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&heard);
    engine.command_bus_mut().subscribe(move |cmd: &SquadCommand, _| {
        assert_eq!(cmd.kind, CommandKind::Move);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    engine.queue_commands([
        SquadCommand::move_to(squad, DVec3::new(5.0, 0.0, 0.0)),
        SquadCommand::move_to(SquadId(42), DVec3::ZERO),
        SquadCommand {
            squad_id: squad,
            kind: CommandKind::Attack,
            target: None,
            waypoints: Vec::new(),
        },
    ]);
    let snap = engine.tick();
    assert_eq!(heard.load(Ordering::SeqCst), 1, "unknown squad and targetless attack dropped");
    assert_eq!(
        events_of(&snap),
        [SimEvent::OrderIssued {
            squad,
            kind: CommandKind::Move
        }]
    );
    assert_eq!(snap.squad(squad).unwrap().order, CommandKind::Move);
}

#[test]
fn test_publish_transforms_in_id_order() {
    let mut engine = engine();
    let a = engine.spawn_agent(infantry(0, 1.0, 2.0));
    let b = engine.spawn_agent(infantry(0, -4.0, 0.0));

    let mut published: Vec<(AgentId, Transform)> = Vec::new();
    engine.publish_transforms(&mut published);
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].0, a);
    assert_eq!(published[1].0, b);
    assert_eq!(published[0].1.position, DVec3::new(1.0, 0.0, 2.0));

    let mut latest: BTreeMap<AgentId, Transform> = BTreeMap::new();
    engine.publish_transforms(&mut latest);
    engine.publish_transforms(&mut latest);
    assert_eq!(latest.len(), 2);
}

#[test]
fn test_surface_lifts_slots_and_agents() {
    let mut engine = engine();
    let squad = engine.create_squad(SquadSpawn::grid(0, 1, 1));
    let agent = engine.spawn_agent(infantry(0, 0.0, 0.0).in_squad(squad));
    engine.set_surface(FlatGround { height: 2.0 });

    let slot = engine.squad(squad).unwrap().formation.member_position(agent).unwrap();
    assert_eq!(slot.y, 2.0);
    let snap = engine.tick();
    assert_eq!(snap.agent(agent).unwrap().position.y, 2.0);
}

#[test]
fn test_snapshot_does_not_advance_time() {
    let mut engine = engine();
    engine.spawn_agent(infantry(0, 0.0, 0.0));
    engine.tick();
    let before = engine.time();
    let snap = engine.snapshot();
    assert_eq!(snap.time.tick, before.tick);
    assert_eq!(engine.time().tick, 1);
    assert_eq!(snap.agents.len(), 1);
}
