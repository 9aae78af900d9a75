//! Demo battle used when the runner is started without a scenario of its own.

use std::f64::consts::FRAC_PI_2;

use phalanx_core::commands::SquadCommand;
use phalanx_core::enums::{Archetype, FormationShape};
use phalanx_core::types::{DVec3, SlotCoord, SquadId};
use phalanx_sim::{AgentSpawn, SimulationEngine, SquadSpawn};
use phalanx_spatial::{Obstacle, ObstacleField};
use tracing::info;

/// Fill every slot of a fresh squad with `archetype`, spawned in place.
fn muster(engine: &mut SimulationEngine, spawn: SquadSpawn, archetype: Archetype) -> SquadId {
    let team = spawn.team;
    let cols = spawn.cols;
    let squad = engine.create_squad(spawn);
    let slots: Vec<DVec3> = engine
        .squad(squad)
        .map(|s| {
            (0..s.formation.capacity())
                .filter_map(|i| s.formation.world_position(SlotCoord::from_index(i, cols)).ok())
                .collect()
        })
        .unwrap_or_default();
    for at in slots {
        engine.spawn_agent(AgentSpawn::new(archetype, team, at).in_squad(squad));
    }
    squad
}

/// Two armies 30 m apart with a pair of boulders between them, both sides
/// ordered to attack. Returns the squads in spawn order.
pub fn skirmish(engine: &mut SimulationEngine) -> Vec<SquadId> {
    engine.set_obstacles(ObstacleField::new(vec![
        Obstacle::new(DVec3::new(0.0, 0.0, 4.0), 1.5),
        Obstacle::new(DVec3::new(0.0, 0.0, -4.0), 1.5),
    ]));

    let west = DVec3::new(-15.0, 0.0, 0.0);
    let east = DVec3::new(15.0, 0.0, 0.0);
    let squads = vec![
        muster(
            engine,
            SquadSpawn::grid(0, 3, 4).at(west + DVec3::new(0.0, 0.0, 4.0)).facing(FRAC_PI_2),
            Archetype::Infantry,
        ),
        muster(
            engine,
            SquadSpawn::new(0, FormationShape::Line, 6)
                .at(west + DVec3::new(-3.0, 0.0, -4.0))
                .facing(FRAC_PI_2),
            Archetype::Pikeman,
        ),
        muster(
            engine,
            SquadSpawn::new(1, FormationShape::Column, 6).at(east).facing(-FRAC_PI_2),
            Archetype::Skirmisher,
        ),
        muster(
            engine,
            SquadSpawn::grid(1, 2, 4).at(east + DVec3::new(3.0, 0.0, 6.0)).facing(-FRAC_PI_2),
            Archetype::Infantry,
        ),
    ];

    engine.queue_commands([
        SquadCommand::attack(squads[0], east),
        SquadCommand::move_via(squads[1], vec![DVec3::new(-6.0, 0.0, -8.0)], DVec3::new(4.0, 0.0, -6.0)),
        SquadCommand::attack(squads[2], west),
        SquadCommand::defend(squads[3], None),
    ]);
    info!(squads = squads.len(), agents = engine.agent_count(), "skirmish deployed");
    squads
}
