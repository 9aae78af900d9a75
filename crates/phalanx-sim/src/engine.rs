//! Simulation engine, the core of PHALANX.
//!
//! `SimulationEngine` owns the hecs world, the squads, the seeded RNG and
//! every per-tick buffer. It processes squad commands, runs all systems in
//! a fixed order and produces a `SimSnapshot` per tick. Completely headless,
//! so the same seed always replays the same battle.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use phalanx_ai::{AgentStateMachine, Archetypes, Transition};
use phalanx_core::commands::SquadCommand;
use phalanx_core::components::{Collider, Kinematics, SquadLink};
use phalanx_core::enums::{AgentState, Archetype, CommandKind, FormationShape};
use phalanx_core::error::{SimError, SimResult};
use phalanx_core::events::SimEvent;
use phalanx_core::state::SimSnapshot;
use phalanx_core::types::{planar, AgentId, DQuat, DVec3, SimTime, SlotCoord, SquadId, Transform};
use phalanx_spatial::{FlatGround, ObstacleQuery, SpatialIndex, SurfaceQuery};
use phalanx_squad::{EventBus, FormationManager, FormationTuning, Squad};

use crate::config::SimConfig;
use crate::sink::TransformSink;
use crate::systems;
use crate::systems::combat::Strike;
use crate::systems::perception::Perception;
use crate::systems::steering::{SteeringBuffers, Surroundings};
use crate::world_setup::{self, AgentSpawn, SquadSpawn};

/// The simulation engine. Owns the ECS world and all sim state.
pub struct SimulationEngine {
    config: SimConfig,
    world: World,
    time: SimTime,
    rng: ChaCha8Rng,
    archetypes: Archetypes,
    squads: BTreeMap<SquadId, Squad>,
    agents: BTreeMap<AgentId, Entity>,
    next_agent_id: u32,
    next_squad_id: u32,
    command_queue: VecDeque<SquadCommand>,
    command_bus: EventBus<SquadCommand>,
    surface: Box<dyn SurfaceQuery + Send>,
    obstacles: Box<dyn ObstacleQuery + Send>,

    // Per-tick scratch, kept between ticks to reuse allocations.
    spatial: SpatialIndex,
    perception: Perception,
    steering_buffers: SteeringBuffers,
    strikes: Vec<Strike>,
    events: Vec<SimEvent>,
}

impl SimulationEngine {
    /// Create an engine on flat ground with no obstacles. Invalid config
    /// values are logged and replaced by their defaults.
    pub fn new(config: SimConfig) -> Self {
        let config = config.sanitized();
        Self {
            world: World::new(),
            time: SimTime::default(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            archetypes: config.archetypes(),
            squads: BTreeMap::new(),
            agents: BTreeMap::new(),
            next_agent_id: 0,
            next_squad_id: 0,
            command_queue: VecDeque::new(),
            command_bus: EventBus::new(),
            surface: Box::new(FlatGround::default()),
            obstacles: Box::new(()),
            spatial: config.spatial.build_index(),
            perception: Perception::default(),
            steering_buffers: SteeringBuffers::default(),
            strikes: Vec::new(),
            events: Vec::new(),
            config,
        }
    }

    /// Replace the ground used for slot projection and agent height.
    pub fn set_surface(&mut self, surface: impl SurfaceQuery + Send + 'static) {
        self.surface = Box::new(surface);
        for squad in self.squads.values_mut() {
            squad.formation.invalidate();
            squad.formation.refresh(&*self.surface);
        }
    }

    /// Replace the obstacle source consulted by avoidance behaviors.
    pub fn set_obstacles(&mut self, obstacles: impl ObstacleQuery + Send + 'static) {
        self.obstacles = Box::new(obstacles);
    }

    /// Queue a squad command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: SquadCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = SquadCommand>) {
        self.command_queue.extend(commands);
    }

    /// Subscribers are notified of every accepted squad command.
    pub fn command_bus_mut(&mut self) -> &mut EventBus<SquadCommand> {
        &mut self.command_bus
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> SimSnapshot {
        let started = Instant::now();

        self.process_commands();
        self.run_systems();
        self.time.advance(self.config.dt);

        let events = std::mem::take(&mut self.events);
        let mut snapshot =
            systems::snapshot::build_snapshot(&self.world, &self.squads, &self.time, events);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if elapsed_ms > self.config.frame_budget_ms {
            warn!(
                tick = self.time.tick,
                elapsed_ms,
                budget_ms = self.config.frame_budget_ms,
                "tick over frame budget"
            );
        }
        snapshot.tick_millis = elapsed_ms;
        snapshot
    }

    /// Current state without advancing time. Pending events are kept for
    /// the next tick.
    pub fn snapshot(&self) -> SimSnapshot {
        systems::snapshot::build_snapshot(&self.world, &self.squads, &self.time, Vec::new())
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn squad(&self, id: SquadId) -> Option<&Squad> {
        self.squads.get(&id)
    }

    pub fn squads(&self) -> impl Iterator<Item = &Squad> {
        self.squads.values()
    }

    /// Number of agents, dead ones included.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent_state(&self, agent: AgentId) -> Option<AgentState> {
        let entity = *self.agents.get(&agent)?;
        self.world
            .get::<&AgentStateMachine>(entity)
            .ok()
            .map(|brain| brain.state())
    }

    /// Create an agent from its archetype profile, joining `spawn.squad`
    /// when given. A failed join leaves the agent unassigned.
    pub fn spawn_agent(&mut self, spawn: AgentSpawn) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        let profile = &self.archetypes.get(spawn.archetype).profile;
        let entity = world_setup::spawn_agent(&mut self.world, id, &spawn, profile);
        self.agents.insert(id, entity);
        debug!(agent = %id, archetype = %spawn.archetype, team = spawn.team, "agent spawned");

        if let Some(squad) = spawn.squad {
            if let Err(err) = self.join_squad(id, squad) {
                warn!(agent = %id, %err, "spawned agent left unassigned");
            }
        }
        id
    }

    /// Create an empty squad.
    pub fn create_squad(&mut self, spawn: SquadSpawn) -> SquadId {
        let id = SquadId(self.next_squad_id);
        self.next_squad_id += 1;
        let tuning = FormationTuning {
            spacing: spawn.spacing.unwrap_or(self.config.formation.spacing),
            ..self.config.formation
        };
        let mut formation =
            FormationManager::with_tuning(id, spawn.shape, spawn.rows.max(1), spawn.cols.max(1), tuning);
        formation.set_anchor(spawn.anchor, DQuat::from_rotation_y(spawn.facing));
        formation.refresh(&*self.surface);
        self.squads
            .insert(id, Squad::new(formation, spawn.team, self.config.squad.speed));
        debug!(squad = %id, rows = spawn.rows, cols = spawn.cols, "squad created");
        id
    }

    fn entity(&self, agent: AgentId) -> SimResult<Entity> {
        self.agents
            .get(&agent)
            .copied()
            .ok_or(SimError::UnknownAgent(agent))
    }

    /// Reserve a slot in `squad_id`. Joining a different squad leaves the
    /// old one only once the new slot is secured. A full squad emits
    /// `SquadFull` and returns `CapacityExceeded`.
    pub fn join_squad(&mut self, agent: AgentId, squad_id: SquadId) -> SimResult<SlotCoord> {
        let entity = self.entity(agent)?;
        let squad = self
            .squads
            .get_mut(&squad_id)
            .ok_or(SimError::UnknownSquad(squad_id))?;
        let link = self
            .world
            .query_one_mut::<&mut SquadLink>(entity)
            .map_err(|_| SimError::UnknownAgent(agent))?;

        let slot = match squad.formation.add_member(agent) {
            Ok(slot) => slot,
            Err(err) => {
                if matches!(err, SimError::CapacityExceeded { .. }) {
                    self.events.push(SimEvent::SquadFull {
                        agent,
                        squad: squad_id,
                    });
                }
                return Err(err);
            }
        };

        if let Some(previous) = link.squad.filter(|&s| s != squad_id) {
            if let Some(old) = self.squads.get_mut(&previous) {
                old.formation.remove_member(agent);
            }
        }
        if link.slot != Some(slot) || link.squad != Some(squad_id) {
            *link = SquadLink {
                squad: Some(squad_id),
                slot: Some(slot),
            };
            self.events.push(SimEvent::SlotAssigned {
                agent,
                squad: squad_id,
                slot,
            });
        }
        Ok(slot)
    }

    /// Free the agent's slot. `Ok(false)` when it was not in a squad.
    pub fn leave_squad(&mut self, agent: AgentId) -> SimResult<bool> {
        let entity = self.entity(agent)?;
        let link = self
            .world
            .query_one_mut::<&mut SquadLink>(entity)
            .map_err(|_| SimError::UnknownAgent(agent))?;
        let Some(squad_id) = link.squad.take() else {
            return Ok(false);
        };
        link.slot = None;
        if let Some(squad) = self.squads.get_mut(&squad_id) {
            squad.formation.remove_member(agent);
        }
        Ok(true)
    }

    /// Move a member into a specific free slot of its squad.
    pub fn set_member_slot(&mut self, agent: AgentId, row: u16, col: u16) -> SimResult<()> {
        let entity = self.entity(agent)?;
        let link = self
            .world
            .query_one_mut::<&mut SquadLink>(entity)
            .map_err(|_| SimError::UnknownAgent(agent))?;
        let squad_id = link
            .squad
            .ok_or_else(|| SimError::Configuration(format!("{agent} is not in a squad")))?;
        let squad = self
            .squads
            .get_mut(&squad_id)
            .ok_or(SimError::UnknownSquad(squad_id))?;
        squad.formation.set_slot(agent, row, col)?;
        let slot = SlotCoord::new(row, col);
        if link.slot != Some(slot) {
            link.slot = Some(slot);
            self.events.push(SimEvent::SlotAssigned {
                agent,
                squad: squad_id,
                slot,
            });
        }
        Ok(())
    }

    /// Change a squad's grid, reassigning members in join order.
    pub fn reshape_squad(
        &mut self,
        squad_id: SquadId,
        shape: FormationShape,
        rows: u16,
        cols: u16,
    ) -> SimResult<()> {
        let squad = self
            .squads
            .get_mut(&squad_id)
            .ok_or(SimError::UnknownSquad(squad_id))?;
        let assignments = squad.formation.reshape(shape, rows, cols)?;
        squad.formation.refresh(&*self.surface);
        self.sync_slots(squad_id, &assignments);
        Ok(())
    }

    /// Pull rear members forward into holes. Returns how many moved.
    pub fn compact_squad(&mut self, squad_id: SquadId) -> SimResult<usize> {
        let squad = self
            .squads
            .get_mut(&squad_id)
            .ok_or(SimError::UnknownSquad(squad_id))?;
        let moved = squad.formation.compact();
        self.sync_slots(squad_id, &moved);
        Ok(moved.len())
    }

    /// Mirror formation-side slot changes onto the agents' links.
    fn sync_slots(&mut self, squad_id: SquadId, assignments: &[(AgentId, SlotCoord)]) {
        for &(agent, slot) in assignments {
            let Some(&entity) = self.agents.get(&agent) else {
                continue;
            };
            let Ok(link) = self.world.query_one_mut::<&mut SquadLink>(entity) else {
                continue;
            };
            if link.slot != Some(slot) {
                link.slot = Some(slot);
                self.events.push(SimEvent::SlotAssigned {
                    agent,
                    squad: squad_id,
                    slot,
                });
            }
        }
    }

    /// Remove an agent from the world, freeing its slot.
    pub fn despawn_agent(&mut self, agent: AgentId) -> SimResult<()> {
        self.leave_squad(agent)?;
        let entity = self.entity(agent)?;
        self.world
            .despawn(entity)
            .map_err(|_| SimError::UnknownAgent(agent))?;
        self.agents.remove(&agent);
        debug!(%agent, "agent despawned");
        Ok(())
    }

    /// Force a state change through the transition table.
    pub fn request_transition(&mut self, agent: AgentId, state: AgentState) -> SimResult<Transition> {
        let entity = self.entity(agent)?;
        let (archetype, brain, kin, collider) = self
            .world
            .query_one_mut::<(&Archetype, &mut AgentStateMachine, &mut Kinematics, &mut Collider)>(entity)
            .map_err(|_| SimError::UnknownAgent(agent))?;
        let profile = &self.archetypes.get(*archetype).profile;
        systems::ai::apply_transition(agent, brain, kin, collider, profile, state, &mut self.events)
    }

    /// Stun an agent for its profile's stun duration.
    pub fn apply_stun(&mut self, agent: AgentId) -> SimResult<Transition> {
        self.request_transition(agent, AgentState::Stunned)
    }

    /// Knock an agent back, adding the horizontal part of `impulse` (m/s)
    /// to its velocity.
    pub fn apply_knockback(&mut self, agent: AgentId, impulse: DVec3) -> SimResult<Transition> {
        let entity = self.entity(agent)?;
        let (archetype, brain, kin, collider) = self
            .world
            .query_one_mut::<(&Archetype, &mut AgentStateMachine, &mut Kinematics, &mut Collider)>(entity)
            .map_err(|_| SimError::UnknownAgent(agent))?;
        let profile = &self.archetypes.get(*archetype).profile;
        let transition = systems::ai::apply_transition(
            agent,
            brain,
            kin,
            collider,
            profile,
            AgentState::Knockback,
            &mut self.events,
        )?;
        kin.velocity += planar(impulse);
        Ok(transition)
    }

    /// Hand every agent's current transform to `sink`, in id order.
    pub fn publish_transforms(&self, sink: &mut dyn TransformSink) {
        for (&agent, &entity) in &self.agents {
            if let Ok(kin) = self.world.get::<&Kinematics>(entity) {
                sink.publish(agent, Transform::from_yaw(kin.position, kin.heading));
            }
        }
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    /// Apply a single squad command and broadcast it on the bus.
    fn handle_command(&mut self, command: SquadCommand) {
        let Some(squad) = self.squads.get_mut(&command.squad_id) else {
            warn!(squad = %command.squad_id, kind = ?command.kind, "command for unknown squad dropped");
            return;
        };
        if matches!(command.kind, CommandKind::Move | CommandKind::Attack) && command.target.is_none() {
            warn!(squad = %command.squad_id, kind = ?command.kind, "order without a target dropped");
            return;
        }
        squad.issue(&command);
        self.events.push(SimEvent::OrderIssued {
            squad: command.squad_id,
            kind: command.kind,
        });
        self.command_bus.publish(&command);
    }

    /// Run all systems in order.
    fn run_systems(&mut self) {
        let dt = self.config.dt;
        // 1. Squad anchors + formation slots
        systems::squads::run(&mut self.squads, &*self.surface, &self.config.squad, dt);
        // 2. Spatial index + perception snapshot (barrier for all queries)
        systems::perception::rebuild(&self.world, &mut self.spatial, &mut self.perception);
        // 3. State machines
        systems::ai::run(
            &mut self.world,
            &self.archetypes,
            &self.squads,
            &mut self.perception,
            &self.spatial,
            &mut self.rng,
            dt,
            &mut self.strikes,
            &mut self.events,
        );
        // 4. Steering + integration
        let around = Surroundings {
            spatial: &self.spatial,
            surface: &*self.surface,
            obstacles: &*self.obstacles,
            neighbor_radius: self.config.spatial.neighbor_radius,
            ground_snap_distance: self.config.formation.ground_snap_distance,
        };
        systems::steering::run(
            &mut self.world,
            &self.archetypes,
            &self.squads,
            &mut self.perception,
            &around,
            &self.config.steering,
            &mut self.steering_buffers,
            &mut self.rng,
            dt,
        );
        // 5. Deferred damage and knockback
        systems::combat::run(
            &mut self.world,
            &self.archetypes,
            &self.agents,
            &mut self.strikes,
            &mut self.events,
        );
        // 6. Casualties leave their formations
        systems::cleanup::run(&mut self.world, &mut self.squads);
    }
}
