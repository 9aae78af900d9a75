//! Per-tick read-only view of every agent, plus the spatial index rebuild.
//!
//! Rebuilt once per tick before any agent logic runs. Agents read each
//! other only through this snapshot, so the order in which agents are
//! updated never changes what they see.

use std::collections::HashMap;

use hecs::{Entity, World};

use phalanx_ai::{AgentStateMachine, EnemyContact};
use phalanx_core::components::{AgentTag, Collider, Kinematics, Team};
use phalanx_core::enums::AgentState;
use phalanx_core::types::{planar_distance, AgentId, DVec3};
use phalanx_spatial::SpatialIndex;
use phalanx_steering::Neighbor;

/// One agent as it stood at the start of the tick.
#[derive(Debug, Clone, Copy)]
pub struct AgentSample {
    pub id: AgentId,
    pub entity: Entity,
    pub team: u8,
    pub position: DVec3,
    pub velocity: DVec3,
    pub state: AgentState,
    /// Collider enabled; only solid agents enter the spatial index.
    pub solid: bool,
}

impl AgentSample {
    pub fn is_alive(&self) -> bool {
        !self.state.is_terminal()
    }

    fn neighbor(&self) -> Neighbor {
        Neighbor {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
        }
    }
}

#[derive(Debug, Default)]
pub struct Perception {
    /// Sorted by agent id.
    samples: Vec<AgentSample>,
    index: HashMap<AgentId, usize>,
    scratch: Vec<AgentId>,
}

impl Perception {
    pub fn samples(&self) -> &[AgentSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentSample> {
        self.index.get(&id).map(|&i| &self.samples[i])
    }

    /// Call `visit` for every living agent other than `me` within `radius`.
    fn for_each_near(
        &mut self,
        spatial: &SpatialIndex,
        me: &AgentSample,
        radius: f64,
        mut visit: impl FnMut(&AgentSample),
    ) {
        self.scratch.clear();
        spatial.query_into(me.position, radius, &mut self.scratch);
        for id in &self.scratch {
            if *id == me.id {
                continue;
            }
            let Some(&i) = self.index.get(id) else {
                continue;
            };
            let other = &self.samples[i];
            if other.is_alive() && planar_distance(me.position, other.position) <= radius {
                visit(other);
            }
        }
    }

    /// Living agents within `radius` of `me`, split by team. Clears both
    /// buffers first.
    pub fn gather(
        &mut self,
        spatial: &SpatialIndex,
        me: &AgentSample,
        radius: f64,
        allies: &mut Vec<Neighbor>,
        enemies: &mut Vec<Neighbor>,
    ) {
        allies.clear();
        enemies.clear();
        self.for_each_near(spatial, me, radius, |other| {
            if other.team == me.team {
                allies.push(other.neighbor());
            } else {
                enemies.push(other.neighbor());
            }
        });
    }

    /// Closest living enemy within `radius`. Ties go to the lower id.
    pub fn nearest_enemy(
        &mut self,
        spatial: &SpatialIndex,
        me: &AgentSample,
        radius: f64,
    ) -> Option<EnemyContact> {
        let mut best: Option<EnemyContact> = None;
        self.for_each_near(spatial, me, radius, |other| {
            if other.team == me.team {
                return;
            }
            let contact = EnemyContact {
                id: other.id,
                position: other.position,
                distance: planar_distance(me.position, other.position),
            };
            let closer = best.map_or(true, |b| {
                contact.distance < b.distance || (contact.distance == b.distance && contact.id < b.id)
            });
            if closer {
                best = Some(contact);
            }
        });
        best
    }
}

/// Refill the spatial index and the snapshot from the world. Dead agents
/// and disabled colliders stay out of the index but keep a sample.
pub fn rebuild(world: &World, spatial: &mut SpatialIndex, perception: &mut Perception) {
    spatial.clear();
    perception.samples.clear();
    perception.index.clear();

    let mut query = world.query::<(&AgentTag, &Team, &Kinematics, &Collider, &AgentStateMachine)>();
    for (entity, (tag, team, kin, collider, brain)) in query.iter() {
        perception.samples.push(AgentSample {
            id: tag.0,
            entity,
            team: team.0,
            position: kin.position,
            velocity: kin.velocity,
            state: brain.state(),
            solid: collider.enabled,
        });
    }

    perception.samples.sort_by_key(|s| s.id);
    for (i, sample) in perception.samples.iter().enumerate() {
        perception.index.insert(sample.id, i);
        if sample.solid && sample.is_alive() {
            spatial.insert(sample.id, sample.position);
        }
    }
}
