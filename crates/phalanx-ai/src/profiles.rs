//! Archetype profiles and the named behavior library.
//!
//! Profiles reference behaviors by name. Names are resolved once, when the
//! [`Archetypes`] table is built; unknown names are logged as configuration
//! errors and dropped so the rest of the profile keeps working.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::error;

use phalanx_core::constants::*;
use phalanx_core::enums::{AgentState, Archetype, ComposerMode};
use phalanx_core::error::SimError;
use phalanx_steering::behaviors::{
    Alignment, Arrival, Cohesion, Flee, FormationKeep, ObstacleAvoidance, PathFollowing, Separation,
    TargetSource,
};
use phalanx_steering::{Behavior, BehaviorSet, BehaviorSlot};

/// Attack and engagement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatTuning {
    pub attack_range: f64,
    pub damage: f64,
    pub cooldown_secs: f64,
    /// Impulse (m/s) applied to the victim; zero disables knockback.
    pub knockback: f64,
    /// Enemies closer than this pull Idle/Moving agents into Attacking.
    pub aggro_range: f64,
    /// Attacking agents give up once the nearest enemy is beyond this.
    pub leash_range: f64,
    /// Fraction of incoming damage taken while Defending.
    pub defend_damage_factor: f64,
}

impl Default for CombatTuning {
    fn default() -> Self {
        Self {
            attack_range: ATTACK_RANGE,
            damage: ATTACK_DAMAGE,
            cooldown_secs: ATTACK_COOLDOWN_SECS,
            knockback: 0.0,
            aggro_range: AGGRO_RANGE,
            leash_range: LEASH_RANGE,
            defend_damage_factor: DEFEND_DAMAGE_FACTOR,
        }
    }
}

/// Behavior names per state. Stunned, Knockback and Dead never steer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateBehaviors {
    pub idle: Vec<String>,
    pub moving: Vec<String>,
    pub attacking: Vec<String>,
    pub defending: Vec<String>,
    pub fleeing: Vec<String>,
}

impl StateBehaviors {
    pub fn names(&self, state: AgentState) -> &[String] {
        match state {
            AgentState::Idle => &self.idle,
            AgentState::Moving => &self.moving,
            AgentState::Attacking => &self.attacking,
            AgentState::Defending => &self.defending,
            AgentState::Fleeing => &self.fleeing,
            AgentState::Stunned | AgentState::Knockback | AgentState::Dead => &[],
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Everything that differs between kinds of soldier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeProfile {
    pub archetype: Archetype,
    pub max_speed: f64,
    pub max_acceleration: f64,
    pub radius: f64,
    pub max_health: f64,
    pub composer: ComposerMode,
    #[serde(default)]
    pub combat: CombatTuning,
    /// Slot distance under which an agent counts as in position.
    pub arrive_distance: f64,
    /// Health fraction below which an attacking agent may break and run.
    pub flee_health_threshold: f64,
    /// Per-tick probability of breaking while under the threshold.
    pub flee_chance: f64,
    pub max_flee_duration_secs: f64,
    pub flee_speed_multiplier: f64,
    pub stun_duration_secs: f64,
    pub knockback_duration_secs: f64,
    #[serde(default)]
    pub behaviors: StateBehaviors,
}

impl ArchetypeProfile {
    /// Shared defaults; archetypes override what they need.
    fn base(archetype: Archetype, composer: ComposerMode) -> Self {
        Self {
            archetype,
            max_speed: AGENT_MAX_SPEED,
            max_acceleration: AGENT_MAX_ACCELERATION,
            radius: AGENT_RADIUS,
            max_health: AGENT_MAX_HEALTH,
            composer,
            combat: CombatTuning::default(),
            arrive_distance: ARRIVE_DISTANCE,
            flee_health_threshold: FLEE_HEALTH_THRESHOLD,
            flee_chance: FLEE_CHANCE,
            max_flee_duration_secs: MAX_FLEE_DURATION_SECS,
            flee_speed_multiplier: FLEE_SPEED_MULTIPLIER,
            stun_duration_secs: STUN_DURATION_SECS,
            knockback_duration_secs: KNOCKBACK_DURATION_SECS,
            behaviors: StateBehaviors::default(),
        }
    }

    /// Built-in profile for an archetype.
    pub fn builtin(archetype: Archetype) -> Self {
        match archetype {
            Archetype::Infantry => Self {
                behaviors: StateBehaviors {
                    idle: names(&["arrive_slot"]),
                    moving: names(&["avoid_obstacles", "separation", "arrive_slot", "cohesion"]),
                    attacking: names(&["separation", "approach"]),
                    defending: names(&["keep_formation", "separation"]),
                    fleeing: names(&["avoid_obstacles", "flee"]),
                },
                ..Self::base(archetype, ComposerMode::PriorityBlend)
            },
            // Slow, heavy line holders.
            Archetype::Pikeman => Self {
                max_speed: AGENT_MAX_SPEED * 0.75,
                max_health: AGENT_MAX_HEALTH * 1.3,
                combat: CombatTuning {
                    attack_range: ATTACK_RANGE * 2.0,
                    knockback: 3.0,
                    ..CombatTuning::default()
                },
                flee_chance: FLEE_CHANCE * 0.5,
                behaviors: StateBehaviors {
                    idle: names(&["arrive_slot"]),
                    moving: names(&["avoid_obstacles", "arrive_slot", "separation", "cohesion"]),
                    attacking: names(&["keep_formation", "approach", "separation"]),
                    defending: names(&["keep_formation", "separation"]),
                    fleeing: names(&["flee", "avoid_obstacles"]),
                },
                ..Self::base(archetype, ComposerMode::ExclusiveSelect)
            },
            // Fast, fragile, loose order.
            Archetype::Skirmisher => Self {
                max_speed: AGENT_MAX_SPEED * 1.3,
                max_health: AGENT_MAX_HEALTH * 0.7,
                combat: CombatTuning {
                    damage: ATTACK_DAMAGE * 0.75,
                    aggro_range: AGGRO_RANGE * 1.25,
                    ..CombatTuning::default()
                },
                flee_health_threshold: FLEE_HEALTH_THRESHOLD * 1.5,
                behaviors: StateBehaviors {
                    idle: names(&["arrive_slot"]),
                    moving: names(&["follow_path", "arrive_slot", "separation", "avoid_obstacles", "cohesion"]),
                    attacking: names(&["approach", "separation", "avoid_obstacles"]),
                    defending: names(&["keep_formation", "separation"]),
                    fleeing: names(&["flee", "avoid_obstacles", "separation"]),
                },
                ..Self::base(archetype, ComposerMode::ContextSteering)
            },
        }
    }
}

/// Named behavior registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorLibrary {
    slots: BTreeMap<String, BehaviorSlot>,
}

impl BehaviorLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a slot under its own name, replacing any previous entry.
    pub fn insert(&mut self, slot: BehaviorSlot) {
        self.slots.insert(slot.name.clone(), slot);
    }

    pub fn get(&self, name: &str) -> Option<&BehaviorSlot> {
        self.slots.get(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Standard behaviors referenced by the built-in profiles.
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        let entries = [
            BehaviorSlot::new("avoid_obstacles", Behavior::ObstacleAvoidance(ObstacleAvoidance::default()))
                .priority(30),
            BehaviorSlot::new("flee", Behavior::Flee(Flee::default())).priority(25),
            BehaviorSlot::new("separation", Behavior::Separation(Separation::default())).priority(20),
            BehaviorSlot::new("keep_formation", Behavior::FormationKeep(FormationKeep::default()))
                .priority(15),
            BehaviorSlot::new(
                "approach",
                Behavior::Arrival(Arrival {
                    source: TargetSource::Target,
                    slowing_radius: ATTACK_RANGE,
                }),
            )
            .priority(10),
            BehaviorSlot::new("follow_path", Behavior::PathFollowing(PathFollowing::default())).priority(8),
            BehaviorSlot::new("arrive_slot", Behavior::Arrival(Arrival::to_slot())).priority(5),
            // Light enough that arrival still wins at the slot.
            BehaviorSlot::new("cohesion", Behavior::Cohesion(Cohesion::default()))
                .priority(2)
                .weight(0.1),
            BehaviorSlot::new("alignment", Behavior::Alignment(Alignment::default()))
                .priority(1)
                .weight(0.5),
        ];
        for slot in entries {
            lib.insert(slot);
        }
        lib
    }

    /// Build a set from names. Unknown names are logged and skipped.
    pub fn resolve(&self, archetype: Archetype, state: AgentState, names: &[String]) -> BehaviorSet {
        let mut slots = Vec::with_capacity(names.len());
        for name in names {
            match self.slots.get(name) {
                Some(slot) => slots.push(slot.clone()),
                None => {
                    let err = SimError::Configuration(format!("unknown behavior `{name}`"));
                    error!(%archetype, %state, %err, "behavior skipped");
                }
            }
        }
        BehaviorSet::new(slots)
    }
}

/// A profile with its per-state behavior sets resolved.
#[derive(Debug, Clone)]
pub struct ResolvedArchetype {
    pub profile: ArchetypeProfile,
    sets: [BehaviorSet; 8],
}

impl ResolvedArchetype {
    pub fn resolve(profile: ArchetypeProfile, library: &BehaviorLibrary) -> Self {
        let sets = AgentState::ALL.map(|state| {
            library.resolve(profile.archetype, state, profile.behaviors.names(state))
        });
        Self { profile, sets }
    }

    /// Behavior set active in `state`.
    pub fn behaviors(&self, state: AgentState) -> &BehaviorSet {
        &self.sets[state.index()]
    }
}

/// Resolved profiles for every archetype.
#[derive(Debug, Clone)]
pub struct Archetypes {
    infantry: ResolvedArchetype,
    pikeman: ResolvedArchetype,
    skirmisher: ResolvedArchetype,
}

impl Archetypes {
    /// Resolve `overrides` against `library`; archetypes without an override
    /// use their built-in profile.
    pub fn new(library: &BehaviorLibrary, overrides: &[ArchetypeProfile]) -> Self {
        let pick = |archetype: Archetype| {
            let profile = overrides
                .iter()
                .rev()
                .find(|p| p.archetype == archetype)
                .cloned()
                .unwrap_or_else(|| ArchetypeProfile::builtin(archetype));
            ResolvedArchetype::resolve(profile, library)
        };
        Self {
            infantry: pick(Archetype::Infantry),
            pikeman: pick(Archetype::Pikeman),
            skirmisher: pick(Archetype::Skirmisher),
        }
    }

    pub fn builtin() -> Self {
        Self::new(&BehaviorLibrary::builtin(), &[])
    }

    pub fn get(&self, archetype: Archetype) -> &ResolvedArchetype {
        match archetype {
            Archetype::Infantry => &self.infantry,
            Archetype::Pikeman => &self.pikeman,
            Archetype::Skirmisher => &self.skirmisher,
        }
    }
}

impl Default for Archetypes {
    fn default() -> Self {
        Self::builtin()
    }
}
