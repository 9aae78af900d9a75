//! Engine configuration.
//!
//! Every field has a default taken from `phalanx_core::constants`, so a
//! JSON file only needs the values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::error;

use phalanx_ai::{ArchetypeProfile, Archetypes, BehaviorLibrary};
use phalanx_core::constants::*;
use phalanx_core::error::{SimError, SimResult};
use phalanx_core::types::DVec3;
use phalanx_spatial::SpatialIndex;
use phalanx_squad::FormationTuning;
use phalanx_steering::{BehaviorSlot, SteeringTuning};

/// Neighbor grid layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    pub origin_x: f64,
    pub origin_z: f64,
    pub cell_size: f64,
    pub width: u32,
    pub height: u32,
    /// Radius of the ally/enemy lists handed to steering.
    pub neighbor_radius: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            origin_x: SPATIAL_GRID_ORIGIN,
            origin_z: SPATIAL_GRID_ORIGIN,
            cell_size: SPATIAL_CELL_SIZE,
            width: SPATIAL_GRID_WIDTH,
            height: SPATIAL_GRID_HEIGHT,
            neighbor_radius: NEIGHBOR_RADIUS,
        }
    }
}

impl SpatialConfig {
    pub fn build_index(&self) -> SpatialIndex {
        SpatialIndex::new(
            DVec3::new(self.origin_x, 0.0, self.origin_z),
            self.cell_size,
            self.width,
            self.height,
        )
    }
}

/// Anchor travel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquadTuning {
    /// Anchor speed (m/s).
    pub speed: f64,
    pub waypoint_reached_distance: f64,
}

impl Default for SquadTuning {
    fn default() -> Self {
        Self {
            speed: SQUAD_SPEED,
            waypoint_reached_distance: WAYPOINT_REACHED_DISTANCE,
        }
    }
}

/// Configuration for starting a new simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same simulation.
    pub seed: u64,
    /// Fixed step in seconds.
    pub dt: f64,
    /// Tick duration (ms) above which a warning is logged.
    pub frame_budget_ms: f64,
    pub spatial: SpatialConfig,
    pub steering: SteeringTuning,
    pub formation: FormationTuning,
    pub squad: SquadTuning,
    /// Extra or replacement behaviors, merged over the built-in library.
    pub behaviors: Vec<BehaviorSlot>,
    /// Archetype overrides; archetypes not listed keep their built-in profile.
    pub profiles: Vec<ArchetypeProfile>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            dt: DT,
            frame_budget_ms: FRAME_BUDGET_MS,
            spatial: SpatialConfig::default(),
            steering: SteeringTuning::default(),
            formation: FormationTuning::default(),
            squad: SquadTuning::default(),
            behaviors: Vec::new(),
            profiles: Vec::new(),
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl SimConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// First invalid value, if any.
    pub fn validate(&self) -> SimResult<()> {
        match self.clone().repair().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Replace invalid values with their defaults, logging each one.
    pub fn sanitized(mut self) -> Self {
        for err in self.repair() {
            error!(%err, "invalid setting replaced by default");
        }
        self
    }

    /// Reset every invalid field to its default and report what changed.
    fn repair(&mut self) -> Vec<SimError> {
        let defaults = Self::default();
        let mut problems = Vec::new();
        let mut check = |ok: bool, what: &str| {
            if !ok {
                problems.push(SimError::Configuration(what.to_string()));
            }
            ok
        };

        if !check(positive(self.dt), "dt must be positive") {
            self.dt = defaults.dt;
        }
        if !check(positive(self.frame_budget_ms), "frame_budget_ms must be positive") {
            self.frame_budget_ms = defaults.frame_budget_ms;
        }
        if !check(positive(self.spatial.cell_size), "spatial.cell_size must be positive") {
            self.spatial.cell_size = defaults.spatial.cell_size;
        }
        if !check(
            self.spatial.width > 0 && self.spatial.height > 0,
            "spatial grid needs at least one cell",
        ) {
            self.spatial.width = defaults.spatial.width;
            self.spatial.height = defaults.spatial.height;
        }
        if !check(
            non_negative(self.spatial.neighbor_radius),
            "spatial.neighbor_radius must be non-negative",
        ) {
            self.spatial.neighbor_radius = defaults.spatial.neighbor_radius;
        }
        if !check(non_negative(self.steering.max_force), "steering.max_force must be non-negative") {
            self.steering.max_force = defaults.steering.max_force;
        }
        if !check(
            (1..=phalanx_steering::context_map::MAX_SECTORS).contains(&self.steering.context_sectors),
            "steering.context_sectors out of range",
        ) {
            self.steering.context_sectors = defaults.steering.context_sectors;
        }
        if !check(positive(self.formation.spacing), "formation.spacing must be positive") {
            self.formation.spacing = defaults.formation.spacing;
        }
        if !check(non_negative(self.squad.speed), "squad.speed must be non-negative") {
            self.squad.speed = defaults.squad.speed;
        }
        if !check(
            non_negative(self.squad.waypoint_reached_distance),
            "squad.waypoint_reached_distance must be non-negative",
        ) {
            self.squad.waypoint_reached_distance = defaults.squad.waypoint_reached_distance;
        }
        problems
    }

    /// Built-in behaviors with the configured ones merged over them.
    pub fn behavior_library(&self) -> BehaviorLibrary {
        let mut library = BehaviorLibrary::builtin();
        for slot in &self.behaviors {
            library.insert(slot.clone());
        }
        library
    }

    /// Archetype table with every behavior name resolved.
    pub fn archetypes(&self) -> Archetypes {
        Archetypes::new(&self.behavior_library(), &self.profiles)
    }
}
