//! Simulation constants and default tuning parameters.
//!
//! Everything here is a default; the runtime values live in the config
//! structs and can be overridden from JSON.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 60;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

/// Wall-clock budget for one tick (milliseconds). Exceeding it only logs.
pub const FRAME_BUDGET_MS: f64 = 16.6;

// --- Spatial index ---

/// Edge length of one spatial grid cell (meters).
pub const SPATIAL_CELL_SIZE: f64 = 4.0;

/// Grid cells along X.
pub const SPATIAL_GRID_WIDTH: u32 = 128;

/// Grid cells along Z.
pub const SPATIAL_GRID_HEIGHT: u32 = 128;

/// World-space X/Z of the grid's minimum corner.
pub const SPATIAL_GRID_ORIGIN: f64 = -256.0;

// --- Agent kinematics ---

/// Default top speed (m/s).
pub const AGENT_MAX_SPEED: f64 = 4.0;

/// Default per-behavior acceleration cap (m/s²).
pub const AGENT_MAX_ACCELERATION: f64 = 12.0;

/// Default collision radius (meters).
pub const AGENT_RADIUS: f64 = 0.4;

/// Default hit points.
pub const AGENT_MAX_HEALTH: f64 = 100.0;

// --- Composition ---

/// Cap on the blended steering force.
pub const MAX_FORCE: f64 = 20.0;

/// Running-sum magnitude after which lower-priority behaviors are skipped.
pub const SIGNIFICANT_FORCE: f64 = 16.0;

/// Radius for ally/enemy neighbor collection (meters).
pub const NEIGHBOR_RADIUS: f64 = 6.0;

/// Minimum separation distance considered (avoids division by zero).
pub const STEERING_EPSILON: f64 = 1e-4;

// --- Behaviors ---

pub const SEPARATION_RADIUS: f64 = 1.2;
pub const SEPARATION_STRENGTH: f64 = 10.0;
pub const COHESION_RADIUS: f64 = 5.0;
pub const ALIGNMENT_RADIUS: f64 = 5.0;
pub const SLOWING_RADIUS: f64 = 3.0;
pub const FLEE_RADIUS: f64 = 12.0;
pub const AVOIDANCE_LOOKAHEAD: f64 = 4.0;
pub const AVOIDANCE_STRENGTH: f64 = 12.0;
pub const PATH_LOOKAHEAD: f64 = 2.0;

/// Offset below which formation keeping applies no force.
pub const FORMATION_DEADZONE: f64 = 0.1;

/// Offset above which formation keeping grows linearly.
pub const FORMATION_LINEAR_THRESHOLD: f64 = 2.0;

/// Constant pull between the deadzone and the linear threshold.
pub const FORMATION_STRENGTH: f64 = 15.0;

// --- Context steering ---

pub const CONTEXT_SECTORS: usize = 16;
pub const CONTEXT_INTEREST_FALLOFF: f64 = 1.0;
pub const CONTEXT_DANGER_FALLOFF: f64 = 4.0;

// --- Formation ---

/// Default slot spacing (meters).
pub const FORMATION_SPACING: f64 = 1.5;

/// Anchor translation that marks slot positions dirty (meters).
pub const FORMATION_POSITION_EPSILON: f64 = 0.01;

/// Anchor rotation that marks slot positions dirty (radians).
pub const FORMATION_ROTATION_EPSILON: f64 = 0.001;

/// Max downward search distance when projecting slots to the ground.
pub const GROUND_SNAP_DISTANCE: f64 = 50.0;

// --- Squad movement ---

/// Anchor travel speed (m/s). Slower than agents so members can keep up.
pub const SQUAD_SPEED: f64 = 2.5;

/// Distance at which a squad waypoint counts as reached.
pub const WAYPOINT_REACHED_DISTANCE: f64 = 0.5;

// --- Combat ---

/// Range at which an idle or moving agent engages an enemy.
pub const AGGRO_RANGE: f64 = 8.0;

/// Range beyond which an attacker gives up its target.
pub const LEASH_RANGE: f64 = 14.0;

pub const ATTACK_RANGE: f64 = 1.5;
pub const ATTACK_DAMAGE: f64 = 12.0;
pub const ATTACK_COOLDOWN_SECS: f64 = 1.0;

/// Distance to the slot under which an agent is considered arrived.
pub const ARRIVE_DISTANCE: f64 = 0.3;

/// Health fraction under which attackers roll to flee.
pub const FLEE_HEALTH_THRESHOLD: f64 = 0.25;

/// Per-tick chance to break and flee when under the threshold.
pub const FLEE_CHANCE: f64 = 0.02;

/// Hard cap on time spent fleeing before returning to Idle.
pub const MAX_FLEE_DURATION_SECS: f64 = 3.0;

pub const STUN_DURATION_SECS: f64 = 1.5;
pub const KNOCKBACK_DURATION_SECS: f64 = 0.4;

/// Fraction of incoming damage taken while Defending.
pub const DEFEND_DAMAGE_FACTOR: f64 = 0.5;

/// Speed multiplier applied while Fleeing.
pub const FLEE_SPEED_MULTIPLIER: f64 = 1.25;
