//! ECS systems that operate on the simulation world each tick.
//!
//! Systems are plain functions over `&mut World` (or `&World` for read-only)
//! plus whatever engine state they need, passed explicitly. They run in the
//! order listed in `SimulationEngine::run_systems`.

pub mod ai;
pub mod cleanup;
pub mod combat;
pub mod perception;
pub mod snapshot;
pub mod squads;
pub mod steering;
