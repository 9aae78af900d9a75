//! Simulation engine for PHALANX.
//!
//! Owns the hecs ECS world, runs the per-tick systems at a fixed step,
//! and produces `SimSnapshot`s for whatever hosts it.

pub mod config;
pub mod engine;
pub mod sink;
pub mod systems;
pub mod world_setup;

pub use phalanx_core as core;
pub use config::SimConfig;
pub use engine::SimulationEngine;
pub use sink::TransformSink;
pub use world_setup::{AgentSpawn, SquadSpawn};

#[cfg(test)]
mod tests;
