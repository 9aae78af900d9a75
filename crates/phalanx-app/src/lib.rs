//! PHALANX headless runner.
//!
//! Wires the simulation crates into a fixed-rate loop thread, fed by a
//! command channel and publishing the latest snapshot for polling.

pub mod game_loop;
pub mod scenario;
pub mod state;

pub use phalanx_core as core;
