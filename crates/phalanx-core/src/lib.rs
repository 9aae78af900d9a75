//! Core types and definitions for the PHALANX squad simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! ids, components, commands, state snapshots, events, errors and constants.
//! It has no dependency on the ECS or any runtime framework.

pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod error;
pub mod events;
pub mod state;
pub mod types;

pub use error::{SimError, SimResult};

#[cfg(test)]
mod tests;
