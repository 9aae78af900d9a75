//! Squad-level coordination for PHALANX.
//!
//! - [`formation`]: slot grid, anchor transform, cached slot positions.
//! - [`squad`]: orders, waypoints and anchor travel.
//! - [`bus`]: copy-then-iterate event fan-out used for squad commands.

pub mod bus;
pub mod formation;
pub mod squad;

pub use bus::{BusRequests, EventBus, SubscriptionId};
pub use formation::{FormationManager, FormationTuning};
pub use squad::Squad;

#[cfg(test)]
mod tests;
