//! Steering for PHALANX agents.
//!
//! | Module          | Contents                                                      |
//! |-----------------|---------------------------------------------------------------|
//! | [`context`]     | `SteeringContext<'a>`: per-agent, per-tick read-only input    |
//! | [`behaviors`]   | force/desire computators and the `Behavior` tagged enum       |
//! | [`slot`]        | `BehaviorSlot` tunables and the priority-sorted `BehaviorSet` |
//! | [`composer`]    | `BehaviorComposer` trait, priority blend, exclusive select    |
//! | [`context_map`] | interest/danger sector voting                                 |
//!
//! Behaviors never mutate anything. A behavior that fails or produces a
//! non-finite vector contributes nothing for that tick.

pub mod behaviors;
pub mod composer;
pub mod context;
pub mod context_map;
pub mod error;
pub mod slot;


pub use behaviors::{Behavior, SteeringBehavior, TargetSource};
pub use composer::{BehaviorComposer, Composer, ExclusiveSelect, PriorityBlend, SteeringTuning};
pub use context::{Neighbor, SquadState, SteeringContext};
pub use context_map::{ContextDecision, ContextMap, ContextSteering};
pub use error::{SteeringError, SteeringResult};
pub use slot::{BehaviorSet, BehaviorSlot};
