//! Spatial queries for PHALANX.
//!
//! Uniform-grid neighbor index, ground projection and obstacle
//! ray checks. Rendering and physics engines sit behind the
//! [`SurfaceQuery`] and [`ObstacleQuery`] traits.

pub use phalanx_core as core;

pub mod grid;
pub mod obstacles;
pub mod surface;

// Re-export key types for convenience.
pub use grid::SpatialIndex;
pub use obstacles::{Obstacle, ObstacleField, ObstacleQuery, RayHit};
pub use surface::{FlatGround, HeightField, SurfaceQuery};
