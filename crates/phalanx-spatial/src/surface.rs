//! Ground surface queries used to drop formation slots onto terrain.

use serde::{Deserialize, Serialize};
use tracing::warn;

use phalanx_core::types::DVec3;

/// Nearest-surface lookup supplied by the host engine.
pub trait SurfaceQuery {
    /// Ground point vertically below (or above) `point`, if the surface lies
    /// within `max_distance` of it.
    fn project_down(&self, point: DVec3, max_distance: f64) -> Option<DVec3>;
}

/// Infinite horizontal plane.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FlatGround {
    pub height: f64,
}

impl SurfaceQuery for FlatGround {
    fn project_down(&self, point: DVec3, max_distance: f64) -> Option<DVec3> {
        if (point.y - self.height).abs() > max_distance {
            return None;
        }
        Some(DVec3::new(point.x, self.height, point.z))
    }
}

/// Regular heightmap over the XZ plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    /// World X of column 0.
    pub origin_x: f64,
    /// World Z of row 0.
    pub origin_z: f64,
    /// Meters per cell.
    pub cell_size: f64,
    /// Samples along X.
    pub width: u32,
    /// Samples along Z.
    pub height: u32,
    /// Heights in meters, row-major (row = Z, column = X).
    pub heights: Vec<f32>,
}

impl HeightField {
    pub fn new(
        origin_x: f64,
        origin_z: f64,
        cell_size: f64,
        width: u32,
        height: u32,
        heights: Vec<f32>,
    ) -> Self {
        let expected = width as usize * height as usize;
        if heights.len() != expected {
            // Missing samples read as zero height.
            warn!(expected, actual = heights.len(), "height field sample count mismatch");
        }
        Self {
            origin_x,
            origin_z,
            cell_size,
            width,
            height,
            heights,
        }
    }

    /// Height at an arbitrary XZ point with bilinear interpolation.
    /// Returns None outside the field.
    pub fn elevation_at(&self, x: f64, z: f64) -> Option<f64> {
        if self.width == 0 || self.height == 0 || self.cell_size <= 0.0 {
            return None;
        }
        let col = (x - self.origin_x) / self.cell_size;
        let row = (z - self.origin_z) / self.cell_size;
        let max_col = (self.width - 1) as f64;
        let max_row = (self.height - 1) as f64;
        if !(0.0..=max_col).contains(&col) || !(0.0..=max_row).contains(&row) {
            return None;
        }
        Some(self.bilinear(row, col))
    }

    fn raw(&self, row: usize, col: usize) -> f64 {
        self.heights
            .get(row * self.width as usize + col)
            .copied()
            .unwrap_or(0.0) as f64
    }

    fn bilinear(&self, row: f64, col: f64) -> f64 {
        let r0 = row.floor() as usize;
        let c0 = col.floor() as usize;
        let r1 = (r0 + 1).min(self.height as usize - 1);
        let c1 = (c0 + 1).min(self.width as usize - 1);

        let fr = row - r0 as f64;
        let fc = col - c0 as f64;

        let top = self.raw(r0, c0) * (1.0 - fc) + self.raw(r0, c1) * fc;
        let bot = self.raw(r1, c0) * (1.0 - fc) + self.raw(r1, c1) * fc;
        top * (1.0 - fr) + bot * fr
    }
}

impl SurfaceQuery for HeightField {
    fn project_down(&self, point: DVec3, max_distance: f64) -> Option<DVec3> {
        let ground = self.elevation_at(point.x, point.z)?;
        if (point.y - ground).abs() > max_distance {
            return None;
        }
        Some(DVec3::new(point.x, ground, point.z))
    }
}
