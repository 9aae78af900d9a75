//! SpatialIndex: uniform-grid bucketing of agent positions on the XZ plane.

use phalanx_core::types::{AgentId, DVec3};

/// Uniform grid over the XZ plane. Rebuilt from scratch every tick.
///
/// Positions outside the grid are clamped into the nearest boundary cell
/// rather than rejected, so queries over-approximate near the edges.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    /// World X/Z of the minimum corner (Y ignored).
    origin: DVec3,
    cell_size: f64,
    /// Cells along X.
    width: u32,
    /// Cells along Z.
    height: u32,
    /// Agent ids per cell, row-major (z * width + x).
    cells: Vec<Vec<AgentId>>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(origin: DVec3, cell_size: f64, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            origin,
            cell_size: if cell_size > 0.0 { cell_size } else { 1.0 },
            width,
            height,
            cells: vec![Vec::new(); width as usize * height as usize],
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of inserted agents.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Empty every cell. Cell allocations are kept for the next rebuild.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.len = 0;
    }

    /// Grid cell `(x, z)` holding `position`, clamped to the grid.
    pub fn cell_of(&self, position: DVec3) -> (u32, u32) {
        let cx = ((position.x - self.origin.x) / self.cell_size).floor() as i64;
        let cz = ((position.z - self.origin.z) / self.cell_size).floor() as i64;
        (
            cx.clamp(0, self.width as i64 - 1) as u32,
            cz.clamp(0, self.height as i64 - 1) as u32,
        )
    }

    pub fn insert(&mut self, agent: AgentId, position: DVec3) {
        let (cx, cz) = self.cell_of(position);
        let idx = self.cell_index(cx, cz);
        self.cells[idx].push(agent);
        self.len += 1;
    }

    /// Every agent in cells within `ceil(radius / cell_size)` of the point's
    /// cell. A superset of the agents inside the circle.
    pub fn query(&self, point: DVec3, radius: f64) -> Vec<AgentId> {
        let mut out = Vec::new();
        self.query_into(point, radius, &mut out);
        out
    }

    /// Allocation-free variant of [`SpatialIndex::query`]; appends to `out`.
    pub fn query_into(&self, point: DVec3, radius: f64, out: &mut Vec<AgentId>) {
        if self.len == 0 {
            return;
        }
        // Huge or infinite radii cover the whole grid; clamp before adding.
        let span = self.width.max(self.height) as i64;
        let reach = ((radius.max(0.0) / self.cell_size).ceil() as i64).min(span);
        let (cx, cz) = self.cell_of(point);
        let (cx, cz) = (cx as i64, cz as i64);

        let x0 = (cx - reach).max(0);
        let x1 = (cx + reach).min(self.width as i64 - 1);
        let z0 = (cz - reach).max(0);
        let z1 = (cz + reach).min(self.height as i64 - 1);

        for z in z0..=z1 {
            for x in x0..=x1 {
                out.extend_from_slice(&self.cells[self.cell_index(x as u32, z as u32)]);
            }
        }
    }

    fn cell_index(&self, cx: u32, cz: u32) -> usize {
        cz as usize * self.width as usize + cx as usize
    }
}
