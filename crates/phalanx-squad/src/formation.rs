//! Formation slot bookkeeping for one squad.
//!
//! A formation is a `rows × cols` grid of slots laid out around the squad
//! anchor. Slots are addressed row-major (`index = row * cols + col`); row 0
//! is the rear-most rank, at negative local Z. Each slot holds at most one
//! agent. World positions are cached and only recomputed when the anchor
//! has moved or turned by more than the configured epsilons.

use serde::{Deserialize, Serialize};
use tracing::debug;

use phalanx_core::constants::{
    FORMATION_POSITION_EPSILON, FORMATION_ROTATION_EPSILON, FORMATION_SPACING, GROUND_SNAP_DISTANCE,
};
use phalanx_core::enums::FormationShape;
use phalanx_core::error::{SimError, SimResult};
use phalanx_core::types::{AgentId, DQuat, DVec3, SlotCoord, SquadId, Transform};
use phalanx_spatial::SurfaceQuery;

/// Layout and refresh tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationTuning {
    pub spacing: f64,
    /// Anchor travel that triggers a slot recompute.
    pub position_epsilon: f64,
    /// Anchor turn (radians) that triggers a slot recompute.
    pub rotation_epsilon: f64,
    /// Vertical search range when dropping slots onto the ground.
    pub ground_snap_distance: f64,
}

impl Default for FormationTuning {
    fn default() -> Self {
        Self {
            spacing: FORMATION_SPACING,
            position_epsilon: FORMATION_POSITION_EPSILON,
            rotation_epsilon: FORMATION_ROTATION_EPSILON,
            ground_snap_distance: GROUND_SNAP_DISTANCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FormationManager {
    squad: SquadId,
    shape: FormationShape,
    rows: u16,
    cols: u16,
    spacing: f64,
    tuning: FormationTuning,
    anchor: Transform,
    /// Holder of each slot, row-major.
    occupancy: Vec<Option<AgentId>>,
    /// Members in join order.
    members: Vec<(AgentId, SlotCoord)>,
    /// Cached world positions, row-major.
    slot_positions: Vec<DVec3>,
    /// Anchor used for the cached positions; `None` forces a recompute.
    computed_for: Option<Transform>,
}

impl FormationManager {
    pub fn new(squad: SquadId, shape: FormationShape, rows: u16, cols: u16, spacing: f64) -> Self {
        let tuning = FormationTuning {
            spacing,
            ..FormationTuning::default()
        };
        Self::with_tuning(squad, shape, rows, cols, tuning)
    }

    pub fn with_tuning(
        squad: SquadId,
        shape: FormationShape,
        rows: u16,
        cols: u16,
        tuning: FormationTuning,
    ) -> Self {
        let capacity = rows as usize * cols as usize;
        Self {
            squad,
            shape,
            rows,
            cols,
            spacing: tuning.spacing,
            tuning,
            anchor: Transform::default(),
            occupancy: vec![None; capacity],
            members: Vec::new(),
            slot_positions: vec![DVec3::ZERO; capacity],
            computed_for: None,
        }
    }

    pub fn squad(&self) -> SquadId {
        self.squad
    }

    pub fn shape(&self) -> FormationShape {
        self.shape
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn capacity(&self) -> usize {
        self.occupancy.len()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity()
    }

    pub fn anchor(&self) -> Transform {
        self.anchor
    }

    /// Member ids in join order.
    pub fn members(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.members.iter().map(|(id, _)| *id)
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.slot_of(agent).is_some()
    }

    pub fn slot_of(&self, agent: AgentId) -> Option<SlotCoord> {
        self.members
            .iter()
            .find(|(id, _)| *id == agent)
            .map(|(_, slot)| *slot)
    }

    /// Holder of `slot`, if any.
    pub fn occupant(&self, slot: SlotCoord) -> Option<AgentId> {
        self.index_of(slot).and_then(|i| self.occupancy[i])
    }

    /// Occupied slots in row-major order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = (SlotCoord, AgentId)> + '_ {
        self.occupancy
            .iter()
            .enumerate()
            .filter_map(|(i, holder)| holder.map(|a| (SlotCoord::from_index(i, self.cols), a)))
    }

    fn index_of(&self, slot: SlotCoord) -> Option<usize> {
        (slot.row < self.rows && slot.col < self.cols).then(|| slot.index(self.cols))
    }

    fn bounds_error(&self, slot: SlotCoord) -> SimError {
        SimError::SlotOutOfBounds {
            slot,
            rows: self.rows,
            cols: self.cols,
        }
    }

    /// Reserve the first free slot (row-major). A current member keeps its slot.
    pub fn add_member(&mut self, agent: AgentId) -> SimResult<SlotCoord> {
        if let Some(slot) = self.slot_of(agent) {
            return Ok(slot);
        }
        let Some(index) = self.occupancy.iter().position(Option::is_none) else {
            return Err(SimError::CapacityExceeded {
                squad: self.squad,
                capacity: self.capacity(),
            });
        };
        let slot = SlotCoord::from_index(index, self.cols);
        self.occupancy[index] = Some(agent);
        self.members.push((agent, slot));
        debug!(squad = %self.squad, %agent, %slot, "slot reserved");
        Ok(slot)
    }

    /// Free the agent's slot. `false` if it was not a member.
    pub fn remove_member(&mut self, agent: AgentId) -> bool {
        let Some(pos) = self.members.iter().position(|(id, _)| *id == agent) else {
            return false;
        };
        let (_, slot) = self.members.remove(pos);
        let index = slot.index(self.cols);
        self.occupancy[index] = None;
        debug!(squad = %self.squad, %agent, %slot, "slot freed");
        true
    }

    /// Move a member into a specific free slot, releasing its old one.
    pub fn set_slot(&mut self, agent: AgentId, row: u16, col: u16) -> SimResult<()> {
        let slot = SlotCoord::new(row, col);
        let index = self.index_of(slot).ok_or_else(|| self.bounds_error(slot))?;
        let member = self
            .members
            .iter()
            .position(|(id, _)| *id == agent)
            .ok_or(SimError::NotAMember {
                agent,
                squad: self.squad,
            })?;
        match self.occupancy[index] {
            Some(holder) if holder == agent => return Ok(()),
            Some(holder) => return Err(SimError::SlotOccupied { slot, holder }),
            None => {}
        }
        let old = self.members[member].1;
        self.occupancy[old.index(self.cols)] = None;
        self.occupancy[index] = Some(agent);
        self.members[member].1 = slot;
        Ok(())
    }

    /// Slot offset relative to the anchor, centred on the grid.
    pub fn local_offset(&self, slot: SlotCoord) -> DVec3 {
        let half_cols = (self.cols.max(1) - 1) as f64 / 2.0;
        let half_rows = (self.rows.max(1) - 1) as f64 / 2.0;
        DVec3::new(
            (slot.col as f64 - half_cols) * self.spacing,
            0.0,
            (slot.row as f64 - half_rows) * self.spacing,
        )
    }

    /// World position of `slot` from the current anchor, without ground
    /// projection.
    pub fn world_position(&self, slot: SlotCoord) -> SimResult<DVec3> {
        self.index_of(slot).ok_or_else(|| self.bounds_error(slot))?;
        Ok(self.anchor.transform_point(self.local_offset(slot)))
    }

    /// World position of `slot` dropped onto `surface`. Falls back to the
    /// unprojected point when the surface is out of snap range.
    pub fn world_position_on(&self, slot: SlotCoord, surface: &dyn SurfaceQuery) -> SimResult<DVec3> {
        let point = self.world_position(slot)?;
        Ok(surface
            .project_down(point, self.tuning.ground_snap_distance)
            .unwrap_or(point))
    }

    /// Cached world position from the last [`refresh`](Self::refresh).
    pub fn slot_position(&self, slot: SlotCoord) -> Option<DVec3> {
        self.index_of(slot).map(|i| self.slot_positions[i])
    }

    /// Cached world position of a member's slot.
    pub fn member_position(&self, agent: AgentId) -> Option<DVec3> {
        self.slot_of(agent).and_then(|slot| self.slot_position(slot))
    }

    pub fn set_anchor(&mut self, position: DVec3, rotation: DQuat) {
        self.anchor = Transform::new(position, rotation);
    }

    /// Mark the cached positions stale so the next refresh recomputes them,
    /// e.g. after the ground changed under a stationary anchor.
    pub fn invalidate(&mut self) {
        self.computed_for = None;
    }

    /// Whether the cached slot positions are stale.
    pub fn is_dirty(&self) -> bool {
        let Some(last) = self.computed_for else {
            return true;
        };
        let moved = last.position.distance(self.anchor.position) > self.tuning.position_epsilon;
        let turned = last.rotation.angle_between(self.anchor.rotation) > self.tuning.rotation_epsilon;
        moved || turned
    }

    /// Recompute cached slot positions if the anchor moved or turned past
    /// the epsilons. Returns whether a recompute happened.
    pub fn refresh(&mut self, surface: &dyn SurfaceQuery) -> bool {
        if !self.is_dirty() {
            return false;
        }
        for index in 0..self.slot_positions.len() {
            let slot = SlotCoord::from_index(index, self.cols);
            let point = self.anchor.transform_point(self.local_offset(slot));
            self.slot_positions[index] = surface
                .project_down(point, self.tuning.ground_snap_distance)
                .unwrap_or(point);
        }
        self.computed_for = Some(self.anchor);
        true
    }

    /// Change the grid and reassign every member, in join order, to the
    /// first slots row-major. Fails without changes if the new grid is too
    /// small. Returns the new assignments.
    pub fn reshape(
        &mut self,
        shape: FormationShape,
        rows: u16,
        cols: u16,
    ) -> SimResult<Vec<(AgentId, SlotCoord)>> {
        let capacity = rows as usize * cols as usize;
        if self.members.len() > capacity {
            return Err(SimError::CapacityExceeded {
                squad: self.squad,
                capacity,
            });
        }
        self.shape = shape;
        self.rows = rows;
        self.cols = cols;
        self.occupancy = vec![None; capacity];
        self.slot_positions = vec![DVec3::ZERO; capacity];
        self.computed_for = None;
        for (index, (agent, slot)) in self.members.iter_mut().enumerate() {
            *slot = SlotCoord::from_index(index, cols);
            self.occupancy[index] = Some(*agent);
        }
        debug!(squad = %self.squad, ?shape, rows, cols, "formation reshaped");
        Ok(self.members.clone())
    }

    /// Close gaps in the front ranks by pulling members forward from the
    /// rear. Front ranks are the highest rows. Returns the members that moved.
    pub fn compact(&mut self) -> Vec<(AgentId, SlotCoord)> {
        let count = self.members.len();
        let cols = self.cols as usize;
        // Front-first slot order: last row first, columns left to right.
        let front_first: Vec<usize> = (0..self.rows as usize)
            .rev()
            .flat_map(|row| (0..cols).map(move |col| row * cols + col))
            .collect();
        let (wanted, rest) = front_first.split_at(count.min(front_first.len()));

        let holes: Vec<usize> = wanted
            .iter()
            .copied()
            .filter(|&i| self.occupancy[i].is_none())
            .collect();
        let mut holes = holes.into_iter();
        let mut moved = Vec::new();
        // Rear-most stragglers move first.
        for &from in rest.iter().rev() {
            let Some(agent) = self.occupancy[from] else {
                continue;
            };
            let Some(to) = holes.next() else {
                break;
            };
            let slot = SlotCoord::from_index(to, self.cols);
            self.occupancy[from] = None;
            self.occupancy[to] = Some(agent);
            if let Some(entry) = self.members.iter_mut().find(|(id, _)| *id == agent) {
                entry.1 = slot;
            }
            moved.push((agent, slot));
        }
        moved
    }
}
