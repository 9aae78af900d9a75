//! Squad anchor travel and formation slot refresh.

use std::collections::BTreeMap;

use phalanx_core::types::SquadId;
use phalanx_spatial::SurfaceQuery;
use phalanx_squad::Squad;

use crate::config::SquadTuning;

/// Move every anchor along its order, then recompute slot positions for
/// the formations whose anchor moved past the epsilons.
pub fn run(
    squads: &mut BTreeMap<SquadId, Squad>,
    surface: &dyn SurfaceQuery,
    tuning: &SquadTuning,
    dt: f64,
) {
    for squad in squads.values_mut() {
        squad.advance(dt, tuning.waypoint_reached_distance);
        squad.formation.refresh(surface);
    }
}
