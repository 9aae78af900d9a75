#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use phalanx_core::commands::SquadCommand;
    use phalanx_core::enums::{CommandKind, FormationShape};
    use phalanx_core::error::SimError;
    use phalanx_core::types::{AgentId, DQuat, DVec3, SlotCoord, SquadId};
    use phalanx_spatial::FlatGround;

    use crate::bus::EventBus;
    use crate::formation::{FormationManager, FormationTuning};
    use crate::squad::Squad;

    const EPS: f64 = 1e-9;

    fn grid3() -> FormationManager {
        FormationManager::new(SquadId(1), FormationShape::Grid, 3, 3, 1.5)
    }

    fn assert_unique(f: &FormationManager) {
        let mut seen = HashSet::new();
        for (slot, agent) in f.occupied_slots() {
            assert!(seen.insert(slot), "slot {slot} held twice");
            assert_eq!(f.slot_of(agent), Some(slot), "occupancy and member list disagree");
        }
        assert_eq!(seen.len(), f.len());
    }

    // --- FormationManager ---

    #[test]
    fn test_add_member_fills_row_major() {
        let mut f = grid3();
        assert_eq!(f.add_member(AgentId(10)).unwrap(), SlotCoord::new(0, 0));
        assert_eq!(f.add_member(AgentId(11)).unwrap(), SlotCoord::new(0, 1));
        assert_eq!(f.add_member(AgentId(12)).unwrap(), SlotCoord::new(0, 2));
        assert_eq!(f.add_member(AgentId(13)).unwrap(), SlotCoord::new(1, 0));
        // Re-adding keeps the existing slot.
        assert_eq!(f.add_member(AgentId(11)).unwrap(), SlotCoord::new(0, 1));
        assert_eq!(f.len(), 4);
    }

    #[test]
    fn test_add_member_full_grid_reserves_nothing() {
        let mut f = FormationManager::new(SquadId(2), FormationShape::Grid, 2, 2, 1.0);
        for i in 0..4 {
            f.add_member(AgentId(i)).unwrap();
        }
        assert!(f.is_full());
        let before: Vec<_> = f.occupied_slots().collect();
        let err = f.add_member(AgentId(99)).unwrap_err();
        assert!(matches!(
            err,
            SimError::CapacityExceeded {
                squad: SquadId(2),
                capacity: 4
            }
        ));
        assert!(!f.contains(AgentId(99)));
        assert_eq!(f.occupied_slots().collect::<Vec<_>>(), before);
    }

    #[test]
    fn test_remove_member_frees_slot() {
        let mut f = grid3();
        f.add_member(AgentId(1)).unwrap();
        f.add_member(AgentId(2)).unwrap();
        assert!(f.remove_member(AgentId(1)));
        assert!(!f.remove_member(AgentId(1)));
        assert_eq!(f.occupant(SlotCoord::new(0, 0)), None);
        // Freed slot is reused first.
        assert_eq!(f.add_member(AgentId(3)).unwrap(), SlotCoord::new(0, 0));
    }

    #[test]
    fn test_set_slot_failures() {
        let mut f = grid3();
        f.add_member(AgentId(1)).unwrap();
        f.add_member(AgentId(2)).unwrap();

        assert!(matches!(
            f.set_slot(AgentId(1), 3, 0),
            Err(SimError::SlotOutOfBounds { rows: 3, cols: 3, .. })
        ));
        assert!(matches!(
            f.set_slot(AgentId(1), 0, 1),
            Err(SimError::SlotOccupied {
                holder: AgentId(2),
                ..
            })
        ));
        assert!(matches!(
            f.set_slot(AgentId(7), 2, 2),
            Err(SimError::NotAMember { agent: AgentId(7), .. })
        ));
        assert_eq!(f.slot_of(AgentId(1)), Some(SlotCoord::new(0, 0)));
    }

    #[test]
    fn test_set_slot_moves_member() {
        let mut f = grid3();
        f.add_member(AgentId(1)).unwrap();
        f.set_slot(AgentId(1), 2, 2).unwrap();
        assert_eq!(f.slot_of(AgentId(1)), Some(SlotCoord::new(2, 2)));
        assert_eq!(f.occupant(SlotCoord::new(0, 0)), None);
        assert_eq!(f.occupant(SlotCoord::new(2, 2)), Some(AgentId(1)));
        // Moving onto its own slot is fine.
        f.set_slot(AgentId(1), 2, 2).unwrap();
    }

    #[test]
    fn test_slot_uniqueness_under_random_operations() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5107);
        let mut f = FormationManager::new(SquadId(3), FormationShape::Grid, 4, 5, 1.0);
        for _ in 0..5000 {
            let agent = AgentId(rng.gen_range(0..30));
            match rng.gen_range(0..3) {
                0 => {
                    let full = f.is_full();
                    let member = f.contains(agent);
                    match f.add_member(agent) {
                        Ok(_) => assert!(member || !full),
                        Err(SimError::CapacityExceeded { .. }) => assert!(full && !member),
                        Err(other) => panic!("unexpected error {other}"),
                    }
                }
                1 => {
                    let member = f.contains(agent);
                    assert_eq!(f.remove_member(agent), member);
                }
                _ => {
                    let row = rng.gen_range(0..5);
                    let col = rng.gen_range(0..6);
                    let _ = f.set_slot(agent, row, col);
                }
            }
            assert_unique(&f);
        }
    }

    #[test]
    fn test_local_offset_centres_grid() {
        let f = grid3();
        assert_eq!(f.local_offset(SlotCoord::new(1, 1)), DVec3::ZERO);
        assert_eq!(f.local_offset(SlotCoord::new(0, 0)), DVec3::new(-1.5, 0.0, -1.5));
        assert_eq!(f.local_offset(SlotCoord::new(2, 0)), DVec3::new(-1.5, 0.0, 1.5));
    }

    #[test]
    fn test_world_position_follows_anchor() {
        let mut f = grid3();
        f.set_anchor(DVec3::new(10.0, 0.0, 0.0), DQuat::IDENTITY);
        let centre = f.world_position(SlotCoord::new(1, 1)).unwrap();
        let corner = f.world_position(SlotCoord::new(0, 0)).unwrap();
        assert!((centre - DVec3::new(10.0, 0.0, 0.0)).length() < EPS);
        assert!((corner - DVec3::new(8.5, 0.0, -1.5)).length() < EPS);
        assert!(f.world_position(SlotCoord::new(3, 3)).is_err());
    }

    #[test]
    fn test_world_position_rotates_with_anchor() {
        let mut f = grid3();
        f.set_anchor(DVec3::ZERO, DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2));
        // Local +X rotated a quarter turn about Y lands on -Z.
        let p = f.world_position(SlotCoord::new(1, 2)).unwrap();
        assert!((p - DVec3::new(0.0, 0.0, -1.5)).length() < EPS, "got {p:?}");
    }

    #[test]
    fn test_refresh_only_when_anchor_moves() {
        let mut f = grid3();
        let ground = FlatGround { height: 2.0 };
        assert!(f.refresh(&ground));
        assert!(!f.refresh(&ground));

        f.set_anchor(DVec3::new(0.005, 0.0, 0.0), DQuat::IDENTITY);
        assert!(!f.refresh(&ground), "below position epsilon");

        f.set_anchor(DVec3::new(1.0, 0.0, 0.0), DQuat::IDENTITY);
        assert!(f.refresh(&ground));
        let p = f.slot_position(SlotCoord::new(1, 1)).unwrap();
        assert!((p - DVec3::new(1.0, 2.0, 0.0)).length() < EPS, "projected onto ground: {p:?}");

        f.set_anchor(DVec3::new(1.0, 0.0, 0.0), DQuat::from_rotation_y(0.01));
        assert!(f.refresh(&ground), "rotation past epsilon");
    }

    #[test]
    fn test_tuning_from_partial_json() {
        let tuning: FormationTuning = serde_json::from_str(r#"{ "position_epsilon": 2.0 }"#).unwrap();
        assert_eq!(tuning.position_epsilon, 2.0);
        assert_eq!(tuning.spacing, FormationTuning::default().spacing);

        let mut f = FormationManager::with_tuning(SquadId(4), FormationShape::Grid, 2, 2, tuning);
        let ground = FlatGround { height: 0.0 };
        assert!(f.refresh(&ground));
        f.set_anchor(DVec3::new(1.0, 0.0, 0.0), DQuat::IDENTITY);
        assert!(!f.refresh(&ground), "1 m is inside the configured epsilon");

        let back: FormationTuning = serde_json::from_str(&serde_json::to_string(&tuning).unwrap()).unwrap();
        assert_eq!(back, tuning);
    }

    #[test]
    fn test_reshape_reassigns_in_join_order() {
        let mut f = grid3();
        for i in [5, 6, 7] {
            f.add_member(AgentId(i)).unwrap();
        }
        f.remove_member(AgentId(5));
        f.add_member(AgentId(8)).unwrap();

        let assigned = f.reshape(FormationShape::Line, 1, 4).unwrap();
        assert_eq!(
            assigned,
            vec![
                (AgentId(6), SlotCoord::new(0, 0)),
                (AgentId(7), SlotCoord::new(0, 1)),
                (AgentId(8), SlotCoord::new(0, 2)),
            ]
        );
        assert_eq!(f.dimensions(), (1, 4));
        assert_unique(&f);

        assert!(f.reshape(FormationShape::Line, 1, 2).is_err());
        assert_eq!(f.dimensions(), (1, 4), "failed reshape leaves grid untouched");
    }

    #[test]
    fn test_compact_fills_front_ranks() {
        let mut f = grid3();
        for i in 0..9 {
            f.add_member(AgentId(i)).unwrap();
        }
        // Casualties in the front rank (row 2).
        f.remove_member(AgentId(6));
        f.remove_member(AgentId(8));

        let moved = f.compact();
        assert_eq!(moved.len(), 2);
        for col in 0..3 {
            assert!(f.occupant(SlotCoord::new(2, col)).is_some(), "front rank hole at col {col}");
        }
        assert_eq!(f.occupied_slots().filter(|(s, _)| s.row == 0).count(), 1);
        assert_unique(&f);
        assert!(f.compact().is_empty(), "already compact");
    }

    // --- Squad travel ---

    #[test]
    fn test_squad_anchor_moves_and_faces_target() {
        let mut squad = Squad::new(grid3(), 0, 2.0);
        squad.issue(&SquadCommand::move_to(SquadId(1), DVec3::new(10.0, 0.0, 0.0)));
        assert_eq!(squad.order(), CommandKind::Move);

        assert!(squad.advance(1.0, 0.5));
        let anchor = squad.anchor();
        assert!((anchor.position - DVec3::new(2.0, 0.0, 0.0)).length() < EPS);
        // Local +Z now points along world +X.
        let forward = anchor.rotation * DVec3::Z;
        assert!((forward - DVec3::X).length() < 1e-6, "forward {forward:?}");

        for _ in 0..10 {
            squad.advance(1.0, 0.5);
        }
        assert!((squad.anchor().position - DVec3::new(10.0, 0.0, 0.0)).length() < EPS);
        assert!(!squad.is_travelling(0.5));
        assert!(!squad.advance(1.0, 0.5));
    }

    #[test]
    fn test_squad_follows_waypoints_in_order() {
        let mut squad = Squad::new(grid3(), 0, 1.0);
        squad.issue(&SquadCommand::move_via(
            SquadId(1),
            vec![DVec3::new(0.0, 0.0, 4.0)],
            DVec3::new(4.0, 0.0, 4.0),
        ));
        for _ in 0..3 {
            squad.advance(1.0, 0.5);
        }
        let p = squad.anchor().position;
        assert!(p.x.abs() < EPS && (p.z - 3.0).abs() < EPS, "still on first leg: {p:?}");

        for _ in 0..20 {
            squad.advance(1.0, 0.5);
        }
        assert!((squad.anchor().position - DVec3::new(4.0, 0.0, 4.0)).length() < EPS);
        assert_eq!(squad.waypoints().count(), 0);
    }

    #[test]
    fn test_stop_clears_destination() {
        let mut squad = Squad::new(grid3(), 0, 1.0);
        squad.issue(&SquadCommand::move_to(SquadId(1), DVec3::new(5.0, 0.0, 0.0)));
        squad.issue(&SquadCommand::stop(SquadId(1)));
        assert_eq!(squad.destination(), None);
        assert!(!squad.advance(1.0, 0.5));
    }

    // --- EventBus ---

    #[test]
    fn test_bus_delivers_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::<u32>::new();
        for tag in ["a", "b"] {
            let log = Arc::clone(&log);
            bus.subscribe(move |e: &u32, _| log.lock().unwrap().push(format!("{tag}{e}")));
        }
        assert_eq!(bus.publish(&7), 2);
        assert_eq!(*log.lock().unwrap(), ["a7", "b7"]);
    }

    #[test]
    fn test_bus_unsubscribe() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::<()>::new();
        let h = Arc::clone(&hits);
        let id = bus.subscribe(move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        bus.publish(&());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.publish(&()), 0);
    }

    #[test]
    fn test_bus_defers_changes_made_during_dispatch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::<u8>::new();

        let h = Arc::clone(&hits);
        let l = Arc::clone(&late);
        bus.subscribe(move |_, requests| {
            h.fetch_add(1, Ordering::SeqCst);
            let l = Arc::clone(&l);
            requests.subscribe(move |_, _| {
                l.fetch_add(1, Ordering::SeqCst);
            });
        });
        // Unsubscribes itself while being dispatched.
        let h2 = Arc::clone(&hits);
        let self_id = Arc::new(Mutex::new(None));
        let sid = Arc::clone(&self_id);
        let id = bus.subscribe(move |_, requests| {
            h2.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *sid.lock().unwrap() {
                requests.unsubscribe(id);
            }
        });
        *self_id.lock().unwrap() = Some(id);

        assert_eq!(bus.publish(&1), 2, "snapshot only covers existing subscribers");
        assert_eq!(late.load(Ordering::SeqCst), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(bus.len(), 2, "one added, one removed");

        bus.publish(&2);
        assert_eq!(late.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }
}
