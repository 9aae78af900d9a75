#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use crate::commands::SquadCommand;
    use crate::components::Health;
    use crate::enums::*;
    use crate::error::SimError;
    use crate::types::*;

    #[test]
    fn test_slot_index_is_row_major() {
        let slot = SlotCoord::new(2, 1);
        assert_eq!(slot.index(3), 7);
        assert_eq!(SlotCoord::from_index(7, 3), slot);
        assert_eq!(SlotCoord::from_index(0, 3), SlotCoord::new(0, 0));
    }

    #[test]
    fn test_formation_shape_dimensions_hold_capacity() {
        for capacity in 1..40 {
            for shape in [FormationShape::Line, FormationShape::Column, FormationShape::Grid] {
                let (rows, cols) = shape.dimensions(capacity);
                assert!(
                    rows as usize * cols as usize >= capacity,
                    "{shape:?} {rows}x{cols} cannot hold {capacity}"
                );
            }
        }
        assert_eq!(FormationShape::Grid.dimensions(9), (3, 3));
        assert_eq!(FormationShape::Grid.dimensions(10), (3, 4));
        assert_eq!(FormationShape::Line.dimensions(5), (1, 5));
    }

    #[test]
    fn test_transform_point_applies_yaw() {
        let t = Transform::from_yaw(DVec3::new(10.0, 0.0, 0.0), FRAC_PI_2);
        // +Z local becomes +X world after a quarter turn about +Y.
        let p = t.transform_point(DVec3::new(0.0, 0.0, 1.0));
        assert!((p - DVec3::new(11.0, 0.0, 0.0)).length() < 1e-9, "got {p:?}");
    }

    #[test]
    fn test_yaw_towards_matches_from_yaw() {
        let dir = DVec3::new(1.0, 5.0, 1.0);
        let yaw = Transform::yaw_towards(dir).unwrap();
        let t = Transform::from_yaw(DVec3::ZERO, yaw);
        let forward = t.transform_point(DVec3::Z);
        assert!((forward - planar(dir).normalize()).length() < 1e-9);
        assert!(Transform::yaw_towards(DVec3::Y).is_none());
    }

    #[test]
    fn test_health_fraction_clamped() {
        let mut h = Health::full(50.0);
        assert_eq!(h.fraction(), 1.0);
        h.current = -5.0;
        assert_eq!(h.fraction(), 0.0);
        assert!(h.is_depleted());
    }

    #[test]
    fn test_dead_is_only_terminal_state() {
        let terminal: Vec<_> = AgentState::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![&AgentState::Dead]);
        for (i, s) in AgentState::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn test_squad_command_json_shape() {
        let json = r#"{"squad_id":3,"kind":"Move","target":[1.0,0.0,2.0]}"#;
        let cmd: SquadCommand = serde_json::from_str(json).unwrap();
        assert_eq!(cmd, SquadCommand::move_to(SquadId(3), DVec3::new(1.0, 0.0, 2.0)));
        assert!(cmd.waypoints.is_empty());
    }

    #[test]
    fn test_error_messages_name_the_parties() {
        let err = SimError::InvalidTransition {
            from: AgentState::Dead,
            to: AgentState::Idle,
        };
        assert_eq!(err.to_string(), "illegal transition Dead -> Idle");
        let err = SimError::CapacityExceeded {
            squad: SquadId(4),
            capacity: 9,
        };
        assert_eq!(err.to_string(), "squad#4 is full (9 slots)");
    }
}
