//! Post-restore verification.

use std::collections::BTreeSet;

use arx_snapshot::{BuildingState, LiveRepositories};
use arx_store::SnapshotMetadata;
use tracing::warn;

use crate::error::Result;
use crate::types::ValidationResult;

/// Recount the live state of `building_id` and check it against the
/// snapshot's recorded counts and the entities just restored.
pub fn validate(
    live: &LiveRepositories,
    building_id: &str,
    expected: &SnapshotMetadata,
    restored: &BuildingState,
) -> Result<ValidationResult> {
    let floors = live.floors.floors_by_building(building_id)?;
    let rooms = live.rooms.rooms_by_building(building_id)?;
    let equipment = live.equipment.equipment_by_building(building_id)?;

    let mut result = ValidationResult {
        valid: true,
        floor_count: floors.len() as u64,
        room_count: rooms.len() as u64,
        equipment_count: equipment.len() as u64,
        ..ValidationResult::default()
    };

    for (what, actual, wanted) in [
        ("floor", result.floor_count, expected.floor_count),
        ("room", result.room_count, expected.room_count),
        ("equipment", result.equipment_count, expected.equipment_count),
    ] {
        if actual != wanted {
            result
                .warnings
                .push(format!("{what} count is {actual}, snapshot recorded {wanted}"));
        }
    }

    if let Some(building) = &restored.building {
        if building.id != building_id {
            result
                .errors
                .push(format!("building record has id {}", building.id));
        }
    }
    let owners = restored
        .floors
        .iter()
        .map(|f| ("floor", f.id.as_str(), f.building_id.as_str()))
        .chain(
            restored
                .rooms
                .iter()
                .map(|r| ("room", r.id.as_str(), r.building_id.as_str())),
        )
        .chain(
            restored
                .equipment
                .iter()
                .map(|e| ("equipment", e.id.as_str(), e.building_id.as_str())),
        );
    for (what, id, owner) in owners {
        if owner != building_id {
            result
                .errors
                .push(format!("{what} {id} belongs to building {owner}"));
        }
    }

    let floor_ids: BTreeSet<&str> = floors.iter().map(|f| f.id.as_str()).collect();
    for room in &rooms {
        if !floor_ids.contains(room.floor_id.as_str()) {
            result
                .warnings
                .push(format!("room {} references missing floor {}", room.id, room.floor_id));
        }
    }
    for item in &equipment {
        if let Some(floor) = item.floor_id.as_deref() {
            if !floor_ids.contains(floor) {
                result
                    .warnings
                    .push(format!("equipment {} references missing floor {floor}", item.id));
            }
        }
    }

    for w in &result.warnings {
        warn!(building_id, warning = %w, "rollback validation");
    }
    result.valid = result.errors.is_empty();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arx_snapshot::InMemoryLiveStore;
    use arx_types::{Building, Equipment, Floor, Room};
    use std::sync::Arc;

    fn live_with(state: &BuildingState) -> LiveRepositories {
        let live = LiveRepositories::from_backend(Arc::new(InMemoryLiveStore::new()));
        if let Some(b) = &state.building {
            live.buildings.create_building(b).unwrap();
        }
        for f in &state.floors {
            live.floors.create_floor(f).unwrap();
        }
        for r in &state.rooms {
            live.rooms.create_room(r).unwrap();
        }
        for e in &state.equipment {
            live.equipment.create_equipment(e).unwrap();
        }
        live
    }

    fn state() -> BuildingState {
        BuildingState {
            building: Some(Building::new("b1", "HQ")),
            floors: vec![Floor::new("f1", "b1", "Ground", 0)],
            rooms: vec![Room::new("r1", "b1", "f1", "Lobby")],
            equipment: vec![Equipment::new("e1", "b1", "AHU-1", "hvac").on_floor("f1")],
            ..BuildingState::default()
        }
    }

    #[test]
    fn matching_state_is_valid() {
        let s = state();
        let live = live_with(&s);
        let v = validate(&live, "b1", &s.metadata(), &s).unwrap();
        assert!(v.valid);
        assert_eq!((v.floor_count, v.room_count, v.equipment_count), (1, 1, 1));
        assert!(v.warnings.is_empty());
        assert!(v.errors.is_empty());
    }

    #[test]
    fn count_mismatch_is_only_a_warning() {
        let s = state();
        let live = live_with(&s);
        let mut expected = s.metadata();
        expected.floor_count = 3;
        let v = validate(&live, "b1", &expected, &s).unwrap();
        assert!(v.valid);
        assert_eq!(v.warnings, vec!["floor count is 1, snapshot recorded 3".to_string()]);
    }

    #[test]
    fn foreign_equipment_is_fatal() {
        let mut s = state();
        s.equipment.push(Equipment::new("e2", "b2", "Stray", "hvac"));
        let live = live_with(&s);
        let v = validate(&live, "b1", &s.metadata(), &s).unwrap();
        assert!(!v.valid);
        assert_eq!(v.errors, vec!["equipment e2 belongs to building b2".to_string()]);
        // The stray record is invisible to the building, so the count is off too.
        assert_eq!(v.equipment_count, 1);
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn dangling_floor_reference_warns() {
        let mut s = state();
        s.equipment[0].floor_id = Some("f9".into());
        let live = live_with(&s);
        let v = validate(&live, "b1", &s.metadata(), &s).unwrap();
        assert!(v.valid);
        assert_eq!(v.warnings, vec!["equipment e1 references missing floor f9".to_string()]);
    }
}
