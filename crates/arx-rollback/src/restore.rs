//! Destructive replacement of live state from a decoded snapshot.

use arx_snapshot::{BuildingState, LiveRepositories, RepositoryError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Entity counts touched by a restore.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub floors_deleted: usize,
    pub rooms_deleted: usize,
    pub equipment_deleted: usize,
    pub floors_created: usize,
    pub rooms_created: usize,
    pub equipment_created: usize,
    pub building_created: bool,
}

/// Delete every floor, room and equipment record of `building_id`, then
/// recreate the entities of `target` exactly as serialized, timestamps
/// included. The building record is updated, or created if missing.
///
/// BAS points and attachments are left alone.
pub fn restore(
    live: &LiveRepositories,
    building_id: &str,
    target: &BuildingState,
) -> Result<RestoreReport> {
    let mut report = RestoreReport::default();

    // Children before parents.
    for item in live.equipment.equipment_by_building(building_id)? {
        live.equipment.delete_equipment(&item.id)?;
        report.equipment_deleted += 1;
    }
    for room in live.rooms.rooms_by_building(building_id)? {
        live.rooms.delete_room(&room.id)?;
        report.rooms_deleted += 1;
    }
    for floor in live.floors.floors_by_building(building_id)? {
        live.floors.delete_floor(&floor.id)?;
        report.floors_deleted += 1;
    }
    debug!(
        building_id,
        floors = report.floors_deleted,
        rooms = report.rooms_deleted,
        equipment = report.equipment_deleted,
        "cleared live state"
    );

    if let Some(building) = &target.building {
        match live.buildings.get_building(&building.id) {
            Ok(_) => live.buildings.update_building(building)?,
            Err(RepositoryError::NotFound { .. }) => {
                live.buildings.create_building(building)?;
                report.building_created = true;
            }
            Err(e) => return Err(e.into()),
        }
    }
    for floor in &target.floors {
        live.floors.create_floor(floor)?;
        report.floors_created += 1;
    }
    for room in &target.rooms {
        live.rooms.create_room(room)?;
        report.rooms_created += 1;
    }
    for item in &target.equipment {
        live.equipment.create_equipment(item)?;
        report.equipment_created += 1;
    }

    info!(
        building_id,
        floors = report.floors_created,
        rooms = report.rooms_created,
        equipment = report.equipment_created,
        "restored live state"
    );
    Ok(report)
}
