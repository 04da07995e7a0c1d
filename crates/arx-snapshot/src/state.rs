//! The full live state of one building, as captured into or restored from a
//! snapshot.

use arx_store::SnapshotMetadata;
use arx_types::{Attachment, BasPoint, Building, Equipment, Floor, Room};

use crate::error::SnapshotResult;
use crate::repository::LiveRepositories;

/// Every entity belonging to one building, each list sorted by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildingState {
    pub building: Option<Building>,
    pub floors: Vec<Floor>,
    pub rooms: Vec<Room>,
    pub equipment: Vec<Equipment>,
    pub points: Vec<BasPoint>,
    pub attachments: Vec<Attachment>,
}

impl BuildingState {
    /// Read the current live state of `building_id`.
    pub fn capture(live: &LiveRepositories, building_id: &str) -> SnapshotResult<Self> {
        let mut state = Self {
            building: Some(live.buildings.get_building(building_id)?),
            floors: live.floors.floors_by_building(building_id)?,
            rooms: live.rooms.rooms_by_building(building_id)?,
            equipment: live.equipment.equipment_by_building(building_id)?,
            points: live.points.points_by_building(building_id)?,
            attachments: live.attachments.attachments_by_building(building_id)?,
        };
        state.sort();
        Ok(state)
    }

    /// Sort every list by id.
    pub fn sort(&mut self) {
        self.floors.sort_by(|a, b| a.id.cmp(&b.id));
        self.rooms.sort_by(|a, b| a.id.cmp(&b.id));
        self.equipment.sort_by(|a, b| a.id.cmp(&b.id));
        self.points.sort_by(|a, b| a.id.cmp(&b.id));
        self.attachments.sort_by(|a, b| a.id.cmp(&b.id));
    }

    /// Denormalized counts stored on the snapshot.
    pub fn metadata(&self) -> SnapshotMetadata {
        SnapshotMetadata {
            floor_count: self.floors.len() as u64,
            room_count: self.rooms.len() as u64,
            equipment_count: self.equipment.len() as u64,
            file_count: self.attachments.len() as u64,
            point_count: self.points.len() as u64,
        }
    }

    pub fn building_id(&self) -> Option<&str> {
        self.building.as_ref().map(|b| b.id.as_str())
    }
}
