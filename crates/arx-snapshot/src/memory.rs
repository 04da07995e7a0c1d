//! In-memory live store implementing every repository trait.

use std::collections::BTreeMap;
use std::sync::RwLock;

use arx_types::{Attachment, BasPoint, Building, Equipment, Floor, Room};

use crate::error::{RepositoryError, RepositoryResult};
use crate::repository::{
    AttachmentRepository, BasPointRepository, BuildingRepository, EquipmentRepository,
    FloorRepository, RoomRepository,
};

/// Live building data held in ordered maps, keyed by entity id.
#[derive(Debug, Default)]
pub struct InMemoryLiveStore {
    buildings: RwLock<BTreeMap<String, Building>>,
    floors: RwLock<BTreeMap<String, Floor>>,
    rooms: RwLock<BTreeMap<String, Room>>,
    equipment: RwLock<BTreeMap<String, Equipment>>,
    points: RwLock<BTreeMap<String, BasPoint>>,
    attachments: RwLock<BTreeMap<String, Attachment>>,
}

fn insert<T: Clone>(
    map: &RwLock<BTreeMap<String, T>>,
    entity: &'static str,
    id: &str,
    value: &T,
) -> RepositoryResult<()> {
    let mut map = map.write().expect("lock poisoned");
    if map.contains_key(id) {
        return Err(RepositoryError::Duplicate {
            entity,
            id: id.to_string(),
        });
    }
    map.insert(id.to_string(), value.clone());
    Ok(())
}

fn remove<T>(map: &RwLock<BTreeMap<String, T>>, entity: &'static str, id: &str) -> RepositoryResult<()> {
    let mut map = map.write().expect("lock poisoned");
    map.remove(id).map(|_| ()).ok_or_else(|| RepositoryError::NotFound {
        entity,
        id: id.to_string(),
    })
}

fn by_building<T: Clone>(
    map: &RwLock<BTreeMap<String, T>>,
    building_id: &str,
    owner: impl Fn(&T) -> &str,
) -> Vec<T> {
    let map = map.read().expect("lock poisoned");
    map.values().filter(|v| owner(v) == building_id).cloned().collect()
}

impl InMemoryLiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a BAS point (points are imported outside the engine).
    pub fn insert_point(&self, point: BasPoint) {
        let mut map = self.points.write().expect("lock poisoned");
        map.insert(point.id.clone(), point);
    }

    /// Seed an attachment record.
    pub fn insert_attachment(&self, attachment: Attachment) {
        let mut map = self.attachments.write().expect("lock poisoned");
        map.insert(attachment.id.clone(), attachment);
    }

    /// Replace an equipment record in place (an edit made outside the engine).
    pub fn put_equipment(&self, equipment: Equipment) {
        let mut map = self.equipment.write().expect("lock poisoned");
        map.insert(equipment.id.clone(), equipment);
    }

    /// Replace a floor record in place.
    pub fn put_floor(&self, floor: Floor) {
        let mut map = self.floors.write().expect("lock poisoned");
        map.insert(floor.id.clone(), floor);
    }
}

impl BuildingRepository for InMemoryLiveStore {
    fn get_building(&self, id: &str) -> RepositoryResult<Building> {
        let map = self.buildings.read().expect("lock poisoned");
        map.get(id).cloned().ok_or_else(|| RepositoryError::NotFound {
            entity: "building",
            id: id.to_string(),
        })
    }

    fn create_building(&self, building: &Building) -> RepositoryResult<()> {
        insert(&self.buildings, "building", &building.id, building)
    }

    fn update_building(&self, building: &Building) -> RepositoryResult<()> {
        let mut map = self.buildings.write().expect("lock poisoned");
        match map.get_mut(&building.id) {
            Some(slot) => {
                *slot = building.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: "building",
                id: building.id.clone(),
            }),
        }
    }
}

impl FloorRepository for InMemoryLiveStore {
    fn floors_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Floor>> {
        Ok(by_building(&self.floors, building_id, |f| f.building_id.as_str()))
    }

    fn create_floor(&self, floor: &Floor) -> RepositoryResult<()> {
        insert(&self.floors, "floor", &floor.id, floor)
    }

    fn delete_floor(&self, id: &str) -> RepositoryResult<()> {
        remove(&self.floors, "floor", id)
    }
}

impl RoomRepository for InMemoryLiveStore {
    fn rooms_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Room>> {
        Ok(by_building(&self.rooms, building_id, |r| r.building_id.as_str()))
    }

    fn create_room(&self, room: &Room) -> RepositoryResult<()> {
        insert(&self.rooms, "room", &room.id, room)
    }

    fn delete_room(&self, id: &str) -> RepositoryResult<()> {
        remove(&self.rooms, "room", id)
    }
}

impl EquipmentRepository for InMemoryLiveStore {
    fn equipment_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Equipment>> {
        Ok(by_building(&self.equipment, building_id, |e| e.building_id.as_str()))
    }

    fn create_equipment(&self, equipment: &Equipment) -> RepositoryResult<()> {
        insert(&self.equipment, "equipment", &equipment.id, equipment)
    }

    fn delete_equipment(&self, id: &str) -> RepositoryResult<()> {
        remove(&self.equipment, "equipment", id)
    }
}

impl BasPointRepository for InMemoryLiveStore {
    fn points_by_building(&self, building_id: &str) -> RepositoryResult<Vec<BasPoint>> {
        Ok(by_building(&self.points, building_id, |p| p.building_id.as_str()))
    }
}

impl AttachmentRepository for InMemoryLiveStore {
    fn attachments_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Attachment>> {
        Ok(by_building(&self.attachments, building_id, |a| a.building_id.as_str()))
    }
}
