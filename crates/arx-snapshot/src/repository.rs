//! Interfaces to the live (relational) building repositories.
//!
//! The engine reads these to build snapshots and writes floors, rooms,
//! equipment and the building record back during rollback. BAS points and
//! attachments are read-only from the engine's point of view.

use std::sync::Arc;

use arx_types::{Attachment, BasPoint, Building, Equipment, Floor, Room};

use crate::error::RepositoryResult;

pub trait BuildingRepository: Send + Sync {
    fn get_building(&self, id: &str) -> RepositoryResult<Building>;
    fn create_building(&self, building: &Building) -> RepositoryResult<()>;
    fn update_building(&self, building: &Building) -> RepositoryResult<()>;
}

pub trait FloorRepository: Send + Sync {
    fn floors_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Floor>>;
    fn create_floor(&self, floor: &Floor) -> RepositoryResult<()>;
    fn delete_floor(&self, id: &str) -> RepositoryResult<()>;
}

pub trait RoomRepository: Send + Sync {
    fn rooms_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Room>>;
    fn create_room(&self, room: &Room) -> RepositoryResult<()>;
    fn delete_room(&self, id: &str) -> RepositoryResult<()>;
}

pub trait EquipmentRepository: Send + Sync {
    fn equipment_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Equipment>>;
    fn create_equipment(&self, equipment: &Equipment) -> RepositoryResult<()>;
    fn delete_equipment(&self, id: &str) -> RepositoryResult<()>;
}

pub trait BasPointRepository: Send + Sync {
    fn points_by_building(&self, building_id: &str) -> RepositoryResult<Vec<BasPoint>>;
}

pub trait AttachmentRepository: Send + Sync {
    fn attachments_by_building(&self, building_id: &str) -> RepositoryResult<Vec<Attachment>>;
}

/// Every live repository the engine talks to.
#[derive(Clone)]
pub struct LiveRepositories {
    pub buildings: Arc<dyn BuildingRepository>,
    pub floors: Arc<dyn FloorRepository>,
    pub rooms: Arc<dyn RoomRepository>,
    pub equipment: Arc<dyn EquipmentRepository>,
    pub points: Arc<dyn BasPointRepository>,
    pub attachments: Arc<dyn AttachmentRepository>,
}

impl LiveRepositories {
    /// Use one backend for every repository.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: BuildingRepository
            + FloorRepository
            + RoomRepository
            + EquipmentRepository
            + BasPointRepository
            + AttachmentRepository
            + 'static,
    {
        Self {
            buildings: backend.clone(),
            floors: backend.clone(),
            rooms: backend.clone(),
            equipment: backend.clone(),
            points: backend.clone(),
            attachments: backend,
        }
    }
}

impl std::fmt::Debug for LiveRepositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveRepositories").finish_non_exhaustive()
    }
}
