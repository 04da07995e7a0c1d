//! Names used inside snapshot trees.
//!
//! ```text
//! snapshot
//! ├── space        building (blob), floors/<floor id>, rooms/<room id>
//! ├── items        <equipment type>/<equipment id>
//! ├── files        <attachment id>
//! └── operations   <point id>
//! ```

pub const SPACE: &str = "space";
pub const ITEMS: &str = "items";
pub const FILES: &str = "files";
pub const OPERATIONS: &str = "operations";

pub const BUILDING: &str = "building";
pub const FLOORS: &str = "floors";
pub const ROOMS: &str = "rooms";

/// Items subtree for equipment with an empty type.
pub const UNSPECIFIED_TYPE: &str = "unspecified";

/// Object metadata key naming the entity a blob holds.
pub const ENTITY_KEY: &str = "entity";

/// Object metadata key carrying the building id on snapshot objects.
pub const BUILDING_KEY: &str = "building_id";

/// Items subtree name for an equipment type.
pub fn type_bucket(equipment_type: &str) -> &str {
    if equipment_type.trim().is_empty() {
        UNSPECIFIED_TYPE
    } else {
        equipment_type
    }
}
