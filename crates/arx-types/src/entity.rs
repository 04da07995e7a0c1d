//! Live building entities.
//!
//! These are the mutable records owned by the relational repositories. The
//! version-control engine reads them to build snapshots and writes them back
//! during rollback. Each entity serializes to a single JSON blob in the
//! snapshot tree, so field names here are part of the on-disk format.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A building: the root of the spatial hierarchy and the unit of versioning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub building_type: String,
    #[serde(default)]
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Building {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: String::new(),
            building_type: String::new(),
            status: "active".into(),
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

/// A floor (storey) of a building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    pub id: String,
    pub building_id: String,
    pub name: String,
    pub level: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Floor {
    pub fn new(
        id: impl Into<String>,
        building_id: impl Into<String>,
        name: impl Into<String>,
        level: i32,
    ) -> Self {
        Self {
            id: id.into(),
            building_id: building_id.into(),
            name: name.into(),
            level,
            elevation: None,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

/// A room on a floor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub building_id: String,
    pub floor_id: String,
    pub name: String,
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        building_id: impl Into<String>,
        floor_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            building_id: building_id.into(),
            floor_id: floor_id.into(),
            name: name.into(),
            number: String::new(),
            area: None,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

/// A point in building coordinates (metres).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: &Location3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance between two optional locations; an absent endpoint counts as 0.
    pub fn distance(a: Option<&Location3>, b: Option<&Location3>) -> f64 {
        match (a, b) {
            (Some(a), Some(b)) => a.distance_to(b),
            _ => 0.0,
        }
    }
}

impl fmt::Display for Location3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// A piece of equipment installed in the building.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub name: String,
    pub equipment_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    pub fn new(
        id: impl Into<String>,
        building_id: impl Into<String>,
        name: impl Into<String>,
        equipment_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            building_id: building_id.into(),
            floor_id: None,
            room_id: None,
            name: name.into(),
            equipment_type: equipment_type.into(),
            status: "operational".into(),
            location: None,
            model: None,
            metadata: BTreeMap::new(),
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }

    pub fn with_location(mut self, location: Location3) -> Self {
        self.location = Some(location);
        self
    }

    pub fn on_floor(mut self, floor_id: impl Into<String>) -> Self {
        self.floor_id = Some(floor_id.into());
        self
    }
}

/// A building-automation (BAS) point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasPoint {
    pub id: String,
    pub building_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub point_name: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub writeable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BasPoint {
    pub fn new(
        id: impl Into<String>,
        building_id: impl Into<String>,
        point_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            building_id: building_id.into(),
            equipment_id: None,
            room_id: None,
            point_name: point_name.into(),
            object_type: String::new(),
            units: String::new(),
            writeable: false,
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

/// A file attached to a building (drawing, manual, photo).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub building_id: String,
    pub name: String,
    #[serde(default)]
    pub content_type: String,
    pub size: u64,
    /// Digest of the attachment body as recorded by the file service.
    #[serde(default)]
    pub digest: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attachment {
    pub fn new(
        id: impl Into<String>,
        building_id: impl Into<String>,
        name: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            id: id.into(),
            building_id: building_id.into(),
            name: name.into(),
            content_type: String::new(),
            size,
            digest: String::new(),
            created_at: DateTime::default(),
            updated_at: DateTime::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_is_formatted_triple() {
        let loc = Location3::new(1.0, 2.5, -3.125);
        assert_eq!(loc.to_string(), "(1.00, 2.50, -3.12)");
    }

    #[test]
    fn euclidean_distance() {
        let a = Location3::new(0.0, 0.0, 0.0);
        let b = Location3::new(3.0, 4.0, 12.0);
        assert!((a.distance_to(&b) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn distance_with_missing_endpoint_is_zero() {
        let a = Location3::new(1.0, 1.0, 1.0);
        assert_eq!(Location3::distance(Some(&a), None), 0.0);
        assert_eq!(Location3::distance(None, Some(&a)), 0.0);
        assert_eq!(Location3::distance(None, None), 0.0);
    }

    #[test]
    fn equipment_serde_skips_empty_optionals() {
        let eq = Equipment::new("eq-1", "b-1", "AHU-1", "hvac");
        let json = serde_json::to_value(&eq).unwrap();
        assert!(json.get("location").is_none());
        assert!(json.get("metadata").is_none());
        let back: Equipment = serde_json::from_value(json).unwrap();
        assert_eq!(back, eq);
    }

    #[test]
    fn floor_roundtrip_preserves_timestamps() {
        let mut floor = Floor::new("f-1", "b-1", "Ground", 0);
        floor.updated_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let json = serde_json::to_vec(&floor).unwrap();
        let back: Floor = serde_json::from_slice(&json).unwrap();
        assert_eq!(back.updated_at, floor.updated_at);
    }
}
