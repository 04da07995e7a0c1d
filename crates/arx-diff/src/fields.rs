//! Field-level comparison of two serialized entities.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields that change on every write and never count as a modification.
pub const IGNORED_FIELDS: &[&str] = &["created_at", "updated_at"];

/// One field that differs between two versions of an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    /// `Value::Null` when the field is absent on that side.
    pub old: Value,
    pub new: Value,
    /// Entity path plus field name, e.g. `space/floors/f1/name`.
    pub path: String,
}

/// Compare two entity documents field by field.
///
/// Only top-level fields are compared; nested values (a location, a metadata
/// map) are reported whole. Fields absent on one side compare as `null`, so
/// a field dropped by `skip_serializing_if` and an explicit `null` are equal.
pub fn diff_fields(path: &str, old: &Value, new: &Value) -> Vec<FieldChange> {
    let empty = Map::new();
    let old_map = old.as_object().unwrap_or(&empty);
    let new_map = new.as_object().unwrap_or(&empty);

    let mut keys: Vec<&String> = old_map.keys().chain(new_map.keys()).collect();
    keys.sort();
    keys.dedup();

    keys.into_iter()
        .filter(|key| !IGNORED_FIELDS.contains(&key.as_str()))
        .filter_map(|key| {
            let old_value = old_map.get(key).unwrap_or(&Value::Null);
            let new_value = new_map.get(key).unwrap_or(&Value::Null);
            (old_value != new_value).then(|| FieldChange {
                field: key.clone(),
                old: old_value.clone(),
                new: new_value.clone(),
                path: format!("{path}/{key}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_documents_have_no_changes() {
        let doc = json!({"id": "f1", "name": "Ground", "level": 0});
        assert!(diff_fields("space/floors/f1", &doc, &doc).is_empty());
    }

    #[test]
    fn reports_only_changed_fields() {
        let old = json!({"id": "f1", "name": "Ground", "level": 0});
        let new = json!({"id": "f1", "name": "Lobby", "level": 0});
        let changes = diff_fields("space/floors/f1", &old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "name");
        assert_eq!(changes[0].old, json!("Ground"));
        assert_eq!(changes[0].new, json!("Lobby"));
        assert_eq!(changes[0].path, "space/floors/f1/name");
    }

    #[test]
    fn timestamps_are_ignored() {
        let old = json!({"name": "A", "updated_at": "2024-01-01T00:00:00Z"});
        let new = json!({"name": "A", "updated_at": "2024-06-01T00:00:00Z"});
        assert!(diff_fields("p", &old, &new).is_empty());
    }

    #[test]
    fn absent_and_null_are_equal() {
        let old = json!({"name": "A"});
        let new = json!({"name": "A", "model": null});
        assert!(diff_fields("p", &old, &new).is_empty());
    }

    #[test]
    fn added_field_is_reported() {
        let old = json!({"name": "A"});
        let new = json!({"name": "A", "location": {"x": 1.0, "y": 2.0, "z": 0.0}});
        let changes = diff_fields("p", &old, &new);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, Value::Null);
    }
}
