//! Versioned document schema
//!
//! Persisted documents carry a `schemaVersion` field. Documents written before versioning was
//! introduced have no such field and are treated as version 1. Loading a document applies the
//! migration steps from its version up to [`SCHEMA_VERSION`]; fields unknown to a step are left
//! untouched.
//!
//! Decoding is tolerant on the level of entries: an equipment, exercise, routine or log that does
//! not match the current schema is set aside instead of failing the whole document, and encoding
//! writes it back unchanged.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::{AppData, Equipment, Exercise, MigrationError, Routine, RoutineExercise, WorkoutLog};

pub const SCHEMA_VERSION: u32 = 2;

const VERSION_FIELD: &str = "schemaVersion";

type Step = fn(&mut Map<String, Value>);

/// Indexed by the version a step migrates from.
const MIGRATIONS: &[(u32, Step)] = &[(1, routine_targets)];

type Check = fn(Value) -> Result<(), serde_json::Error>;

const COLLECTIONS: &[(&str, Check)] = &[
    ("equipment", check::<Equipment>),
    ("exercises", check::<Exercise>),
    ("routines", check::<Routine>),
    ("logs", check::<WorkoutLog>),
];

fn check<T: DeserializeOwned>(entry: Value) -> Result<(), serde_json::Error> {
    serde_json::from_value::<T>(entry).map(|_| ())
}

#[must_use]
pub fn version(document: &Value) -> u32 {
    document
        .get(VERSION_FIELD)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .map_or(1, |v| v.max(1))
}

/// Upgrades a raw document to the current schema version.
pub fn migrate(mut document: Value) -> Result<Value, MigrationError> {
    let mut version = version(&document);
    let Value::Object(ref mut object) = document else {
        return Err(MigrationError::NotAnObject);
    };

    if version > SCHEMA_VERSION {
        return Err(MigrationError::UnsupportedVersion(version));
    }

    while version < SCHEMA_VERSION {
        let (_, step) = MIGRATIONS
            .iter()
            .find(|(from, _)| *from == version)
            .ok_or(MigrationError::MissingStep(version))?;
        debug!("migrating document from schema version {version}");
        step(object);
        version += 1;
    }

    object.insert(VERSION_FIELD.to_string(), json!(SCHEMA_VERSION));
    Ok(document)
}

/// Converts a routine storing plain `exerciseIds` into one with `exercises` entries carrying the
/// default targets. Routines without `exerciseIds` are left unchanged.
pub fn migrate_routine(routine: &mut Value) {
    let Some(object) = routine.as_object_mut() else {
        return;
    };
    let Some(exercise_ids) = object.remove("exerciseIds") else {
        return;
    };
    let exercises = exercise_ids
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|id| serde_json::to_value(RoutineExercise::new(id.into())))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_default();
    object.insert("exercises".to_string(), Value::Array(exercises));
}

fn routine_targets(document: &mut Map<String, Value>) {
    if let Some(Value::Array(routines)) = document.get_mut("routines") {
        for routine in routines {
            migrate_routine(routine);
        }
    }
}

/// Migrates a raw document and converts it into [`AppData`]. Entries that cannot be read end up
/// in [`AppData::unreadable`].
pub fn decode(document: Value) -> Result<AppData, MigrationError> {
    let mut document = migrate(document)?;
    let mut unreadable = BTreeMap::new();
    if let Value::Object(ref mut object) = document {
        object.remove(VERSION_FIELD);
        for (name, check) in COLLECTIONS {
            let Some(Value::Array(entries)) = object.get_mut(*name) else {
                continue;
            };
            let (readable, rejected): (Vec<_>, Vec<_>) =
                std::mem::take(entries).into_iter().partition(|entry| {
                    check(entry.clone())
                        .inspect_err(|err| warn!("keeping unreadable entry of {name}: {err}"))
                        .is_ok()
                });
            *entries = readable;
            if !rejected.is_empty() {
                unreadable.insert((*name).to_string(), rejected);
            }
        }
    }
    let mut data: AppData = serde_json::from_value(document).map_err(MigrationError::Invalid)?;
    data.unreadable = unreadable;
    Ok(data)
}

/// Decodes a document given as JSON text.
pub fn parse(text: &str) -> Result<AppData, MigrationError> {
    decode(serde_json::from_str(text).map_err(MigrationError::Parse)?)
}

/// Serializes [`AppData`] into a document of the current schema version.
pub fn encode(data: &AppData) -> Result<Value, serde_json::Error> {
    let mut document = serde_json::to_value(data)?;
    if let Value::Object(ref mut object) = document {
        for (name, entries) in &data.unreadable {
            if let Some(Value::Array(items)) = object.get_mut(name) {
                items.extend(entries.iter().cloned());
            }
        }
        object.insert(VERSION_FIELD.to_string(), json!(SCHEMA_VERSION));
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{Routine, RoutineExercise};

    use super::*;

    #[test]
    fn test_migrate_routine() {
        let mut routine = json!({ "id": "r1", "exerciseIds": ["e1", "e2"] });
        migrate_routine(&mut routine);
        assert_eq!(
            routine,
            json!({
                "id": "r1",
                "exercises": [
                    { "exerciseId": "e1", "targetSets": 3, "targetReps": 10 },
                    { "exerciseId": "e2", "targetSets": 3, "targetReps": 10 }
                ]
            })
        );
    }

    #[rstest]
    #[case::legacy(json!({ "id": "r1", "name": "Legs", "exerciseIds": ["e1"] }))]
    #[case::current(json!({ "id": "r1", "exercises": [{ "exerciseId": "e1", "restSeconds": 60 }] }))]
    #[case::empty(json!({ "id": "r1", "exerciseIds": [] }))]
    #[case::malformed_ids(json!({ "id": "r1", "exerciseIds": "e1" }))]
    #[case::mixed_ids(json!({ "id": "r1", "exerciseIds": ["e1", 2, null] }))]
    #[case::not_an_object(json!("r1"))]
    fn test_migrate_routine_idempotent(#[case] routine: Value) {
        let mut once = routine;
        migrate_routine(&mut once);
        let mut twice = once.clone();
        migrate_routine(&mut twice);
        assert_eq!(twice, once);
        assert!(once.get("exerciseIds").is_none());
    }

    #[test]
    fn test_migrate_routine_skips_non_string_ids() {
        let mut routine = json!({ "id": "r1", "exerciseIds": ["e1", 2, null] });
        migrate_routine(&mut routine);
        assert_eq!(
            routine["exercises"],
            json!([{ "exerciseId": "e1", "targetSets": 3, "targetReps": 10 }])
        );
    }

    #[test]
    fn test_migrate_legacy_document() {
        let document = json!({
            "equipment": [],
            "exercises": [{ "id": "e1", "name": "Squat", "equipmentIds": [] }],
            "routines": [{ "id": "r1", "name": "Legs", "category": "Strength", "exerciseIds": ["e1"] }],
            "logs": [],
            "theme": "dark"
        });
        assert_eq!(version(&document), 1);
        let migrated = migrate(document).unwrap();
        assert_eq!(version(&migrated), SCHEMA_VERSION);
        assert_eq!(migrated["theme"], json!("dark"));
        assert_eq!(
            migrated["routines"][0]["exercises"],
            json!([{ "exerciseId": "e1", "targetSets": 3, "targetReps": 10 }])
        );
    }

    #[test]
    fn test_migrate_current_document_is_unchanged() {
        let document = json!({
            "schemaVersion": 2,
            "routines": [{ "id": "r1", "name": "Legs", "exerciseIds": ["e1"] }]
        });
        assert_eq!(migrate(document.clone()).unwrap(), document);
    }

    #[rstest]
    #[case(json!({ "schemaVersion": 3 }), 3)]
    #[case(json!({ "schemaVersion": 100 }), 100)]
    fn test_migrate_unsupported_version(#[case] document: Value, #[case] expected: u32) {
        assert!(matches!(
            migrate(document),
            Err(MigrationError::UnsupportedVersion(v)) if v == expected
        ));
    }

    #[rstest]
    #[case(json!([]))]
    #[case(json!(null))]
    #[case(json!("data"))]
    fn test_migrate_not_an_object(#[case] document: Value) {
        assert!(matches!(migrate(document), Err(MigrationError::NotAnObject)));
    }

    #[rstest]
    #[case(json!({}), 1)]
    #[case(json!({ "schemaVersion": 0 }), 1)]
    #[case(json!({ "schemaVersion": "2" }), 1)]
    #[case(json!({ "schemaVersion": 2 }), 2)]
    fn test_version(#[case] document: Value, #[case] expected: u32) {
        assert_eq!(version(&document), expected);
    }

    #[test]
    fn test_decode() {
        let data = decode(json!({
            "routines": [{ "id": "r1", "name": "Legs", "exerciseIds": ["e1"] }],
            "logs": []
        }))
        .unwrap();
        assert_eq!(
            data.routines,
            vec![Routine {
                id: "r1".into(),
                name: "Legs".into(),
                exercises: vec![RoutineExercise::new("e1".into())],
                ..Routine::default()
            }]
        );
        assert!(data.extra.is_empty());
    }

    #[rstest]
    #[case(json!({ "routines": "r1" }))]
    #[case(json!({ "logs": [], "theme": null, "equipment": { "id": "q1" } }))]
    fn test_decode_invalid(#[case] document: Value) {
        assert!(matches!(decode(document), Err(MigrationError::Invalid(_))));
    }

    #[test]
    fn test_decode_keeps_unreadable_entries() {
        let bad_log = json!({ "id": "w1", "date": "2024-03-01", "routineName": "Legs", "exercises": [] });
        let bad_routine = json!({ "id": 1 });
        let data = decode(json!({
            "equipment": [{ "id": "q1", "name": "Barbell" }],
            "exercises": [{ "id": "e1", "name": "Squat" }],
            "routines": [bad_routine.clone()],
            "logs": [bad_log.clone()]
        }))
        .unwrap();
        assert_eq!(data.equipment[0].name, "Barbell");
        assert_eq!(data.exercises[0].name, "Squat");
        assert!(data.routines.is_empty());
        assert!(data.logs.is_empty());
        assert_eq!(data.unreadable["routines"], vec![bad_routine.clone()]);
        assert_eq!(data.unreadable["logs"], vec![bad_log.clone()]);

        let mut data = data;
        data.add_equipment(crate::Equipment::new("Bench"));
        let document = encode(&data).unwrap();
        assert_eq!(document["equipment"].as_array().unwrap().len(), 2);
        assert_eq!(document["routines"], json!([bad_routine]));
        assert_eq!(document["logs"], json!([bad_log]));
        assert_eq!(decode(document).unwrap(), data);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(parse("{ not json"), Err(MigrationError::Parse(_))));
    }

    #[test]
    fn test_encode_stamps_version() {
        let document = encode(&AppData::default()).unwrap();
        assert_eq!(
            document,
            json!({
                "equipment": [],
                "exercises": [],
                "routines": [],
                "logs": [],
                "schemaVersion": 2
            })
        );
        assert_eq!(decode(document).unwrap(), AppData::default());
    }
}
