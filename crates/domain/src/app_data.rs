use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    Equipment, EquipmentID, Exercise, ExerciseID, Extra, Routine, RoutineID, WorkoutLog,
    WorkoutLogID,
};

/// The aggregate persisted per account. Saves always replace the whole document.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub routines: Vec<Routine>,
    #[serde(default)]
    pub logs: Vec<WorkoutLog>,
    #[serde(flatten)]
    pub extra: Extra,
    /// Stored entries that do not match the current schema, by collection name. They are
    /// written back unchanged on save.
    #[serde(skip)]
    pub unreadable: BTreeMap<String, Vec<Value>>,
}

impl AppData {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.equipment.is_empty()
            && self.exercises.is_empty()
            && self.routines.is_empty()
            && self.logs.is_empty()
    }

    #[must_use]
    pub fn equipment(&self, id: &EquipmentID) -> Option<&Equipment> {
        self.equipment.iter().find(|e| &e.id == id)
    }

    /// A missing exercise is an exercise that has been deleted since it was referenced.
    #[must_use]
    pub fn exercise(&self, id: &ExerciseID) -> Option<&Exercise> {
        self.exercises.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn exercise_name(&self, id: &ExerciseID) -> Option<&str> {
        self.exercise(id).map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn routine(&self, id: &RoutineID) -> Option<&Routine> {
        self.routines.iter().find(|r| &r.id == id)
    }

    #[must_use]
    pub fn log(&self, id: &WorkoutLogID) -> Option<&WorkoutLog> {
        self.logs.iter().find(|l| &l.id == id)
    }

    pub fn add_equipment(&mut self, equipment: Equipment) {
        self.equipment.push(equipment);
    }

    pub fn replace_equipment(&mut self, equipment: Equipment) -> bool {
        replace(&mut self.equipment, equipment, |a, b| a.id == b.id)
    }

    pub fn delete_equipment(&mut self, id: &EquipmentID) -> Option<Equipment> {
        remove(&mut self.equipment, |e| &e.id == id)
    }

    pub fn add_exercise(&mut self, exercise: Exercise) {
        self.exercises.push(exercise);
    }

    pub fn replace_exercise(&mut self, exercise: Exercise) -> bool {
        replace(&mut self.exercises, exercise, |a, b| a.id == b.id)
    }

    /// Routines and logs keep their references to the deleted exercise.
    pub fn delete_exercise(&mut self, id: &ExerciseID) -> Option<Exercise> {
        remove(&mut self.exercises, |e| &e.id == id)
    }

    pub fn add_routine(&mut self, routine: Routine) {
        self.routines.push(routine);
    }

    pub fn replace_routine(&mut self, routine: Routine) -> bool {
        replace(&mut self.routines, routine, |a, b| a.id == b.id)
    }

    pub fn delete_routine(&mut self, id: &RoutineID) -> Option<Routine> {
        remove(&mut self.routines, |r| &r.id == id)
    }

    pub fn add_log(&mut self, log: WorkoutLog) {
        self.logs.push(log);
    }

    pub fn delete_log(&mut self, id: &WorkoutLogID) -> Option<WorkoutLog> {
        remove(&mut self.logs, |l| &l.id == id)
    }
}

fn replace<T>(items: &mut [T], item: T, same: impl Fn(&T, &T) -> bool) -> bool {
    match items.iter_mut().find(|i| same(i, &item)) {
        Some(existing) => {
            *existing = item;
            true
        }
        None => false,
    }
}

fn remove<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> Option<T> {
    let idx = items.iter().position(matches)?;
    Some(items.remove(idx))
}
