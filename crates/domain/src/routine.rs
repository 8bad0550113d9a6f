use serde::{Deserialize, Serialize};

use crate::{ExerciseID, Extra};

string_id!(RoutineID);

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: RoutineID,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub exercises: Vec<RoutineExercise>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Routine {
    #[must_use]
    pub fn new(name: &str, category: &str) -> Self {
        Self {
            id: RoutineID::generate(),
            name: name.trim().to_string(),
            category: category.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn exercise_ids(&self) -> impl Iterator<Item = &ExerciseID> {
        self.exercises.iter().map(|e| &e.exercise_id)
    }

    pub fn remove_exercise(&mut self, id: &ExerciseID) {
        self.exercises.retain(|e| &e.exercise_id != id);
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExercise {
    pub exercise_id: ExerciseID,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_time_seconds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_seconds: Option<u32>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl RoutineExercise {
    pub const DEFAULT_TARGET_SETS: u32 = 3;
    pub const DEFAULT_TARGET_REPS: u32 = 10;

    /// Entry with the default targets that routines without explicit targets get.
    #[must_use]
    pub fn new(exercise_id: ExerciseID) -> Self {
        Self {
            exercise_id,
            target_sets: Some(Self::DEFAULT_TARGET_SETS),
            target_reps: Some(Self::DEFAULT_TARGET_REPS),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_routine_exercise_new() {
        assert_eq!(
            serde_json::to_value(RoutineExercise::new("e1".into())).unwrap(),
            json!({ "exerciseId": "e1", "targetSets": 3, "targetReps": 10 })
        );
    }

    #[test]
    fn test_routine_remove_exercise() {
        let mut routine = Routine {
            exercises: vec![
                RoutineExercise::new("e1".into()),
                RoutineExercise::new("e2".into()),
                RoutineExercise::new("e1".into()),
            ],
            ..Routine::new("Push", "Strength")
        };
        routine.remove_exercise(&"e1".into());
        assert_eq!(
            routine.exercise_ids().collect::<Vec<_>>(),
            vec![&ExerciseID::from("e2")]
        );
    }

    #[test]
    fn test_routine_deserialize_without_category() {
        let routine: Routine = serde_json::from_value(json!({
            "id": "r1",
            "name": "Legs",
            "exercises": [{ "exerciseId": "e1", "restSeconds": 90 }]
        }))
        .unwrap();
        assert_eq!(routine.category, "");
        assert_eq!(routine.exercises[0].rest_seconds, Some(90));
        assert_eq!(routine.exercises[0].target_sets, None);
    }
}
