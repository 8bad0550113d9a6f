use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ExerciseID, Extra};

string_id!(WorkoutLogID);

/// Record of a finished workout. Logs are appended once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub id: WorkoutLogID,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    pub routine_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub exercises: Vec<WorkoutExerciseLog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl WorkoutLog {
    pub fn completed_sets(&self) -> impl Iterator<Item = (&ExerciseID, &WorkoutSet)> {
        self.exercises.iter().flat_map(|e| {
            e.sets
                .iter()
                .filter(|s| s.completed)
                .map(move |s| (&e.exercise_id, s))
        })
    }

    /// Sum of weight × reps over all completed sets.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.completed_sets().map(|(_, s)| s.volume()).sum()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExerciseLog {
    pub exercise_id: ExerciseID,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_seconds: Option<u32>,
    #[serde(default)]
    pub completed: bool,
}

impl WorkoutSet {
    #[must_use]
    pub fn volume(&self) -> f64 {
        match (self.weight, self.reps) {
            (Some(weight), Some(reps)) => weight * f64::from(reps),
            _ => 0.0,
        }
    }
}
