use std::collections::BTreeMap;

use chrono::Datelike;

use crate::{AppData, ExerciseID, WorkoutExerciseLog, WorkoutLog, WorkoutSet};

#[must_use]
pub fn logs_newest_first(data: &AppData) -> Vec<&WorkoutLog> {
    let mut logs = data.logs.iter().collect::<Vec<_>>();
    logs.sort_by(|a, b| b.date.cmp(&a.date));
    logs
}

/// Entries of one exercise across all logs, newest first.
#[must_use]
pub fn exercise_history<'a>(
    data: &'a AppData,
    id: &ExerciseID,
) -> Vec<(&'a WorkoutLog, &'a WorkoutExerciseLog)> {
    logs_newest_first(data)
        .into_iter()
        .flat_map(|log| {
            log.exercises
                .iter()
                .filter(|e| &e.exercise_id == id)
                .map(move |e| (log, e))
        })
        .collect()
}

/// Heaviest completed set of an exercise, ties broken by reps.
#[must_use]
pub fn best_set(data: &AppData, id: &ExerciseID) -> Option<WorkoutSet> {
    data.logs
        .iter()
        .flat_map(WorkoutLog::completed_sets)
        .filter(|(exercise_id, _)| *exercise_id == id)
        .map(|(_, set)| *set)
        .max_by(|a, b| {
            a.weight
                .unwrap_or_default()
                .total_cmp(&b.weight.unwrap_or_default())
                .then(a.reps.cmp(&b.reps))
        })
}

#[must_use]
pub fn total_volume(data: &AppData) -> f64 {
    data.logs.iter().map(WorkoutLog::volume).sum()
}

/// Number of workouts per ISO week, keyed by (ISO year, week).
#[must_use]
pub fn workouts_per_week(data: &AppData) -> BTreeMap<(i32, u32), usize> {
    let mut result = BTreeMap::new();
    for log in &data.logs {
        let week = log.date.iso_week();
        *result.entry((week.year(), week.week())).or_insert(0) += 1;
    }
    result
}
