use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use liftbook_domain::{
    AppData, Exercise, ExerciseID, Routine, RoutineID, TrackingType, WorkoutExerciseLog,
    WorkoutLog, WorkoutLogID, WorkoutSet,
};

#[allow(async_fn_in_trait)]
pub trait OngoingWorkoutService {
    async fn get_ongoing_workout(&self) -> Result<Option<ActiveWorkout>, String>;
    async fn set_ongoing_workout(&self, workout: Option<ActiveWorkout>) -> Result<(), String>;
}

#[allow(async_fn_in_trait)]
pub trait OngoingWorkoutRepository {
    async fn read_ongoing_workout(&self) -> Result<Option<ActiveWorkout>, String>;
    async fn write_ongoing_workout(&self, workout: Option<ActiveWorkout>) -> Result<(), String>;
}

/// Upper bound for the sets planned per exercise. Set counts come from stored documents.
const MAX_PLANNED_SETS: u32 = 100;

/// A workout being executed against a routine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActiveWorkout {
    pub routine_id: RoutineID,
    pub routine_name: String,
    pub category: String,
    pub start_time: DateTime<Utc>,
    pub exercises: Vec<PlannedExercise>,
    pub position: Position,
    pub timer_state: TimerState,
    pub notes: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlannedExercise {
    pub exercise_id: ExerciseID,
    pub tracking_type: TrackingType,
    pub rest_seconds: u32,
    pub sets: Vec<WorkoutSet>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub exercise_idx: usize,
    pub set_idx: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Unset,
    Active { target_time: DateTime<Utc> },
    Paused { remaining_ms: i64 },
}

impl ActiveWorkout {
    /// Plans the sets of each routine entry from its targets, falling back to the exercise
    /// defaults. Entries referencing deleted exercises are planned as weight/reps exercises.
    #[must_use]
    pub fn new(
        routine: &Routine,
        data: &AppData,
        default_rest_seconds: u32,
        now: DateTime<Utc>,
    ) -> Self {
        let exercises = routine
            .exercises
            .iter()
            .map(|entry| {
                let exercise = data.exercise(&entry.exercise_id);
                let tracking_type = exercise.map_or(TrackingType::default(), Exercise::tracking);
                let set = match tracking_type {
                    TrackingType::WeightReps => WorkoutSet {
                        weight: entry
                            .target_weight
                            .or(exercise.and_then(|e| e.default_weight)),
                        reps: entry.target_reps.or(exercise.and_then(|e| e.default_reps)),
                        ..WorkoutSet::default()
                    },
                    TrackingType::Time => WorkoutSet {
                        time_seconds: entry
                            .target_time_seconds
                            .or(exercise.and_then(|e| e.default_time_seconds)),
                        ..WorkoutSet::default()
                    },
                    TrackingType::Completion => WorkoutSet::default(),
                };
                let count = entry
                    .target_sets
                    .or(exercise.and_then(|e| e.default_sets))
                    .unwrap_or(1)
                    .min(MAX_PLANNED_SETS);
                PlannedExercise {
                    exercise_id: entry.exercise_id.clone(),
                    tracking_type,
                    rest_seconds: entry.rest_seconds.unwrap_or(default_rest_seconds),
                    sets: vec![set; count as usize],
                }
            })
            .collect();

        let mut workout = Self {
            routine_id: routine.id.clone(),
            routine_name: routine.name.clone(),
            category: routine.category.clone(),
            start_time: now,
            exercises,
            position: Position::default(),
            timer_state: TimerState::Unset,
            notes: String::new(),
        };
        workout.skip_empty_exercises();
        workout
    }

    #[must_use]
    pub fn current(&self) -> Option<(&PlannedExercise, &WorkoutSet)> {
        let exercise = self.exercises.get(self.position.exercise_idx)?;
        Some((exercise, exercise.sets.get(self.position.set_idx)?))
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.current().is_none()
    }

    /// Completes the current set with the performed values, moves on and starts the rest timer.
    pub fn record_set(&mut self, performed: WorkoutSet, now: DateTime<Utc>) -> bool {
        let Position {
            exercise_idx,
            set_idx,
        } = self.position;
        let Some(exercise) = self.exercises.get_mut(exercise_idx) else {
            return false;
        };
        let Some(set) = exercise.sets.get_mut(set_idx) else {
            return false;
        };
        *set = WorkoutSet {
            completed: true,
            ..performed
        };
        let rest_seconds = exercise.rest_seconds;
        self.advance();
        if rest_seconds > 0 && !self.is_done() {
            self.start_rest(rest_seconds, now);
        }
        true
    }

    pub fn skip_set(&mut self) {
        if !self.is_done() {
            self.advance();
        }
    }

    /// Appends a copy of the exercise's last planned set.
    pub fn add_set(&mut self, exercise_idx: usize) {
        if let Some(exercise) = self.exercises.get_mut(exercise_idx) {
            let set = exercise.sets.last().copied().unwrap_or_default();
            exercise.sets.push(WorkoutSet {
                completed: false,
                ..set
            });
        }
    }

    pub fn start_rest(&mut self, seconds: u32, now: DateTime<Utc>) {
        self.timer_state = TimerState::Active {
            target_time: now + Duration::seconds(i64::from(seconds)),
        };
    }

    pub fn pause_rest(&mut self, now: DateTime<Utc>) {
        if let TimerState::Active { target_time } = self.timer_state {
            self.timer_state = TimerState::Paused {
                remaining_ms: (target_time - now).num_milliseconds().max(0),
            };
        }
    }

    pub fn resume_rest(&mut self, now: DateTime<Utc>) {
        if let TimerState::Paused { remaining_ms } = self.timer_state {
            self.timer_state = TimerState::Active {
                target_time: now + Duration::milliseconds(remaining_ms),
            };
        }
    }

    #[must_use]
    pub fn remaining_rest(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.timer_state {
            TimerState::Unset => None,
            TimerState::Active { target_time } => Some((target_time - now).max(Duration::zero())),
            TimerState::Paused { remaining_ms } => Some(Duration::milliseconds(remaining_ms)),
        }
    }

    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.start_time).max(Duration::zero())
    }

    #[must_use]
    pub fn finish(self, now: DateTime<Utc>) -> WorkoutLog {
        let duration_seconds = u64::try_from(self.elapsed(now).num_seconds()).unwrap_or(0);
        WorkoutLog {
            id: WorkoutLogID::generate(),
            date: self.start_time,
            start_time: Some(self.start_time),
            end_time: Some(now),
            duration_seconds: Some(duration_seconds),
            routine_name: self.routine_name,
            category: Some(self.category).filter(|c| !c.is_empty()),
            exercises: self
                .exercises
                .into_iter()
                .map(|e| WorkoutExerciseLog {
                    exercise_id: e.exercise_id,
                    sets: e.sets,
                })
                .collect(),
            notes: Some(self.notes).filter(|n| !n.trim().is_empty()),
            media: None,
            extra: liftbook_domain::Extra::new(),
        }
    }

    fn advance(&mut self) {
        self.position.set_idx += 1;
        self.skip_empty_exercises();
    }

    fn skip_empty_exercises(&mut self) {
        while let Some(exercise) = self.exercises.get(self.position.exercise_idx) {
            if self.position.set_idx < exercise.sets.len() {
                break;
            }
            self.position = Position {
                exercise_idx: self.position.exercise_idx + 1,
                set_idx: 0,
            };
        }
    }
}
