#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod log;

mod active_workout;
mod scheduler;
mod service;
mod session;
mod settings;

pub use active_workout::{
    ActiveWorkout, OngoingWorkoutRepository, OngoingWorkoutService, PlannedExercise, Position,
    TimerState,
};
pub use scheduler::SaveScheduler;
pub use service::Service;
pub use session::{Binding, Notification, Session, State, UpdateOrigin, View};
pub use settings::{Settings, SettingsRepository, SettingsService};

#[cfg(test)]
mod tests {
    pub mod fakes;
}
