use std::collections::VecDeque;

use crate::{
    ActiveWorkout, OngoingWorkoutRepository, OngoingWorkoutService, Settings, SettingsRepository,
    SettingsService, log,
};

/// Access to device-level state that is not part of the workout data.
pub struct Service<R> {
    repository: R,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

impl<R: log::Repository> log::Service for Service<R> {
    fn get_log_entries(&self) -> Result<VecDeque<log::Entry>, log::Error> {
        self.repository.read_entries()
    }

    fn add_log_entry(&self, entry: log::Entry) -> Result<(), log::Error> {
        self.repository.write_entry(entry)
    }
}

impl<R: SettingsRepository> SettingsService for Service<R> {
    async fn get_settings(&self) -> Result<Settings, String> {
        self.repository.read_settings().await
    }

    async fn set_settings(&self, settings: Settings) -> Result<(), String> {
        self.repository.write_settings(settings).await
    }
}

impl<R: OngoingWorkoutRepository> OngoingWorkoutService for Service<R> {
    async fn get_ongoing_workout(&self) -> Result<Option<ActiveWorkout>, String> {
        self.repository.read_ongoing_workout().await
    }

    async fn set_ongoing_workout(&self, workout: Option<ActiveWorkout>) -> Result<(), String> {
        self.repository.write_ongoing_workout(workout).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ::log::Level;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use liftbook_domain::{AppData, Routine};

    use crate::log::{self, Service as _};

    use super::*;

    #[derive(Default)]
    struct Repository {
        entries: Mutex<VecDeque<log::Entry>>,
        settings: Mutex<Option<Settings>>,
        workout: Mutex<Option<ActiveWorkout>>,
    }

    impl log::Repository for Repository {
        fn read_entries(&self) -> Result<VecDeque<log::Entry>, log::Error> {
            Ok(self.entries.lock().unwrap().clone())
        }

        fn write_entry(&self, entry: log::Entry) -> Result<(), log::Error> {
            self.entries.lock().unwrap().push_back(entry);
            Ok(())
        }
    }

    impl SettingsRepository for Repository {
        async fn read_settings(&self) -> Result<Settings, String> {
            Ok(self.settings.lock().unwrap().unwrap_or_default())
        }

        async fn write_settings(&self, settings: Settings) -> Result<(), String> {
            *self.settings.lock().unwrap() = Some(settings);
            Ok(())
        }
    }

    impl OngoingWorkoutRepository for Repository {
        async fn read_ongoing_workout(&self) -> Result<Option<ActiveWorkout>, String> {
            Ok(self.workout.lock().unwrap().clone())
        }

        async fn write_ongoing_workout(
            &self,
            workout: Option<ActiveWorkout>,
        ) -> Result<(), String> {
            *self.workout.lock().unwrap() = workout;
            Ok(())
        }
    }

    #[test]
    fn test_log_entries() {
        let service = Service::new(Repository::default());
        let entry = log::Entry {
            time: "Mar 01 18:00:00".into(),
            level: Level::Warn,
            message: "failed".into(),
        };
        service.add_log_entry(entry.clone()).unwrap();
        assert_eq!(service.get_log_entries().unwrap(), VecDeque::from([entry]));
    }

    #[tokio::test]
    async fn test_settings() {
        let service = Service::new(Repository::default());
        assert_eq!(service.get_settings().await.unwrap(), Settings::default());
        let settings = Settings {
            save_delay_ms: 1000,
            ..Settings::default()
        };
        service.set_settings(settings).await.unwrap();
        assert_eq!(service.get_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_ongoing_workout() {
        let service = Service::new(Repository::default());
        assert_eq!(service.get_ongoing_workout().await.unwrap(), None);

        let workout = ActiveWorkout::new(
            &Routine::new("Legs", "Strength"),
            &AppData::default(),
            90,
            Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
        );
        service
            .set_ongoing_workout(Some(workout.clone()))
            .await
            .unwrap();
        assert_eq!(service.get_ongoing_workout().await.unwrap(), Some(workout));

        service.set_ongoing_workout(None).await.unwrap();
        assert_eq!(service.get_ongoing_workout().await.unwrap(), None);
    }
}
