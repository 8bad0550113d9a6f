#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

/// Passthrough for fields written by other (newer) clients.
pub type Extra = serde_json::Map<String, serde_json::Value>;

macro_rules! string_id {
    ($name: ident) => {
        #[derive(
            derive_more::Deref,
            derive_more::Display,
            Debug,
            Default,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

mod app_data;
mod document;
mod equipment;
mod error;
mod exchange;
mod exercise;
pub mod history;
mod repository;
mod routine;
mod user;
mod workout;

pub use app_data::AppData;
pub use document::{SCHEMA_VERSION, decode, encode, migrate, migrate_routine, parse, version};
pub use equipment::{Equipment, EquipmentID};
pub use error::{
    AccountError, AuthError, ImportError, MigrationError, ReadError, StorageError, WriteError,
};
pub use exchange::{export_file_name, export_json, html_report, import_json};
pub use exercise::{Exercise, ExerciseID, TrackingType};
pub use repository::{
    CloudRepository, LEGACY_SLOT_KEY, LegacyRepository, LocalRepository, OnChange, Subscription,
};
pub use routine::{Routine, RoutineExercise, RoutineID};
pub use user::{AccountID, AuthProvider, CloudAccount, LOCAL_ACCOUNT_KEY, LOCAL_USER_EMAIL, User};
pub use workout::{WorkoutExerciseLog, WorkoutLog, WorkoutLogID, WorkoutSet};
