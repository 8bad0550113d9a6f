use std::{
    collections::{BTreeMap, VecDeque},
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use ::log::debug;
use async_trait::async_trait;
use tempfile::NamedTempFile;

use liftbook_app::{ActiveWorkout, OngoingWorkoutRepository, Settings, SettingsRepository, log};
use liftbook_domain::{LEGACY_SLOT_KEY, LegacyRepository, StorageError};

use crate::io_error;

const KEY_SETTINGS: &str = "settings";
const KEY_ONGOING_WORKOUT: &str = "ongoing workout";
const KEY_LOG: &str = "log";

/// Flat string slots kept in a single JSON object file. Clones share the file and its lock.
///
/// The item methods block on file access. The repository implementations move it to the blocking
/// thread pool of the runtime, except for the log, which is written from synchronous code.
#[derive(Debug, Clone)]
pub struct KeyValueStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid content: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Error> for StorageError {
    fn from(value: Error) -> Self {
        match value {
            Error::Io(err) => io_error(err),
            Error::Json(err) => StorageError::Other(Box::new(err)),
        }
    }
}

impl KeyValueStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, Error> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(self.read_items()?.remove(key))
    }

    pub fn set_item(&self, key: &str, value: String) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut items = self.read_items()?;
        items.insert(key.to_string(), value);
        self.write_items(&items)
    }

    pub fn remove_item(&self, key: &str) -> Result<(), Error> {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut items = self.read_items()?;
        if items.remove(key).is_some() {
            self.write_items(&items)?;
        }
        Ok(())
    }

    async fn blocking<T, F>(&self, access: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T, Error> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || access(&store))
            .await
            .map_err(|err| Error::Io(io::Error::other(err)))?
    }

    fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.get_item(key)? {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    fn set<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        self.set_item(key, serde_json::to_string(value)?)
    }

    fn read_items(&self) -> Result<BTreeMap<String, String>, Error> {
        match fs::read(&self.path) {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_items(&self, items: &BTreeMap<String, String>) -> Result<(), Error> {
        let directory = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(directory)?;
        let mut file = NamedTempFile::new_in(directory)?;
        file.write_all(&serde_json::to_vec(items)?)?;
        file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

#[async_trait]
impl LegacyRepository for KeyValueStore {
    async fn read_legacy_slot(&self) -> Result<Option<String>, StorageError> {
        let slot = self.blocking(|s| s.get_item(LEGACY_SLOT_KEY)).await?;
        if slot.is_some() {
            debug!("found legacy data");
        }
        Ok(slot)
    }
}

impl SettingsRepository for KeyValueStore {
    async fn read_settings(&self) -> Result<Settings, String> {
        self.blocking(|s| s.get::<Settings>(KEY_SETTINGS))
            .await
            .map(Option::unwrap_or_default)
            .map_err(|err| err.to_string())
    }

    async fn write_settings(&self, settings: Settings) -> Result<(), String> {
        self.blocking(move |s| s.set(KEY_SETTINGS, &settings))
            .await
            .map_err(|err| err.to_string())
    }
}

impl OngoingWorkoutRepository for KeyValueStore {
    async fn read_ongoing_workout(&self) -> Result<Option<ActiveWorkout>, String> {
        self.blocking(|s| s.get::<ActiveWorkout>(KEY_ONGOING_WORKOUT))
            .await
            .map_err(|err| err.to_string())
    }

    async fn write_ongoing_workout(&self, workout: Option<ActiveWorkout>) -> Result<(), String> {
        self.blocking(move |s| match workout {
            Some(workout) => s.set(KEY_ONGOING_WORKOUT, &workout),
            None => s.remove_item(KEY_ONGOING_WORKOUT),
        })
        .await
        .map_err(|err| err.to_string())
    }
}

impl log::Repository for KeyValueStore {
    fn read_entries(&self) -> Result<VecDeque<log::Entry>, log::Error> {
        self.get(KEY_LOG)
            .map(Option::unwrap_or_default)
            .map_err(|err| log::Error::Unknown(err.to_string()))
    }

    fn write_entry(&self, entry: log::Entry) -> Result<(), log::Error> {
        let mut entries = self.read_entries()?;
        entries.push_front(entry);
        entries.truncate(log::CAPACITY);
        self.set(KEY_LOG, &entries)
            .map_err(|err| log::Error::Unknown(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use ::log::Level;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use liftbook_app::log::{self, Repository as _};
    use liftbook_domain::Routine;

    use crate::tests::data;

    use super::*;

    fn store() -> (KeyValueStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        (
            KeyValueStore::new(temp_dir.path().join("storage.json")),
            temp_dir,
        )
    }

    fn entry(message: &str) -> log::Entry {
        log::Entry {
            time: "Mar 01 18:00:00".into(),
            level: Level::Info,
            message: message.into(),
        }
    }

    #[test]
    fn test_items() {
        let (store, _temp) = store();
        assert_eq!(store.get_item("key").unwrap(), None);
        store.set_item("key", "value".into()).unwrap();
        assert_eq!(store.get_item("key").unwrap(), Some("value".into()));
        store.remove_item("key").unwrap();
        assert_eq!(store.get_item("key").unwrap(), None);
    }

    #[test]
    fn test_invalid_file() {
        let (store, _temp) = store();
        fs::write(&store.path, "[]").unwrap();
        assert!(matches!(store.get_item("key"), Err(Error::Json(_))));
    }

    #[tokio::test]
    async fn test_legacy_slot() {
        let (store, _temp) = store();
        assert_eq!(store.read_legacy_slot().await.unwrap(), None);
        store
            .set_item(LEGACY_SLOT_KEY, data::LEGACY_DOCUMENT.to_string())
            .unwrap();
        assert_eq!(
            store.read_legacy_slot().await.unwrap().as_deref(),
            Some(data::LEGACY_DOCUMENT)
        );
    }

    #[tokio::test]
    async fn test_settings() {
        let (store, _temp) = store();
        assert_eq!(store.read_settings().await.unwrap(), Settings::default());
        let settings = Settings {
            default_rest_seconds: 120,
            ..Settings::default()
        };
        store.write_settings(settings).await.unwrap();
        assert_eq!(store.read_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_ongoing_workout() {
        let (store, _temp) = store();
        assert_eq!(store.read_ongoing_workout().await.unwrap(), None);

        let workout = ActiveWorkout::new(
            &Routine::new("Legs", "Strength"),
            &data::APP_DATA,
            90,
            Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
        );
        store
            .write_ongoing_workout(Some(workout.clone()))
            .await
            .unwrap();
        assert_eq!(store.read_ongoing_workout().await.unwrap(), Some(workout));

        store.write_ongoing_workout(None).await.unwrap();
        assert_eq!(store.read_ongoing_workout().await.unwrap(), None);
    }

    #[test]
    fn test_log_keeps_newest_entries() {
        let (store, _temp) = store();
        for i in 0..=log::CAPACITY {
            store.write_entry(entry(&i.to_string())).unwrap();
        }
        let entries = store.read_entries().unwrap();
        assert_eq!(entries.len(), log::CAPACITY);
        assert_eq!(entries[0], entry(&log::CAPACITY.to_string()));
        assert_eq!(entries[log::CAPACITY - 1], entry("1"));
    }

    #[tokio::test]
    async fn test_clones_share_items() {
        let (store, temp) = store();
        let clone = store.clone();
        let writes = (0..10)
            .map(|i| {
                let store = store.clone();
                tokio::task::spawn_blocking(move || store.set_item(&i.to_string(), i.to_string()))
            })
            .collect::<Vec<_>>();
        for write in writes {
            write.await.unwrap().unwrap();
        }
        clone.write_settings(Settings::default()).await.unwrap();

        for i in 0..10 {
            assert_eq!(store.get_item(&i.to_string()).unwrap(), Some(i.to_string()));
        }
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let (store, _temp) = store();
        store
            .set_item(LEGACY_SLOT_KEY, data::LEGACY_DOCUMENT.to_string())
            .unwrap();
        store.write_settings(Settings::default()).await.unwrap();
        store.write_entry(entry("started")).unwrap();
        assert_eq!(
            store.read_legacy_slot().await.unwrap().as_deref(),
            Some(data::LEGACY_DOCUMENT)
        );
        assert_eq!(store.read_entries().unwrap().len(), 1);
    }
}
