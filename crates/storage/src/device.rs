use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use liftbook_domain::{LegacyRepository, LocalRepository, StorageError};

use crate::{FileStore, KeyValueStore};

/// Local storage of one device: workout documents per account and the flat key/value slots.
#[derive(Debug, Clone)]
pub struct Device {
    pub documents: FileStore,
    pub slots: Arc<KeyValueStore>,
}

impl Device {
    #[must_use]
    pub fn open(directory: &Path) -> Self {
        Self {
            documents: FileStore::new(directory.join("documents")),
            slots: Arc::new(KeyValueStore::new(directory.join("storage.json"))),
        }
    }
}

#[async_trait]
impl LocalRepository for Device {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.documents.load(key).await
    }

    async fn save(&self, key: &str, document: &Value) -> Result<(), StorageError> {
        self.documents.save(key, document).await
    }
}

#[async_trait]
impl LegacyRepository for Device {
    async fn read_legacy_slot(&self) -> Result<Option<String>, StorageError> {
        self.slots.read_legacy_slot().await
    }
}
