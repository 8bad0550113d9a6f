//! File store
//!
//! One JSON file per key below a root directory. Documents are replaced atomically: the new
//! content is written to a temporary file of its own which is renamed over the previous one, so a
//! failed write leaves the previous document intact and overlapping writes do not interfere.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use async_trait::async_trait;
use log::{debug, error};
use serde_json::Value;
use tempfile::NamedTempFile;
use tokio::fs;

use liftbook_domain::{LocalRepository, StorageError};

use crate::{escape_key, io_error};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", escape_key(key)))
    }

    async fn write(&self, path: PathBuf, content: Vec<u8>) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            // Removed on drop if any step fails.
            let mut file = NamedTempFile::new_in(&root)?;
            file.write_all(&content)?;
            file.as_file().sync_all()?;
            file.persist(&path).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)?
    }
}

#[async_trait]
impl LocalRepository for FileStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path(key);
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no document for {key}");
                return Ok(None);
            }
            Err(err) => return Err(io_error(err)),
        };
        serde_json::from_slice(&content).map(Some).map_err(|err| {
            error!("invalid content in {}: {err}", path.display());
            StorageError::Other(Box::new(err))
        })
    }

    async fn save(&self, key: &str, document: &Value) -> Result<(), StorageError> {
        let content =
            serde_json::to_vec(document).map_err(|err| StorageError::Other(Box::new(err)))?;
        let len = content.len();
        self.write(self.path(key), content)
            .await
            .map_err(io_error)?;
        debug!("wrote {len} bytes for {key}");
        Ok(())
    }
}
