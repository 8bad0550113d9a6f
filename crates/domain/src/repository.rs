use async_trait::async_trait;
use serde_json::Value;

use crate::{AccountID, StorageError};

/// Flat key of the pre-database storage slot.
pub const LEGACY_SLOT_KEY: &str = "workout-app-data";

/// Per-device document storage. One raw document per key.
#[async_trait]
pub trait LocalRepository: Send + Sync + 'static {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn save(&self, key: &str, document: &Value) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LegacyRepository: Send + Sync + 'static {
    async fn read_legacy_slot(&self) -> Result<Option<String>, StorageError>;
}

pub type OnChange = Box<dyn Fn(Value) + Send + Sync>;

/// Cloud document storage. Implementations strip their own metadata on load and stamp it on
/// save.
#[async_trait]
pub trait CloudRepository: Send + Sync + 'static {
    async fn load(&self, account: &AccountID) -> Result<Option<Value>, StorageError>;
    async fn save(&self, account: &AccountID, document: &Value) -> Result<(), StorageError>;

    /// Registers a listener for remote changes of the account's document, including changes
    /// caused by this client. Connection failures are logged, not returned.
    fn subscribe(&self, account: &AccountID, on_change: OnChange) -> Subscription;
}

/// Handle of a live subscription. Dropping it unsubscribes.
#[must_use]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
