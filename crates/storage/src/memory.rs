//! In-memory backends
//!
//! Volatile implementations of the local store, the cloud store and the identity provider. They
//! back demos and tests and behave like their persistent counterparts, including the storage
//! quota of the local store and the change notifications of the cloud store.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde_json::Value;

use liftbook_domain::{
    AccountID, AuthError, AuthProvider, CloudAccount, CloudRepository, LegacyRepository,
    LocalRepository, OnChange, StorageError, Subscription,
};

use crate::{stamp, strip};

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Value>>,
    legacy_slot: Mutex<Option<String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    /// Limits the total size of all serialized documents in bytes.
    #[must_use]
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub fn set_legacy_slot(&self, text: Option<String>) {
        *lock(&self.legacy_slot) = text;
    }

    #[must_use]
    pub fn document(&self, key: &str) -> Option<Value> {
        lock(&self.documents).get(key).cloned()
    }
}

#[async_trait]
impl LocalRepository for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.document(key))
    }

    async fn save(&self, key: &str, document: &Value) -> Result<(), StorageError> {
        let mut documents = lock(&self.documents);
        if let Some(quota) = self.quota {
            let used = documents
                .iter()
                .filter(|(k, _)| *k != key)
                .map(|(_, d)| d.to_string().len())
                .sum::<usize>();
            if used + document.to_string().len() > quota {
                return Err(StorageError::QuotaExceeded);
            }
        }
        documents.insert(key.to_string(), document.clone());
        Ok(())
    }
}

#[async_trait]
impl LegacyRepository for MemoryStore {
    async fn read_legacy_slot(&self) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.legacy_slot).clone())
    }
}

struct Subscriber {
    id: u64,
    account: AccountID,
    on_change: Arc<OnChange>,
}

/// Notifies subscribers synchronously on every save, including saves of the subscriber itself.
#[derive(Default)]
pub struct MemoryCloud {
    documents: Mutex<HashMap<AccountID, Value>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    next_subscriber: AtomicU64,
    offline: AtomicBool,
}

impl MemoryCloud {
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Stored document including metadata.
    #[must_use]
    pub fn document(&self, account: &AccountID) -> Option<Value> {
        lock(&self.documents).get(account).cloned()
    }

    fn check_connection(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            debug!("cloud store is offline");
            return Err(StorageError::NoConnection);
        }
        Ok(())
    }
}

#[async_trait]
impl CloudRepository for MemoryCloud {
    async fn load(&self, account: &AccountID) -> Result<Option<Value>, StorageError> {
        self.check_connection()?;
        Ok(self.document(account).map(strip))
    }

    async fn save(&self, account: &AccountID, document: &Value) -> Result<(), StorageError> {
        self.check_connection()?;
        lock(&self.documents).insert(account.clone(), stamp(document, Utc::now()));
        let listeners = lock(&self.subscribers)
            .iter()
            .filter(|s| &s.account == account)
            .map(|s| s.on_change.clone())
            .collect::<Vec<_>>();
        for on_change in listeners {
            on_change(document.clone());
        }
        Ok(())
    }

    fn subscribe(&self, account: &AccountID, on_change: OnChange) -> Subscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        lock(&self.subscribers).push(Subscriber {
            id,
            account: account.clone(),
            on_change: Arc::new(on_change),
        });
        let subscribers = self.subscribers.clone();
        Subscription::new(move || lock(&subscribers).retain(|s| s.id != id))
    }
}

/// Identity provider with a fixed account offered on interactive sign-in.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    current: Mutex<Option<CloudAccount>>,
    offered: Mutex<Option<CloudAccount>>,
}

impl MemoryAuth {
    /// Account returned by the next sign-in. Without one, sign-in is cancelled.
    pub fn offer(&self, account: Option<CloudAccount>) {
        *lock(&self.offered) = account;
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn current_account(&self) -> Result<Option<CloudAccount>, AuthError> {
        Ok(lock(&self.current).clone())
    }

    async fn sign_in(&self) -> Result<CloudAccount, AuthError> {
        let account = lock(&self.offered).clone().ok_or(AuthError::Cancelled)?;
        *lock(&self.current) = Some(account.clone());
        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *lock(&self.current) = None;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
