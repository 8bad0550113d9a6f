//! Session
//!
//! The session owns the active user, the active data and the view selection. It is the only
//! place that decides whether data is read from and written to the local store or the cloud
//! store.
//!
//! Saves are debounced and replace the whole document. Concurrent edits on several devices are
//! not reconciled: the last save wins.
//!
//! Stored data that exists but cannot be loaded is never overwritten implicitly. The session
//! stays read-only until the data arrives from the cloud subscription, the binding is loaded
//! again, or the caller discards the stored data explicitly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::mpsc;

use liftbook_domain::{
    self as domain, AccountError, AccountID, AppData, AuthError, AuthProvider, CloudAccount,
    CloudRepository, ImportError, LOCAL_ACCOUNT_KEY, LOCAL_USER_EMAIL, LegacyRepository,
    LocalRepository, RoutineID, StorageError, Subscription, User, WorkoutLogID, WriteError,
};

use crate::{ActiveWorkout, Settings, scheduler::SaveScheduler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Local { key: String },
    Cloud { account: CloudAccount },
}

impl Binding {
    fn target(&self) -> Target {
        match self {
            Binding::Local { key } => Target::Local(key.clone()),
            Binding::Cloud { account } => Target::Cloud(account.id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Checking,
    Bound(Binding),
}

/// Where a change of the active data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    LocalEdit,
    /// Change delivered by the cloud subscription. Must not be saved again.
    RemoteEcho,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    StorageQuotaExceeded,
    CloudUnavailable,
    /// Stored data exists but cannot be read. Changes are not saved.
    DataUnreadable,
    AccountNotFound(String),
    AccountAlreadyExists(String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum View {
    #[default]
    Dashboard,
    Workout,
    History,
    TrainingCenter,
    Settings,
}

enum Loaded {
    Data(AppData),
    /// Stored data exists but could not be loaded. Saving would overwrite it.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Local(String),
    Cloud(AccountID),
}

/// Write access to both stores, shared with scheduled saves.
struct Writer<L, C> {
    local: Arc<L>,
    cloud: Arc<C>,
    notifications: mpsc::UnboundedSender<Notification>,
}

impl<L, C> Clone for Writer<L, C> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            cloud: self.cloud.clone(),
            notifications: self.notifications.clone(),
        }
    }
}

impl<L: LocalRepository, C: CloudRepository> Writer<L, C> {
    async fn write(&self, target: &Target, data: &AppData) -> Result<(), WriteError> {
        let document = domain::encode(data)?;
        let result = match target {
            Target::Local(key) => self.local.save(key, &document).await,
            Target::Cloud(account) => self.cloud.save(account, &document).await,
        };
        match result {
            Ok(()) => {
                debug!("saved data to {target:?}");
                Ok(())
            }
            Err(err) => {
                match err {
                    StorageError::QuotaExceeded => {
                        error!("failed to save data to {target:?}: {err}");
                        let _ = self
                            .notifications
                            .send(Notification::StorageQuotaExceeded);
                    }
                    StorageError::NoConnection | StorageError::PermissionDenied => {
                        warn!("failed to save data to {target:?}: {err}");
                        let _ = self.notifications.send(Notification::CloudUnavailable);
                    }
                    StorageError::Other(_) => {
                        error!("failed to save data to {target:?}: {err}");
                    }
                }
                Err(err.into())
            }
        }
    }
}

pub struct Session<L, C, A> {
    local: Arc<L>,
    cloud: Arc<C>,
    auth: A,
    settings: Settings,
    writer: Writer<L, C>,
    state: State,
    user: User,
    data: AppData,
    read_only: bool,
    view: View,
    scheduler: SaveScheduler,
    subscription: Option<Subscription>,
    remote_changes: Option<mpsc::UnboundedReceiver<Value>>,
    notifications: mpsc::UnboundedReceiver<Notification>,
}

impl<L, C, A> Session<L, C, A>
where
    L: LocalRepository + LegacyRepository,
    C: CloudRepository,
    A: AuthProvider,
{
    pub fn new(local: Arc<L>, cloud: Arc<C>, auth: A, settings: Settings) -> Self {
        let (sender, notifications) = mpsc::unbounded_channel();
        Self {
            writer: Writer {
                local: local.clone(),
                cloud: cloud.clone(),
                notifications: sender,
            },
            local,
            cloud,
            auth,
            settings,
            state: State::Checking,
            user: User::local(),
            data: AppData::default(),
            read_only: false,
            view: View::default(),
            scheduler: SaveScheduler::default(),
            subscription: None,
            remote_changes: None,
            notifications,
        }
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }

    #[must_use]
    pub fn binding(&self) -> Option<&Binding> {
        match &self.state {
            State::Checking => None,
            State::Bound(binding) => Some(binding),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Bound(_))
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn data(&self) -> &AppData {
        &self.data
    }

    /// Whether changes are kept in memory only because the stored data could not be loaded.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    #[must_use]
    pub fn has_pending_save(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Binds the session to the cloud if a previous sign-in is still valid, and to the local
    /// account otherwise.
    pub async fn start(&mut self) {
        self.state = State::Checking;
        match self.auth.current_account().await {
            Ok(Some(account)) => self.bind_cloud(account).await,
            Ok(None) => self.bind_local(LOCAL_ACCOUNT_KEY, User::local()).await,
            Err(err) => {
                warn!("failed to check for an existing sign-in: {err}");
                self.bind_local(LOCAL_ACCOUNT_KEY, User::local()).await;
            }
        }
    }

    /// Switches to an existing local account.
    pub async fn login(&mut self, identifier: &str) -> Result<(), AccountError> {
        let identifier = validate_identifier(identifier)?;
        if self.local.load(identifier).await?.is_none() {
            self.notify(Notification::AccountNotFound(identifier.to_string()));
            return Err(AccountError::NotFound(identifier.to_string()));
        }
        self.leave_cloud().await;
        self.bind_local(identifier, User::with_identifier(identifier))
            .await;
        Ok(())
    }

    /// Creates a local account with empty data and switches to it.
    pub async fn register(&mut self, identifier: &str) -> Result<(), AccountError> {
        let identifier = validate_identifier(identifier)?;
        if self.local.load(identifier).await?.is_some() {
            self.notify(Notification::AccountAlreadyExists(identifier.to_string()));
            return Err(AccountError::AlreadyExists(identifier.to_string()));
        }
        self.writer
            .write(&Target::Local(identifier.to_string()), &AppData::default())
            .await?;
        self.leave_cloud().await;
        self.bind_local(identifier, User::with_identifier(identifier))
            .await;
        Ok(())
    }

    pub async fn sign_in_with_cloud(&mut self) -> Result<(), AuthError> {
        let account = self.auth.sign_in().await?;
        info!("signed in as {}", account.email);
        self.bind_cloud(account).await;
        Ok(())
    }

    /// Returns to the account-less local data.
    pub async fn logout(&mut self) {
        self.leave_cloud().await;
        self.bind_local(LOCAL_ACCOUNT_KEY, User::local()).await;
    }

    /// Applies a local edit and schedules a save.
    pub fn update(&mut self, edit: impl FnOnce(&mut AppData)) {
        edit(&mut self.data);
        self.commit(UpdateOrigin::LocalEdit);
    }

    /// Adopts data received from the cloud subscription without saving it again.
    pub fn apply_remote(&mut self, data: AppData) {
        self.data = data;
        self.read_only = false;
        self.commit(UpdateOrigin::RemoteEcho);
    }

    /// Allows saves to replace stored data that could not be loaded. Confirmation is up to the
    /// caller.
    pub fn discard_unreadable(&mut self) {
        if self.read_only {
            warn!("stored data of {} will be replaced", self.user.email);
            self.read_only = false;
        }
    }

    /// Waits for the next change of the cloud document and applies it. Returns `false` if the
    /// session has no live subscription.
    pub async fn next_remote_change(&mut self) -> bool {
        loop {
            let Some(remote_changes) = self.remote_changes.as_mut() else {
                return false;
            };
            let Some(document) = remote_changes.recv().await else {
                return false;
            };
            match domain::decode(document) {
                Ok(data) => {
                    self.apply_remote(data);
                    return true;
                }
                Err(err) => error!("ignoring invalid remote document: {err}"),
            }
        }
    }

    /// Replaces all data by the content of a backup file. Confirmation is up to the caller.
    /// While the session is read-only, the imported data is not saved.
    pub fn import(&mut self, text: &str) -> Result<(), ImportError> {
        let data = domain::import_json(text)?;
        info!(
            "importing {} exercises, {} routines and {} logs",
            data.exercises.len(),
            data.routines.len(),
            data.logs.len()
        );
        self.update(move |d| *d = data);
        Ok(())
    }

    pub fn export(&self) -> Result<String, serde_json::Error> {
        domain::export_json(&self.data)
    }

    #[must_use]
    pub fn report(&self) -> String {
        domain::html_report(&self.data)
    }

    #[must_use]
    pub fn start_workout(&self, routine_id: &RoutineID, now: DateTime<Utc>) -> Option<ActiveWorkout> {
        let routine = self.data.routine(routine_id)?;
        Some(ActiveWorkout::new(
            routine,
            &self.data,
            self.settings.default_rest_seconds,
            now,
        ))
    }

    pub fn finish_workout(&mut self, workout: ActiveWorkout, now: DateTime<Utc>) -> WorkoutLogID {
        let log = workout.finish(now);
        let id = log.id.clone();
        self.update(move |d| d.add_log(log));
        self.view = View::History;
        id
    }

    /// Pending user-facing alerts, oldest first.
    pub fn notifications(&mut self) -> Vec<Notification> {
        let mut result = vec![];
        while let Ok(notification) = self.notifications.try_recv() {
            result.push(notification);
        }
        result
    }

    /// Writes a pending save immediately.
    pub async fn flush(&mut self) {
        self.scheduler.flush().await;
    }

    /// Cancels a pending save and ends the cloud subscription.
    pub fn close(&mut self) {
        self.scheduler.cancel();
        self.unsubscribe();
    }

    fn commit(&mut self, origin: UpdateOrigin) {
        let State::Bound(binding) = &self.state else {
            warn!("not saving change made before data was loaded");
            return;
        };
        match origin {
            UpdateOrigin::LocalEdit if self.read_only => {
                warn!("not saving change, stored data could not be loaded");
            }
            UpdateOrigin::LocalEdit => {
                let writer = self.writer.clone();
                let target = binding.target();
                let data = self.data.clone();
                self.scheduler.schedule(self.settings.save_delay(), async move {
                    let _ = writer.write(&target, &data).await;
                });
            }
            UpdateOrigin::RemoteEcho => {
                self.scheduler.cancel();
                debug!("not saving remote change");
            }
        }
    }

    async fn bind_local(&mut self, key: &str, user: User) {
        self.unbind().await;
        self.user = user;
        let loaded = self.load_local(key).await;
        self.adopt(loaded);
        self.state = State::Bound(Binding::Local {
            key: key.to_string(),
        });
        info!("bound to local data of {}", self.user.email);
    }

    async fn bind_cloud(&mut self, account: CloudAccount) {
        self.unbind().await;
        self.user = User::with_identifier(&account.email);
        let loaded = match self.cloud.load(&account.id).await {
            Ok(Some(document)) => self.decode_stored(document, "cloud"),
            Ok(None) => Loaded::Data(self.promote_local(&account).await),
            Err(err) => {
                warn!("failed to load cloud data: {err}");
                self.notify(Notification::CloudUnavailable);
                Loaded::Unavailable
            }
        };
        self.adopt(loaded);
        self.subscribe(&account);
        info!("bound to cloud data of {}", account.email);
        self.state = State::Bound(Binding::Cloud { account });
    }

    fn adopt(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Data(data) => {
                self.data = data;
                self.read_only = false;
            }
            Loaded::Unavailable => {
                self.data = AppData::default();
                self.read_only = true;
            }
        }
    }

    async fn load_local(&self, key: &str) -> Loaded {
        match self.local.load(key).await {
            Ok(Some(document)) => self.decode_stored(document, "local"),
            Ok(None) if key == LOCAL_ACCOUNT_KEY => Loaded::Data(self.load_legacy_slot(key).await),
            Ok(None) => Loaded::Data(AppData::default()),
            Err(err) => {
                error!("failed to load local data: {err}");
                self.notify(Notification::DataUnreadable);
                Loaded::Unavailable
            }
        }
    }

    fn decode_stored(&self, document: Value, source: &str) -> Loaded {
        match domain::decode(document) {
            Ok(data) => Loaded::Data(data),
            Err(err) => {
                error!("failed to decode {source} data: {err}");
                self.notify(Notification::DataUnreadable);
                Loaded::Unavailable
            }
        }
    }

    /// Moves data of a version that stored it outside the local database into the database.
    /// The slot itself is left untouched.
    async fn load_legacy_slot(&self, key: &str) -> AppData {
        let text = match self.local.read_legacy_slot().await {
            Ok(Some(text)) => text,
            Ok(None) => return AppData::default(),
            Err(err) => {
                error!("failed to read legacy data: {err}");
                return AppData::default();
            }
        };
        match domain::parse(&text) {
            Ok(data) => {
                info!("migrating legacy data into local database");
                let _ = self
                    .writer
                    .write(&Target::Local(key.to_string()), &data)
                    .await;
                data
            }
            Err(err) => {
                error!("failed to parse legacy data: {err}");
                AppData::default()
            }
        }
    }

    /// Uses local data of the same identity as initial cloud data.
    async fn promote_local(&self, account: &CloudAccount) -> AppData {
        match self.local.load(&account.email).await {
            Ok(Some(document)) => match domain::decode(document) {
                Ok(data) => {
                    info!("moving local data of {} into the cloud", account.email);
                    let _ = self
                        .writer
                        .write(&Target::Cloud(account.id.clone()), &data)
                        .await;
                    data
                }
                Err(err) => {
                    error!("failed to decode local data: {err}");
                    AppData::default()
                }
            },
            Ok(None) => AppData::default(),
            Err(err) => {
                error!("failed to load local data: {err}");
                AppData::default()
            }
        }
    }

    fn subscribe(&mut self, account: &CloudAccount) {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscription = Some(self.cloud.subscribe(
            &account.id,
            Box::new(move |document| {
                let _ = sender.send(document);
            }),
        ));
        self.remote_changes = Some(receiver);
    }

    fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.remote_changes = None;
    }

    /// A pending save was scheduled for the previous binding and is written there.
    async fn unbind(&mut self) {
        self.scheduler.flush().await;
        self.unsubscribe();
        self.state = State::Checking;
    }

    async fn leave_cloud(&mut self) {
        if let State::Bound(Binding::Cloud { .. }) = self.state {
            self.unbind().await;
            if let Err(err) = self.auth.sign_out().await {
                warn!("failed to sign out: {err}");
            }
        }
    }

    fn notify(&self, notification: Notification) {
        let _ = self.writer.notifications.send(notification);
    }
}

fn validate_identifier(identifier: &str) -> Result<&str, AccountError> {
    let identifier = identifier.trim();
    if identifier.is_empty() || identifier == LOCAL_ACCOUNT_KEY || identifier == LOCAL_USER_EMAIL {
        return Err(AccountError::InvalidIdentifier);
    }
    Ok(identifier)
}
