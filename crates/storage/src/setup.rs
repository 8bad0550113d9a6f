//! Wiring of the stores of a device into a running session.

use std::{path::Path, sync::Arc};

use ::log::{LevelFilter, debug, info, warn};

use liftbook_app::{Service, Session, Settings, SettingsService, log};
use liftbook_domain::{AuthProvider, StorageError};

use crate::{Device, KeyValueStore, ReqwestSendRequest, RestCloud};

pub type DeviceSession<A> = Session<Device, RestCloud<ReqwestSendRequest>, A>;

pub struct Liftbook<A> {
    pub device: Device,
    /// Log, settings and ongoing workout of the device.
    pub service: Service<KeyValueStore>,
    pub session: DeviceSession<A>,
}

/// Opens the storage in `directory`, persists log records there and starts a session bound to
/// the cloud store at `cloud_url` or to the local store.
pub async fn open<A: AuthProvider>(
    directory: &Path,
    cloud_url: &str,
    auth: A,
    level: LevelFilter,
) -> Result<Liftbook<A>, StorageError> {
    let device = Device::open(directory);
    if log::init(device.slots.clone(), level).is_err() {
        debug!("logger already installed, switching log storage");
    }

    let service = Service::new((*device.slots).clone());
    let settings = service.get_settings().await.unwrap_or_else(|err| {
        warn!("failed to read settings, using defaults: {err}");
        Settings::default()
    });
    let cloud = RestCloud::new(cloud_url, settings.cloud_poll_interval())?;

    let mut session = Session::new(Arc::new(device.clone()), Arc::new(cloud), auth, settings);
    session.start().await;
    info!("opened storage in {}", directory.display());

    Ok(Liftbook {
        device,
        service,
        session,
    })
}
