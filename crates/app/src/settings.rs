use std::time::Duration;

#[allow(async_fn_in_trait)]
pub trait SettingsService {
    async fn get_settings(&self) -> Result<Settings, String>;
    async fn set_settings(&self, settings: Settings) -> Result<(), String>;
}

#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    async fn read_settings(&self) -> Result<Settings, String>;
    async fn write_settings(&self, settings: Settings) -> Result<(), String>;
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Quiet period after the last change before data is saved.
    pub save_delay_ms: u64,
    pub default_rest_seconds: u32,
    pub cloud_poll_interval_ms: u64,
}

impl Settings {
    #[must_use]
    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    #[must_use]
    pub fn cloud_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cloud_poll_interval_ms)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_delay_ms: 500,
            default_rest_seconds: 90,
            cloud_poll_interval_ms: 5000,
        }
    }
}
