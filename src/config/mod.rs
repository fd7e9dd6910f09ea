// config/mod.rs
use config::Config;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub metrics: MetricsSettings,
    pub plug: PlugSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:5080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9110,
        }
    }
}

/// Device address, credentials and automation switches for the plug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PlugSettings {
    pub device_ip: String,
    pub username: String,
    /// Write-only: accepted on save, never served back.
    #[serde(skip_serializing)]
    #[schema(write_only)]
    pub password: String,
    pub auto_on_print_start: bool,
    pub auto_off_print_end: bool,
    /// Seconds between a finished print and the plug switching off.
    #[validate(range(max = 86_400))]
    pub auto_off_delay: u64,
    pub enable_energy_monitoring: bool,
    /// Seconds between energy polls.
    #[validate(range(min = 1, max = 86_400))]
    pub energy_update_interval: u64,
}

impl Default for PlugSettings {
    fn default() -> Self {
        Self {
            device_ip: String::new(),
            username: String::new(),
            password: String::new(),
            auto_on_print_start: false,
            auto_off_print_end: false,
            auto_off_delay: 300,
            enable_energy_monitoring: true,
            energy_update_interval: 30,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("config/config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Runtime copy of the plug settings, replaced wholesale on save.
#[derive(Debug)]
pub struct SettingsStore {
    current: RwLock<PlugSettings>,
}

impl SettingsStore {
    pub fn new(settings: PlugSettings) -> Self {
        Self {
            current: RwLock::new(settings),
        }
    }

    pub async fn snapshot(&self) -> PlugSettings {
        self.current.read().await.clone()
    }

    pub async fn replace(&self, settings: PlugSettings) -> Result<(), AppError> {
        settings.validate()?;
        *self.current.write().await = settings;
        Ok(())
    }
}
