// devices/mod.rs
mod tapo_p110;
#[cfg(test)]
pub mod fake;

pub use tapo_p110::TapoConnector;

use std::time::Duration;

use crate::{
    config::PlugSettings,
    error::AppError,
    models::{DeviceInfo, EnergyUsage},
};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub address: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_settings(settings: &PlugSettings) -> Result<Self, AppError> {
        let required = [
            ("device_ip", &settings.device_ip),
            ("username", &settings.username),
            ("password", &settings.password),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::NotConfigured(*field));
        }

        Ok(Self {
            address: settings.device_ip.trim().to_string(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }
}

/// Opens authenticated handles to a plug.
#[async_trait::async_trait]
pub trait PlugConnector: Send + Sync {
    /// Runs the handshake and login, using `timeout` for each request.
    async fn open(
        &self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn PlugDevice>, AppError>;
}

#[async_trait::async_trait]
pub trait PlugDevice: Send + Sync {
    async fn turn_on(&self) -> Result<(), AppError>;
    async fn turn_off(&self) -> Result<(), AppError>;
    async fn device_info(&self) -> Result<DeviceInfo, AppError>;
    async fn energy_usage(&self) -> Result<EnergyUsage, AppError>;
}
