// tapo_p110.rs
use async_trait::async_trait;
use std::time::Duration;
use tapo::{ApiClient, PlugEnergyMonitoringHandler};
use tracing::debug;

use super::{Credentials, PlugConnector, PlugDevice};
use crate::{
    error::AppError,
    models::{DeviceInfo, EnergyUsage},
};

/// Talks to a P110 over the local network through the `tapo` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TapoConnector;

#[async_trait]
impl PlugConnector for TapoConnector {
    async fn open(
        &self,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn PlugDevice>, AppError> {
        debug!(address = %credentials.address, ?timeout, "Performing handshake and login");
        let handler = ApiClient::new(&credentials.username, &credentials.password)
            .with_timeout(timeout)
            .p110(credentials.address.clone())
            .await?;

        Ok(Box::new(TapoP110 { handler }))
    }
}

pub struct TapoP110 {
    handler: PlugEnergyMonitoringHandler,
}

#[async_trait]
impl PlugDevice for TapoP110 {
    async fn turn_on(&self) -> Result<(), AppError> {
        Ok(self.handler.on().await?)
    }

    async fn turn_off(&self) -> Result<(), AppError> {
        Ok(self.handler.off().await?)
    }

    async fn device_info(&self) -> Result<DeviceInfo, AppError> {
        let info = self.handler.get_device_info().await?;
        Ok(DeviceInfo {
            device_id: info.device_id,
            model: info.model,
            nickname: info.nickname,
            fw_ver: info.fw_ver,
            hw_ver: info.hw_ver,
            device_on: info.device_on,
            signal_level: info.signal_level,
            rssi: info.rssi,
        })
    }

    async fn energy_usage(&self) -> Result<EnergyUsage, AppError> {
        let usage = self.handler.get_energy_usage().await?;
        let power = self.handler.get_current_power().await?;
        Ok(EnergyUsage {
            current_power: power.current_power,
            today_energy: usage.today_energy,
            month_energy: usage.month_energy,
            today_runtime: usage.today_runtime,
            month_runtime: usage.month_runtime,
        })
    }
}
