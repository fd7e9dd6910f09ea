// fake.rs
//! Scripted in-memory plug for exercising the connection policy.
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use super::{Credentials, PlugConnector, PlugDevice};
use crate::{
    error::AppError,
    models::{DeviceInfo, EnergyUsage},
};

#[derive(Debug, Default)]
pub struct FakePlugState {
    pub device_on: bool,
    pub model: String,
    pub energy: EnergyUsage,
    /// Ceiling passed to every `open` call, in order.
    pub open_timeouts: Vec<Duration>,
    /// Relay calls in order: "on" / "off".
    pub switch_calls: Vec<&'static str>,
    pub info_calls: usize,
    pub energy_calls: usize,
    pub open_delay: Option<Duration>,
    pub open_failures: VecDeque<AppError>,
    pub info_failures: VecDeque<AppError>,
    pub switch_failures: VecDeque<AppError>,
    pub energy_failures: VecDeque<AppError>,
    /// Every `open` fails with a connection error.
    pub unreachable: bool,
}

#[derive(Debug, Clone)]
pub struct FakeConnector {
    state: Arc<Mutex<FakePlugState>>,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlugState {
                model: "P110".to_string(),
                ..FakePlugState::default()
            })),
        }
    }
}

impl FakeConnector {
    pub fn state(&self) -> MutexGuard<'_, FakePlugState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl PlugConnector for FakeConnector {
    async fn open(
        &self,
        _credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Box<dyn PlugDevice>, AppError> {
        let (delay, outcome) = {
            let mut state = self.state();
            state.open_timeouts.push(timeout);
            let outcome = if state.unreachable {
                Err(AppError::Connection("host unreachable".into()))
            } else {
                state.open_failures.pop_front().map_or(Ok(()), Err)
            };
            (state.open_delay, outcome)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome?;

        Ok(Box::new(FakeDevice {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeDevice {
    state: Arc<Mutex<FakePlugState>>,
}

impl FakeDevice {
    fn switch(&self, on: bool) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.switch_calls.push(if on { "on" } else { "off" });
        if let Some(err) = state.switch_failures.pop_front() {
            return Err(err);
        }
        state.device_on = on;
        Ok(())
    }
}

#[async_trait]
impl PlugDevice for FakeDevice {
    async fn turn_on(&self) -> Result<(), AppError> {
        self.switch(true)
    }

    async fn turn_off(&self) -> Result<(), AppError> {
        self.switch(false)
    }

    async fn device_info(&self) -> Result<DeviceInfo, AppError> {
        let mut state = self.state.lock().unwrap();
        state.info_calls += 1;
        if let Some(err) = state.info_failures.pop_front() {
            return Err(err);
        }
        Ok(DeviceInfo {
            device_id: "8022A1B2C3".to_string(),
            model: state.model.clone(),
            nickname: "Printer".to_string(),
            fw_ver: "1.3.1 Build 240621".to_string(),
            hw_ver: "1.0".to_string(),
            device_on: state.device_on,
            signal_level: 3,
            rssi: -48,
        })
    }

    async fn energy_usage(&self) -> Result<EnergyUsage, AppError> {
        let mut state = self.state.lock().unwrap();
        state.energy_calls += 1;
        if let Some(err) = state.energy_failures.pop_front() {
            return Err(err);
        }
        Ok(state.energy.clone())
    }
}
