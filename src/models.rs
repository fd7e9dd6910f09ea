use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::SettingsStore, controller::PlugController, events::EventBus};

/// Device info snapshot as reported by the plug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceInfo {
    pub device_id: String,
    pub model: String,
    pub nickname: String,
    pub fw_ver: String,
    pub hw_ver: String,
    pub device_on: bool,
    pub signal_level: u8,
    pub rssi: i16,
}

/// Energy reading. Power is in milliwatts, energy in watt-hours and
/// runtimes in minutes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnergyUsage {
    pub current_power: u64,
    pub today_energy: u64,
    pub month_energy: u64,
    pub today_runtime: u64,
    pub month_runtime: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EnergySample {
    pub energy: EnergyUsage,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CommandResponse {
    Success { success: bool },
    Status { status: Option<DeviceInfo> },
    Energy { energy: Option<EnergyUsage> },
}

/// Event forwarded by the printer host, e.g. `PrintStarted`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct HostEvent {
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connected,
    Disconnected,
    /// Another caller currently holds the connection lock.
    Busy,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlugStateView {
    pub session: SessionState,
    pub session_id: Option<Uuid>,
    pub last_status: Option<bool>,
    pub last_energy: Option<EnergySample>,
}

pub struct AppState {
    pub plug: Arc<PlugController>,
    pub settings: Arc<SettingsStore>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(plug: Arc<PlugController>, settings: Arc<SettingsStore>) -> Self {
        Self {
            plug,
            settings,
            events: EventBus::new(),
        }
    }
}
