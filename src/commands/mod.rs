// commands/mod.rs
use std::{fmt, str::FromStr};
use tracing::info;

use crate::{controller::PlugController, error::AppError, models::CommandResponse};

/// Every action the command endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlugCommand {
    TurnOn,
    TurnOff,
    Toggle,
    GetStatus,
    GetEnergy,
    TestConnection,
}

impl PlugCommand {
    pub const ALL: [PlugCommand; 6] = [
        Self::TurnOn,
        Self::TurnOff,
        Self::Toggle,
        Self::GetStatus,
        Self::GetEnergy,
        Self::TestConnection,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Toggle => "toggle",
            Self::GetStatus => "get_status",
            Self::GetEnergy => "get_energy",
            Self::TestConnection => "test_connection",
        }
    }

    pub async fn execute(self, plug: &PlugController) -> CommandResponse {
        info!(command = self.name(), "Executing command");
        match self {
            Self::TurnOn => CommandResponse::Success {
                success: plug.turn_on().await,
            },
            Self::TurnOff => CommandResponse::Success {
                success: plug.turn_off().await,
            },
            Self::Toggle => CommandResponse::Success {
                success: plug.toggle().await,
            },
            Self::GetStatus => CommandResponse::Status {
                status: plug.get_status().await,
            },
            Self::GetEnergy => CommandResponse::Energy {
                energy: plug.get_energy().await,
            },
            Self::TestConnection => CommandResponse::Success {
                success: plug.test_connection().await,
            },
        }
    }
}

impl FromStr for PlugCommand {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.name() == s)
            .ok_or_else(|| AppError::UnsupportedCommand(s.to_string()))
    }
}

impl fmt::Display for PlugCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
