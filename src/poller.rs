// poller.rs
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::{config::SettingsStore, controller::PlugController};

/// Pause after a failed fetch before the loop resumes.
pub const FALLBACK_DELAY: Duration = Duration::from_secs(60);

pub fn spawn_energy_poller(
    plug: Arc<PlugController>,
    settings: Arc<SettingsStore>,
) -> JoinHandle<()> {
    tokio::spawn(run(plug, settings))
}

/// Sleeps the configured interval, then samples energy usage if monitoring is
/// on. Interval and switch are re-read every cycle. Never returns.
pub async fn run(plug: Arc<PlugController>, settings: Arc<SettingsStore>) {
    info!("Energy poller started");
    loop {
        let interval = settings.snapshot().await.energy_update_interval.max(1);
        tokio::time::sleep(Duration::from_secs(interval)).await;

        if !settings.snapshot().await.enable_energy_monitoring {
            continue;
        }

        match plug.fetch_energy().await {
            Ok(energy) => {
                debug!(
                    current_power_mw = energy.current_power,
                    today_energy_wh = energy.today_energy,
                    "Energy sample"
                );
            }
            Err(err) => {
                error!(
                    error = %err,
                    retry_in_secs = FALLBACK_DELAY.as_secs(),
                    "Energy monitoring error"
                );
                tokio::time::sleep(FALLBACK_DELAY).await;
            }
        }
    }
}
