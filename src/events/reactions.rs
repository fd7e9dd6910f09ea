// reactions.rs
use std::{sync::Arc, time::Duration};
use tracing::info;

use super::{EventBus, HostEventKind};
use crate::{config::SettingsStore, controller::PlugController};

/// Powers the plug on print start and off a while after the print is done.
/// A pending delayed shut-off is never cancelled.
pub fn register_print_reactions(
    bus: &EventBus,
    plug: Arc<PlugController>,
    settings: Arc<SettingsStore>,
) {
    {
        let plug = Arc::clone(&plug);
        let settings = Arc::clone(&settings);
        bus.subscribe(HostEventKind::PrintStarted, move |_payload| {
            let plug = Arc::clone(&plug);
            let settings = Arc::clone(&settings);
            tokio::spawn(async move {
                if settings.snapshot().await.auto_on_print_start {
                    info!("Print started - turning plug on");
                    plug.turn_on().await;
                }
            });
        });
    }

    bus.subscribe(HostEventKind::PrintDone, move |_payload| {
        let plug = Arc::clone(&plug);
        let settings = Arc::clone(&settings);
        tokio::spawn(async move {
            let current = settings.snapshot().await;
            if !current.auto_off_print_end {
                return;
            }
            info!(
                delay_secs = current.auto_off_delay,
                "Print done - turning plug off after delay"
            );
            tokio::time::sleep(Duration::from_secs(current.auto_off_delay)).await;
            plug.turn_off().await;
        });
    });
}
