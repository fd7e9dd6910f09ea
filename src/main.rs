// main.rs
mod commands;
mod config;
mod controller;
mod devices;
mod diagnostics;
mod docs;
mod error;
mod events;
mod handlers;
mod metrics;
mod models;
mod poller;
mod utils;

use clap::{Parser, Subcommand};
use controller::PlugController;
use devices::TapoConnector;
use models::AppState;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Drives a Tapo P110 smart plug for a 3D printer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Check connectivity to the configured plug and print a report
    Diagnose,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = config::Settings::new()
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Diagnose => {
            let report =
                diagnostics::run(settings.plug, Arc::new(TapoConnector), diagnostics::HTTP_PORT)
                    .await?;
            print!("{report}");
            Ok(())
        }
        Command::Serve => serve(settings).await,
    }
}

async fn serve(settings: config::Settings) -> anyhow::Result<()> {
    if settings.metrics.enabled {
        metrics::setup_metrics(settings.metrics.port)
            .map_err(|e| anyhow::anyhow!("Failed to setup metrics: {}", e))?;
        tracing::info!("Metrics exported on port {}", settings.metrics.port);
    }

    let store = Arc::new(config::SettingsStore::new(settings.plug));
    let plug = Arc::new(PlugController::new(Arc::new(TapoConnector), Arc::clone(&store)));
    let state = Arc::new(AppState::new(Arc::clone(&plug), Arc::clone(&store)));

    events::register_print_reactions(&state.events, Arc::clone(&plug), Arc::clone(&store));
    poller::spawn_energy_poller(plug, store);

    let app = handlers::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server.address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind address: {}", e))?;

    tracing::info!("Tapo P110 service started on {}", settings.server.address);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
