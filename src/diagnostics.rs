// diagnostics.rs
use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpStream, time::timeout};

use crate::{
    config::{PlugSettings, SettingsStore},
    controller::{ConnectAttempt, EXPECTED_MODELS, PlugController},
    devices::{Credentials, PlugConnector},
    models::{DeviceInfo, EnergyUsage},
};

pub const HTTP_PORT: u16 = 80;
const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// What a successful diagnose run found out about the plug.
#[derive(Debug)]
pub struct DiagnosticReport {
    pub address: SocketAddr,
    pub username: String,
    pub attempts: Vec<ConnectAttempt>,
    pub info: DeviceInfo,
    pub energy: Result<EnergyUsage, String>,
    pub warnings: Vec<String>,
}

/// Step-by-step connection check against the configured plug. Fails on the
/// first step that does not pass; `port` is the plug's HTTP port.
pub async fn run(
    settings: PlugSettings,
    connector: Arc<dyn PlugConnector>,
    port: u16,
) -> anyhow::Result<DiagnosticReport> {
    let credentials = Credentials::from_settings(&settings)?;
    let address = check_reachable(&credentials.address, port).await?;

    let plug = PlugController::new(connector, Arc::new(SettingsStore::new(settings)));
    let connected = plug.test_connection().await;
    let attempts = plug.last_connect_attempts().await;
    if !connected {
        anyhow::bail!(
            "handshake/login failed after {} attempt(s):\n{}",
            attempts.len(),
            AttemptList(&attempts)
        );
    }

    let info = plug.fetch_status().await?;
    let mut warnings = Vec::new();
    if !EXPECTED_MODELS.contains(&info.model.as_str()) {
        warnings.push(format!("expected a P110, found {}", info.model));
    }

    let energy = plug.fetch_energy().await.map_err(|err| err.to_string());
    if let Err(err) = &energy {
        warnings.push(format!("energy usage unavailable: {err}"));
    }

    Ok(DiagnosticReport {
        address,
        username: credentials.username,
        attempts,
        info,
        energy,
        warnings,
    })
}

async fn check_reachable(address: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let stream = timeout(REACHABILITY_TIMEOUT, TcpStream::connect((address, port)))
        .await
        .map_err(|_| anyhow::anyhow!("no TCP answer from {address}:{port} within 5s"))?
        .map_err(|err| anyhow::anyhow!("plug is not reachable on {address}:{port}: {err}"))?;
    Ok(stream.peer_addr()?)
}

struct AttemptList<'a>(&'a [ConnectAttempt]);

impl fmt::Display for AttemptList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attempt in self.0 {
            write!(
                f,
                "     attempt {} ({}s ceiling): {} ms",
                attempt.attempt,
                attempt.ceiling.as_secs(),
                attempt.elapsed.as_millis()
            )?;
            match &attempt.error {
                Some(err) => writeln!(f, ", {err}")?,
                None => writeln!(f, ", ok")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = &self.info;
        writeln!(f, "[ok] {} accepts TCP connections", self.address)?;
        writeln!(f, "[ok] handshake and login as {}", self.username)?;
        write!(f, "{}", AttemptList(&self.attempts))?;
        writeln!(f, "[ok] device info")?;
        writeln!(f, "     model:    {}", info.model)?;
        writeln!(f, "     nickname: {}", info.nickname)?;
        writeln!(f, "     firmware: {}", info.fw_ver)?;
        writeln!(f, "     hardware: {}", info.hw_ver)?;
        writeln!(f, "     state:    {}", if info.device_on { "ON" } else { "OFF" })?;
        writeln!(f, "     signal:   {}", info.signal_level)?;
        if let Ok(energy) = &self.energy {
            writeln!(f, "[ok] energy usage")?;
            writeln!(f, "     current power: {} mW", energy.current_power)?;
            writeln!(f, "     today:         {} Wh", energy.today_energy)?;
            writeln!(f, "     this month:    {} Wh", energy.month_energy)?;
        }
        for warning in &self.warnings {
            writeln!(f, "[warn] {warning}")?;
        }
        Ok(())
    }
}
