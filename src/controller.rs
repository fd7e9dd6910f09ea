// controller.rs
use chrono::Utc;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, RwLock},
    time::{Instant, timeout},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::SettingsStore,
    devices::{Credentials, PlugConnector, PlugDevice},
    error::AppError,
    metrics,
    models::{DeviceInfo, EnergySample, EnergyUsage, PlugStateView, SessionState},
};

/// Per-attempt ceilings for handshake, login and the first device-info read.
pub const TIMEOUT_LADDER: [Duration; 4] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(15),
    Duration::from_secs(30),
];

pub const EXPECTED_MODELS: [&str; 2] = ["P110", "P110M"];

/// A live, authenticated handle to the plug.
pub struct DeviceSession {
    pub id: Uuid,
    pub info: DeviceInfo,
    device: Box<dyn PlugDevice>,
}

/// Outcome of one rung of the timeout ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub attempt: usize,
    pub ceiling: Duration,
    pub elapsed: Duration,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct CachedReadings {
    last_status: Option<bool>,
    last_energy: Option<EnergySample>,
    last_connect: Vec<ConnectAttempt>,
}

/// Owns the single device session. Every connect, device call and
/// disconnect runs under `session`.
pub struct PlugController {
    connector: Arc<dyn PlugConnector>,
    settings: Arc<SettingsStore>,
    session: Mutex<Option<DeviceSession>>,
    cache: RwLock<CachedReadings>,
}

impl PlugController {
    pub fn new(connector: Arc<dyn PlugConnector>, settings: Arc<SettingsStore>) -> Self {
        Self {
            connector,
            settings,
            session: Mutex::new(None),
            cache: RwLock::new(CachedReadings::default()),
        }
    }

    /// Returns true once a session is ready. No-op if one is already open.
    pub async fn connect(&self) -> bool {
        let mut slot = self.session.lock().await;
        self.ensure_session(&mut slot).await.is_ok()
    }

    pub async fn disconnect(&self) {
        if let Some(session) = self.session.lock().await.take() {
            debug!(session = %session.id, "Device session dropped");
        }
    }

    pub async fn turn_on(&self) -> bool {
        self.set_power(true).await
    }

    pub async fn turn_off(&self) -> bool {
        self.set_power(false).await
    }

    /// Reads the relay state and issues exactly one switch call to invert it.
    pub async fn toggle(&self) -> bool {
        match self.get_status().await {
            Some(info) if info.device_on => self.turn_off().await,
            Some(_) => self.turn_on().await,
            None => false,
        }
    }

    pub async fn get_status(&self) -> Option<DeviceInfo> {
        match self.fetch_status().await {
            Ok(info) => Some(info),
            Err(err) => {
                log_failure("get status", &err);
                None
            }
        }
    }

    pub async fn get_energy(&self) -> Option<EnergyUsage> {
        match self.fetch_energy().await {
            Ok(energy) => Some(energy),
            Err(err) => {
                log_failure("get energy usage", &err);
                None
            }
        }
    }

    /// Drops any open session and runs a fresh connect.
    pub async fn test_connection(&self) -> bool {
        let settings = self.settings.snapshot().await;
        info!(
            address = %settings.device_ip,
            username = %settings.username,
            "Testing connection"
        );

        self.disconnect().await;
        let connected = self.connect().await;
        if connected {
            info!("Test connection successful");
        } else {
            error!("Test connection failed");
        }
        connected
    }

    pub async fn fetch_status(&self) -> Result<DeviceInfo, AppError> {
        let info = {
            let mut slot = self.session.lock().await;
            let session = self.ensure_session(&mut slot).await?;
            let result = session.device.device_info().await;
            if result.is_err() {
                *slot = None;
            }
            result?
        };

        self.cache.write().await.last_status = Some(info.device_on);
        metrics::record_relay_state(info.device_on);
        Ok(info)
    }

    pub async fn fetch_energy(&self) -> Result<EnergyUsage, AppError> {
        let energy = {
            let mut slot = self.session.lock().await;
            let session = self.ensure_session(&mut slot).await?;
            let result = session.device.energy_usage().await;
            if result.is_err() {
                *slot = None;
            }
            result?
        };

        self.cache.write().await.last_energy = Some(EnergySample {
            energy: energy.clone(),
            fetched_at: Utc::now(),
        });
        metrics::record_energy(&energy);
        Ok(energy)
    }

    /// Cached readings plus session state. Never waits on device I/O.
    pub async fn state(&self) -> PlugStateView {
        let (session, session_id) = match self.session.try_lock() {
            Ok(slot) => match slot.as_ref() {
                Some(session) => (SessionState::Connected, Some(session.id)),
                None => (SessionState::Disconnected, None),
            },
            Err(_) => (SessionState::Busy, None),
        };
        let cache = self.cache.read().await;

        PlugStateView {
            session,
            session_id,
            last_status: cache.last_status,
            last_energy: cache.last_energy.clone(),
        }
    }

    /// Attempts made by the most recent connect that reached the device.
    pub async fn last_connect_attempts(&self) -> Vec<ConnectAttempt> {
        self.cache.read().await.last_connect.clone()
    }

    async fn set_power(&self, on: bool) -> bool {
        let label = if on { "ON" } else { "OFF" };
        let result = {
            let mut slot = self.session.lock().await;
            match self.ensure_session(&mut slot).await {
                Ok(session) => {
                    let result = if on {
                        session.device.turn_on().await
                    } else {
                        session.device.turn_off().await
                    };
                    if result.is_err() {
                        *slot = None;
                    }
                    result
                }
                Err(err) => Err(err),
            }
        };

        match result {
            Ok(()) => {
                self.cache.write().await.last_status = Some(on);
                metrics::record_relay_state(on);
                info!("Plug turned {label}");
                true
            }
            Err(err) => {
                error!(error = %err, "Failed to turn plug {label}");
                false
            }
        }
    }

    async fn ensure_session<'s>(
        &self,
        slot: &'s mut Option<DeviceSession>,
    ) -> Result<&'s DeviceSession, AppError> {
        let session = match slot.take() {
            Some(session) => session,
            None => self.open_session().await?,
        };
        Ok(slot.insert(session))
    }

    async fn open_session(&self) -> Result<DeviceSession, AppError> {
        let mut history = Vec::with_capacity(TIMEOUT_LADDER.len());
        let result = self.walk_ladder(&mut history).await;
        self.cache.write().await.last_connect = history;
        result
    }

    async fn walk_ladder(
        &self,
        history: &mut Vec<ConnectAttempt>,
    ) -> Result<DeviceSession, AppError> {
        let settings = self.settings.snapshot().await;
        let credentials = Credentials::from_settings(&settings).inspect_err(|err| {
            error!(error = %err, "Cannot connect");
        })?;

        let attempts = TIMEOUT_LADDER.len();
        let mut last_error = None;
        for (index, ceiling) in TIMEOUT_LADDER.into_iter().enumerate() {
            let attempt = index + 1;
            info!(
                address = %credentials.address,
                attempt,
                attempts,
                timeout_secs = ceiling.as_secs(),
                "Connecting to plug"
            );
            metrics::record_connect_attempt(ceiling.as_secs());

            let started = Instant::now();
            let outcome = self.attempt(&credentials, ceiling).await;
            let elapsed = started.elapsed();
            history.push(ConnectAttempt {
                attempt,
                ceiling,
                elapsed,
                error: outcome.as_ref().err().map(ToString::to_string),
            });

            match outcome {
                Ok(session) => {
                    info!(
                        session = %session.id,
                        model = %session.info.model,
                        firmware = %session.info.fw_ver,
                        device_on = session.info.device_on,
                        timeout_secs = ceiling.as_secs(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Connected"
                    );
                    if !EXPECTED_MODELS.contains(&session.info.model.as_str()) {
                        warn!(model = %session.info.model, "Expected a P110");
                    }
                    return Ok(session);
                }
                Err(err) if err.is_transient() => {
                    warn!(
                        attempt,
                        timeout_secs = ceiling.as_secs(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %err,
                        "Timeout/connection error"
                    );
                    if attempt < attempts {
                        info!("Retrying with longer timeout");
                    }
                    last_error = Some(err);
                }
                Err(err) => {
                    if let AppError::Format(_) = err {
                        error!(
                            elapsed_ms = elapsed.as_millis() as u64,
                            error = %err,
                            "Failed to connect; this might be a firmware compatibility issue"
                        );
                    } else {
                        error!(
                            elapsed_ms = elapsed.as_millis() as u64,
                            error = %err,
                            "Failed to connect"
                        );
                    }
                    metrics::record_connect_failure();
                    return Err(err);
                }
            }
        }

        error!("All timeout attempts failed");
        metrics::record_connect_failure();
        Err(last_error.unwrap_or_else(|| AppError::Timeout("no connection attempts".into())))
    }

    /// One handshake, login and device-info read bounded by `ceiling`.
    async fn attempt(
        &self,
        credentials: &Credentials,
        ceiling: Duration,
    ) -> Result<DeviceSession, AppError> {
        let connect = async {
            let device = self.connector.open(credentials, ceiling).await?;
            debug!("Getting device info");
            let info = device.device_info().await?;
            Ok::<_, AppError>(DeviceSession {
                id: Uuid::new_v4(),
                info,
                device,
            })
        };

        timeout(ceiling, connect).await.map_err(|_| {
            AppError::Timeout(format!("no response within {}s", ceiling.as_secs()))
        })?
    }
}

fn log_failure(action: &str, err: &AppError) {
    match err {
        AppError::Format(_) => error!(
            error = %err,
            "Failed to {action}; this might be a firmware compatibility issue"
        ),
        _ => error!(error = %err, "Failed to {action}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PlugSettings, devices::fake::FakeConnector};

    fn configured() -> PlugSettings {
        PlugSettings {
            device_ip: "192.168.0.105".to_string(),
            username: "me@example.com".to_string(),
            password: "secret".to_string(),
            ..PlugSettings::default()
        }
    }

    fn controller_with(settings: PlugSettings) -> (PlugController, FakeConnector) {
        let fake = FakeConnector::default();
        let controller = PlugController::new(
            Arc::new(fake.clone()),
            Arc::new(SettingsStore::new(settings)),
        );
        (controller, fake)
    }

    fn timeout_err() -> AppError {
        AppError::Timeout("read timed out".into())
    }

    #[tokio::test]
    async fn connect_is_idempotent() {
        let (plug, fake) = controller_with(configured());

        assert!(plug.connect().await);
        assert!(plug.connect().await);

        assert_eq!(fake.state().open_timeouts.len(), 1);
        assert_eq!(fake.state().info_calls, 1);
    }

    #[tokio::test]
    async fn connect_walks_the_whole_ladder_once() {
        let (plug, fake) = controller_with(configured());
        fake.state().unreachable = true;

        assert!(!plug.connect().await);

        assert_eq!(fake.state().open_timeouts, TIMEOUT_LADDER.to_vec());
        assert_eq!(plug.state().await.session, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn transient_failures_retry_with_the_next_ceiling() {
        let (plug, fake) = controller_with(configured());
        fake.state().open_failures.push_back(timeout_err());
        fake.state().info_failures.push_back(AppError::Connection("reset".into()));

        assert!(plug.connect().await);

        assert_eq!(fake.state().open_timeouts, TIMEOUT_LADDER[..3].to_vec());
        assert_eq!(plug.state().await.session, SessionState::Connected);
    }

    #[tokio::test]
    async fn non_transient_failure_stops_retrying() {
        let (plug, fake) = controller_with(configured());
        fake.state().open_failures.push_back(timeout_err());
        fake.state()
            .open_failures
            .push_back(AppError::Device("login rejected".into()));

        assert!(!plug.connect().await);

        assert_eq!(fake.state().open_timeouts, TIMEOUT_LADDER[..2].to_vec());
    }

    #[tokio::test]
    async fn format_error_on_device_info_stops_retrying() {
        let (plug, fake) = controller_with(configured());
        fake.state()
            .info_failures
            .push_back(AppError::Format("missing field `model`".into()));

        assert!(!plug.connect().await);
        assert_eq!(fake.state().open_timeouts.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_handshake_is_cut_off_at_each_ceiling() {
        let (plug, fake) = controller_with(configured());
        fake.state().open_delay = Some(Duration::from_secs(120));

        let started = Instant::now();
        assert!(!plug.connect().await);

        assert_eq!(fake.state().open_timeouts, TIMEOUT_LADDER.to_vec());
        assert_eq!(started.elapsed(), Duration::from_secs(5 + 10 + 15 + 30));

        let history = plug.last_connect_attempts().await;
        assert_eq!(history.len(), 4);
        for (record, ceiling) in history.iter().zip(TIMEOUT_LADDER) {
            assert_eq!(record.ceiling, ceiling);
            assert_eq!(record.elapsed, ceiling);
            assert!(record.error.as_deref().unwrap().contains("no response within"));
        }
    }

    #[tokio::test]
    async fn attempt_history_records_failures_then_success() {
        let (plug, fake) = controller_with(configured());
        fake.state().open_failures.push_back(timeout_err());

        assert!(plug.connect().await);

        let history = plug.last_connect_attempts().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].attempt, 1);
        assert_eq!(history[0].ceiling, Duration::from_secs(5));
        assert!(history[0].error.as_deref().unwrap().contains("read timed out"));
        assert_eq!(history[1].attempt, 2);
        assert_eq!(history[1].error, None);
    }

    #[tokio::test]
    async fn incomplete_settings_never_reach_the_device() {
        let (plug, fake) = controller_with(PlugSettings::default());

        assert!(!plug.connect().await);
        assert!(fake.state().open_timeouts.is_empty());
    }

    #[tokio::test]
    async fn unreachable_device_degrades_to_negative_results() {
        let (plug, fake) = controller_with(configured());
        fake.state().unreachable = true;

        assert!(!plug.turn_on().await);
        assert!(!plug.turn_off().await);
        assert!(!plug.toggle().await);
        assert_eq!(plug.get_status().await, None);
        assert_eq!(plug.get_energy().await, None);
        assert!(fake.state().switch_calls.is_empty());
    }

    #[tokio::test]
    async fn toggle_inverts_the_reported_state() {
        let (plug, fake) = controller_with(configured());

        fake.state().device_on = true;
        assert!(plug.toggle().await);
        assert_eq!(fake.state().switch_calls, vec!["off"]);

        assert!(plug.toggle().await);
        assert_eq!(fake.state().switch_calls, vec!["off", "on"]);
    }

    #[tokio::test]
    async fn toggle_skips_switching_when_status_fails() {
        let (plug, fake) = controller_with(configured());
        assert!(plug.connect().await);
        fake.state()
            .info_failures
            .push_back(AppError::Device("bad session".into()));
        fake.state().unreachable = true;

        assert!(!plug.toggle().await);
        assert!(fake.state().switch_calls.is_empty());
    }

    #[tokio::test]
    async fn switch_failure_tears_down_the_session() {
        let (plug, fake) = controller_with(configured());
        fake.state()
            .switch_failures
            .push_back(AppError::Device("-1012".into()));

        assert!(!plug.turn_on().await);
        assert_eq!(plug.state().await.session, SessionState::Disconnected);
        assert_eq!(plug.state().await.last_status, None);

        assert!(plug.turn_on().await);
        assert_eq!(fake.state().open_timeouts.len(), 2);
        assert_eq!(plug.state().await.last_status, Some(true));
    }

    #[tokio::test]
    async fn cached_readings_survive_failed_reads() {
        let (plug, fake) = controller_with(configured());
        fake.state().energy.current_power = 12_500;

        let energy = plug.get_energy().await.unwrap();
        assert_eq!(energy.current_power, 12_500);

        fake.state()
            .energy_failures
            .push_back(AppError::Device("oops".into()));
        assert_eq!(plug.get_energy().await, None);

        let state = plug.state().await;
        assert_eq!(state.session, SessionState::Disconnected);
        assert_eq!(state.last_energy.unwrap().energy.current_power, 12_500);
    }

    #[tokio::test]
    async fn test_connection_forces_a_fresh_session() {
        let (plug, fake) = controller_with(configured());
        assert!(plug.connect().await);
        let first = plug.state().await.session_id;

        assert!(plug.test_connection().await);

        assert_eq!(fake.state().open_timeouts.len(), 2);
        assert_ne!(plug.state().await.session_id, first);
    }

    #[tokio::test]
    async fn unexpected_model_is_accepted() {
        let (plug, fake) = controller_with(configured());
        fake.state().model = "P100".to_string();

        assert!(plug.connect().await);
        assert_eq!(plug.get_status().await.unwrap().model, "P100");
    }
}
